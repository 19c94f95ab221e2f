//! Common types and utilities shared across the tariff crates.
//!
//! This crate defines the canonical offer schema, the run-level error taxonomy,
//! the page-provider capability used by extractors, and the shared logging
//! initialiser. It stays dependency-light so every crate in the workspace can
//! depend on it.
//!
//! # Overview
//!
//! - [`model`]: [`ProductRecord`], [`PackRecord`], [`LogRecord`] and the tagged
//!   [`Quantity`] value with its warehouse wire encoding
//! - [`error`]: [`ScrapeError`] and [`ValidationError`]
//! - [`page`]: [`PageProvider`] and [`RenderedPage`], the seam to browser automation
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use tariff_common::{ProductCategory, Quantity};
//!
//! assert!(ProductCategory::MobilePrepaid.is_mobile());
//! assert_eq!(Quantity::Unknown.to_wire(), Some(-1.0));
//! assert_eq!(Quantity::NotApplicable.to_wire(), None);
//! ```

pub mod error;
pub mod model;
pub mod observability;
pub mod page;

pub use error::{Result, ScrapeError, ValidationError};
pub use model::{
    FileKind, LogRecord, PackRecord, ProductCategory, ProductRecord, Quantity, RunStatus,
    NO_ERROR, UNLIMITED_SENTINEL,
};
pub use page::{PageProvider, RenderedPage};

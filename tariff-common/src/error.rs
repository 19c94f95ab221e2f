//! Run-level error taxonomy.
//!
//! Every failure inside a scraping run is classified into one of these variants
//! and surfaced once, as the run's `error_details`. Nothing here is retried
//! locally; re-execution is the scheduler's business.

use std::fmt;

/// A schema violation found while validating an aggregated product batch.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("record {index} field `{field}`: {reason}")]
pub struct ValidationError {
    /// Position of the offending record in the batch.
    pub index: usize,
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(index: usize, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            index,
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Error types used across a scraping run.
#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    /// Page fetch or navigation failed.
    #[error("Network error at {url}: {message}")]
    Network { url: String, message: String },

    /// An expected UI control was missing or did not respond.
    #[error("Interaction error at {url} on `{control}`: {message}")]
    Interaction {
        url: String,
        control: String,
        message: String,
    },

    /// An expected data field was missing or could not be parsed.
    #[error("Extraction error at {url} on field `{field}`: {reason}")]
    Extraction {
        url: String,
        field: String,
        reason: String,
    },

    /// The aggregated product batch violated the canonical schema.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Cross-joining products into packs failed.
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// The persistence collaborator rejected a payload.
    #[error("Persistence error for {target}: {message}")]
    Persistence { target: String, message: String },

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScrapeError {
    pub fn network(url: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::Network {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    pub fn interaction(
        url: impl fmt::Display,
        control: impl Into<String>,
        message: impl fmt::Display,
    ) -> Self {
        Self::Interaction {
            url: url.to_string(),
            control: control.into(),
            message: message.to_string(),
        }
    }

    pub fn extraction(
        url: impl fmt::Display,
        field: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        Self::Extraction {
            url: url.to_string(),
            field: field.into(),
            reason: reason.to_string(),
        }
    }

    /// Short machine-friendly kind, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::Interaction { .. } => "interaction",
            Self::Extraction { .. } => "extraction",
            Self::Validation(_) => "validation",
            Self::Synthesis(_) => "synthesis",
            Self::Persistence { .. } => "persistence",
            Self::Config(_) => "config",
        }
    }
}

/// Convenient alias for results that use [`ScrapeError`].
pub type Result<T> = std::result::Result<T, ScrapeError>;

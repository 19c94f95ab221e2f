//! Extraction and normalisation engine.
//!
//! - Field normalisation of decorated tokens (`normalize`)
//! - Per-category extractors over rendered HTML, plus the combo parser (`extract`)
//! - Batch validation against the canonical schema (`validate`)
//! - Mobile + internet pack synthesis (`packs`)
//! - Competitor registry and run plans (`competitor`)
//! - Output sink (`sink`) and the run coordinator tying it together (`run`)
//!
//! The engine never drives a browser itself: it consumes
//! [`tariff_common::PageProvider`] for rendered pages and
//! [`fetch::DocumentSource`] for static ones.

pub mod competitor;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod packs;
pub mod run;
pub mod sink;
pub mod validate;

pub use competitor::{CategoryPage, CompetitorPlan, ExtractorSet};
pub use extract::{CategoryExtractor, ExtractContext};
pub use fetch::DocumentSource;
pub use normalize::{NormalizeError, Normalizer};
pub use packs::synthesize;
pub use run::{record_failed_run, RunCoordinator, RunOutcome, RunStep};
pub use sink::{JsonFileSink, RunSink, SinkFormat};
pub use validate::validate;

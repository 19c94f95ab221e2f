//! Per-category extractors.
//!
//! Each extractor maps one competitor's markup for one product category onto
//! [`ProductRecord`]s. Parsing is a pure function of an HTML snapshot; the
//! async [`CategoryExtractor::extract`] drives the page (toggles, tier
//! switches) and parses every snapshot it needs.
//!
//! Any missing element or unparsable figure aborts the category with
//! [`ScrapeError::Extraction`] naming the URL and field.

pub mod combo;
pub mod internet;
pub mod prepaid;
pub mod subscription;

use async_trait::async_trait;
use chrono::NaiveDate;
use scraper::{ElementRef, Selector};
use tariff_common::{ProductCategory, ProductRecord, RenderedPage, Result, ScrapeError};
use url::Url;

use crate::normalize::NormalizeError;

pub use combo::ComboExtractor;
pub use internet::InternetExtractor;
pub use prepaid::PrepaidExtractor;
pub use subscription::SubscriptionExtractor;

/// Who and what is being extracted.
#[derive(Debug, Clone)]
pub struct ExtractContext {
    pub competitor: String,
    pub url: Url,
    pub scraped_at: NaiveDate,
}

impl ExtractContext {
    pub fn missing(&self, field: &str) -> ScrapeError {
        ScrapeError::extraction(&self.url, field, "expected element not found")
    }

    pub fn unparsable(&self, field: &str, err: NormalizeError) -> ScrapeError {
        ScrapeError::extraction(&self.url, field, err)
    }
}

#[async_trait]
pub trait CategoryExtractor: Send + Sync {
    fn category(&self) -> ProductCategory;

    /// Selector whose presence means the offers have rendered.
    fn ready_selector(&self) -> &str;

    /// Parse one rendered snapshot.
    fn parse(&self, html: &str, ctx: &ExtractContext) -> Result<Vec<ProductRecord>>;

    /// Wait for the offers, then parse the page as-is.
    async fn extract(
        &self,
        page: &mut dyn RenderedPage,
        ctx: &ExtractContext,
    ) -> Result<Vec<ProductRecord>> {
        page.wait_for(self.ready_selector()).await?;
        let html = page.content().await?;
        self.parse(&html, ctx)
    }
}

pub(crate) fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| ScrapeError::Config(format!("invalid selector '{selector}': {e}")))
}

pub(crate) fn select_one<'a>(
    scope: ElementRef<'a>,
    selector: &Selector,
    ctx: &ExtractContext,
    field: &str,
) -> Result<ElementRef<'a>> {
    scope
        .select(selector)
        .next()
        .ok_or_else(|| ctx.missing(field))
}

pub(crate) fn attr<'a>(el: ElementRef<'a>, name: &str, ctx: &ExtractContext) -> Result<&'a str> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ctx.missing(name))
}

/// Visible text with whitespace collapsed.
pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drop anything outside ASCII (icons, non-breaking spaces, arrows).
pub(crate) fn ascii_only(s: &str) -> String {
    s.chars().filter(char::is_ascii).collect()
}

/// `"Fiber Max"` -> `"fiber_max"`.
pub(crate) fn slug(s: &str) -> String {
    s.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Drop the `,-` marker competitors put after round prices.
pub(crate) fn strip_price_marker(s: &str) -> &str {
    let s = s.trim();
    s.strip_suffix(",-").unwrap_or(s).trim()
}

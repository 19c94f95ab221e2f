//! Combo (bundle) discount from the static promotion page.

use scraper::{Html, Selector};
use tariff_common::{Result, ScrapeError};
use url::Url;

use super::{compile, text_of};
use crate::normalize::first_integer;

pub const COMBO_FIELD: &str = "combo_advantage";

pub struct ComboExtractor {
    message: Selector,
}

impl ComboExtractor {
    pub fn new() -> Result<Self> {
        Self::with_selector(".monthlyPrice__discountMessage")
    }

    pub fn with_selector(selector: &str) -> Result<Self> {
        Ok(Self {
            message: compile(selector)?,
        })
    }

    /// Monthly discount granted when mobile and internet are bought together:
    /// the first integer in the discount message.
    pub fn parse(&self, html: &str, url: &Url) -> Result<f64> {
        let doc = Html::parse_document(html);
        let message = doc
            .select(&self.message)
            .next()
            .map(text_of)
            .ok_or_else(|| {
                ScrapeError::extraction(url, COMBO_FIELD, "discount message not found")
            })?;
        first_integer(&message)
            .map(|n| n as f64)
            .ok_or_else(|| {
                ScrapeError::extraction(url, COMBO_FIELD, format!("no amount in {message:?}"))
            })
    }
}

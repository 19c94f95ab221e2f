//! Prepaid tiles.
//!
//! Each tile carries its figures as data attributes (`data-focus`, `data-gb`,
//! `data-min`, `data-price`). The SMS figure only exists as text in the tile's
//! rate rows, and is located by the row's label rather than by position.
//! Prepaid pages also expose toggles that switch tiles to a bundled-calls
//! pricing mode; that mode is captured as a second batch.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tariff_common::{ProductCategory, ProductRecord, RenderedPage, Result};
use tracing::{debug, info};

use super::{attr, compile, text_of, CategoryExtractor, ExtractContext};
use crate::normalize::Normalizer;

#[derive(Debug, Clone)]
pub struct PrepaidSelectors {
    pub tile: String,
    pub rate_figure: String,
    pub toggle: String,
    /// Words identifying the SMS rate row.
    pub sms_labels: Vec<String>,
}

impl Default for PrepaidSelectors {
    fn default() -> Self {
        Self {
            tile: ".PrepaidSelectorProduct".into(),
            rate_figure: ".PrepaidSelectorProduct__rates__major".into(),
            toggle: ".slider".into(),
            sms_labels: vec!["sms".into(), "text".into()],
        }
    }
}

pub struct PrepaidExtractor {
    selectors: PrepaidSelectors,
    tile: Selector,
    rate_figure: Selector,
    normalizer: Normalizer,
}

impl PrepaidExtractor {
    pub fn new(selectors: PrepaidSelectors, normalizer: Normalizer) -> Result<Self> {
        Ok(Self {
            tile: compile(&selectors.tile)?,
            rate_figure: compile(&selectors.rate_figure)?,
            selectors,
            normalizer,
        })
    }

    fn parse_tile(&self, tile: ElementRef<'_>, ctx: &ExtractContext) -> Result<ProductRecord> {
        let focus = attr(tile, "data-focus", ctx)?;
        let gb = attr(tile, "data-gb", ctx)?;
        let minutes = attr(tile, "data-min", ctx)?;
        let price = attr(tile, "data-price", ctx)?;
        let sms = self.sms_figure(tile).ok_or_else(|| ctx.missing("sms"))?;

        let data = self
            .normalizer
            .quantity(gb)
            .map_err(|e| ctx.unparsable("data-gb", e))?;
        let minutes = self
            .normalizer
            .quantity(minutes)
            .map_err(|e| ctx.unparsable("data-min", e))?;
        let sms = self
            .normalizer
            .quantity(&sms)
            .map_err(|e| ctx.unparsable("sms", e))?;
        let price = self
            .normalizer
            .price(price)
            .map_err(|e| ctx.unparsable("data-price", e))?;

        Ok(ProductRecord {
            product_name: format!(
                "{}_{}_{}_gb",
                ProductCategory::MobilePrepaid,
                focus.to_lowercase(),
                gb.to_lowercase()
            ),
            competitor_name: ctx.competitor.clone(),
            product_category: ProductCategory::MobilePrepaid,
            product_url: ctx.url.to_string(),
            price,
            scraped_at: ctx.scraped_at,
            data,
            minutes,
            sms,
            upload_speed: None,
            download_speed: None,
        })
    }

    /// Text of the rate figure whose row is labelled as SMS.
    fn sms_figure(&self, tile: ElementRef<'_>) -> Option<String> {
        tile.select(&self.rate_figure)
            .find(|figure| {
                let label = self.rate_label(*figure).to_lowercase();
                self.selectors
                    .sms_labels
                    .iter()
                    .any(|k| label.contains(k.as_str()))
            })
            .map(text_of)
    }

    /// Label of a rate row. When figures share one container, the label is the
    /// text between this figure and the next one.
    fn rate_label(&self, figure: ElementRef<'_>) -> String {
        let Some(row) = figure.parent().and_then(ElementRef::wrap) else {
            return String::new();
        };
        if row.select(&self.rate_figure).count() <= 1 {
            return text_of(row);
        }

        let mut label = String::new();
        for sibling in figure.next_siblings() {
            if let Some(el) = ElementRef::wrap(sibling) {
                if self.rate_figure.matches(&el) {
                    break;
                }
                label.push_str(&text_of(el));
            } else if let Some(text) = sibling.value().as_text() {
                label.push_str(text);
            }
            label.push(' ');
        }
        label
    }
}

#[async_trait]
impl CategoryExtractor for PrepaidExtractor {
    fn category(&self) -> ProductCategory {
        ProductCategory::MobilePrepaid
    }

    fn ready_selector(&self) -> &str {
        &self.selectors.tile
    }

    fn parse(&self, html: &str, ctx: &ExtractContext) -> Result<Vec<ProductRecord>> {
        let doc = Html::parse_document(html);
        let tiles: Vec<ElementRef> = doc.select(&self.tile).collect();
        if tiles.is_empty() {
            return Err(ctx.missing(&self.selectors.tile));
        }
        debug!(url = %ctx.url, count = tiles.len(), "extract.prepaid.tiles");
        tiles.into_iter().map(|t| self.parse_tile(t, ctx)).collect()
    }

    /// Default pricing mode first, then the mode behind the toggles.
    async fn extract(
        &self,
        page: &mut dyn RenderedPage,
        ctx: &ExtractContext,
    ) -> Result<Vec<ProductRecord>> {
        page.wait_for(&self.selectors.tile).await?;
        let html = page.content().await?;
        let mut records = self.parse(&html, ctx)?;

        let toggled = page
            .click_all(&self.selectors.toggle, &self.selectors.tile)
            .await?;
        info!(url = %ctx.url, toggled, "extract.prepaid.toggles");

        page.wait_for(&self.selectors.tile).await?;
        let html = page.content().await?;
        records.extend(self.parse(&html, ctx)?);
        Ok(records)
    }
}

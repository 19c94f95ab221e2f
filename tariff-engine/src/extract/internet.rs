//! Home-internet price matrix.
//!
//! The page shows one matrix at a time; a row of budget filters switches it
//! between tiers. Each tier yields one record named after its filter label.

use async_trait::async_trait;
use scraper::{Html, Selector};
use tariff_common::{ProductCategory, ProductRecord, Quantity, RenderedPage, Result, ScrapeError};
use tracing::info;

use super::{
    ascii_only, compile, select_one, slug, strip_price_marker, text_of, CategoryExtractor,
    ExtractContext,
};
use crate::normalize::Normalizer;

#[derive(Debug, Clone)]
pub struct InternetSelectors {
    pub price: String,
    pub data: String,
    pub download_speed: String,
    pub upload_speed: String,
    pub tier_label: String,
    /// How many tiers to capture, starting from the one shown on load.
    pub tiers: usize,
}

impl Default for InternetSelectors {
    fn default() -> Self {
        Self {
            price: "tr.matrix__price td".into(),
            data: "tr.matrix__data td".into(),
            download_speed: "tr.matrix__downloadSpeed td".into(),
            // The upload figure sits in the row the site labels "voice".
            upload_speed: "tr.matrix__voice td".into(),
            tier_label: ".wideScreenFilters__budgetItem__label".into(),
            tiers: 2,
        }
    }
}

pub struct InternetExtractor {
    selectors: InternetSelectors,
    price: Selector,
    data: Selector,
    download_speed: Selector,
    upload_speed: Selector,
    tier_label: Selector,
    normalizer: Normalizer,
}

impl InternetExtractor {
    pub fn new(selectors: InternetSelectors, normalizer: Normalizer) -> Result<Self> {
        Ok(Self {
            price: compile(&selectors.price)?,
            data: compile(&selectors.data)?,
            download_speed: compile(&selectors.download_speed)?,
            upload_speed: compile(&selectors.upload_speed)?,
            tier_label: compile(&selectors.tier_label)?,
            selectors,
            normalizer,
        })
    }

    /// Read the matrix currently shown and name it after the `tier`-th filter.
    pub fn parse_tier(&self, html: &str, ctx: &ExtractContext, tier: usize) -> Result<ProductRecord> {
        let doc = Html::parse_document(html);
        let root = doc.root_element();

        let label = doc
            .select(&self.tier_label)
            .nth(tier)
            .map(text_of)
            .ok_or_else(|| {
                ScrapeError::interaction(
                    &ctx.url,
                    &self.selectors.tier_label,
                    format!("tier {tier} filter not found"),
                )
            })?;

        let price_text = text_of(select_one(root, &self.price, ctx, "matrix-price")?);
        let data_text = text_of(select_one(root, &self.data, ctx, "matrix-data")?).to_lowercase();
        let download = speed(&text_of(select_one(
            root,
            &self.download_speed,
            ctx,
            "download_speed",
        )?));
        let upload = speed(&text_of(select_one(
            root,
            &self.upload_speed,
            ctx,
            "upload_speed",
        )?));
        if download.is_empty() {
            return Err(ctx.missing("download_speed"));
        }
        if upload.is_empty() {
            return Err(ctx.missing("upload_speed"));
        }

        let price = self
            .normalizer
            .price(strip_price_marker(&price_text))
            .map_err(|e| ctx.unparsable("matrix-price", e))?;
        let data = self
            .normalizer
            .quantity(&data_text)
            .map_err(|e| ctx.unparsable("matrix-data", e))?;

        Ok(ProductRecord {
            product_name: format!("{}_{}", ProductCategory::InternetSubscription, slug(&label)),
            competitor_name: ctx.competitor.clone(),
            product_category: ProductCategory::InternetSubscription,
            product_url: ctx.url.to_string(),
            price,
            scraped_at: ctx.scraped_at,
            data,
            minutes: Quantity::NotApplicable,
            sms: Quantity::NotApplicable,
            upload_speed: Some(upload),
            download_speed: Some(download),
        })
    }
}

fn speed(raw: &str) -> String {
    ascii_only(raw).trim().to_lowercase()
}

#[async_trait]
impl CategoryExtractor for InternetExtractor {
    fn category(&self) -> ProductCategory {
        ProductCategory::InternetSubscription
    }

    fn ready_selector(&self) -> &str {
        &self.selectors.tier_label
    }

    /// The tier shown on load.
    fn parse(&self, html: &str, ctx: &ExtractContext) -> Result<Vec<ProductRecord>> {
        Ok(vec![self.parse_tier(html, ctx, 0)?])
    }

    async fn extract(
        &self,
        page: &mut dyn RenderedPage,
        ctx: &ExtractContext,
    ) -> Result<Vec<ProductRecord>> {
        page.wait_for(&self.selectors.tier_label).await?;
        let mut records = Vec::with_capacity(self.selectors.tiers);
        for tier in 0..self.selectors.tiers {
            if tier > 0 {
                page.click_nth(&self.selectors.tier_label, tier, &self.selectors.price)
                    .await?;
                page.wait_for(&self.selectors.price).await?;
            }
            let html = page.content().await?;
            let record = self.parse_tier(&html, ctx, tier)?;
            info!(url = %ctx.url, tier, product = %record.product_name, "extract.internet.tier");
            records.push(record);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use url::Url;

    fn ctx() -> ExtractContext {
        ExtractContext {
            competitor: "mobileviking".into(),
            url: Url::parse("https://mobilevikings.be/en/offer/internet/").unwrap(),
            scraped_at: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        }
    }

    const MATRIX: &str = r#"
        <ul>
          <li class="wideScreenFilters__budgetItem__label">Fiber Max</li>
          <li class="wideScreenFilters__budgetItem__label">Zen Fiber</li>
        </ul>
        <table>
          <tr class="matrix__price"><td>55,-</td></tr>
          <tr class="matrix__data"><td>Unlimited</td></tr>
          <tr class="matrix__downloadSpeed"><td>1 Gbps &#8595;</td></tr>
          <tr class="matrix__voice"><td> 100 Mbps &#8593;</td></tr>
        </table>"#;

    #[test]
    fn first_tier_is_named_after_its_filter() {
        let ex = InternetExtractor::new(Default::default(), Normalizer::default()).unwrap();
        let r = &ex.parse(MATRIX, &ctx()).unwrap()[0];
        assert_eq!(r.product_name, "internet_subscription_fiber_max");
        assert_eq!(r.price, 55.0);
        assert_eq!(r.data, Quantity::Unlimited);
        assert_eq!(r.download_speed.as_deref(), Some("1 gbps"));
        assert_eq!(r.upload_speed.as_deref(), Some("100 mbps"));
        assert_eq!(r.minutes, Quantity::NotApplicable);
        assert_eq!(r.sms, Quantity::NotApplicable);
    }

    #[test]
    fn missing_tier_filter_is_an_interaction_error() {
        let ex = InternetExtractor::new(Default::default(), Normalizer::default()).unwrap();
        let err = ex.parse_tier(MATRIX, &ctx(), 2).unwrap_err();
        assert_eq!(err.kind(), "interaction");
    }
}

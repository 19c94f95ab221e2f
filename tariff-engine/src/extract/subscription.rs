//! Postpaid subscription cards.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tariff_common::{ProductCategory, ProductRecord, Quantity, Result, ScrapeError};
use tracing::debug;

use super::{compile, select_one, strip_price_marker, text_of, CategoryExtractor, ExtractContext};
use crate::normalize::Normalizer;

#[derive(Debug, Clone)]
pub struct SubscriptionSelectors {
    pub card: String,
    pub data: String,
    pub calls_texts: String,
    pub price: String,
}

impl Default for SubscriptionSelectors {
    fn default() -> Self {
        Self {
            card: ".PostpaidOption".into(),
            data: ".data-amount".into(),
            calls_texts: ".PostpaidOption__voiceTextAmount".into(),
            price: ".monthlyPrice__price".into(),
        }
    }
}

pub struct SubscriptionExtractor {
    selectors: SubscriptionSelectors,
    card: Selector,
    data: Selector,
    calls_texts: Selector,
    price: Selector,
    minutes_re: Regex,
    sms_re: Regex,
    normalizer: Normalizer,
}

impl SubscriptionExtractor {
    pub fn new(selectors: SubscriptionSelectors, normalizer: Normalizer) -> Result<Self> {
        let regex = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ScrapeError::Config(format!("invalid pattern: {e}")))
        };
        Ok(Self {
            card: compile(&selectors.card)?,
            data: compile(&selectors.data)?,
            calls_texts: compile(&selectors.calls_texts)?,
            price: compile(&selectors.price)?,
            minutes_re: regex(r"(\d+)\s*minutes")?,
            sms_re: regex(r"(\d+)\s*(?:texts|sms)")?,
            selectors,
            normalizer,
        })
    }

    fn parse_card(&self, card: ElementRef<'_>, ctx: &ExtractContext) -> Result<ProductRecord> {
        let data_text = text_of(select_one(card, &self.data, ctx, "data-amount")?).to_lowercase();
        let calls_texts =
            text_of(select_one(card, &self.calls_texts, ctx, "voice-text-amount")?).to_lowercase();
        let price_text = text_of(select_one(card, &self.price, ctx, "monthly-price")?);

        let data_label = data_text.replace("gb", "");
        let data_label = data_label.trim();
        let data = self
            .normalizer
            .quantity(data_label)
            .map_err(|e| ctx.unparsable("data-amount", e))?;
        let price = self
            .normalizer
            .price(strip_price_marker(&price_text))
            .map_err(|e| ctx.unparsable("monthly-price", e))?;

        Ok(ProductRecord {
            product_name: format!(
                "{}_{}_gb",
                ProductCategory::MobileSubscription,
                data_label.replace(' ', "_")
            ),
            competitor_name: ctx.competitor.clone(),
            product_category: ProductCategory::MobileSubscription,
            product_url: ctx.url.to_string(),
            price,
            scraped_at: ctx.scraped_at,
            data,
            minutes: captured(&self.minutes_re, &calls_texts),
            sms: captured(&self.sms_re, &calls_texts),
            upload_speed: None,
            download_speed: None,
        })
    }
}

/// First capture of `re` as a measured amount; `Unknown` when the free text
/// carries no count (e.g. "unlimited texts").
fn captured(re: &Regex, text: &str) -> Quantity {
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map_or(Quantity::Unknown, Quantity::Measured)
}

impl CategoryExtractor for SubscriptionExtractor {
    fn category(&self) -> ProductCategory {
        ProductCategory::MobileSubscription
    }

    fn ready_selector(&self) -> &str {
        &self.selectors.card
    }

    fn parse(&self, html: &str, ctx: &ExtractContext) -> Result<Vec<ProductRecord>> {
        let doc = Html::parse_document(html);
        let cards: Vec<ElementRef> = doc.select(&self.card).collect();
        if cards.is_empty() {
            return Err(ctx.missing(&self.selectors.card));
        }
        debug!(url = %ctx.url, count = cards.len(), "extract.subscription.cards");
        cards.into_iter().map(|c| self.parse_card(c, ctx)).collect()
    }
}

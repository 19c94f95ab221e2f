//! Competitor registry: which extractors handle which competitor's markup.

use std::fmt;
use tariff_common::{ProductCategory, Result, ScrapeError};
use url::Url;

use crate::extract::internet::InternetSelectors;
use crate::extract::prepaid::PrepaidSelectors;
use crate::extract::subscription::SubscriptionSelectors;
use crate::extract::{
    CategoryExtractor, ComboExtractor, InternetExtractor, PrepaidExtractor, SubscriptionExtractor,
};
use crate::normalize::Normalizer;

/// The extractors for one competitor, one per category, plus its combo parser.
pub struct ExtractorSet {
    extractors: Vec<Box<dyn CategoryExtractor>>,
    pub combo: ComboExtractor,
}

impl ExtractorSet {
    /// Look up the registered markup for `competitor`.
    pub fn for_competitor(competitor: &str, normalizer: Normalizer) -> Result<Self> {
        match competitor.to_ascii_lowercase().as_str() {
            "mobileviking" | "mobilevikings" => Self::mobileviking(normalizer),
            other => Err(ScrapeError::Config(format!(
                "no extractors registered for competitor '{other}'"
            ))),
        }
    }

    pub fn mobileviking(normalizer: Normalizer) -> Result<Self> {
        Ok(Self {
            extractors: vec![
                Box::new(PrepaidExtractor::new(
                    PrepaidSelectors::default(),
                    normalizer.clone(),
                )?),
                Box::new(SubscriptionExtractor::new(
                    SubscriptionSelectors::default(),
                    normalizer.clone(),
                )?),
                Box::new(InternetExtractor::new(
                    InternetSelectors::default(),
                    normalizer,
                )?),
            ],
            combo: ComboExtractor::new()?,
        })
    }

    pub fn get(&self, category: ProductCategory) -> Option<&dyn CategoryExtractor> {
        self.extractors
            .iter()
            .find(|e| e.category() == category)
            .map(|e| e.as_ref())
    }
}

impl fmt::Debug for ExtractorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let categories: Vec<ProductCategory> =
            self.extractors.iter().map(|e| e.category()).collect();
        f.debug_struct("ExtractorSet")
            .field("categories", &categories)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CategoryPage {
    pub category: ProductCategory,
    pub url: Url,
}

/// Everything one competitor run needs.
#[derive(Debug)]
pub struct CompetitorPlan {
    pub name: String,
    /// Extracted in order.
    pub pages: Vec<CategoryPage>,
    pub combo_url: Url,
    /// Probe each page over plain HTTP before rendering it.
    pub preflight: bool,
    pub extractors: ExtractorSet,
}

impl CompetitorPlan {
    pub fn new(
        name: impl Into<String>,
        pages: Vec<CategoryPage>,
        combo_url: Url,
        extractors: ExtractorSet,
    ) -> Self {
        Self {
            name: name.into(),
            pages,
            combo_url,
            preflight: true,
            extractors,
        }
    }

    pub fn with_preflight(mut self, preflight: bool) -> Self {
        self.preflight = preflight;
        self
    }
}

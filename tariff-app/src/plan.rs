use tariff_common::{ProductCategory, Result, ScrapeError};
use tariff_config::CompetitorSpec;
use tariff_engine::{CategoryPage, CompetitorPlan, ExtractorSet, Normalizer};

/// Turn a configured competitor into a runnable plan. Pages are extracted in
/// category order; a competitor without a combo page cannot produce packs and
/// is rejected.
pub fn plan_for(spec: &CompetitorSpec) -> Result<CompetitorPlan> {
    let normalizer = Normalizer::new(&spec.unlimited_keywords);
    let extractors = ExtractorSet::for_competitor(&spec.name, normalizer)?;

    let urls = &spec.pages;
    let pages: Vec<CategoryPage> = ProductCategory::ALL
        .into_iter()
        .filter_map(|category| {
            let url = match category {
                ProductCategory::MobilePrepaid => &urls.mobile_prepaid,
                ProductCategory::MobileSubscription => &urls.mobile_subscription,
                ProductCategory::InternetSubscription => &urls.internet_subscription,
            };
            url.clone().map(|url| CategoryPage { category, url })
        })
        .collect();
    if pages.is_empty() {
        return Err(ScrapeError::Config(format!(
            "competitor '{}' has no product pages",
            spec.name
        )));
    }

    let combo_url = urls.combo.clone().ok_or_else(|| {
        ScrapeError::Config(format!("competitor '{}' has no combo page", spec.name))
    })?;

    Ok(CompetitorPlan::new(&spec.name, pages, combo_url, extractors).with_preflight(spec.preflight()))
}

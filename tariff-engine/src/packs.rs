//! Mobile + internet bundles derived from a validated product batch.

use tariff_common::{PackRecord, ProductRecord, Result, ScrapeError};

/// Cross-join internet (outer) and mobile (inner) products, discounting each
/// pair by `combo_advantage`.
///
/// Relative order within each partition is preserved, so the output is fully
/// determined by the input. Negative pack prices are passed through.
pub fn synthesize(
    products: &[ProductRecord],
    combo_advantage: f64,
    pack_url: &str,
) -> Result<Vec<PackRecord>> {
    if !combo_advantage.is_finite() {
        return Err(ScrapeError::Synthesis(format!(
            "combo advantage is not a number: {combo_advantage}"
        )));
    }

    let mobile: Vec<&ProductRecord> = products
        .iter()
        .filter(|p| p.product_category.is_mobile())
        .collect();
    let internet: Vec<&ProductRecord> = products
        .iter()
        .filter(|p| p.product_category.is_internet())
        .collect();

    let mut packs = Vec::with_capacity(mobile.len() * internet.len());
    for i in &internet {
        for m in &mobile {
            let price = m.price + i.price - combo_advantage;
            if !price.is_finite() {
                return Err(ScrapeError::Synthesis(format!(
                    "non-finite price for {} + {}",
                    m.product_name, i.product_name
                )));
            }
            packs.push(PackRecord {
                competitor_name: i.competitor_name.clone(),
                pack_name: format!("{}_{}", m.product_name, i.product_name),
                pack_url: pack_url.to_string(),
                pack_description: None,
                price,
                scraped_at: i.scraped_at,
                mobile_product_name: Some(m.product_name.clone()),
                internet_product_name: Some(i.product_name.clone()),
            });
        }
    }
    Ok(packs)
}

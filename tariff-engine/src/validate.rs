//! Product batch validation.
//!
//! The whole batch is rejected on the first violation; downstream synthesis
//! and persistence only ever see batches that passed.

use serde_json::Value;
use tariff_common::{ProductCategory, ProductRecord, Quantity, ValidationError, UNLIMITED_SENTINEL};
use url::Url;

/// Check every record of `products` against the canonical schema.
pub fn validate(products: Vec<ProductRecord>) -> Result<Vec<ProductRecord>, ValidationError> {
    for (index, record) in products.iter().enumerate() {
        check_record(index, record)?;
    }
    Ok(products)
}

/// Validate an untyped `[...]` or `{"products": [...]}` batch, reporting type
/// errors against the offending record.
pub fn validate_value(batch: &Value) -> Result<Vec<ProductRecord>, ValidationError> {
    let items = match batch {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("products") {
            Some(Value::Array(items)) => items,
            _ => return Err(ValidationError::new(0, "products", "expected a list of products")),
        },
        _ => return Err(ValidationError::new(0, "products", "expected a list of products")),
    };

    let mut products = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let record: ProductRecord = serde_json::from_value(item.clone())
            .map_err(|e| ValidationError::new(index, field_of(&e), e.to_string()))?;
        products.push(record);
    }
    validate(products)
}

fn field_of(err: &serde_json::Error) -> String {
    // serde reports "missing field `x`" / "unknown variant `y`"
    let msg = err.to_string();
    msg.split('`')
        .nth(1)
        .filter(|_| msg.starts_with("missing field"))
        .map_or_else(|| "record".to_string(), str::to_string)
}

fn check_record(index: usize, r: &ProductRecord) -> Result<(), ValidationError> {
    let fail = |field: &str, reason: &str| Err(ValidationError::new(index, field, reason));

    if r.product_name.trim().is_empty() {
        return fail("product_name", "must not be empty");
    }
    if r.competitor_name.trim().is_empty() {
        return fail("competitor_name", "must not be empty");
    }
    if Url::parse(&r.product_url).is_err() {
        return fail("product_url", "not an absolute URL");
    }
    if !r.price.is_finite() || r.price < 0.0 {
        return fail("price", "must be a non-negative number");
    }

    for (field, q) in [("data", r.data), ("minutes", r.minutes), ("sms", r.sms)] {
        if let Quantity::Measured(x) = q {
            if !x.is_finite() || x < 0.0 {
                return fail(field, "must be non-negative");
            }
            if x >= UNLIMITED_SENTINEL {
                return fail(field, "collides with the unlimited sentinel");
            }
        }
    }
    if r.sms.measured().is_some_and(|x| x.fract() != 0.0) {
        return fail("sms", "must be a whole number of messages");
    }

    match r.product_category {
        ProductCategory::MobilePrepaid | ProductCategory::MobileSubscription => {
            for (field, q) in [("data", r.data), ("minutes", r.minutes), ("sms", r.sms)] {
                if !q.is_applicable() {
                    return fail(field, "required for mobile products");
                }
            }
            if r.upload_speed.is_some() {
                return fail("upload_speed", "must be null for mobile products");
            }
            if r.download_speed.is_some() {
                return fail("download_speed", "must be null for mobile products");
            }
        }
        ProductCategory::InternetSubscription => {
            if !r.data.is_applicable() {
                return fail("data", "required for internet products");
            }
            if r.minutes.is_applicable() {
                return fail("minutes", "must be null for internet products");
            }
            if r.sms.is_applicable() {
                return fail("sms", "must be null for internet products");
            }
            for (field, speed) in [
                ("upload_speed", &r.upload_speed),
                ("download_speed", &r.download_speed),
            ] {
                if speed.as_deref().is_none_or(|s| s.trim().is_empty()) {
                    return fail(field, "required for internet products");
                }
            }
        }
    }
    Ok(())
}

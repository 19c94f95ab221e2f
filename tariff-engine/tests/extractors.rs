mod common;

use common::*;
use tariff_common::{PageProvider, ProductCategory, Quantity};
use tariff_engine::{validate, CategoryExtractor, ExtractContext, ExtractorSet, Normalizer};

fn ctx(page: &str) -> ExtractContext {
    ExtractContext {
        competitor: "mobileviking".into(),
        url: url(page),
        scraped_at: run_date(),
    }
}

fn extractors() -> ExtractorSet {
    ExtractorSet::for_competitor("mobileviking", Normalizer::default()).unwrap()
}

#[tokio::test]
async fn prepaid_captures_both_pricing_modes() {
    let provider = FakeProvider::mobileviking();
    let mut page = provider.acquire(&url(PREPAID_URL)).await.unwrap();
    let set = extractors();
    let records = set
        .get(ProductCategory::MobilePrepaid)
        .unwrap()
        .extract(&mut *page, &ctx(PREPAID_URL))
        .await
        .unwrap();

    let names: Vec<&str> = records.iter().map(|r| r.product_name.as_str()).collect();
    assert_eq!(
        names,
        [
            "mobile_prepaid_data_4_gb",
            "mobile_prepaid_data_10_gb",
            "mobile_prepaid_calls_4_gb",
            "mobile_prepaid_calls_10_gb",
        ]
    );
    assert_eq!(records[0].sms, Quantity::Measured(100.0));
    assert_eq!(records[1].sms, Quantity::Measured(250.0));
    assert_eq!(records[2].sms, Quantity::Unlimited);
    assert_eq!(records[2].minutes, Quantity::Unlimited);
    assert_eq!(records[3].price, 25.0);
    assert!(records.iter().all(|r| r.scraped_at == run_date()));
}

#[tokio::test]
async fn prepaid_sms_reaches_the_wire_as_the_scraped_count() {
    let provider = FakeProvider::mobileviking();
    let mut page = provider.acquire(&url(PREPAID_URL)).await.unwrap();
    let records = extractors()
        .get(ProductCategory::MobilePrepaid)
        .unwrap()
        .extract(&mut *page, &ctx(PREPAID_URL))
        .await
        .unwrap();
    let records = validate(records).unwrap();

    let wire = serde_json::to_value(&records[0]).unwrap();
    assert_eq!(wire["sms"], serde_json::json!(100));
    let wire = serde_json::to_value(&records[2]).unwrap();
    assert_eq!(wire["sms"], serde_json::json!(999_999));
}

#[tokio::test]
async fn prepaid_without_toggles_still_reads_a_second_batch() {
    let no_toggles = prepaid_default().replace(r#"<label class="slider"></label>"#, "");
    let provider = FakeProvider::default().with_page(PREPAID_URL, vec![no_toggles]);
    let mut page = provider.acquire(&url(PREPAID_URL)).await.unwrap();
    let records = extractors()
        .get(ProductCategory::MobilePrepaid)
        .unwrap()
        .extract(&mut *page, &ctx(PREPAID_URL))
        .await
        .unwrap();
    assert_eq!(records.len(), 4);
    assert_eq!(records[0], records[2]);
}

#[tokio::test]
async fn toggle_that_changes_nothing_is_an_interaction_error() {
    let provider = FakeProvider::default().with_page(PREPAID_URL, vec![prepaid_default()]);
    let mut page = provider.acquire(&url(PREPAID_URL)).await.unwrap();
    let err = extractors()
        .get(ProductCategory::MobilePrepaid)
        .unwrap()
        .extract(&mut *page, &ctx(PREPAID_URL))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "interaction");
    assert!(err.to_string().contains(".PrepaidSelectorProduct"), "{err}");
}

#[test]
fn subscription_with_unlimited_texts_has_unknown_sms() {
    let records = extractors()
        .get(ProductCategory::MobileSubscription)
        .unwrap()
        .parse(&subscription_page(), &ctx(SUBSCRIPTION_URL))
        .unwrap();

    let first = &records[0];
    assert_eq!(first.product_name, "mobile_subscription_5_gb");
    assert_eq!(first.minutes, Quantity::Measured(300.0));
    assert_eq!(first.sms, Quantity::Unknown);
    assert_eq!(first.sms.to_wire(), Some(-1.0));

    let second = &records[1];
    assert_eq!(second.minutes, Quantity::Unknown);
    assert_eq!(second.sms, Quantity::Measured(100.0));
}

#[tokio::test]
async fn internet_switches_tier_and_returns_two_records() {
    let provider = FakeProvider::mobileviking();
    let mut page = provider.acquire(&url(INTERNET_URL)).await.unwrap();
    let records = extractors()
        .get(ProductCategory::InternetSubscription)
        .unwrap()
        .extract(&mut *page, &ctx(INTERNET_URL))
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].product_name, "internet_subscription_fiber_start");
    assert_eq!(records[1].product_name, "internet_subscription_fiber_max");
    assert_ne!(records[0].price, records[1].price);
    assert_eq!(records[0].download_speed.as_deref(), Some("100 mbps"));
    assert_eq!(records[1].upload_speed.as_deref(), Some("100 mbps"));
    assert_eq!(records[1].data, Quantity::Unlimited);
    assert!(records
        .iter()
        .all(|r| r.minutes == Quantity::NotApplicable && r.sms == Quantity::NotApplicable));
}

#[tokio::test]
async fn internet_without_second_tier_is_an_interaction_error() {
    let single = internet_tier_one().replace(
        r#"<li class="wideScreenFilters__budgetItem__label">Fiber Max</li>"#,
        "",
    );
    let provider = FakeProvider::default().with_page(INTERNET_URL, vec![single]);
    let mut page = provider.acquire(&url(INTERNET_URL)).await.unwrap();
    let err = extractors()
        .get(ProductCategory::InternetSubscription)
        .unwrap()
        .extract(&mut *page, &ctx(INTERNET_URL))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "interaction");
}

#[test]
fn combo_advantage_is_the_first_integer() {
    let combo = extractors()
        .combo
        .parse(&combo_page(), &url(COMBO_URL))
        .unwrap();
    assert_eq!(combo, 10.0);
}

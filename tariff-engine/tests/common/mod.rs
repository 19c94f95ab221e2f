#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tariff_common::{FileKind, PageProvider, RenderedPage, Result, ScrapeError};
use tariff_engine::fetch::DocumentSource;
use tariff_engine::sink::RunSink;
use url::Url;

pub const PREPAID_URL: &str = "https://mobilevikings.be/en/offer/prepaid/";
pub const SUBSCRIPTION_URL: &str = "https://mobilevikings.be/en/offer/subscriptions/";
pub const INTERNET_URL: &str = "https://mobilevikings.be/en/offer/internet/";
pub const COMBO_URL: &str = "https://mobilevikings.be/en/offer/combo/";

pub fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

pub fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

// ==============================
// Fixtures
// ==============================

fn prepaid_tile(focus: &str, gb: &str, min: &str, price: &str, sms: &str) -> String {
    format!(
        r#"<div class="PrepaidSelectorProduct" data-focus="{focus}" data-gb="{gb}" data-min="{min}" data-price="{price}">
             <div class="row"><span class="PrepaidSelectorProduct__rates__major">0.25</span> per minute</div>
             <div class="row"><span class="PrepaidSelectorProduct__rates__major">0.05</span> per MB</div>
             <div class="row"><span class="PrepaidSelectorProduct__rates__major">{sms}</span> texts included</div>
           </div>"#
    )
}

/// Default pricing mode: two data tiles.
pub fn prepaid_default() -> String {
    format!(
        r#"<html><body><label class="slider"></label>{}{}</body></html>"#,
        prepaid_tile("data", "4", "60", "10", "100"),
        prepaid_tile("data", "10", "120", "15", "250"),
    )
}

/// After the calls toggle: the same tiles priced with bundled calls.
pub fn prepaid_toggled() -> String {
    format!(
        r#"<html><body><label class="slider"></label>{}{}</body></html>"#,
        prepaid_tile("calls", "4", "unlimited", "20", "unlimited"),
        prepaid_tile("calls", "10", "unlimited", "25", "unlimited"),
    )
}

pub fn subscription_page() -> String {
    r#"<html><body>
         <div class="PostpaidOption">
           <span class="data-amount">5 GB</span>
           <p class="PostpaidOption__voiceTextAmount">300 minutes and unlimited texts</p>
           <span class="monthlyPrice__price">20,-</span>
         </div>
         <div class="PostpaidOption">
           <span class="data-amount">25 GB</span>
           <p class="PostpaidOption__voiceTextAmount">Unlimited minutes and 100 texts</p>
           <span class="monthlyPrice__price">30,-</span>
         </div>
       </body></html>"#
        .to_string()
}

fn internet_matrix(price: &str, data: &str, down: &str, up: &str) -> String {
    format!(
        r#"<html><body>
             <ul>
               <li class="wideScreenFilters__budgetItem__label">Fiber Start</li>
               <li class="wideScreenFilters__budgetItem__label">Fiber Max</li>
             </ul>
             <table>
               <tr class="matrix__price"><td>{price}</td></tr>
               <tr class="matrix__data"><td>{data}</td></tr>
               <tr class="matrix__downloadSpeed"><td>{down}</td></tr>
               <tr class="matrix__voice"><td>{up}</td></tr>
             </table>
           </body></html>"#
    )
}

pub fn internet_tier_one() -> String {
    internet_matrix("35,-", "150 GB", "100 Mbps &#8595;", "20 Mbps &#8593;")
}

pub fn internet_tier_two() -> String {
    internet_matrix("55,-", "Unlimited", "1 Gbps &#8595;", "100 Mbps &#8593;")
}

pub fn combo_page() -> String {
    r#"<html><body><p class="monthlyPrice__discountMessage">Save €10 every month</p></body></html>"#
        .to_string()
}

// ==============================
// Fake page provider
// ==============================

/// A page replaying a fixed sequence of DOM snapshots. Every successful click
/// advances to the next snapshot, if any, and fails like the browser does when
/// the watched region stays the same.
pub struct FakePage {
    url: Url,
    snapshots: Vec<String>,
    current: usize,
    closed: Arc<AtomicUsize>,
}

impl FakePage {
    pub fn new(url: Url, snapshots: Vec<String>) -> Self {
        Self {
            url,
            snapshots,
            current: 0,
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn html(&self) -> &str {
        &self.snapshots[self.current]
    }

    fn count(&self, selector: &str) -> Result<usize> {
        let sel = Selector::parse(selector)
            .map_err(|e| ScrapeError::Config(format!("bad selector {selector}: {e}")))?;
        Ok(Html::parse_document(self.html()).select(&sel).count())
    }

    fn region(&self, selector: &str) -> Result<String> {
        let sel = Selector::parse(selector)
            .map_err(|e| ScrapeError::Config(format!("bad selector {selector}: {e}")))?;
        Ok(Html::parse_document(self.html())
            .select(&sel)
            .map(|el| el.html())
            .collect())
    }

    fn advance(&mut self, watch: &str) -> Result<()> {
        let before = self.region(watch)?;
        if self.current + 1 < self.snapshots.len() {
            self.current += 1;
        }
        if self.region(watch)? == before {
            return Err(ScrapeError::interaction(&self.url, watch, "region did not change"));
        }
        Ok(())
    }
}

#[async_trait]
impl RenderedPage for FakePage {
    fn url(&self) -> &Url {
        &self.url
    }

    async fn content(&self) -> Result<String> {
        Ok(self.html().to_string())
    }

    async fn wait_for(&self, selector: &str) -> Result<()> {
        if self.count(selector)? == 0 {
            return Err(ScrapeError::interaction(&self.url, selector, "timed out waiting"));
        }
        Ok(())
    }

    async fn click_all(&mut self, selector: &str, watch: &str) -> Result<usize> {
        let n = self.count(selector)?;
        if n > 0 {
            self.advance(watch)?;
        }
        Ok(n)
    }

    async fn click_nth(&mut self, selector: &str, index: usize, watch: &str) -> Result<()> {
        if self.count(selector)? <= index {
            return Err(ScrapeError::interaction(&self.url, selector, "no such element"));
        }
        self.advance(watch)
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeProvider {
    pages: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    pub acquired: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
}

impl FakeProvider {
    pub fn with_page(mut self, url: &str, snapshots: Vec<String>) -> Self {
        self.pages.insert(url.to_string(), snapshots);
        self
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    /// Every page of the mobileviking fixture site.
    pub fn mobileviking() -> Self {
        Self::default()
            .with_page(PREPAID_URL, vec![prepaid_default(), prepaid_toggled()])
            .with_page(SUBSCRIPTION_URL, vec![subscription_page()])
            .with_page(INTERNET_URL, vec![internet_tier_one(), internet_tier_two()])
    }
}

#[async_trait]
impl PageProvider for FakeProvider {
    async fn acquire(&self, url: &Url) -> Result<Box<dyn RenderedPage>> {
        if self.failing.contains(url.as_str()) {
            return Err(ScrapeError::network(url, "navigation failed"));
        }
        let snapshots = self
            .pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| ScrapeError::network(url, "404"))?;
        self.acquired.fetch_add(1, Ordering::SeqCst);
        let mut page = FakePage::new(url.clone(), snapshots);
        page.closed = self.closed.clone();
        Ok(Box::new(page))
    }
}

// ==============================
// Fake static documents
// ==============================

#[derive(Default)]
pub struct FakeDocuments {
    docs: HashMap<String, String>,
    unreachable: HashSet<String>,
    pub probes: AtomicUsize,
}

impl FakeDocuments {
    pub fn with_doc(mut self, url: &str, html: String) -> Self {
        self.docs.insert(url.to_string(), html);
        self
    }

    pub fn unreachable(mut self, url: &str) -> Self {
        self.unreachable.insert(url.to_string());
        self
    }

    pub fn mobileviking() -> Self {
        Self::default().with_doc(COMBO_URL, combo_page())
    }
}

#[async_trait]
impl DocumentSource for FakeDocuments {
    async fn probe(&self, url: &Url) -> Result<()> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.contains(url.as_str()) {
            return Err(ScrapeError::network(url, "connection refused"));
        }
        Ok(())
    }

    async fn fetch(&self, url: &Url) -> Result<String> {
        self.docs
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| ScrapeError::network(url, "HTTP 404"))
    }
}

// ==============================
// In-memory sink
// ==============================

#[derive(Default)]
pub struct MemorySink {
    written: Mutex<Vec<(String, FileKind, Value)>>,
    fail_on: Option<FileKind>,
}

impl MemorySink {
    pub fn failing_on(kind: FileKind) -> Self {
        Self {
            fail_on: Some(kind),
            ..Self::default()
        }
    }

    /// Records of `kind` currently held, flattened across writes.
    pub fn records(&self, kind: FileKind) -> Vec<Value> {
        self.written
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .flat_map(|(_, _, payload)| {
                payload[kind.as_str()].as_array().cloned().unwrap_or_default()
            })
            .collect()
    }
}

impl RunSink for MemorySink {
    fn write(&self, competitor: &str, kind: FileKind, payload: &Value) -> Result<()> {
        if self.fail_on == Some(kind) {
            return Err(ScrapeError::Persistence {
                target: format!("{competitor}_{kind}"),
                message: "disk full".into(),
            });
        }
        self.written
            .lock()
            .unwrap()
            .push((competitor.to_string(), kind, payload.clone()));
        Ok(())
    }

    fn discard(&self, competitor: &str, kind: FileKind) -> Result<()> {
        self.written
            .lock()
            .unwrap()
            .retain(|(c, k, _)| !(c == competitor && *k == kind));
        Ok(())
    }
}

use crate::browser::page::DriverPage;
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tariff_common::{PageProvider, RenderedPage, Result, ScrapeError};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;
use webdriver::capabilities::Capabilities;

/// Connection and readiness settings for a WebDriver session.
#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// WebDriver endpoint, e.g. chromedriver on `http://localhost:9515`.
    pub webdriver_url: String,
    pub headless: bool,
    /// Upper bound for every wait: element presence, consent control, a clicked region changing.
    pub ready_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".into(),
            headless: true,
            ready_timeout: Duration::from_secs(15),
            poll_interval: Duration::from_millis(250),
        }
    }
}

fn browser_arguments(headless: bool) -> Vec<String> {
    let mut args = vec![
        "--disable-dev-shm-usage".to_string(),
        "--no-sandbox".to_string(),
        "--disable-extensions".to_string(),
        "--window-size=1920,1080".to_string(),
        "--lang=en".to_string(),
    ];
    if headless {
        args.push("--headless".to_string());
        args.push("--disable-gpu".to_string());
    }
    args
}

#[cfg(feature = "chromium")]
fn capabilities(headless: bool) -> Capabilities {
    let mut caps = Capabilities::new();
    caps.insert(
        "goog:chromeOptions".to_string(),
        json!({ "args": browser_arguments(headless) }),
    );
    caps
}

#[cfg(not(feature = "chromium"))]
fn capabilities(headless: bool) -> Capabilities {
    let mut caps = Capabilities::new();
    let args: Vec<&str> = if headless { vec!["-headless"] } else { vec![] };
    caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
    caps
}

/// One WebDriver session shared by every extraction of a process.
///
/// Each [`PageProvider::acquire`] opens its own tab and holds the session
/// lock until the page is closed, so two extraction flows never drive the
/// browser at the same time.
#[derive(Clone)]
pub struct TariffDriver {
    client: Client,
    session: Arc<Mutex<()>>,
    settings: DriverSettings,
    consent_selector: Option<String>,
}

impl TariffDriver {
    /// Start a session against a running WebDriver service.
    pub async fn connect(settings: DriverSettings) -> Result<Self> {
        let client = ClientBuilder::native()
            .capabilities(capabilities(settings.headless))
            .connect(&settings.webdriver_url)
            .await
            .map_err(|e| ScrapeError::network(&settings.webdriver_url, e))?;
        info!(
            webdriver_url = %settings.webdriver_url,
            headless = settings.headless,
            "driver.connected"
        );
        Ok(Self {
            client,
            session: Arc::new(Mutex::new(())),
            settings,
            consent_selector: None,
        })
    }

    /// A handle on the same session that dismisses `selector` (a cookie or
    /// consent control) after every navigation. The control must appear.
    pub fn with_consent(&self, selector: Option<String>) -> Self {
        Self {
            consent_selector: selector,
            ..self.clone()
        }
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    /// End the browser session.
    pub async fn close(self) -> Result<()> {
        let endpoint = self.settings.webdriver_url.clone();
        self.client
            .close()
            .await
            .map_err(|e| ScrapeError::network(endpoint, e))?;
        info!("driver.closed");
        Ok(())
    }

    async fn accept_consent(&self, url: &Url, selector: &str) -> Result<()> {
        let button = self
            .client
            .wait()
            .at_most(self.settings.ready_timeout)
            .every(self.settings.poll_interval)
            .for_element(Locator::Css(selector))
            .await
            .map_err(|e| ScrapeError::interaction(url, selector, e))?;
        button
            .click()
            .await
            .map_err(|e| ScrapeError::interaction(url, selector, e))?;
        debug!(%url, %selector, "driver.consent.accepted");
        Ok(())
    }
}

#[async_trait]
impl PageProvider for TariffDriver {
    async fn acquire(&self, url: &Url) -> Result<Box<dyn RenderedPage>> {
        let lease = self.session.clone().lock_owned().await;

        let origin = self
            .client
            .window()
            .await
            .map_err(|e| ScrapeError::network(url, e))?;
        let tab = self
            .client
            .new_window(true)
            .await
            .map_err(|e| ScrapeError::network(url, e))?
            .handle;
        self.client
            .switch_to_window(tab)
            .await
            .map_err(|e| ScrapeError::network(url, e))?;

        let mut page = DriverPage::new(
            self.client.clone(),
            url.clone(),
            origin,
            self.settings.clone(),
            lease,
        );

        info!(%url, "driver.navigate");
        let opened = match self.client.goto(url.as_str()).await {
            Ok(()) => match &self.consent_selector {
                Some(selector) => self.accept_consent(url, selector).await,
                None => Ok(()),
            },
            Err(e) => Err(ScrapeError::network(url, e)),
        };

        if let Err(e) = opened {
            if let Err(close_err) = page.close().await {
                warn!(%url, error = %close_err, "driver.page.close_failed");
            }
            return Err(e);
        }
        Ok(Box::new(page))
    }
}

use crate::browser::driver::DriverSettings;
use async_trait::async_trait;
use fantoccini::wd::WindowHandle;
use fantoccini::{Client, Locator};
use tariff_common::{RenderedPage, Result, ScrapeError};
use tokio::sync::OwnedMutexGuard;
use tokio::time::{sleep, Instant};
use tracing::debug;
use url::Url;

/// A browser tab opened for one extraction. Holds the session lease until
/// [`RenderedPage::close`] (or drop).
pub struct DriverPage {
    client: Client,
    url: Url,
    origin: WindowHandle,
    settings: DriverSettings,
    lease: Option<OwnedMutexGuard<()>>,
}

impl DriverPage {
    pub(crate) fn new(
        client: Client,
        url: Url,
        origin: WindowHandle,
        settings: DriverSettings,
        lease: OwnedMutexGuard<()>,
    ) -> Self {
        Self {
            client,
            url,
            origin,
            settings,
            lease: Some(lease),
        }
    }

    fn interaction(&self, control: &str, err: impl std::fmt::Display) -> ScrapeError {
        ScrapeError::interaction(&self.url, control, err)
    }

    /// Outer HTML of every element matching `watch`, concatenated.
    async fn region(&self, watch: &str) -> Result<String> {
        let elements = self
            .client
            .find_all(Locator::Css(watch))
            .await
            .map_err(|e| self.interaction(watch, e))?;
        let mut markup = String::new();
        for element in elements {
            let html = element
                .html(false)
                .await
                .map_err(|e| self.interaction(watch, e))?;
            markup.push_str(&html);
        }
        Ok(markup)
    }

    /// Poll until the markup under `watch` differs from `before`. Elements
    /// going stale mid-read count as "not yet".
    async fn wait_for_change(&self, watch: &str, before: &str) -> Result<()> {
        let deadline = Instant::now() + self.settings.ready_timeout;
        loop {
            match self.region(watch).await {
                Ok(now) if now != before => return Ok(()),
                Ok(_) => {}
                Err(e) => debug!(url = %self.url, %watch, error = %e, "page.watch.unreadable"),
            }
            if Instant::now() >= deadline {
                return Err(self.interaction(watch, "region did not change before timeout"));
            }
            sleep(self.settings.poll_interval).await;
        }
    }
}

#[async_trait]
impl RenderedPage for DriverPage {
    fn url(&self) -> &Url {
        &self.url
    }

    async fn content(&self) -> Result<String> {
        self.client
            .source()
            .await
            .map_err(|e| ScrapeError::network(&self.url, e))
    }

    async fn wait_for(&self, selector: &str) -> Result<()> {
        self.client
            .wait()
            .at_most(self.settings.ready_timeout)
            .every(self.settings.poll_interval)
            .for_element(Locator::Css(selector))
            .await
            .map_err(|e| self.interaction(selector, e))?;
        Ok(())
    }

    async fn click_all(&mut self, selector: &str, watch: &str) -> Result<usize> {
        let elements = self
            .client
            .find_all(Locator::Css(selector))
            .await
            .map_err(|e| self.interaction(selector, e))?;
        if elements.is_empty() {
            debug!(url = %self.url, %selector, "page.click_all.none");
            return Ok(0);
        }
        let before = self.region(watch).await?;
        for element in &elements {
            element
                .click()
                .await
                .map_err(|e| self.interaction(selector, e))?;
        }
        self.wait_for_change(watch, &before).await?;
        debug!(url = %self.url, %selector, clicked = elements.len(), "page.click_all");
        Ok(elements.len())
    }

    async fn click_nth(&mut self, selector: &str, index: usize, watch: &str) -> Result<()> {
        let elements = self
            .client
            .find_all(Locator::Css(selector))
            .await
            .map_err(|e| self.interaction(selector, e))?;
        let element = elements.get(index).ok_or_else(|| {
            self.interaction(
                selector,
                format!("element {index} not found ({} present)", elements.len()),
            )
        })?;
        let before = self.region(watch).await?;
        element
            .click()
            .await
            .map_err(|e| self.interaction(selector, e))?;
        self.wait_for_change(watch, &before).await?;
        debug!(url = %self.url, %selector, index, "page.click_nth");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.lease.is_none() {
            return Ok(());
        }
        let closed = self.client.close_window().await;
        let restored = self.client.switch_to_window(self.origin.clone()).await;
        self.lease = None;
        closed.map_err(|e| ScrapeError::network(&self.url, e))?;
        restored.map_err(|e| ScrapeError::network(&self.url, e))?;
        debug!(url = %self.url, "page.closed");
        Ok(())
    }
}

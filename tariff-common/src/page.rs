//! Capability traits for acquiring rendered pages.
//!
//! Extractors only ever see a [`RenderedPage`]: they read its HTML and poke its
//! controls. How the page was rendered (WebDriver, a fixture, a recording) is
//! the provider's concern.

use crate::error::Result;
use async_trait::async_trait;
use url::Url;

/// A live, rendered document owned by exactly one extraction flow.
#[async_trait]
pub trait RenderedPage: Send {
    /// URL the page was acquired for.
    fn url(&self) -> &Url;

    /// Full HTML of the current DOM.
    async fn content(&self) -> Result<String>;

    /// Block until `selector` matches, bounded by the provider's ready timeout.
    async fn wait_for(&self, selector: &str) -> Result<()>;

    /// Click every element matching `selector`, then wait until the markup of
    /// the elements matching `watch` changes. Returns how many elements were
    /// clicked; with none, nothing is awaited.
    async fn click_all(&mut self, selector: &str, watch: &str) -> Result<usize>;

    /// Click the `index`-th element matching `selector`, then wait until the
    /// markup under `watch` changes. Missing elements and a region that never
    /// changes are interaction errors.
    async fn click_nth(&mut self, selector: &str, index: usize, watch: &str) -> Result<()>;

    /// Release the page. Callers invoke this on every exit path.
    async fn close(&mut self) -> Result<()>;
}

/// Source of rendered pages, one per logical extraction.
#[async_trait]
pub trait PageProvider: Send + Sync {
    async fn acquire(&self, url: &Url) -> Result<Box<dyn RenderedPage>>;
}

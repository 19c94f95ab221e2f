//! Plain (non-rendered) document access: reachability probes and static pages.

use async_trait::async_trait;
use tariff_common::Result;
use tariff_http::{HttpClient, RequestOpts};
use url::Url;

#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Succeeds when `url` answers with a success status.
    async fn probe(&self, url: &Url) -> Result<()>;

    /// Raw HTML of `url`, without rendering.
    async fn fetch(&self, url: &Url) -> Result<String>;
}

#[async_trait]
impl DocumentSource for HttpClient {
    async fn probe(&self, url: &Url) -> Result<()> {
        Ok(self.check(url).await?)
    }

    async fn fetch(&self, url: &Url) -> Result<String> {
        Ok(self.get_text(url, RequestOpts::default()).await?)
    }
}

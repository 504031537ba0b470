use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::catalog::normalize_page;
use crate::categories::DEFAULT_SLUG;
use crate::config::Settings;
use crate::error::CatalogError;
use crate::filter::WatchFilter;
use crate::models::CatalogPage;

#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// One normalized, filtered page of `category`. An empty category means the default one.
    async fn list(&self, category: &str, page: u32) -> Result<CatalogPage>;
    fn source_name(&self) -> &str;
}

#[derive(Clone)]
pub struct NumparserClient {
    client: Client,
    base_url: String,
    language: String,
    source_name: String,
    filter: WatchFilter,
}

impl NumparserClient {
    pub fn new(
        base_url: &str,
        language: &str,
        source_name: &str,
        filter: WatchFilter,
    ) -> Result<Self> {
        let user_agent = format!("numparser/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .context("Failed to build catalog HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            language: language.to_string(),
            source_name: source_name.to_string(),
            filter,
        })
    }

    pub fn from_settings(settings: &Settings, filter: WatchFilter) -> Result<Self> {
        Self::new(
            settings.require_base_url()?,
            &settings.language,
            &settings.source_name,
            filter,
        )
    }

    pub fn page_url(&self, category: &str, page: u32) -> String {
        let category = if category.is_empty() {
            DEFAULT_SLUG
        } else {
            category
        };
        format!(
            "{}/{}?page={}&language={}",
            self.base_url,
            urlencoding::encode(category),
            page.max(1),
            urlencoding::encode(&self.language)
        )
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .context("request failed")?;
        let status = res.status();
        let text = res.text().await.context("reading body failed")?;
        if !status.is_success() {
            return Err(CatalogError::Upstream {
                url: url.to_string(),
                status: status.as_u16(),
                body: text,
            }
            .into());
        }
        if text.trim().is_empty() {
            return Err(CatalogError::EmptyResponse.into());
        }
        let parsed: Value = serde_json::from_str(&text).context("JSON parse failed")?;
        Ok(parsed)
    }
}

#[async_trait]
impl CatalogApi for NumparserClient {
    async fn list(&self, category: &str, page: u32) -> Result<CatalogPage> {
        let url = self.page_url(category, page);
        debug!(%url, "Fetching catalog page");
        let json = self.get_json(&url).await?;
        normalize_page(&json, &self.source_name, &self.filter)
            .with_context(|| format!("Failed to normalize {}", url))
    }

    fn source_name(&self) -> &str {
        &self.source_name
    }
}

//! DEV Community articles
//!
//! https://developers.forem.com/api - pages start at 1

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::fanout::{fetch_pages, flatten, page_urls};
use super::{FetchParams, Source, SourceKind, SourceMetadata};
use crate::error::Result;
use crate::http_client::HttpClient;
use crate::schemas::{Item, RawId};

pub const SOURCE_ID: &str = "devto";

const PER_PAGE: u32 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct Article {
    pub id: RawId,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
}

impl Article {
    fn into_item(self) -> Result<Item> {
        let desc = self.description.filter(|d| !d.is_empty());
        Item::new(self.id.to_string(), self.title, self.url)
            .with_desc(desc)
            .validated()
    }
}

pub struct DevToSource {
    client: Arc<HttpClient>,
    base_url: String,
    default_range: u32,
    max_range: u32,
    metadata: SourceMetadata,
}

impl DevToSource {
    pub fn new(client: Arc<HttpClient>, base_url: &str, default_range: u32, max_range: u32) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let metadata = SourceMetadata::new(SOURCE_ID, "DEV Community", &base_url, SourceKind::PagedJson);

        Self {
            client,
            base_url,
            default_range,
            max_range,
            metadata,
        }
    }

    fn page_urls(&self, range: u32) -> Vec<String> {
        page_urls(range, 1, |page| {
            format!("{}/api/articles?page={}&per_page={}", self.base_url, page, PER_PAGE)
        })
    }
}

#[async_trait]
impl Source for DevToSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    async fn fetch(&self, params: &FetchParams) -> Result<Vec<Item>> {
        let range = params.range(self.default_range, self.max_range)?;
        let urls = self.page_urls(range);

        let pages: Vec<Vec<Article>> = fetch_pages(&self.client, &urls).await?;
        let items = flatten(pages, |page| page)
            .into_iter()
            .map(Article::into_item)
            .collect::<Result<Vec<_>>>()?;

        info!(source = SOURCE_ID, range, items = items.len(), "Fetched articles");
        Ok(items)
    }
}

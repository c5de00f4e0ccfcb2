//! Hacker News front page via the Algolia search API
//!
//! https://hn.algolia.com/api - pages start at 0

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::fanout::{fetch_pages, flatten, page_urls};
use super::{FetchParams, Source, SourceKind, SourceMetadata};
use crate::error::Result;
use crate::http_client::HttpClient;
use crate::schemas::Item;

pub const SOURCE_ID: &str = "hackernews";

const ITEM_URL: &str = "https://news.ycombinator.com/item?id=";

/// One page of search results
#[derive(Debug, Deserialize)]
struct SearchPage {
    hits: Vec<Hit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hit {
    #[serde(rename = "objectID")]
    pub object_id: String,
    pub title: Option<String>,
    pub url: Option<String>,
}

impl Hit {
    fn into_item(self) -> Result<Item> {
        // Ask/Show HN posts have no external link
        let url = match self.url {
            Some(url) if !url.is_empty() => url,
            _ => format!("{}{}", ITEM_URL, self.object_id),
        };
        Item::new(self.object_id, self.title.unwrap_or_default(), url).validated()
    }
}

pub struct HackerNewsSource {
    client: Arc<HttpClient>,
    base_url: String,
    default_range: u32,
    max_range: u32,
    metadata: SourceMetadata,
}

impl HackerNewsSource {
    pub fn new(client: Arc<HttpClient>, base_url: &str, default_range: u32, max_range: u32) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let metadata = SourceMetadata::new(
            SOURCE_ID,
            "Hacker News",
            "https://news.ycombinator.com",
            SourceKind::PagedJson,
        );

        Self {
            client,
            base_url,
            default_range,
            max_range,
            metadata,
        }
    }

    fn page_urls(&self, range: u32) -> Vec<String> {
        page_urls(range, 0, |page| {
            format!("{}/api/v1/search?tags=front_page&page={}", self.base_url, page)
        })
    }
}

#[async_trait]
impl Source for HackerNewsSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    async fn fetch(&self, params: &FetchParams) -> Result<Vec<Item>> {
        let range = params.range(self.default_range, self.max_range)?;
        let urls = self.page_urls(range);

        let pages: Vec<SearchPage> = fetch_pages(&self.client, &urls).await?;
        let items = flatten(pages, |page| page.hits)
            .into_iter()
            .map(Hit::into_item)
            .collect::<Result<Vec<_>>>()?;

        info!(source = SOURCE_ID, range, items = items.len(), "Fetched front page");
        Ok(items)
    }
}

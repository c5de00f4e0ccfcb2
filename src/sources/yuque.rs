//! Yuque recommended documents
//!
//! https://www.yuque.com/api/explore/recommends

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::{FetchParams, Source, SourceKind, SourceMetadata};
use crate::error::Result;
use crate::http_client::HttpClient;
use crate::schemas::{Item, RawId};

pub const SOURCE_ID: &str = "yuque";

/// Yuque API response
#[derive(Debug, Deserialize)]
struct RecommendsResponse {
    data: RecommendsData,
}

#[derive(Debug, Deserialize)]
struct RecommendsData {
    docs: Vec<YuqueDoc>,
}

/// A single recommended document
#[derive(Debug, Clone, Deserialize)]
pub struct YuqueDoc {
    pub id: RawId,
    pub title: String,
    pub slug: String,
    pub book: YuqueBook,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YuqueBook {
    pub slug: String,
    pub user: YuqueUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YuqueUser {
    pub login: String,
}

pub struct YuqueSource {
    client: Arc<HttpClient>,
    base_url: String,
    limit: u32,
    metadata: SourceMetadata,
}

impl YuqueSource {
    pub fn new(client: Arc<HttpClient>, base_url: &str, limit: u32) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let metadata = SourceMetadata::new(SOURCE_ID, "Yuque", &base_url, SourceKind::Json);

        Self {
            client,
            base_url,
            limit,
            metadata,
        }
    }

    fn api_url(&self) -> String {
        format!("{}/api/explore/recommends?limit={}", self.base_url, self.limit)
    }

    /// Converts a document to an item
    fn doc_to_item(&self, doc: YuqueDoc) -> Result<Item> {
        let url = format!(
            "{}/{}/{}/{}",
            self.base_url, doc.book.user.login, doc.book.slug, doc.slug
        );
        Item::new(doc.id.to_string(), doc.title, url).validated()
    }
}

#[async_trait]
impl Source for YuqueSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    async fn fetch(&self, _params: &FetchParams) -> Result<Vec<Item>> {
        let url = self.api_url();
        debug!(source = SOURCE_ID, url = %url, "Fetching recommends");

        let response: RecommendsResponse = self.client.get_json(&url).await?;
        let items = response
            .data
            .docs
            .into_iter()
            .map(|doc| self.doc_to_item(doc))
            .collect::<Result<Vec<_>>>()?;

        info!(source = SOURCE_ID, items = items.len(), "Fetched recommends");
        Ok(items)
    }
}

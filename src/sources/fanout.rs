//! Concurrent page fan-out
//!
//! Paged sources request `range` pages at once and join them all-or-nothing.
//! Results keep the order the requests were issued in, whatever order the
//! responses arrive in.

use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use std::time::Instant;
use tracing::debug;

use crate::error::Result;
use crate::http_client::HttpClient;

/// URLs for `range` consecutive pages starting at `first_page`
pub fn page_urls(range: u32, first_page: u32, build: impl Fn(u32) -> String) -> Vec<String> {
    (first_page..first_page + range).map(build).collect()
}

/// Fetches every page concurrently.
///
/// Fails as soon as any page fails; no partial result is returned.
pub async fn fetch_pages<P: DeserializeOwned>(client: &HttpClient, urls: &[String]) -> Result<Vec<P>> {
    let start = Instant::now();

    let pages = try_join_all(urls.iter().map(|url| client.get_json::<P>(url))).await?;

    debug!(
        pages = pages.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Fetched all pages"
    );
    Ok(pages)
}

/// Concatenates page entries in page order
pub fn flatten<P, E>(pages: Vec<P>, entries: impl Fn(P) -> Vec<E>) -> Vec<E> {
    pages.into_iter().flat_map(entries).collect()
}

//! Echo JS front page

use scraper::ElementRef;
use std::sync::Arc;

use super::markup::{first, own_text, required_attr, MarkupSource, RowContext, RowScope};
use super::{SourceKind, SourceMetadata};
use crate::error::{Result, SourceError};
use crate::http_client::HttpClient;
use crate::schemas::Item;

pub const SOURCE_ID: &str = "echojs";

pub fn source(base_url: &str, client: Arc<HttpClient>) -> MarkupSource {
    let base_url = base_url.trim_end_matches('/');
    let page_url = format!("{}/", base_url);

    MarkupSource::new(
        SourceMetadata::new(SOURCE_ID, "Echo JS", &page_url, SourceKind::Markup),
        client,
        page_url,
        base_url,
        RowScope::All("#newslist > article"),
        extract_row,
    )
}

fn extract_row(row: ElementRef<'_>, ctx: &RowContext<'_>) -> Result<Item> {
    let id = required_attr(row, "data-news-id", ctx.source_id)?;
    let anchor = first(row, "h2 > a")?.ok_or_else(|| SourceError::MissingField {
        source_id: ctx.source_id.to_string(),
        field: "h2 > a",
    })?;
    let url = required_attr(anchor, "href", ctx.source_id)?;

    Ok(Item::new(id, own_text(anchor), url))
}

//! Xinquji featured products

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;
use std::sync::Arc;

use super::markup::{capture, first, own_text, required_attr, text_of, MarkupSource, RowContext, RowScope};
use super::{SourceKind, SourceMetadata};
use crate::error::Result;
use crate::http_client::HttpClient;
use crate::schemas::Item;

pub const SOURCE_ID: &str = "xinquji";

static POST_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"posts/(\d+)$").expect("Failed to compile xinquji post id pattern"));

pub fn source(base_url: &str, client: Arc<HttpClient>) -> MarkupSource {
    let base_url = base_url.trim_end_matches('/');
    let page_url = format!("{}/", base_url);

    MarkupSource::new(
        SourceMetadata::new(SOURCE_ID, "Xinquji", &page_url, SourceKind::Markup),
        client,
        page_url,
        base_url,
        RowScope::WithinFirst {
            container: ".ant-card",
            rows: ".link",
        },
        extract_row,
    )
}

fn extract_row(row: ElementRef<'_>, ctx: &RowContext<'_>) -> Result<Item> {
    let href = required_attr(row, "href", ctx.source_id)?;
    let id = capture(&POST_ID, &href, ctx.source_id)?;
    let title = text_of(row, ".content > h3")?;
    let desc = first(row, ".content > p")?.map(own_text);
    let url = format!("{}/posts/{}", ctx.base_url, id);

    Ok(Item::new(id, title, url).with_desc(desc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_first_card_with_descriptions() {
        let html = r#"
            <div class="ant-card">
              <a class="link" href="/posts/501"><div class="content"><h3>Notion AI</h3><p>Write faster</p></div></a>
              <a class="link" href="/posts/502"><div class="content"><h3>Arc</h3></div></a>
            </div>
            <div class="ant-card">
              <a class="link" href="/posts/999"><div class="content"><h3>Later</h3></div></a>
            </div>
        "#;
        let src = source("https://xinquji.com/", Arc::new(HttpClient::with_defaults().unwrap()));
        let items = src.extract(html).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, "https://xinquji.com/posts/501");
        assert_eq!(items[0].desc.as_deref(), Some("Write faster"));
        assert_eq!(items[1].title, "Arc");
        assert!(items[1].desc.is_none());
    }
}

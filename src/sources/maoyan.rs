//! Maoyan yearly box-office ranking

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;
use std::sync::Arc;

use super::markup::{capture, required_attr, text_of, MarkupSource, RowContext, RowScope};
use super::{SourceKind, SourceMetadata};
use crate::error::Result;
use crate::http_client::HttpClient;
use crate::schemas::Item;

pub const SOURCE_ID: &str = "maoyan";

// data-com looks like `hrefTo,href:'/movie/248906'`
static MOVIE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(\d+)'").expect("Failed to compile maoyan movie id pattern"));

pub fn source(base_url: &str, client: Arc<HttpClient>) -> MarkupSource {
    let base_url = base_url.trim_end_matches('/');
    let page_url = format!("{}/rankings/year", base_url);

    MarkupSource::new(
        SourceMetadata::new(SOURCE_ID, "Maoyan Box Office", &page_url, SourceKind::Markup),
        client,
        page_url,
        base_url,
        RowScope::All("#ranks-list > .row"),
        extract_row,
    )
}

fn extract_row(row: ElementRef<'_>, ctx: &RowContext<'_>) -> Result<Item> {
    let data_com = required_attr(row, "data-com", ctx.source_id)?;
    let id = capture(&MOVIE_ID, &data_com, ctx.source_id)?;
    let title = text_of(row, ".first-line")?;
    let url = format!("{}/movie/{}", ctx.base_url, id);

    Ok(Item::new(id, title, url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;

    fn src() -> MarkupSource {
        source("https://piaofang.maoyan.com", Arc::new(HttpClient::with_defaults().unwrap()))
    }

    #[test]
    fn test_extracts_movies() {
        let html = r#"
            <div id="ranks-list">
              <ul class="row" data-com="hrefTo,href:'/movie/257706'"><li><p class="first-line">The Wandering Earth</p></li></ul>
              <ul class="row" data-com="hrefTo,href:'/movie/1211270'"><li><p class="first-line">Ne Zha</p></li></ul>
            </div>
        "#;
        let items = src().extract(html).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0],
            Item::new("257706", "The Wandering Earth", "https://piaofang.maoyan.com/movie/257706")
        );
        assert_eq!(items[1].id, "1211270");
    }

    #[test]
    fn test_unmatched_data_com_fails() {
        let html = r#"<div id="ranks-list"><ul class="row" data-com="hrefTo"><li class="first-line">X</li></ul></div>"#;
        let err = src().extract(html).unwrap_err();
        assert!(matches!(err, SourceError::PatternMismatch { .. }));
    }
}

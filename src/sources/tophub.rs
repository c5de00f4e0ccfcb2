//! tophub.today boards
//!
//! tophub mirrors the hot lists of many sites under `/n/<node>`. All boards
//! share one table layout, so every board is the same markup adapter with a
//! different node.

use scraper::ElementRef;
use std::sync::Arc;

use super::markup::{first, own_text, required_attr, MarkupSource, RowContext, RowScope};
use super::{SourceKind, SourceMetadata};
use crate::error::{Result, SourceError};
use crate::http_client::HttpClient;
use crate::schemas::Item;

/// A board hosted on tophub
#[derive(Debug, Clone, Copy)]
pub struct Board {
    pub id: &'static str,
    pub name: &'static str,
    pub node: &'static str,
}

pub const WEIBO: Board = Board { id: "weibo", name: "Weibo", node: "KqndgxeLl9" };
pub const WEIXIN: Board = Board { id: "weixin", name: "WeChat", node: "WnBe01o371" };
pub const KAIYAN: Board = Board { id: "kaiyan", name: "Kaiyan", node: "KqndgDmeLl" };
pub const ZHIHU: Board = Board { id: "zhihu", name: "Zhihu Daily", node: "KMZd7VOvrO" };
pub const ZUIMEI: Board = Board { id: "zuimei", name: "Zuimei Apps", node: "zQ0or05d8B" };
pub const KR36: Board = Board { id: "36ky", name: "36Kr", node: "Q1Vd5Ko85R" };
pub const SSPAI: Board = Board { id: "sspai", name: "SSPAI", node: "Y2KeDGQdNP" };

/// Rows of the first list on a board page
pub const ROWS: &str = ".Zd-p-Sc .cc-dc:first-child table tr";

/// Builds the adapter for one board
pub fn board_source(board: Board, base_url: &str, client: Arc<HttpClient>) -> MarkupSource {
    let base_url = base_url.trim_end_matches('/');
    let page_url = format!("{}/n/{}", base_url, board.node);

    MarkupSource::new(
        SourceMetadata::new(board.id, board.name, &page_url, SourceKind::Markup),
        client,
        page_url,
        base_url,
        RowScope::All(ROWS),
        extract_row,
    )
}

fn extract_row(row: ElementRef<'_>, ctx: &RowContext<'_>) -> Result<Item> {
    let anchor = first(row, "td[class=al] > a")?.ok_or_else(|| SourceError::MissingField {
        source_id: ctx.source_id.to_string(),
        field: "td.al > a",
    })?;

    let id = required_attr(anchor, "itemid", ctx.source_id)?;
    let url = required_attr(anchor, "href", ctx.source_id)?;
    let title = own_text(anchor).trim().to_string();

    Ok(Item::new(id, title, url))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_page(rows: &[(&str, &str, &str)]) -> String {
        let rows: String = rows
            .iter()
            .map(|(id, title, href)| {
                format!(
                    r#"<tr><td>1.</td><td class="al"><a href="{href}" itemid="{id}"> {title} </a></td><td>99</td></tr>"#
                )
            })
            .collect();
        format!(
            r#"<html><body><div class="Zd-p-Sc"><div class="cc-dc"><table>{rows}</table></div><div class="cc-dc"><table><tr><td class="al"><a href="/other" itemid="zzz">Other</a></td></tr></table></div></div></body></html>"#
        )
    }

    fn source() -> MarkupSource {
        board_source(WEIXIN, "https://tophub.today/", Arc::new(HttpClient::with_defaults().unwrap()))
    }

    #[test]
    fn test_board_url() {
        assert_eq!(source().page_url(), "https://tophub.today/n/WnBe01o371");
    }

    #[test]
    fn test_extracts_first_list_only() {
        let html = board_page(&[("a", "First", "https://mp.weixin.qq.com/a"), ("b", "Second", "/b")]);
        let items = source().extract(&html).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Item::new("a", "First", "https://mp.weixin.qq.com/a"));
        assert_eq!(items[1].title, "Second");
    }

    #[test]
    fn test_row_without_anchor_fails() {
        let html = r#"<div class="Zd-p-Sc"><div class="cc-dc"><table><tr><td>header</td></tr></table></div></div>"#;
        assert!(source().extract(html).is_err());
    }

    #[test]
    fn test_anchor_without_itemid_fails() {
        let html = r#"<div class="Zd-p-Sc"><div class="cc-dc"><table><tr><td class="al"><a href="/x">X</a></td></tr></table></div></div>"#;
        let err = source().extract(html).unwrap_err();
        assert!(matches!(err, SourceError::MissingField { field: "itemid", .. }));
    }
}

//! Generic markup adapter
//!
//! One GET of an HTML page, rows selected with CSS, one `Item` per row via a
//! per-source extraction rule. Several sources share this implementation and
//! differ only in URL, row scope and rule.

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use tracing::{debug, info};

use super::{FetchParams, Source, SourceMetadata};
use crate::error::{Result, SourceError};
use crate::http_client::HttpClient;
use crate::schemas::Item;

/// Turns one selected row into an item. Receives the source id and base URL.
pub type ExtractRule = fn(ElementRef<'_>, &RowContext<'_>) -> Result<Item>;

/// Values a rule may need besides the row itself
pub struct RowContext<'a> {
    pub source_id: &'a str,
    pub base_url: &'a str,
}

/// Which nodes of the document become rows
#[derive(Debug, Clone, Copy)]
pub enum RowScope {
    /// Every match of the selector
    All(&'static str),
    /// Matches of `rows` inside the first match of `container` only
    WithinFirst {
        container: &'static str,
        rows: &'static str,
    },
}

pub struct MarkupSource {
    metadata: SourceMetadata,
    client: Arc<HttpClient>,
    page_url: String,
    base_url: String,
    scope: RowScope,
    rule: ExtractRule,
}

impl MarkupSource {
    pub fn new(
        metadata: SourceMetadata,
        client: Arc<HttpClient>,
        page_url: impl Into<String>,
        base_url: impl Into<String>,
        scope: RowScope,
        rule: ExtractRule,
    ) -> Self {
        Self {
            metadata,
            client,
            page_url: page_url.into(),
            base_url: base_url.into(),
            scope,
            rule,
        }
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    /// Extracts items from an already fetched page.
    ///
    /// Any row whose rule fails fails the whole page.
    pub fn extract(&self, html: &str) -> Result<Vec<Item>> {
        let ctx = RowContext {
            source_id: &self.metadata.id,
            base_url: &self.base_url,
        };
        extract_rows(html, self.scope, self.rule, &ctx)
    }
}

#[async_trait]
impl Source for MarkupSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    async fn fetch(&self, _params: &FetchParams) -> Result<Vec<Item>> {
        debug!(source = %self.metadata.id, url = %self.page_url, "Fetching page");

        let html = self.client.get_text(&self.page_url).await?;
        let items = self.extract(&html)?;

        info!(source = %self.metadata.id, items = items.len(), "Extracted items");
        Ok(items)
    }
}

/// Parses `html` and applies `rule` to every row selected by `scope`
pub fn extract_rows(
    html: &str,
    scope: RowScope,
    rule: ExtractRule,
    ctx: &RowContext<'_>,
) -> Result<Vec<Item>> {
    let document = Html::parse_document(html);

    let rows: Vec<ElementRef<'_>> = match scope {
        RowScope::All(rows) => {
            let selector = selector(rows)?;
            document.select(&selector).collect()
        }
        RowScope::WithinFirst { container, rows } => {
            let container = selector(container)?;
            let rows = selector(rows)?;
            match document.select(&container).next() {
                Some(first) => first.select(&rows).collect(),
                None => Vec::new(),
            }
        }
    };

    rows.into_iter()
        .map(|row| rule(row, ctx).and_then(Item::validated))
        .collect()
}

/// Parses a CSS selector
pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| SourceError::SelectorError(format!("{}: {:?}", css, e)))
}

/// First descendant of `el` matching `css`
pub fn first<'a>(el: ElementRef<'a>, css: &str) -> Result<Option<ElementRef<'a>>> {
    let sel = selector(css)?;
    Ok(el.select(&sel).next())
}

/// Concatenated text of every descendant matching `css`; empty when none match
pub fn text_of(el: ElementRef<'_>, css: &str) -> Result<String> {
    let sel = selector(css)?;
    Ok(el.select(&sel).flat_map(|m| m.text()).collect())
}

/// Full text content of `el`
pub fn own_text(el: ElementRef<'_>) -> String {
    el.text().collect()
}

/// Attribute value, or a `MissingField` error naming it
pub fn required_attr(el: ElementRef<'_>, name: &'static str, source_id: &str) -> Result<String> {
    el.value()
        .attr(name)
        .map(str::to_string)
        .ok_or_else(|| SourceError::MissingField {
            source_id: source_id.to_string(),
            field: name,
        })
}

/// First capture group of `re` in `input`
pub fn capture(re: &Regex, input: &str, source_id: &str) -> Result<String> {
    re.captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| SourceError::PatternMismatch {
            source_id: source_id.to_string(),
            pattern: re.as_str().to_string(),
            input: input.to_string(),
        })
}

//! Upstream sources
//!
//! Each source implements the `Source` trait: fetch upstream content and
//! normalize it into `Item`s. Sources hold no mutable state and may be
//! invoked concurrently.

pub mod devto;
pub mod echojs;
pub mod fanout;
pub mod hackernews;
pub mod maoyan;
pub mod markup;
pub mod tophub;
pub mod xinquji;
pub mod yuque;

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{Result, SourceError};
use crate::schemas::Item;

/// How a source talks to its upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// One GET of an HTML page, items extracted with selectors
    Markup,
    /// One GET of a JSON API
    Json,
    /// Several concurrent GETs of a paged JSON API
    PagedJson,
}

/// Metadata about a source
#[derive(Debug, Clone, Serialize)]
pub struct SourceMetadata {
    /// Registry key
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Page the items come from
    pub homepage: String,
    pub kind: SourceKind,
}

impl SourceMetadata {
    pub fn new(id: &str, name: &str, homepage: &str, kind: SourceKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            homepage: homepage.to_string(),
            kind,
        }
    }
}

/// Caller-supplied query parameters, minus the source selector.
///
/// One value per name: inserting a name again replaces its value, so a
/// repeated query parameter keeps only its last occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchParams {
    values: BTreeMap<String, String>,
}

impl FetchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Parameters in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reads the `range` parameter used by paged sources.
    ///
    /// Absent means `default`; anything that is not an integer in
    /// `1..=max` is rejected.
    pub fn range(&self, default: u32, max: u32) -> Result<u32> {
        let Some(raw) = self.get("range") else {
            return Ok(default);
        };

        let value: u32 = raw.trim().parse().map_err(|_| SourceError::InvalidParameter {
            name: "range",
            reason: format!("{:?} is not a positive integer", raw),
        })?;

        if value == 0 || value > max {
            return Err(SourceError::InvalidParameter {
                name: "range",
                reason: format!("must be within 1..={} (got {})", max, value),
            });
        }

        Ok(value)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FetchParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = FetchParams::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// Trait for all upstream sources
#[async_trait]
pub trait Source: Send + Sync {
    /// Gets metadata about this source
    fn metadata(&self) -> &SourceMetadata;

    /// Fetches and normalizes the current list
    async fn fetch(&self, params: &FetchParams) -> Result<Vec<Item>>;

    /// Gets the source ID
    fn id(&self) -> &str {
        &self.metadata().id
    }

    /// Gets the source name
    fn name(&self) -> &str {
        &self.metadata().name
    }
}

pub use devto::DevToSource;
pub use hackernews::HackerNewsSource;
pub use markup::{MarkupSource, RowScope};
pub use yuque::YuqueSource;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_defaults_when_absent() {
        let params = FetchParams::new();
        assert_eq!(params.range(7, 20).unwrap(), 7);
    }

    #[test]
    fn test_range_parses_and_bounds() {
        let params = FetchParams::new().with("range", "3");
        assert_eq!(params.range(7, 20).unwrap(), 3);

        assert!(FetchParams::new().with("range", "0").range(7, 20).is_err());
        assert!(FetchParams::new().with("range", "21").range(7, 20).is_err());
        assert!(FetchParams::new().with("range", "abc").range(7, 20).is_err());
    }

    #[test]
    fn test_params_iterate_in_name_order() {
        let params: FetchParams = vec![("z", "1"), ("a", "2")].into_iter().collect();
        let names: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["a", "z"]);
    }
}

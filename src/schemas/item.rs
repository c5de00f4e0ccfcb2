//! Item Schema
//!
//! The normalized unit every adapter produces

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::error::{Result, SourceError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct Item {
    /// Source-scoped identifier
    #[validate(length(min = 1))]
    pub id: String,

    /// Headline; may be empty when the upstream markup lacks one
    pub title: String,

    /// Absolute or source-relative link to the content
    #[validate(length(min = 1))]
    pub url: String,

    /// Summary, only for sources that expose one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

impl Item {
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            desc: None,
        }
    }

    pub fn with_desc(mut self, desc: Option<String>) -> Self {
        self.desc = desc;
        self
    }

    /// Returns the item if `id` and `url` are non-empty.
    ///
    /// Adapters call this on every item they emit, so a blank required field
    /// fails the adapter instead of reaching callers.
    pub fn validated(self) -> Result<Self> {
        self.validate().map_err(|e| {
            SourceError::ValidationError(format!("item {:?}: {}", self.id, e))
        })?;
        Ok(self)
    }
}

/// Upstream identifier that may arrive as a JSON number or a string
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RawId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawId::Number(n) => write!(f, "{}", n),
            RawId::Text(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_serialization_omits_missing_desc() {
        let item = Item::new("a", "Title", "https://example.com/a");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "a", "title": "Title", "url": "https://example.com/a"})
        );

        let item = item.with_desc(Some("summary".to_string()));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["desc"], "summary");
    }

    #[test]
    fn test_validated_rejects_blank_required_fields() {
        assert!(Item::new("", "t", "/x").validated().is_err());
        assert!(Item::new("1", "t", "").validated().is_err());
        assert!(Item::new("1", "", "/x").validated().is_ok());
    }

    #[test]
    fn test_raw_id_display() {
        let n: RawId = serde_json::from_str("42").unwrap();
        let s: RawId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(n.to_string(), "42");
        assert_eq!(s.to_string(), "abc");
    }
}

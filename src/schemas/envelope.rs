//! Response Envelope
//!
//! `{code: 0, list}` on success, `{code: 1, msg}` on failure. The HTTP status is
//! always 200; `code` is the only outcome signal existing callers read.

use serde::{Deserialize, Serialize};

use super::item::Item;
use crate::error::FetchFailure;

pub const CODE_OK: u8 = 0;
pub const CODE_FAILURE: u8 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    pub code: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<Vec<Item>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl Envelope {
    pub fn ok(list: Vec<Item>) -> Self {
        Self {
            code: CODE_OK,
            list: Some(list),
            msg: None,
        }
    }

    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            code: CODE_FAILURE,
            list: None,
            msg: Some(msg.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == CODE_OK
    }
}

impl From<Result<Vec<Item>, FetchFailure>> for Envelope {
    fn from(result: Result<Vec<Item>, FetchFailure>) -> Self {
        match result {
            Ok(list) => Envelope::ok(list),
            Err(failure) => Envelope::failure(failure.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_shape() {
        let env = Envelope::ok(vec![Item::new("a", "A", "/a")]);
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["code"], 0);
        assert_eq!(json["list"][0]["id"], "a");
        assert!(json.get("msg").is_none());
    }

    #[test]
    fn test_failure_shape() {
        let env: Envelope = Err(FetchFailure::UnsupportedSource {
            name: "nope".to_string(),
            supported: vec![],
        })
        .into();
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json, serde_json::json!({"code": 1, "msg": "target nope is not supported"}));
        assert!(!env.is_success());
    }
}

//! Flash mailbox kept in the session between requests.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Session key the mailbox is stored under.
pub const FLASH_SESSION_KEY: &str = "messages";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    #[default]
    Error,
    Success,
}

/// Only the exact string `"error"` is an error; anything else is a success.
impl From<&str> for FlashKind {
    fn from(kind: &str) -> Self {
        if kind == "error" {
            FlashKind::Error
        } else {
            FlashKind::Success
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub success: Vec<String>,
}

impl Flash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a mailbox out of a stored session value. Anything that is not a
    /// mailbox object, or an empty one, yields the empty mailbox.
    pub fn from_session_value(value: Option<Value>) -> Self {
        match value {
            Some(Value::Object(map)) if !map.is_empty() => {
                serde_json::from_value(Value::Object(map)).unwrap_or_default()
            }
            _ => Self::default(),
        }
    }

    pub fn push(&mut self, message: impl Into<String>, kind: FlashKind) {
        match kind {
            FlashKind::Error => self.errors.push(message.into()),
            FlashKind::Success => self.success.push(message.into()),
        }
    }

    pub fn clear(&mut self) {
        self.errors.clear();
        self.success.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.success.is_empty()
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({ "errors": self.errors, "success": self.success })
    }
}

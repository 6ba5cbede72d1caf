//! Strongly-typed identifiers for focuslockd

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of an application (package or bundle id).
///
/// Opaque to the enforcement core: two ids are the same app iff the
/// strings are byte-for-byte equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(String);

impl AppId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this id can name a real application: non-empty and free of
    /// whitespace. Events carrying anything else are dropped.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty() && !self.0.chars().any(char::is_whitespace)
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for AppId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AppId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a connected IPC client
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_id_equality_is_exact() {
        assert_eq!(AppId::new("com.example.game"), AppId::from("com.example.game"));
        assert_ne!(AppId::new("com.example.game"), AppId::new("com.example.Game"));
        assert_ne!(AppId::new("com.example.game"), AppId::new("com.example.game "));
    }

    #[test]
    fn app_id_well_formed() {
        assert!(AppId::new("com.example.game").is_well_formed());
        assert!(!AppId::new("").is_well_formed());
        assert!(!AppId::new("   ").is_well_formed());
        assert!(!AppId::new("com.example game").is_well_formed());
    }

    #[test]
    fn app_id_serializes_as_plain_string() {
        let id = AppId::new("com.example.video");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"com.example.video\"");

        let parsed: AppId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn client_id_uniqueness() {
        assert_ne!(ClientId::new(), ClientId::new());
    }
}

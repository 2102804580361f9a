//! Public profile data of a participant.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the caller should do with the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileAction {
    /// The judge reports the handle as not found.
    Remove,
}

/// Profile lookup result for one handle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileInfo {
    /// Handle as requested.
    pub handle: String,
    /// Current rating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
    /// Country.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Rating volatility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volatility: Option<i64>,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    /// Requested follow-up action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ProfileAction>,
    /// The lookup failed; data is unknown.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stale: bool,
    /// When a stale profile is worth retrying.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<Duration>,
    /// Judge payload as received.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub raw: serde_json::Value,
}

impl ProfileInfo {
    /// Creates an empty profile.
    #[must_use]
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            ..Default::default()
        }
    }

    /// Placeholder for a handle whose lookup failed.
    #[must_use]
    pub fn stale(handle: impl Into<String>, retry_after: Duration) -> Self {
        Self {
            stale: true,
            retry_after: Some(retry_after),
            ..Self::new(handle)
        }
    }

    /// Marker for a handle the judge no longer knows.
    #[must_use]
    pub fn removed(handle: impl Into<String>) -> Self {
        Self {
            action: Some(ProfileAction::Remove),
            ..Self::new(handle)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_placeholder() {
        let p = ProfileInfo::stale("ghost", Duration::from_secs(60));
        assert!(p.stale);
        assert_eq!(p.retry_after, Some(Duration::from_secs(60)));
        assert!(p.action.is_none());
    }

    #[test]
    fn test_removed_serialization() {
        let value = serde_json::to_value(ProfileInfo::removed("gone")).unwrap();
        assert_eq!(value, serde_json::json!({"handle": "gone", "action": "remove"}));
    }
}

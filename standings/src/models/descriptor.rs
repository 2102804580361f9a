//! Contest descriptor supplied by the caller.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Identifies one contest occasion on one judge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContestDescriptor {
    /// Contest title as listed by the judge.
    pub name: String,
    /// Canonical contest URL.
    pub url: String,
    /// Scoreboard URL, when it differs from `url` or is already known.
    #[serde(default)]
    pub standings_url: Option<String>,
    /// Contest start.
    pub start_time: DateTime<Utc>,
    /// Opaque external id.
    #[serde(default)]
    pub key: String,
    /// Judge host key, e.g. `topcoder.com`.
    #[serde(default)]
    pub resource: String,
    /// Free-form per-resource hints.
    #[serde(default)]
    pub info: serde_json::Map<String, serde_json::Value>,
}

impl ContestDescriptor {
    /// Creates a descriptor with the required fields.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>, start_time: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            standings_url: None,
            start_time,
            key: String::new(),
            resource: String::new(),
            info: serde_json::Map::new(),
        }
    }

    /// Sets the standings URL.
    #[must_use]
    pub fn with_standings_url(mut self, url: impl Into<String>) -> Self {
        self.standings_url = Some(url.into());
        self
    }

    /// Sets the external key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Sets the resource host key.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    /// Adds an info hint.
    #[must_use]
    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.info.insert(key.into(), value.into());
        self
    }

    /// Returns a string info hint.
    #[must_use]
    pub fn info_str(&self, key: &str) -> Option<&str> {
        self.info.get(key).and_then(serde_json::Value::as_str)
    }

    /// Academic season of the contest: seasons start in September.
    #[must_use]
    pub fn season(&self) -> String {
        let year = self.start_time.year();
        if self.start_time.month() >= 9 {
            format!("{}-{}", year, year + 1)
        } else {
            format!("{}-{}", year - 1, year)
        }
    }
}

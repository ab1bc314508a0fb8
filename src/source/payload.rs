//! Wire shapes of the two service endpoints.
//!
//! The service is lenient about what it returns, so these types are too:
//! everything beyond the top-level shape is optional, and the per-platform
//! records are read field by field from raw JSON.  Only a body that is not
//! a JSON object at all is rejected.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::item::to_count;

// ---------------------------------------------------------------------------
// GET status/
// ---------------------------------------------------------------------------

/// Body of the service status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServiceStatus {
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub message: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub version: String,

    #[serde(default, deserialize_with = "lenient_strings")]
    pub features: Vec<String>,

    /// Upstream API sub-statuses, keyed by name (`github_api`, ...).
    #[serde(skip)]
    pub apis: BTreeMap<String, ApiStatus>,

    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

impl ServiceStatus {
    /// Decode a status body, collecting every `*_api` sub-status.
    ///
    /// # Errors
    ///
    /// Fails only when `body` is not a JSON object.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        let mut status: ServiceStatus = serde_json::from_slice(body)?;
        status.apis = std::mem::take(&mut status.extra)
            .into_iter()
            .filter(|(key, _)| key.ends_with("_api"))
            .filter_map(|(key, value)| {
                serde_json::from_value::<ApiStatus>(value)
                    .ok()
                    .map(|api| (key, api))
            })
            .collect();
        Ok(status)
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self.status.as_str(), "running" | "success" | "ok")
    }
}

/// Health of one upstream API as the service sees it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApiStatus {
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub message: String,

    #[serde(default)]
    pub rate_limit: Option<RateLimit>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct RateLimit {
    #[serde(default, deserialize_with = "lenient_count")]
    pub limit: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub remaining: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub reset_time: u64,
}

// ---------------------------------------------------------------------------
// GET trending/
// ---------------------------------------------------------------------------

/// Body of the trending endpoint before normalisation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrendingPayload {
    /// Raw item records, kept untyped until the normaliser maps them.
    #[serde(default, deserialize_with = "lenient_array")]
    pub trending_topics: Vec<Value>,

    #[serde(default, deserialize_with = "lenient_object")]
    pub platforms: BTreeMap<String, Value>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub last_updated: String,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TrendingPayload {
    /// # Errors
    ///
    /// Fails when `body` is not a JSON object.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// The service's own generation time, if it sent a parseable one.
    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.last_updated)
    }

    /// Every top-level `total_*_analyzed` counter, keyed by its full name.
    pub fn analyzed_totals(&self) -> BTreeMap<String, u64> {
        self.extra
            .iter()
            .filter(|(key, value)| {
                key.starts_with("total_") && key.ends_with("_analyzed") && value.is_number()
            })
            .map(|(key, value)| (key.clone(), to_count(value)))
            .collect()
    }
}

/// Coarse health of one platform's harvester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Ok,
    Degraded,
    Error,
}

impl Health {
    /// Map the service's free-form status word.  Unknown words read as
    /// degraded: the platform answered, but not in a way we recognise.
    pub fn from_word(word: &str) -> Self {
        match word.trim().to_ascii_lowercase().as_str() {
            "ok" | "active" | "connected" | "success" | "running" => Self::Ok,
            "error" | "failed" | "down" => Self::Error,
            _ => Self::Degraded,
        }
    }
}

/// One entry of the payload's `platforms` map.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformStatus {
    pub health: Health,
    pub last_fetch: Option<DateTime<Utc>>,
    pub repos_count: Option<u64>,
    pub posts_count: Option<u64>,
    pub questions_count: Option<u64>,
    pub stories_count: Option<u64>,
    pub rate_limit_remaining: Option<u64>,
    pub error: Option<String>,
}

impl PlatformStatus {
    /// Read a status record field by field; a non-object reads as an
    /// unknown (degraded) status with no counters.
    pub fn from_raw(raw: &Value) -> Self {
        let get = |key: &str| raw.get(key);
        let count = |key: &str| get(key).filter(|v| v.is_number()).map(to_count);
        let text = |key: &str| get(key).and_then(Value::as_str).map(str::to_string);

        Self {
            health: Health::from_word(&text("status").unwrap_or_default()),
            last_fetch: text("last_fetch").as_deref().and_then(parse_timestamp),
            repos_count: count("repos_count"),
            posts_count: count("posts_count"),
            questions_count: count("questions_count"),
            stories_count: count("stories_count"),
            rate_limit_remaining: count("rate_limit_remaining"),
            error: text("error").filter(|s| !s.is_empty()),
        }
    }

    /// The counter the platform reports, with its unit.
    pub fn headline_count(&self) -> Option<(u64, &'static str)> {
        [
            (self.repos_count, "repos"),
            (self.posts_count, "posts"),
            (self.questions_count, "questions"),
            (self.stories_count, "stories"),
        ]
        .into_iter()
        .find_map(|(n, unit)| n.map(|n| (n, unit)))
    }
}

// ---------------------------------------------------------------------------
// Lenient field decoders
// ---------------------------------------------------------------------------

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn lenient_string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    let value = Value::deserialize(de)?;
    Ok(value.as_str().map(str::to_string).unwrap_or_default())
}

fn lenient_strings<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
    let value = Value::deserialize(de)?;
    Ok(value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default())
}

fn lenient_array<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<Value>, D::Error> {
    let value = Value::deserialize(de)?;
    Ok(match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    })
}

fn lenient_object<'de, D: Deserializer<'de>>(de: D) -> Result<BTreeMap<String, Value>, D::Error> {
    let value = Value::deserialize(de)?;
    Ok(match value {
        Value::Object(map) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    })
}

fn lenient_count<'de, D: Deserializer<'de>>(de: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(de)?;
    Ok(to_count(&value))
}

//! The typed trending item shared by every platform.
//!
//! The service sends one loosely-typed record shape for all platforms, with
//! fields whose meaning depends on where the item came from (`posts_count`
//! is forks for a repository but comments for a post).  [`PlatformItem::from_raw`]
//! is the single place that untangles this: it classifies the record into a
//! [`Bucket`] and pulls the platform-specific attributes into
//! [`PlatformDetails`].
//!
//! The mapping is total.  Missing or oddly-typed keys fall back to zero or
//! the empty string, and a record whose platform cannot be worked out lands
//! in [`Bucket::Unclassified`] instead of being dropped.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};

/// The source platforms the service aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Platform {
    GitHub,
    Reddit,
    HackerNews,
    StackOverflow,
}

impl Platform {
    /// Human-readable name, as the dashboard titles it.
    pub fn label(self) -> &'static str {
        match self {
            Self::GitHub => "GitHub",
            Self::Reddit => "Reddit",
            Self::HackerNews => "Hacker News",
            Self::StackOverflow => "Stack Overflow",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Platform {
    type Err = String;

    /// Accepts the spellings the service has used over time: `GitHub`,
    /// `github`, `Hacker News`, `hackernews`, `stack_overflow`, ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold_tag(s).as_str() {
            "github" => Ok(Self::GitHub),
            "reddit" => Ok(Self::Reddit),
            "hackernews" => Ok(Self::HackerNews),
            "stackoverflow" => Ok(Self::StackOverflow),
            _ => Err(format!("unknown platform: {s}")),
        }
    }
}

/// The secondary `type` tag on a raw item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Repository,
    Discussion,
    News,
    Question,
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold_tag(s).as_str() {
            "repository" => Ok(Self::Repository),
            "discussion" => Ok(Self::Discussion),
            "news" => Ok(Self::News),
            "question" => Ok(Self::Question),
            _ => Err(format!("unknown item kind: {s}")),
        }
    }
}

/// The grouping an item is rendered and totalled under.
///
/// Ordering follows the dashboard's panel order, which also makes every
/// map keyed by `Bucket` iterate deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Bucket {
    GitHub,
    Reddit,
    HackerNews,
    StackOverflow,
    Unclassified,
}

impl Bucket {
    pub const ALL: [Bucket; 5] = [
        Bucket::GitHub,
        Bucket::Reddit,
        Bucket::HackerNews,
        Bucket::StackOverflow,
        Bucket::Unclassified,
    ];

    /// Classify by the `platform` tag first, then by the `type` tag.
    ///
    /// Only repository, discussion and news have a fixed platform; a
    /// `question` with no platform tag stays unclassified.
    pub fn classify(platform: Option<Platform>, kind: Option<ItemKind>) -> Bucket {
        if let Some(platform) = platform {
            return platform.into();
        }
        match kind {
            Some(ItemKind::Repository) => Bucket::GitHub,
            Some(ItemKind::Discussion) => Bucket::Reddit,
            Some(ItemKind::News) => Bucket::HackerNews,
            Some(ItemKind::Question) | None => Bucket::Unclassified,
        }
    }

    pub fn platform(self) -> Option<Platform> {
        match self {
            Self::GitHub => Some(Platform::GitHub),
            Self::Reddit => Some(Platform::Reddit),
            Self::HackerNews => Some(Platform::HackerNews),
            Self::StackOverflow => Some(Platform::StackOverflow),
            Self::Unclassified => None,
        }
    }

    pub fn label(self) -> &'static str {
        self.platform().map_or("Unclassified", Platform::label)
    }

    /// Names of the primary and secondary counters for this bucket's totals.
    pub fn metric_labels(self) -> (&'static str, &'static str) {
        match self {
            Self::GitHub => ("stars", "forks"),
            Self::Reddit => ("upvotes", "comments"),
            Self::HackerNews => ("points", "comments"),
            Self::StackOverflow => ("score", "answers"),
            Self::Unclassified => ("score", "count"),
        }
    }
}

impl From<Platform> for Bucket {
    fn from(p: Platform) -> Self {
        match p {
            Platform::GitHub => Bucket::GitHub,
            Platform::Reddit => Bucket::Reddit,
            Platform::HackerNews => Bucket::HackerNews,
            Platform::StackOverflow => Bucket::StackOverflow,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Attributes that only exist for one platform.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformDetails {
    GitHub { language: Option<String> },
    Reddit { subreddit: Option<String> },
    HackerNews { author: Option<String> },
    StackOverflow,
    Unclassified,
}

/// One trending entity, normalised from the service's raw record.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformItem {
    /// Unique within one payload only.
    pub id: String,

    pub bucket: Bucket,

    /// Repository name, post title or story title.
    pub title: String,

    /// May be empty.
    pub description: String,

    /// Platform-specific scale; not comparable across buckets.
    pub trend_score: f64,

    /// Stars (GitHub), upvotes (Reddit), points (Hacker News) or score.
    pub primary_metric: u64,

    /// Forks (GitHub) or comments (Reddit, Hacker News).
    pub secondary_count: u64,

    pub url: Option<String>,

    pub details: PlatformDetails,
}

impl PlatformItem {
    /// Map a raw record of unknown shape into a typed item.
    ///
    /// Never fails: a non-object value yields an empty unclassified item so
    /// that the item still counts towards the payload's totals.
    pub fn from_raw(raw: &Value) -> Self {
        let empty = Map::new();
        let obj = raw.as_object().unwrap_or(&empty);

        let platform = str_field(obj, "platform").and_then(|s| s.parse::<Platform>().ok());
        let kind = str_field(obj, "type")
            .or_else(|| str_field(obj, "kind"))
            .and_then(|s| s.parse::<ItemKind>().ok());
        let bucket = Bucket::classify(platform, kind);

        let primary_metric = match bucket {
            Bucket::GitHub => count_field(obj, &["stars"]),
            Bucket::Reddit | Bucket::HackerNews | Bucket::StackOverflow => {
                count_field(obj, &["score", "points"])
            }
            Bucket::Unclassified => count_field(obj, &["stars", "score", "points"]),
        };
        let secondary_count = match bucket {
            Bucket::GitHub => count_field(obj, &["posts_count", "forks"]),
            _ => count_field(obj, &["posts_count", "comments"]),
        };

        let details = match bucket {
            Bucket::GitHub => PlatformDetails::GitHub {
                language: non_empty(obj, "language"),
            },
            Bucket::Reddit => PlatformDetails::Reddit {
                subreddit: non_empty(obj, "subreddit"),
            },
            Bucket::HackerNews => PlatformDetails::HackerNews {
                author: non_empty(obj, "author"),
            },
            Bucket::StackOverflow => PlatformDetails::StackOverflow,
            Bucket::Unclassified => PlatformDetails::Unclassified,
        };

        let title = ["keyword", "title", "name"]
            .iter()
            .find_map(|key| str_field(obj, key))
            .unwrap_or_default()
            .to_string();

        PlatformItem {
            id: id_field(obj),
            bucket,
            title,
            description: str_field(obj, "description").unwrap_or_default().to_string(),
            trend_score: score_field(obj, "trend_score"),
            primary_metric,
            secondary_count,
            url: non_empty(obj, "url"),
            details,
        }
    }

    /// The GitHub language, when this is a repository that reports one.
    pub fn language(&self) -> Option<&str> {
        match &self.details {
            PlatformDetails::GitHub { language } => language.as_deref(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Lowercase and strip separators so `Hacker News` and `hacker_news` match.
fn fold_tag(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

fn non_empty(obj: &Map<String, Value>, key: &str) -> Option<String> {
    str_field(obj, key)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn id_field(obj: &Map<String, Value>) -> String {
    match obj.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// First numeric value among `keys`, clamped to a non-negative integer.
fn count_field(obj: &Map<String, Value>, keys: &[&str]) -> u64 {
    keys.iter()
        .find_map(|key| obj.get(*key).filter(|v| v.is_number()))
        .map_or(0, to_count)
}

pub(crate) fn to_count(value: &Value) -> u64 {
    if let Some(n) = value.as_u64() {
        return n;
    }
    match value.as_f64() {
        Some(f) if f.is_finite() && f > 0.0 => f.floor() as u64,
        _ => 0,
    }
}

fn score_field(obj: &Map<String, Value>, key: &str) -> f64 {
    obj.get(key)
        .and_then(Value::as_f64)
        .filter(|f| f.is_finite())
        .unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

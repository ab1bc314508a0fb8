//! Turning a raw trending payload into a display-ready snapshot.
//!
//! The [`Normalizer`] maps every raw record to a [`PlatformItem`], groups
//! items into buckets and derives the summary numbers the dashboard shows.
//! Two rules hold throughout:
//!
//! * **Nothing is dropped.**  Every record lands in exactly one bucket,
//!   unclassified ones included, so bucket sizes always add up to the
//!   number of records the service sent.
//! * **Aggregates cover the whole bucket.**  The per-bucket display cap only
//!   limits what is listed; totals are computed before truncation.
//!
//! [`Normalizer::aggregate`] is a pure function of the item list, so a
//! snapshot's aggregates can always be recomputed and compared.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::source::{Bucket, PlatformItem, PlatformStatus, ServiceStatus, TrendingPayload};

/// Sums over one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketTotals {
    pub items: usize,
    pub primary: u64,
    pub secondary: u64,
}

/// Summed GitHub stars for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageShare {
    pub language: String,
    pub stars: u64,
    pub repos: usize,
}

/// Everything derived from a snapshot's items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aggregates {
    pub item_count: usize,
    /// One entry per bucket, empty buckets included.
    pub totals: BTreeMap<Bucket, BucketTotals>,
    /// Top languages by summed stars, ties in first-seen order.
    pub languages: Vec<LanguageShare>,
    /// Number of distinct languages before the chart cap.
    pub distinct_languages: usize,
}

impl Aggregates {
    pub fn totals_for(&self, bucket: Bucket) -> BucketTotals {
        self.totals.get(&bucket).copied().unwrap_or_default()
    }
}

/// An immutable, internally consistent view of one successful cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshSnapshot {
    /// Arrival order from the payload.
    pub items: Vec<PlatformItem>,
    /// Indices into `items` per bucket, in arrival order, uncapped.
    pub buckets: BTreeMap<Bucket, Vec<usize>>,
    pub platform_status: BTreeMap<String, PlatformStatus>,
    pub aggregates: Aggregates,
    /// The service's own `last_updated`, not our fetch time.
    pub generated_at: Option<DateTime<Utc>>,
    /// `total_*_analyzed` counters the service reported.
    pub analyzed_totals: BTreeMap<String, u64>,
    pub service: ServiceStatus,
    bucket_cap: usize,
}

impl RefreshSnapshot {
    /// All items of a bucket, in arrival order.
    pub fn bucket(&self, bucket: Bucket) -> impl Iterator<Item = &PlatformItem> + '_ {
        self.buckets
            .get(&bucket)
            .into_iter()
            .flatten()
            .map(|&i| &self.items[i])
    }

    /// The capped slice of a bucket that gets listed.
    pub fn displayed(&self, bucket: Bucket) -> impl Iterator<Item = &PlatformItem> + '_ {
        self.bucket(bucket).take(self.bucket_cap)
    }

    pub fn bucket_len(&self, bucket: Bucket) -> usize {
        self.buckets.get(&bucket).map_or(0, Vec::len)
    }

    pub fn displayed_len(&self, bucket: Bucket) -> usize {
        self.bucket_len(bucket).min(self.bucket_cap)
    }
}

/// Builds [`RefreshSnapshot`]s with fixed display caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    bucket_cap: usize,
    language_cap: usize,
}

impl Normalizer {
    pub fn new(bucket_cap: usize, language_cap: usize) -> Self {
        Self {
            bucket_cap,
            language_cap,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.bucket_cap, config.language_cap)
    }

    /// Build a snapshot from one cycle's two responses.
    pub fn snapshot(&self, service: ServiceStatus, payload: TrendingPayload) -> RefreshSnapshot {
        let items: Vec<PlatformItem> = payload
            .trending_topics
            .iter()
            .map(PlatformItem::from_raw)
            .collect();
        let buckets = partition(&items);
        let aggregates = self.aggregate(&items);

        let platform_status = payload
            .platforms
            .iter()
            .map(|(name, raw)| (name.clone(), PlatformStatus::from_raw(raw)))
            .collect();

        RefreshSnapshot {
            generated_at: payload.generated_at(),
            analyzed_totals: payload.analyzed_totals(),
            items,
            buckets,
            platform_status,
            aggregates,
            service,
            bucket_cap: self.bucket_cap,
        }
    }

    /// Compute totals and the language distribution over `items`.
    pub fn aggregate(&self, items: &[PlatformItem]) -> Aggregates {
        let mut totals: BTreeMap<Bucket, BucketTotals> = Bucket::ALL
            .iter()
            .map(|&b| (b, BucketTotals::default()))
            .collect();

        for item in items {
            let entry = totals.entry(item.bucket).or_default();
            entry.items += 1;
            entry.primary = entry.primary.saturating_add(item.primary_metric);
            entry.secondary = entry.secondary.saturating_add(item.secondary_count);
        }

        let mut languages = language_distribution(items);
        let distinct_languages = languages.len();
        languages.truncate(self.language_cap);

        Aggregates {
            item_count: items.len(),
            totals,
            languages,
            distinct_languages,
        }
    }
}

/// Group item indices by bucket.  Every bucket gets an entry.
pub fn partition(items: &[PlatformItem]) -> BTreeMap<Bucket, Vec<usize>> {
    let mut buckets: BTreeMap<Bucket, Vec<usize>> =
        Bucket::ALL.iter().map(|&b| (b, Vec::new())).collect();
    for (i, item) in items.iter().enumerate() {
        buckets.entry(item.bucket).or_default().push(i);
    }
    buckets
}

/// Stars per language over GitHub items, sorted by stars descending.
///
/// The sort is stable over first-seen order, so ties keep the order in which
/// the languages first appeared in the payload.
fn language_distribution(items: &[PlatformItem]) -> Vec<LanguageShare> {
    let mut shares: Vec<LanguageShare> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for item in items.iter().filter(|i| i.bucket == Bucket::GitHub) {
        let Some(language) = item.language() else {
            continue;
        };
        let slot = *index.entry(language).or_insert_with(|| {
            shares.push(LanguageShare {
                language: language.to_string(),
                stars: 0,
                repos: 0,
            });
            shares.len() - 1
        });
        let share = &mut shares[slot];
        share.stars = share.stars.saturating_add(item.primary_metric);
        share.repos += 1;
    }

    shares.sort_by(|a, b| b.stars.cmp(&a.stars));
    shares
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn payload(topics: Vec<Value>) -> TrendingPayload {
        TrendingPayload {
            trending_topics: topics,
            ..TrendingPayload::default()
        }
    }

    fn repo(stars: u64, language: &str) -> Value {
        json!({ "platform": "GitHub", "stars": stars, "posts_count": 1, "language": language })
    }

    fn normalizer() -> Normalizer {
        Normalizer::new(8, 6)
    }

    #[test]
    fn github_and_reddit_totals() {
        let snap = normalizer().snapshot(
            ServiceStatus::default(),
            payload(vec![
                json!({ "id": 1, "platform": "GitHub", "stars": 100, "posts_count": 10 }),
                json!({ "id": 2, "platform": "GitHub", "stars": 50, "posts_count": 5 }),
                json!({ "id": 3, "platform": "GitHub", "stars": 10 }),
                json!({ "id": 4, "platform": "Reddit", "score": 40, "posts_count": 12 }),
                json!({ "id": 5, "platform": "Reddit", "score": 5 }),
            ]),
        );

        let github = snap.aggregates.totals_for(Bucket::GitHub);
        let reddit = snap.aggregates.totals_for(Bucket::Reddit);
        assert_eq!(github.primary, 160);
        assert_eq!(github.secondary, 15);
        assert_eq!(reddit.primary, 45);
        assert_eq!(reddit.secondary, 12);
        assert_eq!(snap.bucket_len(Bucket::Unclassified), 0);
        assert_eq!(snap.displayed_len(Bucket::GitHub), 3);
        assert_eq!(snap.displayed_len(Bucket::Reddit), 2);
    }

    #[test]
    fn every_item_lands_in_exactly_one_bucket() {
        let topics = vec![
            json!({ "platform": "github" }),
            json!({ "type": "news" }),
            json!({ "platform": "stackoverflow" }),
            json!({ "type": "question" }),
            json!({}),
            json!(null),
            json!({ "platform": "Hacker News" }),
        ];
        let count = topics.len();
        let snap = normalizer().snapshot(ServiceStatus::default(), payload(topics));

        let sizes: usize = snap.buckets.values().map(Vec::len).sum();
        assert_eq!(sizes, count);
        assert_eq!(snap.aggregates.item_count, count);
        assert_eq!(snap.bucket_len(Bucket::Unclassified), 3);

        let mut seen: Vec<usize> = snap.buckets.values().flatten().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..count).collect::<Vec<_>>());
    }

    #[test]
    fn unclassified_items_count_towards_totals() {
        let snap = normalizer().snapshot(
            ServiceStatus::default(),
            payload(vec![json!({ "score": 9, "posts_count": 2 })]),
        );
        let totals = snap.aggregates.totals_for(Bucket::Unclassified);
        assert_eq!(totals, BucketTotals { items: 1, primary: 9, secondary: 2 });
    }

    #[test]
    fn display_cap_does_not_shrink_totals() {
        let topics: Vec<Value> = (1..=12).map(|n| repo(n, "Rust")).collect();
        let snap = normalizer().snapshot(ServiceStatus::default(), payload(topics));

        assert_eq!(snap.bucket_len(Bucket::GitHub), 12);
        assert_eq!(snap.displayed(Bucket::GitHub).count(), 8);
        assert_eq!(snap.aggregates.totals_for(Bucket::GitHub).primary, 78);
        assert_eq!(snap.aggregates.languages[0].repos, 12);
    }

    #[test]
    fn display_keeps_arrival_order_not_score_order() {
        let snap = normalizer().snapshot(
            ServiceStatus::default(),
            payload(vec![
                json!({ "id": "low", "platform": "github", "stars": 1, "trend_score": 1 }),
                json!({ "id": "high", "platform": "github", "stars": 900, "trend_score": 99 }),
            ]),
        );
        let ids: Vec<&str> = snap.displayed(Bucket::GitHub).map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["low", "high"]);
    }

    #[test]
    fn languages_sorted_by_stars_then_first_seen() {
        let topics = vec![
            repo(10, "Go"),
            repo(30, "Rust"),
            repo(20, "Python"),
            repo(10, "Rust"),
            repo(20, "Zig"),
            repo(5, ""),
            json!({ "platform": "GitHub", "stars": 500 }),
            json!({ "platform": "Reddit", "score": 999, "language": "Rust" }),
        ];
        let aggregates = normalizer().aggregate(
            &topics.iter().map(PlatformItem::from_raw).collect::<Vec<_>>(),
        );

        let order: Vec<(&str, u64)> = aggregates
            .languages
            .iter()
            .map(|l| (l.language.as_str(), l.stars))
            .collect();
        assert_eq!(order, [("Rust", 40), ("Python", 20), ("Zig", 20), ("Go", 10)]);
        assert_eq!(aggregates.distinct_languages, 4);
    }

    #[test]
    fn language_chart_is_capped() {
        let topics: Vec<Value> = ["A", "B", "C", "D", "E", "F", "G", "H"]
            .iter()
            .enumerate()
            .map(|(i, lang)| repo(100 - i as u64, lang))
            .collect();
        let items: Vec<PlatformItem> = topics.iter().map(PlatformItem::from_raw).collect();
        let aggregates = normalizer().aggregate(&items);

        assert_eq!(aggregates.languages.len(), 6);
        assert_eq!(aggregates.distinct_languages, 8);
        assert_eq!(aggregates.languages[5].language, "F");
    }

    #[test]
    fn aggregates_are_a_pure_function_of_items() {
        let n = normalizer();
        let snap = n.snapshot(
            ServiceStatus::default(),
            payload(vec![
                repo(3, "C"),
                json!({ "platform": "reddit", "score": 4 }),
                json!({ "type": "news", "points": 8 }),
            ]),
        );
        assert_eq!(n.aggregate(&snap.items), snap.aggregates);
    }

    #[test]
    fn aggregates_serialize_identically_every_time() {
        let n = normalizer();
        let topics = vec![repo(7, "Rust"), repo(7, "Go"), json!({ "platform": "reddit" })];
        let first = serde_json::to_string(&n.snapshot(ServiceStatus::default(), payload(topics.clone())).aggregates).unwrap();
        for _ in 0..5 {
            let again = serde_json::to_string(
                &n.snapshot(ServiceStatus::default(), payload(topics.clone())).aggregates,
            )
            .unwrap();
            assert_eq!(again, first);
        }
    }

    #[test]
    fn empty_payload_has_every_bucket_empty() {
        let snap = normalizer().snapshot(ServiceStatus::default(), TrendingPayload::default());
        for bucket in Bucket::ALL {
            assert_eq!(snap.bucket_len(bucket), 0);
            assert_eq!(snap.aggregates.totals_for(bucket), BucketTotals::default());
        }
        assert!(snap.aggregates.languages.is_empty());
        assert!(snap.generated_at.is_none());
    }

    #[test]
    fn snapshot_carries_platform_status_and_service_fields() {
        let body = br#"{
            "trending_topics": [],
            "platforms": {
                "github": {"status": "active", "repos_count": 30},
                "reddit": {"status": "error", "error": "429"}
            },
            "total_repos_analyzed": 30,
            "last_updated": "2025-08-20T20:25:00Z"
        }"#;
        let payload = TrendingPayload::from_slice(body).unwrap();
        let snap = normalizer().snapshot(ServiceStatus::default(), payload);

        assert_eq!(snap.platform_status.len(), 2);
        assert_eq!(
            snap.platform_status["reddit"].health,
            crate::source::Health::Error
        );
        assert_eq!(snap.analyzed_totals["total_repos_analyzed"], 30);
        assert!(snap.generated_at.is_some());
    }
}

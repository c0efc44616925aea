//! Resolver configuration.

use crate::ContentType;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{collections::BTreeSet, time::Duration};

/// How collaborator lookups are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStrategy {
    /// Look up purchases, then subscriptions, stopping at the first grant.
    #[default]
    Sequential,
    /// Look up purchases and subscriptions concurrently once the content is
    /// known, discarding whichever result is not needed.
    Prefetch,
}

/// What to do with a completed purchase that records no access terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyPurchasePolicy {
    /// Treat the purchase as indefinite access.
    #[default]
    GrantIndefinite,
    /// Ignore the purchase, as if it had expired.
    Deny,
}

/// Configuration for [`AccessResolver`](crate::AccessResolver).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Deadline for a whole resolution, in milliseconds. `None` waits for
    /// the collaborators indefinitely.
    #[serde(
        rename = "timeout_ms",
        serialize_with = "serialize_timeout",
        deserialize_with = "deserialize_timeout"
    )]
    pub timeout: Option<Duration>,

    /// Lookup scheduling.
    pub fetch: FetchStrategy,

    /// Treatment of purchases without access terms.
    pub legacy_purchases: LegacyPurchasePolicy,

    /// Content types that carry video, and are therefore unlocked by a
    /// `video_access` benefit.
    pub video_bearing: BTreeSet<ContentType>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            fetch: FetchStrategy::Sequential,
            legacy_purchases: LegacyPurchasePolicy::GrantIndefinite,
            video_bearing: BTreeSet::from([ContentType::Course, ContentType::Workshop]),
        }
    }
}

impl ResolverConfig {
    /// Set the resolution deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the lookup scheduling.
    pub fn with_fetch(mut self, fetch: FetchStrategy) -> Self {
        self.fetch = fetch;
        self
    }

    /// Set the treatment of purchases without access terms.
    pub fn with_legacy_purchases(mut self, policy: LegacyPurchasePolicy) -> Self {
        self.legacy_purchases = policy;
        self
    }

    /// Replace the set of video-bearing content types.
    pub fn with_video_bearing(mut self, types: impl IntoIterator<Item = ContentType>) -> Self {
        self.video_bearing = types.into_iter().collect();
        self
    }

    /// Whether `content_type` carries video.
    pub fn is_video_bearing(&self, content_type: ContentType) -> bool {
        self.video_bearing.contains(&content_type)
    }
}

fn serialize_timeout<S: Serializer>(
    timeout: &Option<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match timeout {
        Some(timeout) => {
            let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            serializer.serialize_some(&millis)
        }
        None => serializer.serialize_none(),
    }
}

fn deserialize_timeout<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Duration>, D::Error> {
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn it_defaults_to_sequential_lookups_without_deadline() {
        let config = ResolverConfig::default();

        assert_eq!(config.timeout, None);
        assert_eq!(config.fetch, FetchStrategy::Sequential);
        assert_eq!(config.legacy_purchases, LegacyPurchasePolicy::GrantIndefinite);
        assert!(config.is_video_bearing(ContentType::Course));
        assert!(config.is_video_bearing(ContentType::Workshop));
        assert!(!config.is_video_bearing(ContentType::LessonPlan));
    }

    #[test]
    fn it_reads_partial_configuration() {
        let config: ResolverConfig = serde_json::from_value(json!({
            "timeout_ms": 250,
            "fetch": "prefetch",
        }))
        .unwrap();

        assert_eq!(
            config,
            ResolverConfig::default()
                .with_timeout(Duration::from_millis(250))
                .with_fetch(FetchStrategy::Prefetch)
        );
    }

    #[test]
    fn it_writes_the_timeout_in_milliseconds() {
        let config = ResolverConfig::default()
            .with_timeout(Duration::from_secs(2))
            .with_legacy_purchases(LegacyPurchasePolicy::Deny)
            .with_video_bearing([ContentType::Course]);

        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({
                "timeout_ms": 2000,
                "fetch": "sequential",
                "legacy_purchases": "deny",
                "video_bearing": ["course"],
            })
        );
    }

    #[test]
    fn it_saturates_timeouts_beyond_the_millisecond_range() {
        let config = ResolverConfig::default().with_timeout(Duration::MAX);

        assert_eq!(
            serde_json::to_value(&config).unwrap()["timeout_ms"],
            json!(u64::MAX)
        );
    }
}

//! Subscription grants and plan benefits.

use crate::{Allowance, Capabilities, ContentType, SubjectId};
use lectern_common::{TimeWindow, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Benefit key unlocking every content type.
pub const ALL_CONTENT: &str = "all_content";

/// Benefit key unlocking playback of video-bearing content.
pub const VIDEO_ACCESS: &str = "video_access";

/// Benefit key that, when explicitly withheld, disables downloads.
pub const DOWNLOAD_ACCESS: &str = "download_access";

/// Benefit key that, when explicitly withheld, disables playback.
pub const PLAY_ACCESS: &str = "play_access";

/// Benefit key that, when explicitly withheld, disables previews.
pub const PREVIEW_ACCESS: &str = "preview_access";

/// Value of a single plan benefit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Benefit {
    /// Granted or withheld outright.
    Flag(bool),
    /// Granted with a consumption limit. A limit of zero grants nothing.
    Limit(u64),
}

impl Benefit {
    /// Whether this benefit grants anything.
    pub fn grants(&self) -> bool {
        match self {
            Benefit::Flag(granted) => *granted,
            Benefit::Limit(limit) => *limit > 0,
        }
    }

    /// Remaining allowance carried by this benefit.
    pub fn allowance(&self) -> Allowance {
        match self {
            Benefit::Flag(_) => Allowance::Unlimited,
            Benefit::Limit(limit) => Allowance::Limited(*limit),
        }
    }
}

impl From<bool> for Benefit {
    fn from(value: bool) -> Self {
        Benefit::Flag(value)
    }
}

impl From<u64> for Benefit {
    fn from(value: u64) -> Self {
        Benefit::Limit(value)
    }
}

/// Which benefit key matched a content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedBy {
    /// The `{type}_access` key for exactly this type.
    TypeAccess,
    /// The generic [`ALL_CONTENT`] key.
    AllContent,
    /// The [`VIDEO_ACCESS`] key, for video-bearing types only.
    VideoAccess,
}

/// A benefit that unlocked a content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenefitMatch {
    /// The key that matched.
    pub key: String,
    /// How the key relates to the content type.
    pub matched_by: MatchedBy,
    /// The matched value.
    pub benefit: Benefit,
}

/// A plan's benefits map: capability name to flag or limit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Benefits(pub BTreeMap<String, Benefit>);

impl Benefits {
    /// An empty benefits map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a benefit.
    pub fn with(mut self, key: impl Into<String>, benefit: impl Into<Benefit>) -> Self {
        self.0.insert(key.into(), benefit.into());
        self
    }

    /// Look up a single benefit.
    pub fn get(&self, key: &str) -> Option<&Benefit> {
        self.0.get(key)
    }

    fn granted(&self, key: &str) -> Option<Benefit> {
        self.get(key).copied().filter(Benefit::grants)
    }

    /// Find the benefit unlocking `content_type`, if any.
    ///
    /// Keys are tried from most to least specific: `{type}_access`, then
    /// [`ALL_CONTENT`], then [`VIDEO_ACCESS`] when `video_bearing` is set.
    pub fn match_for(&self, content_type: ContentType, video_bearing: bool) -> Option<BenefitMatch> {
        let type_key = content_type.access_key();
        let candidates = [
            (type_key.as_str(), MatchedBy::TypeAccess),
            (ALL_CONTENT, MatchedBy::AllContent),
            (VIDEO_ACCESS, MatchedBy::VideoAccess),
        ];

        candidates
            .into_iter()
            .filter(|(_, matched_by)| video_bearing || *matched_by != MatchedBy::VideoAccess)
            .find_map(|(key, matched_by)| {
                self.granted(key).map(|benefit| BenefitMatch {
                    key: key.to_string(),
                    matched_by,
                    benefit,
                })
            })
    }

    fn withheld(&self, key: &str) -> bool {
        self.get(key).is_some_and(|benefit| !benefit.grants())
    }

    /// Capabilities conferred by a match against this map.
    ///
    /// Every capability is on unless the plan explicitly withholds it:
    /// [`DOWNLOAD_ACCESS`] for downloads, [`PREVIEW_ACCESS`] for previews,
    /// and [`VIDEO_ACCESS`] or [`PLAY_ACCESS`] for playback. Playback-only
    /// matches ([`MatchedBy::VideoAccess`]) never include downloads.
    pub fn capabilities(&self, matched: &BenefitMatch) -> Capabilities {
        Capabilities {
            can_download: matched.matched_by != MatchedBy::VideoAccess
                && !self.withheld(DOWNLOAD_ACCESS),
            can_preview: !self.withheld(PREVIEW_ACCESS),
            can_play: !self.withheld(VIDEO_ACCESS) && !self.withheld(PLAY_ACCESS),
        }
    }
}

/// A subject's subscription and the benefits of its plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionGrant {
    /// The subscriber.
    pub subject_id: SubjectId,
    /// Plan name, for audit and display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    /// Cleared when the subscription is cancelled or suspended.
    pub active: bool,
    /// First instant of validity.
    pub starts_at: Timestamp,
    /// Last instant of validity; `None` for open-ended plans.
    #[serde(default)]
    pub ends_at: Option<Timestamp>,
    /// What the plan unlocks.
    #[serde(default)]
    pub benefits: Benefits,
}

impl SubscriptionGrant {
    /// An active, open-ended subscription starting at `starts_at`.
    pub fn new(subject_id: impl Into<SubjectId>, starts_at: Timestamp, benefits: Benefits) -> Self {
        Self {
            subject_id: subject_id.into(),
            plan: None,
            active: true,
            starts_at,
            ends_at: None,
            benefits,
        }
    }

    /// Name the plan.
    pub fn with_plan(mut self, plan: impl Into<String>) -> Self {
        self.plan = Some(plan.into());
        self
    }

    /// Close the subscription at `ends_at`.
    pub fn ending(mut self, ends_at: Timestamp) -> Self {
        self.ends_at = Some(ends_at);
        self
    }

    /// Mark the subscription as cancelled.
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Instants during which this subscription is valid.
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(Some(self.starts_at), self.ends_at)
    }

    /// Whether this subscription is active and valid at `now`.
    pub fn is_current(&self, now: Timestamp) -> bool {
        self.active && self.window().covers(now)
    }

    /// Select the current subscription of `subject` among `grants`: the
    /// most recently started one that is active and valid at `now`.
    pub fn select_current<'a>(
        grants: impl IntoIterator<Item = &'a SubscriptionGrant>,
        subject: &SubjectId,
        now: Timestamp,
    ) -> Option<&'a SubscriptionGrant> {
        grants
            .into_iter()
            .filter(|grant| &grant.subject_id == subject && grant.is_current(now))
            .max_by_key(|grant| grant.starts_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn day(day: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2025, 3, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn it_matches_the_most_specific_key_first() {
        let benefits = Benefits::new()
            .with(ALL_CONTENT, true)
            .with("course_access", 3u64);

        let matched = benefits.match_for(ContentType::Course, true).unwrap();
        assert_eq!(matched.matched_by, MatchedBy::TypeAccess);
        assert_eq!(matched.benefit.allowance(), Allowance::Limited(3));

        let matched = benefits.match_for(ContentType::Tool, false).unwrap();
        assert_eq!(matched.matched_by, MatchedBy::AllContent);
        assert_eq!(matched.benefit.allowance(), Allowance::Unlimited);
    }

    #[test]
    fn it_only_applies_video_access_to_video_bearing_types() {
        let benefits = Benefits::new().with(VIDEO_ACCESS, true);

        assert!(benefits.match_for(ContentType::Course, true).is_some());
        assert!(benefits.match_for(ContentType::File, false).is_none());
    }

    #[test]
    fn it_ignores_withheld_and_exhausted_benefits() {
        let benefits = Benefits::new()
            .with("workshop_access", false)
            .with("course_access", 0u64);

        assert!(benefits.match_for(ContentType::Workshop, true).is_none());
        assert!(benefits.match_for(ContentType::Course, true).is_none());
    }

    #[test]
    fn it_limits_video_benefits_to_playback() {
        let benefits = Benefits::new().with(VIDEO_ACCESS, true);
        let matched = benefits.match_for(ContentType::Workshop, true).unwrap();

        assert_eq!(
            benefits.capabilities(&matched),
            Capabilities {
                can_download: false,
                can_preview: true,
                can_play: true,
            }
        );
    }

    #[test]
    fn it_honours_withheld_downloads() {
        let benefits = Benefits::new()
            .with(ALL_CONTENT, true)
            .with(DOWNLOAD_ACCESS, false);
        let matched = benefits.match_for(ContentType::File, false).unwrap();

        assert!(!benefits.capabilities(&matched).can_download);
    }

    #[test]
    fn it_honours_withheld_playback_and_previews() {
        let benefits = Benefits::new()
            .with(ALL_CONTENT, true)
            .with(VIDEO_ACCESS, false)
            .with(PREVIEW_ACCESS, false);
        let matched = benefits.match_for(ContentType::Course, true).unwrap();

        assert_eq!(
            benefits.capabilities(&matched),
            Capabilities {
                can_download: true,
                can_preview: false,
                can_play: false,
            }
        );

        let benefits = Benefits::new()
            .with("course_access", true)
            .with(PLAY_ACCESS, 0u64);
        let matched = benefits.match_for(ContentType::Course, true).unwrap();
        let capabilities = benefits.capabilities(&matched);

        assert!(!capabilities.can_play);
        assert!(capabilities.can_preview);
        assert!(capabilities.can_download);
    }

    #[test]
    fn it_reads_benefits_from_json() {
        let benefits: Benefits =
            serde_json::from_str(r#"{"all_content": true, "file_access": 5}"#).unwrap();

        assert_eq!(benefits.get(ALL_CONTENT), Some(&Benefit::Flag(true)));
        assert_eq!(benefits.get("file_access"), Some(&Benefit::Limit(5)));
    }

    #[test]
    fn it_selects_the_latest_current_subscription() {
        let subject = SubjectId::from("u1");
        let grants = vec![
            SubscriptionGrant::new("u1", day(1), Benefits::new()).with_plan("basic"),
            SubscriptionGrant::new("u1", day(5), Benefits::new())
                .with_plan("cancelled")
                .inactive(),
            SubscriptionGrant::new("u1", day(3), Benefits::new())
                .with_plan("pro")
                .ending(day(20)),
            SubscriptionGrant::new("u2", day(4), Benefits::new()).with_plan("other"),
            SubscriptionGrant::new("u1", day(25), Benefits::new()).with_plan("future"),
        ];

        let current = SubscriptionGrant::select_current(&grants, &subject, day(10)).unwrap();
        assert_eq!(current.plan.as_deref(), Some("pro"));

        let current =
            SubscriptionGrant::select_current(&grants, &subject, day(20) + Duration::seconds(1))
                .unwrap();
        assert_eq!(current.plan.as_deref(), Some("basic"));
    }
}

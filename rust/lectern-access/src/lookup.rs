//! Collaborator interfaces supplied by the host application.
//!
//! The resolver reads everything it needs through these traits. Hosts back
//! them with their database, cache or remote services; [`MemoryCatalog`]
//! backs them with in-process maps.
//!
//! [`MemoryCatalog`]: crate::MemoryCatalog

use crate::{ContentRef, Purchasable, PurchasableId, PurchaseRecord, SubjectId, SubscriptionGrant};
use async_trait::async_trait;
use lectern_common::Timestamp;
use serde::Serialize;
use std::{fmt, time::Duration};

/// A collaborator could not answer.
///
/// "Not found" is never an error: lookups answer it with `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// The backing service is unreachable.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The backing service answered with an error.
    #[error("Backend error: {0}")]
    Backend(String),

    /// The backing service did not answer in time.
    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Names the collaborator a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookup {
    /// [`ContentLookup`]
    Content,
    /// [`PurchaseLookup`]
    Purchase,
    /// [`SubscriptionLookup`]
    Subscription,
    /// [`VideoIndex`]
    Video,
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lookup::Content => "content",
            Lookup::Purchase => "purchase",
            Lookup::Subscription => "subscription",
            Lookup::Video => "video",
        })
    }
}

/// Resolves caller-side references to canonical purchasables.
#[async_trait]
pub trait ContentLookup: Send + Sync {
    /// The purchasable `content` refers to, if any.
    async fn find_purchasable(&self, content: &ContentRef)
    -> Result<Option<Purchasable>, LookupError>;
}

/// Reads purchase history.
#[async_trait]
pub trait PurchaseLookup: Send + Sync {
    /// The most recent purchase of `purchasable` by `subject` whose payment
    /// completed.
    async fn find_latest_completed(
        &self,
        subject: &SubjectId,
        purchasable: &PurchasableId,
    ) -> Result<Option<PurchaseRecord>, LookupError>;
}

/// Reads subscriptions.
#[async_trait]
pub trait SubscriptionLookup: Send + Sync {
    /// The subscription that is current for `subject` at `now`: active,
    /// valid at `now`, and the most recently started among those.
    async fn find_current(
        &self,
        subject: &SubjectId,
        now: Timestamp,
    ) -> Result<Option<SubscriptionGrant>, LookupError>;
}

/// Explicit index from video identifiers to the content that owns them.
#[async_trait]
pub trait VideoIndex: Send + Sync {
    /// The content `video_id` belongs to, if it is indexed.
    async fn find_content(&self, video_id: &str) -> Result<Option<ContentRef>, LookupError>;
}

/// Decides whether a subject created a purchasable.
pub trait CreatorCheck: Send + Sync {
    /// Whether `subject` created `purchasable`.
    fn is_creator(&self, subject: &SubjectId, purchasable: &Purchasable) -> bool;
}

/// [`CreatorCheck`] against the creator recorded on the purchasable.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreatorOfRecord;

impl CreatorCheck for CreatorOfRecord {
    fn is_creator(&self, subject: &SubjectId, purchasable: &Purchasable) -> bool {
        &purchasable.creator_id == subject
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContentType;

    #[test]
    fn it_matches_the_recorded_creator() {
        let course = Purchasable::new("p1", "u1", ContentType::Course);

        assert!(CreatorOfRecord.is_creator(&"u1".into(), &course));
        assert!(!CreatorOfRecord.is_creator(&"u2".into(), &course));
    }
}

//! In-memory collaborators.

use crate::{
    ContentLookup, ContentRef, Lookup, LookupError, Purchasable, PurchasableId, PurchaseLookup,
    PurchaseRecord, SubjectId, SubscriptionGrant, SubscriptionLookup, VideoIndex,
};
use async_trait::async_trait;
use lectern_common::Timestamp;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

#[derive(Debug, Default)]
struct CatalogState {
    purchasables: HashMap<ContentRef, Purchasable>,
    purchases: Vec<PurchaseRecord>,
    subscriptions: Vec<SubscriptionGrant>,
    videos: HashMap<String, ContentRef>,
    failures: HashMap<Lookup, LookupError>,
    calls: HashMap<Lookup, usize>,
    latency: Option<Duration>,
}

/// A catalogue of content, purchases, subscriptions and videos held in
/// memory.
///
/// Implements every lookup trait, so one catalogue can back a whole
/// [`AccessResolver`](crate::AccessResolver). Clones share state. Individual
/// lookups can be made to fail with [`MemoryCatalog::fail`], or slowed down
/// with [`MemoryCatalog::set_latency`], which requires a tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog(Arc<Mutex<CatalogState>>);

impl MemoryCatalog {
    /// An empty catalogue.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, CatalogState>, LookupError> {
        self.0
            .lock()
            .map_err(|_| LookupError::Backend("memory catalog poisoned".into()))
    }

    fn state_mut(&self) -> MutexGuard<'_, CatalogState> {
        match self.0.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register `purchasable` under `content`.
    pub fn insert_purchasable(&self, content: ContentRef, purchasable: Purchasable) {
        self.state_mut().purchasables.insert(content, purchasable);
    }

    /// Record a purchase.
    pub fn insert_purchase(&self, purchase: PurchaseRecord) {
        self.state_mut().purchases.push(purchase);
    }

    /// Record a subscription.
    pub fn insert_subscription(&self, subscription: SubscriptionGrant) {
        self.state_mut().subscriptions.push(subscription);
    }

    /// Index `video_id` as belonging to `content`.
    pub fn index_video(&self, video_id: impl Into<String>, content: ContentRef) {
        self.state_mut().videos.insert(video_id.into(), content);
    }

    /// Make every call to `lookup` fail with `error` until
    /// [`MemoryCatalog::recover`] is called.
    pub fn fail(&self, lookup: Lookup, error: LookupError) {
        self.state_mut().failures.insert(lookup, error);
    }

    /// Stop failing calls to `lookup`.
    pub fn recover(&self, lookup: Lookup) {
        self.state_mut().failures.remove(&lookup);
    }

    /// Delay every lookup by `latency`.
    ///
    /// The delay is a [`tokio::time::sleep`], so once a latency is set the
    /// catalogue must be polled inside a tokio runtime with the timer
    /// enabled. Without a latency no lookup touches the runtime.
    pub fn set_latency(&self, latency: Duration) {
        self.state_mut().latency = Some(latency);
    }

    /// How many times `lookup` has been called.
    pub fn calls(&self, lookup: Lookup) -> usize {
        self.state_mut().calls.get(&lookup).copied().unwrap_or(0)
    }

    async fn enter(&self, lookup: Lookup) -> Result<(), LookupError> {
        let latency = {
            let mut state = self.state()?;
            *state.calls.entry(lookup).or_default() += 1;
            if let Some(error) = state.failures.get(&lookup) {
                return Err(error.clone());
            }
            state.latency
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(())
    }
}

#[async_trait]
impl ContentLookup for MemoryCatalog {
    async fn find_purchasable(
        &self,
        content: &ContentRef,
    ) -> Result<Option<Purchasable>, LookupError> {
        self.enter(Lookup::Content).await?;
        Ok(self.state()?.purchasables.get(content).cloned())
    }
}

#[async_trait]
impl PurchaseLookup for MemoryCatalog {
    async fn find_latest_completed(
        &self,
        subject: &SubjectId,
        purchasable: &PurchasableId,
    ) -> Result<Option<PurchaseRecord>, LookupError> {
        self.enter(Lookup::Purchase).await?;
        Ok(self
            .state()?
            .purchases
            .iter()
            .filter(|purchase| {
                &purchase.subject_id == subject
                    && &purchase.purchasable_id == purchasable
                    && purchase.is_completed()
            })
            .max_by_key(|purchase| purchase.created_at)
            .cloned())
    }
}

#[async_trait]
impl SubscriptionLookup for MemoryCatalog {
    async fn find_current(
        &self,
        subject: &SubjectId,
        now: Timestamp,
    ) -> Result<Option<SubscriptionGrant>, LookupError> {
        self.enter(Lookup::Subscription).await?;
        let state = self.state()?;
        Ok(SubscriptionGrant::select_current(&state.subscriptions, subject, now).cloned())
    }
}

#[async_trait]
impl VideoIndex for MemoryCatalog {
    async fn find_content(&self, video_id: &str) -> Result<Option<ContentRef>, LookupError> {
        self.enter(Lookup::Video).await?;
        Ok(self.state()?.videos.get(video_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Benefits, ContentType, PaymentStatus};
    use chrono::{Duration, TimeZone, Utc};
    use testresult::TestResult;

    fn day(day: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2025, 6, day, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn it_returns_the_latest_completed_purchase() -> TestResult {
        let catalog = MemoryCatalog::new();
        catalog.insert_purchase(PurchaseRecord::completed("u1", "p1", day(1)).for_days(7));
        catalog.insert_purchase(PurchaseRecord::completed("u1", "p1", day(3)).lifetime());
        catalog.insert_purchase(
            PurchaseRecord::completed("u1", "p1", day(5)).with_status(PaymentStatus::Failed),
        );
        catalog.insert_purchase(PurchaseRecord::completed("u2", "p1", day(6)));

        let latest = catalog
            .find_latest_completed(&"u1".into(), &"p1".into())
            .await?
            .ok_or("expected a purchase")?;

        assert_eq!(latest.created_at, day(3));
        assert!(latest.lifetime_access);
        assert!(
            catalog
                .find_latest_completed(&"u1".into(), &"p2".into())
                .await?
                .is_none()
        );
        Ok(())
    }

    #[tokio::test]
    async fn it_returns_the_current_subscription() -> TestResult {
        let catalog = MemoryCatalog::new();
        catalog.insert_subscription(
            SubscriptionGrant::new("u1", day(1), Benefits::new()).ending(day(10)),
        );

        assert!(catalog.find_current(&"u1".into(), day(10)).await?.is_some());
        assert!(
            catalog
                .find_current(&"u1".into(), day(10) + Duration::seconds(1))
                .await?
                .is_none()
        );
        Ok(())
    }

    #[test]
    fn it_answers_outside_a_runtime_without_latency() -> TestResult {
        let catalog = MemoryCatalog::new();
        let content = ContentRef::new(ContentType::Course, "c1");
        catalog.insert_purchasable(
            content.clone(),
            Purchasable::new("p1", "u9", ContentType::Course),
        );

        let found = futures::executor::block_on(catalog.find_purchasable(&content))?;

        assert_eq!(found.map(|purchasable| purchasable.id), Some("p1".into()));
        Ok(())
    }

    #[tokio::test]
    async fn it_fails_and_recovers_on_demand() -> TestResult {
        let catalog = MemoryCatalog::new();
        let content = ContentRef::new(ContentType::File, "f1");
        catalog.insert_purchasable(
            content.clone(),
            Purchasable::new("p1", "u9", ContentType::File),
        );
        catalog.fail(Lookup::Content, LookupError::Unavailable("down".into()));

        assert_eq!(
            catalog.find_purchasable(&content).await,
            Err(LookupError::Unavailable("down".into()))
        );

        catalog.recover(Lookup::Content);
        assert!(catalog.find_purchasable(&content).await?.is_some());
        assert_eq!(catalog.calls(Lookup::Content), 2);
        Ok(())
    }
}

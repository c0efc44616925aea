//! Access resolution.
//!
//! For a subject and a content reference, the resolver consults the access
//! channels in priority order and stops at the first one that grants:
//!
//! 1. Resolve the reference to a canonical [`Purchasable`]. References that
//!    resolve to nothing are [`AccessError::NotClaimable`].
//! 2. The content's creator always has full access.
//! 3. The most recent completed purchase grants access for as long as its
//!    terms cover `now`. An expired purchase grants nothing but does not
//!    stop the evaluation.
//! 4. The subject's current subscription grants access when its plan
//!    benefits cover the content type.
//! 5. Otherwise access is denied with [`Reason::NoGrantFound`].
//!
//! A collaborator failure at any step aborts the resolution with an error;
//! it is never reported as a denial.

use crate::{
    AccessDecision, AccessError, AccessRecord, ContentLookup, ContentRef, ContentType,
    CreatorCheck, CreatorOfRecord, DecisionSink, FetchStrategy, LegacyPurchasePolicy, Lookup,
    LookupError, Purchasable, PurchaseLookup, PurchaseRecord, PurchaseTerm, Reason,
    ResolverConfig, Subject, SubjectId, SubscriptionGrant, SubscriptionLookup, VideoIndex,
};
use lectern_common::{Clock, SystemClock, Timestamp};
use std::{fmt, future::Future, sync::Arc};
use tracing::{debug, warn};

/// Resolves a subject's access to purchasable content.
///
/// Construct one at start-up and share it: the resolver holds no mutable
/// state, and clones share their collaborators.
#[derive(Clone)]
pub struct AccessResolver {
    content: Arc<dyn ContentLookup>,
    purchases: Arc<dyn PurchaseLookup>,
    subscriptions: Arc<dyn SubscriptionLookup>,
    videos: Option<Arc<dyn VideoIndex>>,
    creators: Arc<dyn CreatorCheck>,
    clock: Arc<dyn Clock>,
    sink: Option<Arc<dyn DecisionSink>>,
    config: ResolverConfig,
}

impl fmt::Debug for AccessResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessResolver")
            .field("config", &self.config)
            .field("videos", &self.videos.is_some())
            .field("sink", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

impl AccessResolver {
    /// Create a resolver over the given collaborators, with the system
    /// clock, creator-of-record checks, default configuration, no video
    /// index and no sink.
    pub fn new(
        content: impl ContentLookup + 'static,
        purchases: impl PurchaseLookup + 'static,
        subscriptions: impl SubscriptionLookup + 'static,
    ) -> Self {
        Self {
            content: Arc::new(content),
            purchases: Arc::new(purchases),
            subscriptions: Arc::new(subscriptions),
            videos: None,
            creators: Arc::new(CreatorOfRecord),
            clock: Arc::new(SystemClock),
            sink: None,
            config: ResolverConfig::default(),
        }
    }

    /// Use `clock` for [`AccessResolver::resolve_now`].
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the creator check.
    pub fn with_creator_check(mut self, creators: impl CreatorCheck + 'static) -> Self {
        self.creators = Arc::new(creators);
        self
    }

    /// Hand every decision to `sink`.
    pub fn with_sink(mut self, sink: impl DecisionSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Enable [`AccessResolver::resolve_video`] through `videos`.
    pub fn with_video_index(mut self, videos: impl VideoIndex + 'static) -> Self {
        self.videos = Some(Arc::new(videos));
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve `subject`'s access to the content of type `content_type`
    /// identified by `content_id`, as of `now`.
    pub async fn resolve(
        &self,
        subject: &SubjectId,
        content_type: ContentType,
        content_id: &str,
        now: Timestamp,
    ) -> Result<AccessDecision, AccessError> {
        self.resolve_ref(subject, &ContentRef::new(content_type, content_id), now)
            .await
    }

    /// [`AccessResolver::resolve`] as of the resolver's clock.
    pub async fn resolve_now(
        &self,
        subject: &SubjectId,
        content_type: ContentType,
        content_id: &str,
    ) -> Result<AccessDecision, AccessError> {
        let now = self.clock.now();
        self.resolve(subject, content_type, content_id, now).await
    }

    /// [`AccessResolver::resolve`] for a full [`Subject`].
    pub async fn resolve_subject(
        &self,
        subject: &Subject,
        content_type: ContentType,
        content_id: &str,
        now: Timestamp,
    ) -> Result<AccessDecision, AccessError> {
        self.resolve(&subject.id, content_type, content_id, now)
            .await
    }

    /// Resolve `subject`'s access to `content` as of `now`.
    #[tracing::instrument(level = "debug", skip_all, fields(subject = %subject, content = %content))]
    pub async fn resolve_ref(
        &self,
        subject: &SubjectId,
        content: &ContentRef,
        now: Timestamp,
    ) -> Result<AccessDecision, AccessError> {
        let decision = self.within_deadline(self.evaluate(subject, content, now)).await?;
        self.publish(subject, content, now, &decision).await;
        Ok(decision)
    }

    /// Resolve `subject`'s access to the content owning `video_id`.
    ///
    /// Videos are located through the configured [`VideoIndex`]; an id the
    /// index does not know is not claimable.
    #[tracing::instrument(level = "debug", skip_all, fields(subject = %subject, video = video_id))]
    pub async fn resolve_video(
        &self,
        subject: &SubjectId,
        video_id: &str,
        now: Timestamp,
    ) -> Result<AccessDecision, AccessError> {
        let videos = self.videos.as_ref().ok_or(AccessError::VideoIndexMissing)?;

        let (content, decision) = self
            .within_deadline(async {
                let content = videos
                    .find_content(video_id)
                    .await
                    .map_err(|error| failed(Lookup::Video, error))?
                    .ok_or_else(|| AccessError::NotClaimable {
                        reference: format!("video:{video_id}"),
                    })?;
                let decision = self.evaluate(subject, &content, now).await?;
                Ok::<_, AccessError>((content, decision))
            })
            .await?;

        self.publish(subject, &content, now, &decision).await;
        Ok(decision)
    }

    /// Resolve a page of references in order.
    ///
    /// Unclaimable references yield an error in their own slot so that one
    /// stale entry does not hide the rest. Any collaborator failure aborts
    /// the whole page.
    pub async fn resolve_many(
        &self,
        subject: &SubjectId,
        contents: &[ContentRef],
        now: Timestamp,
    ) -> Result<Vec<Result<AccessDecision, AccessError>>, AccessError> {
        let mut decisions = Vec::with_capacity(contents.len());
        for content in contents {
            match self.resolve_ref(subject, content, now).await {
                Err(error) if error.is_not_claimable() => decisions.push(Err(error)),
                outcome => decisions.push(Ok(outcome?)),
            }
        }
        Ok(decisions)
    }

    async fn within_deadline<T>(
        &self,
        work: impl Future<Output = Result<T, AccessError>>,
    ) -> Result<T, AccessError> {
        match self.config.timeout {
            None => work.await,
            Some(limit) => tokio::time::timeout(limit, work).await.map_err(|_| {
                warn!(?limit, "Access resolution timed out");
                AccessError::TimedOut(limit)
            })?,
        }
    }

    async fn evaluate(
        &self,
        subject: &SubjectId,
        content: &ContentRef,
        now: Timestamp,
    ) -> Result<AccessDecision, AccessError> {
        let purchasable = self
            .content
            .find_purchasable(content)
            .await
            .map_err(|error| failed(Lookup::Content, error))?
            .ok_or_else(|| AccessError::not_claimable(content))?;

        if self.creators.is_creator(subject, &purchasable) {
            debug!(purchasable = %purchasable.id, "Granting creator access");
            return Ok(AccessDecision::creator());
        }

        match self.config.fetch {
            FetchStrategy::Sequential => {
                let purchase = self.latest_purchase(subject, &purchasable).await?;
                if let Some(decision) = self.purchase_grant(purchase.as_ref(), now) {
                    return Ok(decision);
                }

                let subscription = self.current_subscription(subject, now).await?;
                Ok(self.subscription_grant(&purchasable, subscription.as_ref(), now))
            }
            FetchStrategy::Prefetch => {
                let (purchase, subscription) = futures::join!(
                    self.latest_purchase(subject, &purchasable),
                    self.current_subscription(subject, now),
                );
                if let Some(decision) = self.purchase_grant(purchase?.as_ref(), now) {
                    return Ok(decision);
                }

                // A subscription failure only surfaces once no purchase grants.
                Ok(self.subscription_grant(&purchasable, subscription?.as_ref(), now))
            }
        }
    }

    async fn latest_purchase(
        &self,
        subject: &SubjectId,
        purchasable: &Purchasable,
    ) -> Result<Option<PurchaseRecord>, AccessError> {
        self.purchases
            .find_latest_completed(subject, &purchasable.id)
            .await
            .map_err(|error| failed(Lookup::Purchase, error))
    }

    async fn current_subscription(
        &self,
        subject: &SubjectId,
        now: Timestamp,
    ) -> Result<Option<SubscriptionGrant>, AccessError> {
        self.subscriptions
            .find_current(subject, now)
            .await
            .map_err(|error| failed(Lookup::Subscription, error))
    }

    fn purchase_grant(
        &self,
        purchase: Option<&PurchaseRecord>,
        now: Timestamp,
    ) -> Option<AccessDecision> {
        let purchase = purchase?;
        if !purchase.is_completed() {
            debug!(status = ?purchase.status, "Ignoring purchase without completed payment");
            return None;
        }

        let term = purchase.term();
        if term == PurchaseTerm::Indefinite
            && self.config.legacy_purchases == LegacyPurchasePolicy::Deny
        {
            debug!(created_at = %purchase.created_at, "Ignoring purchase without access terms");
            return None;
        }

        if term.covers(now) {
            let decision = AccessDecision::purchase(&term);
            debug!(access_type = ?decision.access_type, "Granting purchase access");
            Some(decision)
        } else {
            debug!(expires_at = ?term.expires_at(), "Purchase has expired");
            None
        }
    }

    fn subscription_grant(
        &self,
        purchasable: &Purchasable,
        subscription: Option<&SubscriptionGrant>,
        now: Timestamp,
    ) -> AccessDecision {
        let Some(grant) = subscription else {
            debug!("No current subscription");
            return AccessDecision::denied(Reason::NoGrantFound);
        };

        if !grant.is_current(now) {
            debug!(window = %grant.window(), "Ignoring subscription that is not current");
            return AccessDecision::denied(Reason::NoGrantFound);
        }

        let video_bearing = self.config.is_video_bearing(purchasable.content_type);
        match grant
            .benefits
            .match_for(purchasable.content_type, video_bearing)
        {
            Some(matched) => {
                debug!(plan = ?grant.plan, benefit = %matched.key, "Granting subscription access");
                AccessDecision::subscription(grant, &matched)
            }
            None => {
                debug!(
                    plan = ?grant.plan,
                    content_type = %purchasable.content_type,
                    "Subscription plan does not cover content"
                );
                AccessDecision::denied(Reason::NoGrantFound)
            }
        }
    }

    async fn publish(
        &self,
        subject: &SubjectId,
        content: &ContentRef,
        now: Timestamp,
        decision: &AccessDecision,
    ) {
        let Some(sink) = &self.sink else {
            return;
        };

        let record = AccessRecord {
            subject_id: subject.clone(),
            content: content.clone(),
            evaluated_at: now,
            decision: decision.clone(),
        };
        if let Err(error) = sink.record(&record).await {
            warn!(%error, "Failed to record access decision");
        }
    }
}

fn failed(lookup: Lookup, error: LookupError) -> AccessError {
    warn!(%lookup, %error, "Access lookup failed");
    AccessError::collaborator(lookup, error)
}

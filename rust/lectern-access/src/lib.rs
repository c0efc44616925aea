//! Content access-control resolution.
//!
//! This crate answers one question for the lectern marketplace: may this
//! subject use this piece of content right now, through which channel, and
//! with which capabilities?
//!
//! # Overview
//!
//! The [`AccessResolver`] reads everything through collaborator traits
//! supplied by the host application:
//!
//! - [`ContentLookup`] resolves a [`ContentRef`] to its [`Purchasable`]
//! - [`PurchaseLookup`] finds the latest completed [`PurchaseRecord`]
//! - [`SubscriptionLookup`] finds the current [`SubscriptionGrant`]
//! - [`VideoIndex`] maps video ids to the content that owns them
//! - [`Clock`](lectern_common::Clock) supplies `now` when the caller does not
//! - [`DecisionSink`] receives every decision for auditing
//!
//! Channels are consulted in a fixed priority order: creator, then
//! purchase, then subscription. See [`resolver`] for the full rules.
//!
//! # Example
//!
//! ```ignore
//! use lectern_access::{AccessResolver, ContentType, MemoryCatalog};
//!
//! let catalog = MemoryCatalog::new();
//! let resolver = AccessResolver::new(catalog.clone(), catalog.clone(), catalog);
//!
//! match resolver.resolve(&"u1".into(), ContentType::Course, "c1", now).await {
//!     Ok(decision) if decision.has_access => serve(decision.capabilities),
//!     Ok(decision) => forbid(decision.reason),
//!     Err(error) => respond(error.status_code()),
//! }
//! ```

mod audit;
mod config;
mod content;
mod decision;
mod error;
mod lookup;
mod memory;
mod purchase;
pub mod resolver;
mod subject;
mod subscription;

pub use audit::{AccessRecord, DecisionSink, MemorySink, SinkError, TracingSink};
pub use config::{FetchStrategy, LegacyPurchasePolicy, ResolverConfig};
pub use content::{ContentRef, ContentType, Purchasable, PurchasableId, UnknownContentType};
pub use decision::{AccessDecision, AccessType, Allowance, Capabilities, Reason};
pub use error::{AccessError, ErrorCode};
pub use lookup::{
    ContentLookup, CreatorCheck, CreatorOfRecord, Lookup, LookupError, PurchaseLookup,
    SubscriptionLookup, VideoIndex,
};
pub use memory::MemoryCatalog;
pub use purchase::{PaymentStatus, PurchaseRecord, PurchaseTerm};
pub use resolver::AccessResolver;
pub use subject::{Subject, SubjectId, SubjectKind};
pub use subscription::{
    ALL_CONTENT, Benefit, BenefitMatch, Benefits, DOWNLOAD_ACCESS, MatchedBy, PLAY_ACCESS,
    PREVIEW_ACCESS, SubscriptionGrant, VIDEO_ACCESS,
};

//! Purchase records and the access terms they carry.

use crate::{AccessType, PurchasableId, SubjectId};
use chrono::{DateTime, Duration, Utc};
use lectern_common::{TimeWindow, Timestamp};
use serde::{Deserialize, Serialize};

/// Outcome of the payment behind a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Payment captured.
    Completed,
    /// Awaiting the payment provider.
    Pending,
    /// Payment declined or abandoned.
    Failed,
}

/// A subject's purchase of a purchasable.
///
/// Several rows may exist for the same pair (retries, renewals). Only the
/// most recent completed one is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    /// The buyer.
    pub subject_id: SubjectId,
    /// What was bought.
    pub purchasable_id: PurchasableId,
    /// Payment outcome.
    pub status: PaymentStatus,
    /// Access never expires.
    #[serde(default)]
    pub lifetime_access: bool,
    /// Absolute, inclusive end of access.
    #[serde(default)]
    pub access_until: Option<Timestamp>,
    /// Access length counted from `created_at`.
    #[serde(default)]
    pub access_days: Option<u32>,
    /// When the purchase was made.
    pub created_at: Timestamp,
}

impl PurchaseRecord {
    /// A completed purchase with no access terms set.
    pub fn completed(
        subject_id: impl Into<SubjectId>,
        purchasable_id: impl Into<PurchasableId>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            purchasable_id: purchasable_id.into(),
            status: PaymentStatus::Completed,
            lifetime_access: false,
            access_until: None,
            access_days: None,
            created_at,
        }
    }

    /// Grant lifetime access.
    pub fn lifetime(mut self) -> Self {
        self.lifetime_access = true;
        self
    }

    /// Limit access to an absolute end instant.
    pub fn until(mut self, access_until: Timestamp) -> Self {
        self.access_until = Some(access_until);
        self
    }

    /// Limit access to a number of days after purchase.
    pub fn for_days(mut self, access_days: u32) -> Self {
        self.access_days = Some(access_days);
        self
    }

    /// Override the payment status.
    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether the payment behind this purchase was captured.
    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }

    /// Classify the access terms of this purchase.
    ///
    /// Fields are consulted in precedence order: the lifetime flag, then
    /// `access_until`, then `access_days`. A record with none of them set is
    /// [`PurchaseTerm::Indefinite`].
    pub fn term(&self) -> PurchaseTerm {
        if self.lifetime_access {
            PurchaseTerm::Lifetime
        } else if let Some(until) = self.access_until {
            PurchaseTerm::Until(until)
        } else if let Some(days) = self.access_days {
            let expires = self
                .created_at
                .checked_add_signed(Duration::days(i64::from(days)))
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            PurchaseTerm::Days {
                started: self.created_at,
                days,
                expires,
            }
        } else {
            PurchaseTerm::Indefinite
        }
    }
}

/// The access terms a purchase grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseTerm {
    /// Never expires.
    Lifetime,
    /// Valid up to and including the given instant.
    Until(Timestamp),
    /// Valid for `days` days after `started`, up to and including `expires`.
    Days {
        /// When the purchase was made.
        started: Timestamp,
        /// Length of access.
        days: u32,
        /// `started + days * 24h`.
        expires: Timestamp,
    },
    /// A completed purchase with no terms recorded at all.
    ///
    /// Such rows are most likely legacy or incomplete data rather than a
    /// deliberate grant. Whether they grant access is governed by
    /// [`LegacyPurchasePolicy`](crate::LegacyPurchasePolicy).
    Indefinite,
}

impl PurchaseTerm {
    /// Instants during which these terms grant access.
    pub fn window(&self) -> TimeWindow {
        match self {
            PurchaseTerm::Lifetime | PurchaseTerm::Indefinite => TimeWindow::unbounded(),
            PurchaseTerm::Until(until) => TimeWindow::until(*until),
            PurchaseTerm::Days { expires, .. } => TimeWindow::until(*expires),
        }
    }

    /// Whether these terms grant access at `now`.
    pub fn covers(&self, now: Timestamp) -> bool {
        self.window().covers(now)
    }

    /// When access under these terms ends, if ever.
    pub fn expires_at(&self) -> Option<Timestamp> {
        self.window().expires_at()
    }

    /// The access type reported for a grant under these terms.
    pub fn access_type(&self) -> AccessType {
        match self {
            PurchaseTerm::Lifetime => AccessType::PurchaseLifetime,
            PurchaseTerm::Until(_) | PurchaseTerm::Days { .. } => AccessType::PurchaseTimeLimited,
            PurchaseTerm::Indefinite => AccessType::PurchaseIndefinite,
        }
    }
}

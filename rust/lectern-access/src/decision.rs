//! The value produced by a resolution.

use crate::{BenefitMatch, PurchaseTerm, SubscriptionGrant};
use lectern_common::Timestamp;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Channel through which access was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    /// The subject created the content.
    Creator,
    /// A purchase with lifetime access.
    PurchaseLifetime,
    /// A purchase valid until a known instant.
    PurchaseTimeLimited,
    /// A purchase with no recorded terms.
    PurchaseIndefinite,
    /// A subscription benefit.
    Subscription,
    /// No access.
    None,
}

/// Machine readable reason for a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// Granted to the content's creator.
    Creator,
    /// Granted by a lifetime purchase.
    PurchaseLifetime,
    /// Granted by a purchase that has not yet expired.
    PurchaseTimeLimited,
    /// Granted by a purchase with no recorded terms.
    PurchaseIndefinite,
    /// Granted by a subscription benefit.
    Subscription,
    /// Denied: no channel grants access.
    NoGrantFound,
    /// Denied: the reference does not resolve to purchasable content.
    NotClaimable,
}

/// What a grant allows the subject to do with the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// Fetch the (watermarked) original.
    pub can_download: bool,
    /// View a preview rendition.
    pub can_preview: bool,
    /// Stream video.
    pub can_play: bool,
}

impl Capabilities {
    /// Every capability.
    pub const fn all() -> Self {
        Self {
            can_download: true,
            can_preview: true,
            can_play: true,
        }
    }

    /// No capability.
    pub const fn none() -> Self {
        Self {
            can_download: false,
            can_preview: false,
            can_play: false,
        }
    }
}

/// How many more uses a grant allows.
///
/// Serialised as the string `"unlimited"` or a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allowance {
    /// No consumption limit.
    Unlimited,
    /// A fixed number of remaining uses.
    Limited(u64),
}

impl Serialize for Allowance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Allowance::Unlimited => serializer.serialize_str("unlimited"),
            Allowance::Limited(remaining) => serializer.serialize_u64(*remaining),
        }
    }
}

impl<'de> Deserialize<'de> for Allowance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Remaining(u64),
            Word(String),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Remaining(remaining) => Ok(Allowance::Limited(remaining)),
            Wire::Word(word) if word == "unlimited" => Ok(Allowance::Unlimited),
            Wire::Word(word) => Err(serde::de::Error::custom(format!(
                "expected \"unlimited\" or a number, found \"{word}\""
            ))),
        }
    }
}

/// Outcome of resolving a subject's access to a piece of content.
///
/// Created fresh by every resolution and never mutated afterwards. A denial
/// is an ordinary decision with `has_access` unset, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDecision {
    /// Whether access is granted.
    pub has_access: bool,
    /// Channel of the grant.
    pub access_type: AccessType,
    /// Why the decision came out this way.
    pub reason: Reason,
    /// When the grant lapses; `None` when it does not or nothing was granted.
    pub expires_at: Option<Timestamp>,
    /// What the subject may do.
    pub capabilities: Capabilities,
    /// Remaining uses under this grant.
    pub remaining_allowances: Allowance,
}

impl AccessDecision {
    /// Full, unlimited access for the content's creator.
    pub fn creator() -> Self {
        Self {
            has_access: true,
            access_type: AccessType::Creator,
            reason: Reason::Creator,
            expires_at: None,
            capabilities: Capabilities::all(),
            remaining_allowances: Allowance::Unlimited,
        }
    }

    /// Full access under the terms of a valid purchase.
    pub fn purchase(term: &PurchaseTerm) -> Self {
        let access_type = term.access_type();
        let reason = match access_type {
            AccessType::PurchaseLifetime => Reason::PurchaseLifetime,
            AccessType::PurchaseIndefinite => Reason::PurchaseIndefinite,
            _ => Reason::PurchaseTimeLimited,
        };

        Self {
            has_access: true,
            access_type,
            reason,
            expires_at: term.expires_at(),
            capabilities: Capabilities::all(),
            remaining_allowances: Allowance::Unlimited,
        }
    }

    /// Access through a subscription benefit.
    pub fn subscription(grant: &SubscriptionGrant, matched: &BenefitMatch) -> Self {
        Self {
            has_access: true,
            access_type: AccessType::Subscription,
            reason: Reason::Subscription,
            expires_at: grant.ends_at,
            capabilities: grant.benefits.capabilities(matched),
            remaining_allowances: matched.benefit.allowance(),
        }
    }

    /// No access, for the given reason.
    pub fn denied(reason: Reason) -> Self {
        Self {
            has_access: false,
            access_type: AccessType::None,
            reason,
            expires_at: None,
            capabilities: Capabilities::none(),
            remaining_allowances: Allowance::Limited(0),
        }
    }

    /// Denial for callers that fold [`AccessError::NotClaimable`]
    /// into a decision.
    ///
    /// [`AccessError::NotClaimable`]: crate::AccessError::NotClaimable
    pub fn not_claimable() -> Self {
        Self::denied(Reason::NotClaimable)
    }

    /// HTTP-style status a caller would answer with: 200 when granted, 404
    /// for content that is not claimable, 403 otherwise.
    pub fn status_code(&self) -> u16 {
        match (self.has_access, self.reason) {
            (true, _) => 200,
            (false, Reason::NotClaimable) => 404,
            (false, _) => 403,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn it_serialises_creator_decisions() {
        let decision = serde_json::to_value(AccessDecision::creator()).unwrap();

        assert_eq!(
            decision,
            json!({
                "hasAccess": true,
                "accessType": "creator",
                "reason": "creator",
                "expiresAt": null,
                "capabilities": {
                    "canDownload": true,
                    "canPreview": true,
                    "canPlay": true,
                },
                "remainingAllowances": "unlimited",
            })
        );
    }

    #[test]
    fn it_reads_both_allowance_shapes() {
        let unlimited: Allowance = serde_json::from_value(json!("unlimited")).unwrap();
        let limited: Allowance = serde_json::from_value(json!(4)).unwrap();

        assert_eq!(unlimited, Allowance::Unlimited);
        assert_eq!(limited, Allowance::Limited(4));
        assert!(serde_json::from_value::<Allowance>(json!("plenty")).is_err());
    }

    #[test]
    fn it_maps_decisions_to_status_codes() {
        assert_eq!(AccessDecision::creator().status_code(), 200);
        assert_eq!(AccessDecision::denied(Reason::NoGrantFound).status_code(), 403);
        assert_eq!(AccessDecision::not_claimable().status_code(), 404);
    }
}

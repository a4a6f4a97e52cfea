//! Account-tier limits on stored offers and per-offer edits

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountTier {
    #[default]
    Free,
    Professional,
    Agency,
}

impl AccountTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountTier::Free => "free",
            AccountTier::Professional => "professional",
            AccountTier::Agency => "agency",
        }
    }

    pub fn limits(&self) -> TierLimits {
        match self {
            AccountTier::Free => TierLimits {
                max_offers: Some(1),
                max_edits_per_offer: Some(5),
            },
            AccountTier::Professional => TierLimits {
                max_offers: Some(4),
                max_edits_per_offer: Some(15),
            },
            AccountTier::Agency => TierLimits {
                max_offers: None,
                max_edits_per_offer: None,
            },
        }
    }

    /// Whether one more offer may be created given `current` stored offers.
    pub fn check_create(&self, current: u32) -> Result<(), QuotaError> {
        match self.limits().max_offers {
            Some(limit) if current >= limit => Err(QuotaError::LimitReached {
                tier: *self,
                kind: QuotaKind::Offers,
                limit,
            }),
            _ => Ok(()),
        }
    }

    /// Whether an offer already edited `edits` times may be edited again.
    pub fn check_edit(&self, edits: u32) -> Result<(), QuotaError> {
        match self.limits().max_edits_per_offer {
            Some(limit) if edits >= limit => Err(QuotaError::LimitReached {
                tier: *self,
                kind: QuotaKind::Edits,
                limit,
            }),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for AccountTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierLimits {
    pub max_offers: Option<u32>,
    pub max_edits_per_offer: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaKind {
    Offers,
    Edits,
}

impl fmt::Display for QuotaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaKind::Offers => f.write_str("offer"),
            QuotaKind::Edits => f.write_str("edit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuotaError {
    #[error("{tier} plan {kind} limit of {limit} reached")]
    LimitReached {
        tier: AccountTier,
        kind: QuotaKind,
        limit: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_tier_allows_one_offer() {
        assert!(AccountTier::Free.check_create(0).is_ok());
        let err = AccountTier::Free.check_create(1).unwrap_err();
        assert_eq!(err.to_string(), "free plan offer limit of 1 reached");
    }

    #[test]
    fn professional_edit_limit() {
        assert!(AccountTier::Professional.check_edit(14).is_ok());
        assert!(matches!(
            AccountTier::Professional.check_edit(15),
            Err(QuotaError::LimitReached {
                kind: QuotaKind::Edits,
                limit: 15,
                ..
            })
        ));
    }

    #[test]
    fn agency_is_unlimited() {
        assert!(AccountTier::Agency.check_create(10_000).is_ok());
        assert!(AccountTier::Agency.check_edit(u32::MAX).is_ok());
        assert_eq!(AccountTier::Agency.limits().max_offers, None);
    }
}

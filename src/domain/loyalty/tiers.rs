//! Cashback tier ladder keyed by lifetime spend.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Tier {
    pub name: String,
    /// Lifetime spend at which this tier starts (inclusive).
    pub min_lifetime_spend: Decimal,
    /// Cashback rate as a fraction, e.g. `0.05` for 5%.
    pub rate: Decimal,
}

impl Tier {
    pub fn new(name: impl Into<String>, min_lifetime_spend: Decimal, rate: Decimal) -> Self {
        Self { name: name.into(), min_lifetime_spend, rate }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TierError {
    #[error("Tier table is empty")]
    Empty,
    #[error("First tier must start at zero lifetime spend")]
    MissingBaseTier,
    #[error("Tier thresholds must be strictly increasing (at '{0}')")]
    ThresholdsNotIncreasing(String),
    #[error("Tier rates must be non-decreasing (at '{0}')")]
    RateDecreases(String),
    #[error("Tier rate must be between 0 and 1 (at '{0}')")]
    RateOutOfRange(String),
}

/// Where a customer sits on the ladder and how far the next tier is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TierProgress {
    pub lifetime_spend: Decimal,
    pub current: Tier,
    pub next: Option<Tier>,
    pub remaining_to_next: Option<Decimal>,
}

/// Validated, ordered tier ladder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TierTable {
    tiers: Vec<Tier>,
}

impl TierTable {
    pub fn new(tiers: Vec<Tier>) -> Result<Self, TierError> {
        let first = tiers.first().ok_or(TierError::Empty)?;
        if first.min_lifetime_spend != Decimal::ZERO { return Err(TierError::MissingBaseTier); }
        for tier in &tiers {
            if tier.rate < Decimal::ZERO || tier.rate > Decimal::ONE {
                return Err(TierError::RateOutOfRange(tier.name.clone()));
            }
        }
        for pair in tiers.windows(2) {
            let (lower, upper) = (&pair[0], &pair[1]);
            if upper.min_lifetime_spend <= lower.min_lifetime_spend {
                return Err(TierError::ThresholdsNotIncreasing(upper.name.clone()));
            }
            if upper.rate < lower.rate {
                return Err(TierError::RateDecreases(upper.name.clone()));
            }
        }
        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[Tier] { &self.tiers }

    /// Highest tier whose threshold does not exceed `lifetime_spend`.
    /// Reaching a threshold exactly selects that tier.
    pub fn tier_for(&self, lifetime_spend: Decimal) -> &Tier {
        let idx = self.tiers.iter().rposition(|t| lifetime_spend >= t.min_lifetime_spend).unwrap_or(0);
        &self.tiers[idx]
    }

    pub fn rate_for(&self, lifetime_spend: Decimal) -> Decimal { self.tier_for(lifetime_spend).rate }

    /// Top-tier rate; no order can earn more than this share of its subtotal.
    pub fn max_rate(&self) -> Decimal { self.tiers.last().map(|t| t.rate).unwrap_or(Decimal::ZERO) }

    /// Smallest threshold strictly above `value`, if any.
    pub fn next_threshold_above(&self, value: Decimal) -> Option<Decimal> {
        self.tiers.iter().map(|t| t.min_lifetime_spend).find(|m| *m > value)
    }

    pub fn progress(&self, lifetime_spend: Decimal) -> TierProgress {
        let current = self.tier_for(lifetime_spend).clone();
        let next = self.tiers.iter().find(|t| t.min_lifetime_spend > lifetime_spend).cloned();
        let remaining_to_next = next.as_ref().map(|t| t.min_lifetime_spend - lifetime_spend);
        TierProgress { lifetime_spend, current, next, remaining_to_next }
    }
}

impl Default for TierTable {
    /// 3% from zero, 5% from 50 000, 7% from 100 000, 10% from 200 000.
    fn default() -> Self {
        Self {
            tiers: vec![
                Tier::new("Base", Decimal::ZERO, Decimal::new(3, 2)),
                Tier::new("Silver", Decimal::new(50_000, 0), Decimal::new(5, 2)),
                Tier::new("Gold", Decimal::new(100_000, 0), Decimal::new(7, 2)),
                Tier::new("Platinum", Decimal::new(200_000, 0), Decimal::new(10, 2)),
            ],
        }
    }
}

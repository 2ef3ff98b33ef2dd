//! Progressive cashback.
//!
//! An order is credited slice by slice along the tier ladder, starting from the
//! customer's lifetime spend before the order. A 5 000 order placed at 48 000
//! lifetime spend earns 3% on the first 2 000 and 5% on the remaining 3 000.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use crate::domain::loyalty::tiers::TierTable;
use crate::domain::value_objects::Points;

/// Points earned on `eligible_subtotal` given `lifetime_before`, floored to whole points.
pub fn progressive_cashback(tiers: &TierTable, lifetime_before: Decimal, eligible_subtotal: Decimal) -> Points {
    if eligible_subtotal <= Decimal::ZERO { return Points::ZERO; }

    let mut cursor = lifetime_before.max(Decimal::ZERO);
    let mut remaining = eligible_subtotal;
    let mut earned = Decimal::ZERO;

    while remaining > Decimal::ZERO {
        let rate = tiers.rate_for(cursor);
        let slice = match tiers.next_threshold_above(cursor) {
            Some(next) => (next - cursor).min(remaining),
            None => remaining,
        };
        earned += slice * rate;
        remaining -= slice;
        cursor = cursor.checked_add(slice).unwrap_or(Decimal::MAX);
    }

    Points::saturating(earned.floor().to_i64().unwrap_or(i64::MAX))
}

//! Loyalty cashback rules
pub mod tiers;
pub mod cashback;

pub use tiers::{Tier, TierError, TierProgress, TierTable};
pub use cashback::progressive_cashback;

//! Application services wiring the domain rules to storage and notifications.
pub mod accrual;
pub mod aggregator;
pub mod dispatch;
pub mod ledger;
pub mod orders;

#[cfg(test)]
pub(crate) mod test_support;

pub use accrual::{AccrualOutcome, CashbackAccrual};
pub use aggregator::LifetimeSpendAggregator;
pub use dispatch::{DispatchHandle, DispatchReport, NotificationDispatcher};
pub use ledger::LedgerUpdater;
pub use orders::{OrderService, StatusUpdate};

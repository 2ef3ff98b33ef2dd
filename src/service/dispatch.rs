//! Notification queue.
//!
//! Status handlers enqueue jobs and return immediately. A single worker task
//! delivers them in order, retrying each one with a fixed delay. A job that
//! still fails after `max_attempts` is dead-lettered: logged at error level
//! and dropped.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::notify::{Channel, Notifier, StatusNotification};

/// Jobs waiting beyond this are dead-lettered at enqueue time.
pub const QUEUE_CAPACITY: usize = 1024;

#[derive(Clone, Debug)]
struct Job {
    channel: Channel,
    notification: StatusNotification,
}

#[derive(Clone, Debug)]
pub struct DispatchHandle {
    tx: mpsc::Sender<Job>,
}

impl DispatchHandle {
    /// Queues one job per channel. Never blocks and never fails the caller.
    pub fn enqueue(&self, channels: &[Channel], notification: &StatusNotification) {
        for &channel in channels {
            let job = Job { channel, notification: notification.clone() };
            if let Err(e) = self.tx.try_send(job) {
                error!(order_id = %notification.order_id, subject = channel.subject(), error = %e, "Notification dead-lettered: queue unavailable");
            }
        }
    }
}

/// Totals reported by the worker once every handle is dropped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: u64,
    pub dead_lettered: u64,
}

pub struct NotificationDispatcher;

impl NotificationDispatcher {
    pub fn spawn(notifier: Arc<dyn Notifier>, max_attempts: u32, retry_delay: Duration) -> (DispatchHandle, JoinHandle<DispatchReport>) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let worker = tokio::spawn(run(rx, notifier, max_attempts.max(1), retry_delay));
        (DispatchHandle { tx }, worker)
    }
}

async fn run(mut rx: mpsc::Receiver<Job>, notifier: Arc<dyn Notifier>, max_attempts: u32, retry_delay: Duration) -> DispatchReport {
    let mut report = DispatchReport::default();
    while let Some(job) = rx.recv().await {
        if deliver(notifier.as_ref(), &job, max_attempts, retry_delay).await {
            report.delivered += 1;
        } else {
            report.dead_lettered += 1;
        }
    }
    debug!(?report, "Notification worker stopped");
    report
}

async fn deliver(notifier: &dyn Notifier, job: &Job, max_attempts: u32, retry_delay: Duration) -> bool {
    let order_id = job.notification.order_id;
    let subject = job.channel.subject();
    for attempt in 1..=max_attempts {
        match notifier.send(job.channel, &job.notification).await {
            Ok(()) => {
                debug!(%order_id, subject, attempt, "Notification delivered");
                return true;
            }
            Err(e) if attempt < max_attempts => {
                warn!(%order_id, subject, attempt, error = %e, "Notification failed, retrying");
                tokio::time::sleep(retry_delay).await;
            }
            Err(e) => {
                error!(%order_id, subject, attempts = max_attempts, error = %e, payload = ?job.notification, "Notification dead-lettered");
            }
        }
    }
    false
}

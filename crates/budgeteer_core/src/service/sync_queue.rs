//! Ordered background pushes to the remote mirror.
//!
//! # Invariants
//! - One worker per queue; jobs are pushed in enqueue order.
//! - A failed push is logged and reported, never retried.
//! - `SyncStatus::is_loading` is true from enqueue until the job reports.

use crate::model::budget::BudgetState;
use crate::model::format_timestamp;
use crate::remote::RemoteStore;
use chrono::Utc;
use log::{info, warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};

/// Result of one remote push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing was pushed because no remote session is active.
    Skipped,
    /// Remote now holds the document stamped with `at`.
    Synced { at: String },
    Failed(String),
}

/// Handle for a queued push. Await it with [`PendingSync::wait`] or drop it;
/// dropping does not cancel the push.
#[derive(Debug)]
pub struct PendingSync {
    receiver: Option<oneshot::Receiver<SyncOutcome>>,
}

impl PendingSync {
    pub fn skipped() -> Self {
        Self { receiver: None }
    }

    pub fn is_scheduled(&self) -> bool {
        self.receiver.is_some()
    }

    pub async fn wait(self) -> SyncOutcome {
        match self.receiver {
            None => SyncOutcome::Skipped,
            Some(receiver) => receiver.await.unwrap_or_else(|_| {
                SyncOutcome::Failed("sync worker stopped before reporting".to_string())
            }),
        }
    }
}

/// Shared view of remote activity, readable while pushes run.
#[derive(Debug, Default)]
pub struct SyncStatus {
    in_flight: AtomicUsize,
    last_sync: Mutex<Option<String>>,
}

impl SyncStatus {
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn last_sync(&self) -> Option<String> {
        self.last_sync
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_last_sync(&self, value: Option<String>) {
        *self.last_sync.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Marks remote work as started until the returned guard drops.
    pub(crate) fn begin(&self) -> InFlight<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlight { status: self }
    }

    fn finish(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

pub(crate) struct InFlight<'a> {
    status: &'a SyncStatus,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.status.finish();
    }
}

struct SyncJob {
    state: BudgetState,
    reply: oneshot::Sender<SyncOutcome>,
}

pub struct SyncQueue {
    remote: Arc<dyn RemoteStore>,
    status: Arc<SyncStatus>,
    sender: Option<mpsc::UnboundedSender<SyncJob>>,
}

impl SyncQueue {
    pub fn new(remote: Arc<dyn RemoteStore>, status: Arc<SyncStatus>) -> Self {
        Self {
            remote,
            status,
            sender: None,
        }
    }

    /// Queues a push of `state`. Spawns the worker on first use, so this must
    /// be called from within a Tokio runtime.
    pub fn enqueue(&mut self, state: BudgetState) -> PendingSync {
        let (reply, receiver) = oneshot::channel();
        self.status.in_flight.fetch_add(1, Ordering::SeqCst);

        let remote = &self.remote;
        let status = &self.status;
        let sender = self
            .sender
            .get_or_insert_with(|| spawn_worker(Arc::clone(remote), Arc::clone(status)));

        if let Err(mpsc::error::SendError(job)) = sender.send(SyncJob { state, reply }) {
            warn!("event=sync_push module=service status=error error_code=worker_gone");
            self.sender = None;
            self.status.finish();
            let _ = job
                .reply
                .send(SyncOutcome::Failed("sync worker is not running".to_string()));
        }

        PendingSync {
            receiver: Some(receiver),
        }
    }
}

fn spawn_worker(
    remote: Arc<dyn RemoteStore>,
    status: Arc<SyncStatus>,
) -> mpsc::UnboundedSender<SyncJob> {
    let (sender, mut receiver) = mpsc::unbounded_channel::<SyncJob>();
    tokio::spawn(async move {
        while let Some(job) = receiver.recv().await {
            let outcome = push(remote.as_ref(), &job.state, &status).await;
            status.finish();
            let _ = job.reply.send(outcome);
        }
    });
    sender
}

/// Uploads `state` stamped with the current time; records the stamp on success.
pub(crate) async fn push(
    remote: &dyn RemoteStore,
    state: &BudgetState,
    status: &SyncStatus,
) -> SyncOutcome {
    let stamp = format_timestamp(Utc::now());
    let envelope = BudgetState {
        last_sync: Some(stamp.clone()),
        ..state.clone()
    };

    match remote.save(&envelope).await {
        Ok(()) => {
            status.set_last_sync(Some(stamp.clone()));
            info!(
                "event=sync_push module=service provider={} status=ok",
                remote.provider_id()
            );
            SyncOutcome::Synced { at: stamp }
        }
        Err(err) => {
            warn!(
                "event=sync_push module=service provider={} status=error error={err}",
                remote.provider_id()
            );
            SyncOutcome::Failed(err.to_string())
        }
    }
}

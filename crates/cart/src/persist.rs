//! Single-writer persistence of cart snapshots.
//!
//! One writer task per store watches the snapshot channel and writes the
//! newest version it sees. Writes never overlap, and versions that were
//! replaced before the writer got to them are skipped, so the stored cart
//! only ever moves forward.
//!
//! A failed write is retried with exponential backoff. When every attempt
//! fails the status turns [`PersistHealth::Degraded`] until a later write
//! succeeds.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, instrument, warn};

use crate::snapshot::{self, SNAPSHOT_KEY};
use crate::storage::Storage;
use crate::store::Snapshot;

/// Retry settings for the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistOptions {
    /// Attempts per version, including the first one. Values below 1 act as 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after every further failure.
    pub backoff: Duration,
}

impl Default for PersistOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

/// Health of the most recently completed write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PersistHealth {
    /// Nothing has been written yet.
    #[default]
    Idle,
    /// The last write succeeded.
    Healthy,
    /// The last write failed after all retries.
    Degraded {
        /// Error reported by the final attempt.
        error: String,
    },
}

/// Outcome of the latest write the writer finished.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PersistStatus {
    /// Cart version the write was for. Zero until the first write.
    pub version: u64,
    /// Whether that write succeeded.
    pub health: PersistHealth,
}

impl PersistStatus {
    /// Whether persistence is currently failing.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self.health, PersistHealth::Degraded { .. })
    }
}

enum WriteOutcome {
    Written,
    Superseded,
    Failed(String),
}

/// Write every new snapshot until the store is dropped.
///
/// The value already marked seen on `snapshots` counts as persisted.
#[instrument(skip_all)]
pub(crate) async fn run_writer<S: Storage>(
    storage: Arc<S>,
    mut snapshots: watch::Receiver<Snapshot>,
    status: watch::Sender<PersistStatus>,
    options: PersistOptions,
) {
    while snapshots.changed().await.is_ok() {
        let snapshot = snapshots.borrow_and_update().clone();
        let version = snapshot.version();

        match write_snapshot(storage.as_ref(), &snapshot, &snapshots, options).await {
            WriteOutcome::Written => {
                debug!(version, lines = snapshot.lines().len(), "Persisted cart");
                status.send_replace(PersistStatus {
                    version,
                    health: PersistHealth::Healthy,
                });
            }
            WriteOutcome::Superseded => {
                debug!(version, "Skipping superseded cart version");
            }
            WriteOutcome::Failed(message) => {
                error!(version, error = %message, "Giving up on cart write");
                status.send_replace(PersistStatus {
                    version,
                    health: PersistHealth::Degraded { error: message },
                });
            }
        }
    }

    debug!("Cart store dropped, writer exiting");
}

async fn write_snapshot<S: Storage>(
    storage: &S,
    snapshot: &Snapshot,
    snapshots: &watch::Receiver<Snapshot>,
    options: PersistOptions,
) -> WriteOutcome {
    let bytes = match snapshot::encode(snapshot.lines()) {
        Ok(bytes) => bytes,
        Err(e) => return WriteOutcome::Failed(e.to_string()),
    };

    let max_attempts = options.max_attempts.max(1);
    let mut delay = options.backoff;
    let mut attempt = 1;

    loop {
        match storage.set(SNAPSHOT_KEY, bytes.clone()).await {
            Ok(()) => return WriteOutcome::Written,
            Err(e) if attempt >= max_attempts => return WriteOutcome::Failed(e.to_string()),
            Err(e) => {
                warn!(
                    version = snapshot.version(),
                    attempt,
                    error = %e,
                    "Cart write failed, retrying"
                );
            }
        }

        // A newer version makes this one pointless to retry.
        if snapshots.has_changed().unwrap_or(false) {
            return WriteOutcome::Superseded;
        }
        tokio::time::sleep(delay).await;
        if snapshots.has_changed().unwrap_or(false) {
            return WriteOutcome::Superseded;
        }

        delay = delay.saturating_mul(2);
        attempt += 1;
    }
}

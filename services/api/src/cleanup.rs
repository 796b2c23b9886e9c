//! Expired album cleanup
//!
//! An hourly job flags albums whose expiry has passed and, once an album has
//! been expired for longer than the grace period, deletes its stored files
//! and its row. A failed storage delete leaves the album for the next run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use media::ObjectStorage;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::lifecycle::AlbumStore;

/// Top of every hour
pub const CLEANUP_SCHEDULE: &str = "0 0 * * * *";

/// How long an expired album is kept before it is purged
pub const GRACE_PERIOD_HOURS: i64 = 24;

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub marked_expired: u64,
    pub purged: usize,
    pub files_removed: usize,
    pub skipped: usize,
}

/// Holds the run flag; releases it on drop, including on panic or cancellation
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct CleanupScheduler {
    store: Arc<dyn AlbumStore>,
    storage: Arc<dyn ObjectStorage>,
    grace: Duration,
    running: Arc<AtomicBool>,
}

impl CleanupScheduler {
    pub fn new(store: Arc<dyn AlbumStore>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            store,
            storage,
            grace: Duration::hours(GRACE_PERIOD_HOURS),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sweep immediately; `None` when another sweep is still in progress
    pub async fn run_once(&self) -> Option<SweepReport> {
        self.sweep(Utc::now()).await
    }

    pub async fn sweep(&self, now: DateTime<Utc>) -> Option<SweepReport> {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            warn!("Cleanup is already running, skipping this tick");
            return None;
        };

        let report = self.sweep_inner(now).await;

        info!(
            "Cleanup finished: {} marked expired, {} purged, {} files removed, {} skipped",
            report.marked_expired, report.purged, report.files_removed, report.skipped
        );
        Some(report)
    }

    async fn sweep_inner(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        match self.store.mark_expired(now).await {
            Ok(marked) => report.marked_expired = marked,
            Err(e) => error!("Failed to mark expired albums: {}", e),
        }

        let candidates = match self.store.purge_candidates(now - self.grace).await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!("Failed to load albums to purge: {}", e);
                return report;
            }
        };

        for album in candidates {
            let keys = match self.store.album_storage_keys(album.id).await {
                Ok(keys) => keys,
                Err(e) => {
                    error!("Failed to load files of album {}: {}", album.id, e);
                    report.skipped += 1;
                    continue;
                }
            };

            if !keys.is_empty() {
                if let Err(e) = self.storage.delete_objects(&keys).await {
                    warn!("Failed to delete files of album {}, will retry: {:#}", album.id, e);
                    report.skipped += 1;
                    continue;
                }
            }

            match self.store.delete_album(album.id).await {
                Ok(_) => {
                    info!(
                        "Purged album {} (expired at {}, {} files)",
                        album.id,
                        album.expires_at,
                        keys.len()
                    );
                    report.purged += 1;
                    report.files_removed += keys.len();
                }
                Err(e) => {
                    error!("Failed to delete album {}: {}", album.id, e);
                    report.skipped += 1;
                }
            }
        }

        report
    }

    /// Register the hourly job and start the scheduler
    pub async fn start(self) -> Result<JobScheduler> {
        let scheduler = JobScheduler::new().await?;

        let job = Job::new_async(CLEANUP_SCHEDULE, move |_, _| {
            let cleanup = self.clone();
            Box::pin(async move {
                info!("Cleanup job executed");
                cleanup.run_once().await;
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;

        info!("Started cleanup scheduler with schedule: {}", CLEANUP_SCHEDULE);
        Ok(scheduler)
    }
}

//! ExpirySweeper: background task that drops expired confirmations and
//! uncollected flash entries.
//!
//! Lookups already ignore expired entries, so the sweeper only bounds memory.
//! A failed sweep is logged and retried on the next tick.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use super::flash::FlashTransport;
use super::store::ConfirmationStore;

pub struct ExpirySweeper {
    store: Arc<dyn ConfirmationStore>,
    flash: Arc<dyn FlashTransport>,
    interval: Duration,
}

/// Counts from a single sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub confirmations: usize,
    pub flash_entries: usize,
}

impl ExpirySweeper {
    pub fn new(
        store: Arc<dyn ConfirmationStore>,
        flash: Arc<dyn FlashTransport>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            flash,
            interval,
        }
    }

    /// Run the sweep loop. This never returns under normal operation.
    /// Spawn it as a background task via `tokio::spawn`.
    pub async fn run(&self) {
        tracing::info!("ExpirySweeper started (interval={:?})", self.interval);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.sweep_once().await;
        }
    }

    /// One pass over both stores.
    pub async fn sweep_once(&self) -> SweepReport {
        let now = Utc::now();
        let mut report = SweepReport::default();

        match self.store.purge_expired(now).await {
            Ok(n) => report.confirmations = n,
            Err(e) => tracing::error!("Confirmation sweep failed: {e}"),
        }
        match self.flash.purge_expired(now).await {
            Ok(n) => report.flash_entries = n,
            Err(e) => tracing::error!("Flash sweep failed: {e}"),
        }

        if report != SweepReport::default() {
            tracing::debug!(
                confirmations = report.confirmations,
                flash_entries = report.flash_entries,
                "Swept expired entries"
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::flash::MemoryFlashStore;
    use crate::confirm::store::MemoryConfirmationStore;
    use crate::confirm::types::{DisplayMetadata, OriginalRequest, PendingConfirmation};

    fn pending(ttl: chrono::Duration) -> PendingConfirmation {
        let now = Utc::now();
        PendingConfirmation {
            request: OriginalRequest {
                original_page_path: "/Forms/Submit".into(),
                original_handler: "Submit".into(),
                original_form_data: Default::default(),
                return_url: "/".into(),
            },
            metadata: DisplayMetadata::default(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    #[tokio::test]
    async fn sweep_once_purges_both_stores() {
        let store = Arc::new(MemoryConfirmationStore::new());
        let flash = Arc::new(MemoryFlashStore::new(chrono::Duration::seconds(-1)));

        store.put(pending(chrono::Duration::seconds(-5))).await.unwrap();
        store.put(pending(chrono::Duration::minutes(5))).await.unwrap();
        flash.put(Default::default()).await.unwrap();

        let sweeper = ExpirySweeper::new(store.clone(), flash.clone(), Duration::from_secs(60));
        let report = sweeper.sweep_once().await;

        assert_eq!(
            report,
            SweepReport {
                confirmations: 1,
                flash_entries: 1,
            }
        );
        assert_eq!(store.len().await, 1);
        assert_eq!(flash.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn run_sweeps_on_each_tick() {
        let store = Arc::new(MemoryConfirmationStore::new());
        let flash = Arc::new(MemoryFlashStore::default());
        store.put(pending(chrono::Duration::seconds(-5))).await.unwrap();

        let sweeper = ExpirySweeper::new(store.clone(), flash, Duration::from_secs(30));
        let handle = tokio::spawn(async move { sweeper.run().await });

        // First tick fires immediately
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.len().await, 0);

        handle.abort();
    }
}

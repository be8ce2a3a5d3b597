use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{ProgressUpdate, TrackingProgressUpdater};

#[derive(Debug, Default)]
struct VerificationState {
    seen_completion_signal: bool,
    n_updates: usize,
}

/// Wraps another updater and asserts the observable progress contract on
/// everything that flows through:
///
/// - a part's completed bytes never exceed its expected bytes,
/// - the percentage stays at or below 99 until the completion signal,
/// - exactly one 100 is ever reported, and nothing follows it.
///
/// Intended for tests; panics on violation.
#[derive(Debug)]
pub struct ProgressUpdaterVerificationWrapper {
    inner: Arc<dyn TrackingProgressUpdater>,
    state: Mutex<VerificationState>,
}

impl ProgressUpdaterVerificationWrapper {
    pub fn new(inner: Arc<dyn TrackingProgressUpdater>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            state: Mutex::new(VerificationState::default()),
        })
    }

    /// Asserts that the completion signal was observed.
    pub async fn assert_complete(&self) {
        let state = self.state.lock().await;
        assert!(state.seen_completion_signal, "no 100% completion signal was reported");
    }

    pub async fn n_updates(&self) -> usize {
        self.state.lock().await.n_updates
    }
}

#[async_trait::async_trait]
impl TrackingProgressUpdater for ProgressUpdaterVerificationWrapper {
    async fn register_updates(&self, update: ProgressUpdate) {
        {
            let mut state = self.state.lock().await;

            assert!(
                !state.seen_completion_signal,
                "update reported after the completion signal: {update:?}"
            );

            for part_update in &update.part_updates {
                assert!(
                    part_update.completed_bytes <= part_update.expected_bytes,
                    "part {} reported {} of {} expected bytes",
                    part_update.part_number,
                    part_update.completed_bytes,
                    part_update.expected_bytes
                );
            }

            assert!(
                update.total_bytes_completed <= update.total_bytes,
                "completed bytes {} exceed total {}",
                update.total_bytes_completed,
                update.total_bytes
            );

            if update.percent == 100 {
                state.seen_completion_signal = true;
            } else {
                assert!(update.percent <= 99, "reported percent {} out of range", update.percent);
            }

            state.n_updates += 1;
        }

        self.inner.register_updates(update).await;
    }
}

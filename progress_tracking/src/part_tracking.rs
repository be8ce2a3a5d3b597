use std::sync::Arc;

use more_asserts::debug_assert_le;
use tokio::sync::Mutex;

use crate::{PartProgressUpdate, ProgressUpdate, TrackingProgressUpdater};

/// Byte accounting for a single part.
#[derive(Debug)]
struct PartProgressEntry {
    /// Number of bytes this part is expected to carry.
    expected_bytes: u64,

    /// Bytes counted as uploaded so far.  Invariant: never exceeds
    /// `expected_bytes`.
    completed_bytes: u64,

    /// True once the part's attempt succeeded; further streaming updates for
    /// it are stale and get dropped.
    is_completed: bool,
}

#[derive(Debug, Default)]
struct PartProgressTrackerImpl {
    parts: Vec<PartProgressEntry>,

    total_bytes: u64,
    total_bytes_completed: u64,

    /// Set when the one completion signal has been emitted.
    finalized: bool,
}

impl PartProgressTrackerImpl {
    fn new(part_sizes: &[u64]) -> Self {
        let parts: Vec<PartProgressEntry> = part_sizes
            .iter()
            .map(|&expected_bytes| PartProgressEntry {
                expected_bytes,
                completed_bytes: 0,
                is_completed: false,
            })
            .collect();

        let total_bytes = part_sizes.iter().sum();

        Self {
            parts,
            total_bytes,
            total_bytes_completed: 0,
            finalized: false,
        }
    }

    /// The caller-visible percentage: floor of the byte ratio, capped at 99.
    /// 100 is reserved for the completion signal.
    fn percent(&self) -> u8 {
        if self.finalized {
            return 100;
        }
        if self.total_bytes == 0 {
            return 0;
        }

        let percent = (100 * self.total_bytes_completed) / self.total_bytes;
        percent.min(99) as u8
    }

    fn update_for_part(&self, part_index: usize) -> ProgressUpdate {
        let entry = &self.parts[part_index];

        ProgressUpdate {
            part_updates: vec![PartProgressUpdate {
                part_number: part_index as u32 + 1,
                expected_bytes: entry.expected_bytes,
                completed_bytes: entry.completed_bytes,
            }],
            total_bytes: self.total_bytes,
            total_bytes_completed: self.total_bytes_completed,
            percent: self.percent(),
        }
    }

    /// Count `byte_increment` more bytes against a part, clamped so the part
    /// never exceeds its expected size.  Returns `None` for stale updates
    /// arriving after the part already completed.
    fn register_part_progress(&mut self, part_index: usize, byte_increment: u64) -> Option<ProgressUpdate> {
        let entry = &mut self.parts[part_index];

        if entry.is_completed {
            return None;
        }

        let increment = byte_increment.min(entry.expected_bytes - entry.completed_bytes);
        entry.completed_bytes += increment;
        self.total_bytes_completed += increment;

        debug_assert_le!(self.parts[part_index].completed_bytes, self.parts[part_index].expected_bytes);
        debug_assert_le!(self.total_bytes_completed, self.total_bytes);

        Some(self.update_for_part(part_index))
    }

    /// Drop a part's counted bytes back to zero.  Called at the start of
    /// every upload attempt for that part, so a retry restarts its visible
    /// progress; the overall percentage may dip.
    fn reset_part(&mut self, part_index: usize) -> Option<ProgressUpdate> {
        let entry = &mut self.parts[part_index];

        debug_assert!(!entry.is_completed);
        if entry.is_completed {
            return None;
        }

        self.total_bytes_completed -= entry.completed_bytes;
        entry.completed_bytes = 0;

        Some(self.update_for_part(part_index))
    }

    /// Mark a part as fully uploaded, truing its counter up to the expected
    /// size regardless of what the streaming updates reported.
    fn register_part_completion(&mut self, part_index: usize) -> Option<ProgressUpdate> {
        let entry = &mut self.parts[part_index];

        debug_assert!(!entry.is_completed);
        if entry.is_completed {
            return None;
        }

        let remaining = entry.expected_bytes - entry.completed_bytes;
        entry.completed_bytes = entry.expected_bytes;
        entry.is_completed = true;
        self.total_bytes_completed += remaining;

        debug_assert_le!(self.total_bytes_completed, self.total_bytes);

        Some(self.update_for_part(part_index))
    }

    /// Emit the one forced 100% signal.  Valid only once every part has
    /// completed; a second call is ignored.
    fn register_finalization(&mut self) -> Option<ProgressUpdate> {
        debug_assert!(self.is_complete());
        debug_assert!(!self.finalized);

        if self.finalized {
            return None;
        }

        self.finalized = true;

        Some(ProgressUpdate {
            part_updates: vec![],
            total_bytes: self.total_bytes,
            total_bytes_completed: self.total_bytes_completed,
            percent: 100,
        })
    }

    fn status(&self) -> (u64, u64) {
        (self.total_bytes_completed, self.total_bytes)
    }

    fn is_complete(&self) -> bool {
        self.parts.iter().all(|p| p.is_completed)
    }
}

/// Tracks uploaded-byte counts for every part of one transfer and derives
/// the overall percentage from them.
///
/// The counters are mutated concurrently by every in-flight part, so all
/// access goes through one mutex; each public operation is an atomic
/// read-modify-write that also pushes the recomputed state to the progress
/// reporter.
pub struct PartProgressTracker {
    inner: Mutex<PartProgressTrackerImpl>,
    progress_reporter: Arc<dyn TrackingProgressUpdater>,
}

impl std::fmt::Debug for PartProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartProgressTracker").finish_non_exhaustive()
    }
}

impl PartProgressTracker {
    /// Create a tracker for parts of the given expected sizes; part i of the
    /// slice is part number i + 1.
    pub fn new(part_sizes: &[u64], progress_reporter: Arc<dyn TrackingProgressUpdater>) -> Self {
        Self {
            inner: Mutex::new(PartProgressTrackerImpl::new(part_sizes)),
            progress_reporter,
        }
    }

    pub async fn register_part_progress(&self, part_index: usize, byte_increment: u64) {
        let update = self.inner.lock().await.register_part_progress(part_index, byte_increment);

        if let Some(update) = update {
            self.progress_reporter.register_updates(update).await;
        }
    }

    /// Register streaming progress from a transport callback without
    /// awaiting.  Updates may land after the part completed; those are
    /// simply dropped.
    pub fn register_part_progress_background(self: &Arc<Self>, part_index: usize, byte_increment: u64) {
        let this = self.clone();
        tokio::spawn(async move {
            this.register_part_progress(part_index, byte_increment).await;
        });
    }

    pub async fn reset_part(&self, part_index: usize) {
        let update = self.inner.lock().await.reset_part(part_index);

        if let Some(update) = update {
            self.progress_reporter.register_updates(update).await;
        }
    }

    pub async fn register_part_completion(&self, part_index: usize) {
        let update = self.inner.lock().await.register_part_completion(part_index);

        if let Some(update) = update {
            self.progress_reporter.register_updates(update).await;
        }
    }

    pub async fn register_finalization(&self) {
        let update = self.inner.lock().await.register_finalization();

        if let Some(update) = update {
            self.progress_reporter.register_updates(update).await;
        }
    }

    /// (completed, total) byte counts.
    pub async fn status(&self) -> (u64, u64) {
        self.inner.lock().await.status()
    }

    pub async fn is_complete(&self) -> bool {
        self.inner.lock().await.is_complete()
    }

    pub async fn percent(&self) -> u8 {
        self.inner.lock().await.percent()
    }
}

mod no_op_tracker;
pub mod part_tracking;
mod progress_info;
pub mod verification_wrapper;

pub use no_op_tracker::NoOpProgressUpdater;
pub use part_tracking::PartProgressTracker;
pub use progress_info::{PartProgressUpdate, ProgressUpdate};
pub use verification_wrapper::ProgressUpdaterVerificationWrapper;

/// The trait a progress observer implements to receive aggregated transfer
/// updates.
#[async_trait::async_trait]
pub trait TrackingProgressUpdater: std::fmt::Debug + Send + Sync {
    /// Register one aggregated update.  Called on every tracker mutation;
    /// implementations that only care about the overall percentage can read
    /// `update.percent` and ignore the per-part details.
    async fn register_updates(&self, update: ProgressUpdate);
}

/// Progress of a single part within the transfer.
#[derive(Clone, Debug)]
pub struct PartProgressUpdate {
    /// 1-based part number.
    pub part_number: u32,

    /// The number of bytes this part is expected to carry.
    pub expected_bytes: u64,

    /// Bytes counted as uploaded for this part so far.  Always at most
    /// `expected_bytes`; drops back to zero when the part starts a new
    /// attempt.
    pub completed_bytes: u64,
}

/// A report of the overall transfer state, emitted on every tracker
/// mutation.
///
/// `percent` is the caller-visible value: `floor(100 * completed / total)`
/// capped at 99 while the transfer is running.  100 is reserved for the
/// single completion signal emitted right before finalization, so observers
/// can distinguish "nearly done" from "server-side merge in progress".
#[derive(Clone, Debug, Default)]
pub struct ProgressUpdate {
    /// The parts whose counters changed in this update; empty for the
    /// completion signal.
    pub part_updates: Vec<PartProgressUpdate>,

    /// Total bytes in the transfer.
    pub total_bytes: u64,

    /// Bytes counted as uploaded across all parts.
    pub total_bytes_completed: u64,

    pub percent: u8,
}

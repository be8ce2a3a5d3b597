use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use more_asserts::debug_assert_le;

/// Streams one part's bytes to the transport in fixed-size blocks,
/// reporting a block's byte count to the callback once the transport polls
/// for the next one (i.e. once the previous block has been consumed).
///
/// A fresh stream is created for every upload attempt, so a retry restarts
/// reporting from zero; this pairs with the tracker resetting the part's
/// counted bytes at attempt start.
pub(crate) struct PartUploadStream<ReportFn>
where
    ReportFn: Fn(u64) + Send + Sync + Unpin + 'static,
{
    data: Bytes,
    block_size: u64,

    /// Bytes handed to the transport so far.
    bytes_sent: u64,

    /// Bytes already pushed through the report callback.
    bytes_reported: u64,

    report_increment: ReportFn,
}

impl<ReportFn> PartUploadStream<ReportFn>
where
    ReportFn: Fn(u64) + Send + Sync + Unpin + 'static,
{
    pub fn new(data: Bytes, block_size: u64, report_increment: ReportFn) -> Self {
        debug_assert!(block_size > 0);

        Self {
            data,
            block_size: block_size.max(1),
            bytes_sent: 0,
            bytes_reported: 0,
            report_increment,
        }
    }
}

impl<ReportFn> Stream for PartUploadStream<ReportFn>
where
    ReportFn: Fn(u64) + Send + Sync + Unpin + 'static,
{
    type Item = std::result::Result<Bytes, std::io::Error>;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        debug_assert_le!(this.bytes_sent, this.data.len() as u64);

        // Being polled again means the previously yielded block was consumed.
        let newly_confirmed = this.bytes_sent - this.bytes_reported;
        if newly_confirmed > 0 {
            (this.report_increment)(newly_confirmed);
            this.bytes_reported = this.bytes_sent;
        }

        if this.bytes_sent == this.data.len() as u64 {
            return Poll::Ready(None);
        }

        let slice_start = this.bytes_sent;
        let slice_end = (this.bytes_sent + this.block_size).min(this.data.len() as u64);
        this.bytes_sent = slice_end;

        Poll::Ready(Some(Ok(this.data.slice(slice_start as usize..slice_end as usize))))
    }
}

use crate::error::Result;
use crate::index::BulkOperation;
use crate::index::SearchIndex;
use tracing::debug;

/// Default number of buffered operations that triggers a flush
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Buffers bulk operations and sends them to the index in batches.
///
/// Adding the operation that fills the buffer flushes it. Whatever remains at
/// the end must be sent with an explicit [`BulkIndexer::flush`].
pub struct BulkIndexer<'a> {
    index: &'a dyn SearchIndex,
    batch_size: usize,
    pending: Vec<BulkOperation>,
    flushed: usize,
}

impl<'a> BulkIndexer<'a> {
    pub fn new(index: &'a dyn SearchIndex, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            index,
            batch_size,
            pending: Vec::with_capacity(batch_size),
            flushed: 0,
        }
    }

    /// Buffer `operation`, flushing if the batch is now full.
    pub async fn add(&mut self, operation: BulkOperation) -> Result<()> {
        self.pending.push(operation);
        if self.pending.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Whether any operations are waiting to be sent.
    pub fn can_flush(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Send every buffered operation in one request. The buffer is emptied
    /// even when the request fails.
    pub async fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::replace(&mut self.pending, Vec::with_capacity(self.batch_size));
        debug!("Flushing {} bulk operations", batch.len());
        self.index.bulk(&batch).await?;
        self.flushed += batch.len();
        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Number of operations successfully sent so far.
    pub fn flushed(&self) -> usize {
        self.flushed
    }
}

/// Load Module
///
/// Buffers rows and writes them to the store in bounded batches. Each flush is
/// one bulk statement in one transaction: either the whole buffer lands or none
/// of it does. A failed flush is logged and counted, and loading carries on with
/// the next buffer, so a partially loaded stage is safe to re-run.
use crate::db::{BatchRow, Store, MAX_BATCH_SIZE};
use serde::Serialize;

/// Default rows per flush
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Totals for one sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SinkSummary {
    /// Rows handed to `stage`
    pub staged: u64,
    /// Rows the store reported as inserted or updated
    pub written: u64,
    pub batches: usize,
    pub failed_batches: usize,
}

pub struct BatchSink<'s, S: Store + ?Sized, R: BatchRow> {
    store: &'s S,
    buffer: Vec<R>,
    capacity: usize,
    summary: SinkSummary,
}

impl<'s, S: Store + ?Sized, R: BatchRow> BatchSink<'s, S, R> {
    /// `capacity` is clamped to `1..=MAX_BATCH_SIZE`
    pub fn new(store: &'s S, capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_BATCH_SIZE);
        Self { store, buffer: Vec::with_capacity(capacity), capacity, summary: SinkSummary::default() }
    }

    /// Buffer one row, flushing when the buffer is full
    pub async fn stage(&mut self, row: R) -> u64 {
        self.buffer.push(row);
        self.summary.staged += 1;

        if self.buffer.len() >= self.capacity {
            self.flush().await
        } else {
            0
        }
    }

    /// Write the buffered rows as one batch, returning the rows written.
    ///
    /// A store error rolls the batch back and reports zero.
    pub async fn flush(&mut self) -> u64 {
        if self.buffer.is_empty() {
            return 0;
        }

        let batch = R::into_batch(std::mem::replace(&mut self.buffer, Vec::with_capacity(self.capacity)));
        self.summary.batches += 1;

        match self.store.write_batch(&batch).await {
            Ok(written) => {
                self.summary.written += written;
                written
            }
            Err(e) => {
                self.summary.failed_batches += 1;
                tracing::warn!("Batch of {} rows for {} rolled back: {:#}", batch.len(), batch.table(), e);
                0
            }
        }
    }

    /// Drain the partial buffer and return the totals
    pub async fn finish(mut self) -> SinkSummary {
        self.flush().await;
        self.summary()
    }

    pub fn summary(&self) -> SinkSummary {
        self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::NewPerson;

    fn person(i: usize) -> NewPerson {
        NewPerson { imdb_nconst: format!("nm{:07}", i), primary_name: format!("Person {}", i), birth_year: None, death_year: None }
    }

    #[tokio::test]
    async fn test_flushes_when_buffer_fills() {
        let store = MemoryStore::new();
        let mut sink = BatchSink::new(&store, 3);

        assert_eq!(sink.stage(person(1)).await, 0);
        assert_eq!(sink.stage(person(2)).await, 0);
        assert_eq!(sink.stage(person(3)).await, 3);
        assert_eq!(sink.summary().batches, 1);
        assert_eq!(store.count_rows("person").await.unwrap(), 3);

        sink.stage(person(4)).await;
        assert_eq!(store.count_rows("person").await.unwrap(), 3);

        let summary = sink.finish().await;
        assert_eq!(summary, SinkSummary { staged: 4, written: 4, batches: 2, failed_batches: 0 });
        assert_eq!(store.count_rows("person").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_duplicates_are_staged_but_not_written() {
        let store = MemoryStore::new();
        let mut sink = BatchSink::new(&store, 10);
        for _ in 0..3 {
            sink.stage(person(7)).await;
        }

        let summary = sink.finish().await;
        assert_eq!(summary.staged, 3);
        assert_eq!(summary.written, 1);
    }

    #[tokio::test]
    async fn test_failed_flush_reports_zero_and_continues() {
        let store = MemoryStore::new();
        let mut sink = BatchSink::new(&store, 2);

        store.fail_writes_to("person");
        sink.stage(person(1)).await;
        assert_eq!(sink.stage(person(2)).await, 0);

        store.restore_writes();
        sink.stage(person(3)).await;
        let summary = sink.finish().await;

        assert_eq!(summary, SinkSummary { staged: 3, written: 1, batches: 2, failed_batches: 1 });
        let loaded: Vec<String> = store.people().into_iter().map(|p| p.imdb_nconst).collect();
        assert_eq!(loaded, vec!["nm0000003"]);
    }

    #[test]
    fn test_capacity_is_clamped() {
        let store = MemoryStore::new();
        let huge: BatchSink<'_, MemoryStore, NewPerson> = BatchSink::new(&store, 1_000_000);
        assert_eq!(huge.capacity, MAX_BATCH_SIZE);

        let zero: BatchSink<'_, MemoryStore, NewPerson> = BatchSink::new(&store, 0);
        assert_eq!(zero.capacity, 1);
    }

    #[tokio::test]
    async fn test_empty_finish_writes_nothing() {
        let store = MemoryStore::new();
        let sink: BatchSink<'_, MemoryStore, NewPerson> = BatchSink::new(&store, DEFAULT_BATCH_SIZE);
        assert_eq!(sink.finish().await, SinkSummary::default());
    }
}

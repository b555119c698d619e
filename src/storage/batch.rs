//! Fixed-size record batching.
//!
//! The aggregator accumulates rows and flushes them to the store in batches.
//! The original tooling this harness replaces only flushed when a batch hit
//! the threshold, silently dropping a trailing partial batch; that behavior
//! is kept selectable via [`FlushPolicy::OnThreshold`], with
//! [`FlushPolicy::OnCompletion`] as the default.

use super::results::ResultRecord;

/// What happens to a partial batch left over when the input is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushPolicy {
    /// Flush the trailing partial batch after the last record.
    OnCompletion,
    /// Only flush full batches; a trailing partial batch is dropped.
    OnThreshold,
}

/// Buffers records up to a fixed capacity.
#[derive(Debug)]
pub struct RecordBatcher {
    buf: Vec<ResultRecord>,
    capacity: usize,
}

impl RecordBatcher {
    /// Creates a batcher flushing every `capacity` records.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "batch capacity must be positive");
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Adds a record; returns a full batch ready to insert when the
    /// threshold is reached.
    pub fn push(&mut self, record: ResultRecord) -> Option<Vec<ResultRecord>> {
        self.buf.push(record);
        if self.buf.len() >= self.capacity {
            Some(std::mem::replace(
                &mut self.buf,
                Vec::with_capacity(self.capacity),
            ))
        } else {
            None
        }
    }

    /// Takes whatever is buffered, per the given policy.
    pub fn finish(&mut self, policy: FlushPolicy) -> Option<Vec<ResultRecord>> {
        match policy {
            FlushPolicy::OnThreshold => {
                self.buf.clear();
                None
            }
            FlushPolicy::OnCompletion => {
                if self.buf.is_empty() {
                    None
                } else {
                    Some(std::mem::take(&mut self.buf))
                }
            }
        }
    }

    /// Records currently buffered.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::results::solution_optimality;

    fn record() -> ResultRecord {
        ResultRecord {
            count: 100,
            center: 50,
            variability: 2,
            lower_bound: 10,
            algorithm: "FirstFit".to_string(),
            solution_bin_count: 12,
            solution_time: 1.0,
            solution_optimality: solution_optimality(12, 10),
        }
    }

    #[test]
    fn test_exactly_one_flush_at_threshold() {
        let mut batcher = RecordBatcher::new(20);
        let mut flushes = 0;
        for _ in 0..20 {
            if let Some(batch) = batcher.push(record()) {
                assert_eq!(batch.len(), 20);
                flushes += 1;
            }
        }
        assert_eq!(flushes, 1);
        assert_eq!(batcher.pending(), 0);
        assert!(batcher.finish(FlushPolicy::OnCompletion).is_none());
    }

    #[test]
    fn test_trailing_partial_flushed_on_completion() {
        let mut batcher = RecordBatcher::new(20);
        let mut flushes = 0;
        for _ in 0..21 {
            if batcher.push(record()).is_some() {
                flushes += 1;
            }
        }
        assert_eq!(flushes, 1);
        let tail = batcher.finish(FlushPolicy::OnCompletion).unwrap();
        assert_eq!(tail.len(), 1);
    }

    #[test]
    fn test_trailing_partial_dropped_on_threshold_policy() {
        let mut batcher = RecordBatcher::new(20);
        for _ in 0..19 {
            assert!(batcher.push(record()).is_none());
        }
        assert!(batcher.finish(FlushPolicy::OnThreshold).is_none());
        assert_eq!(batcher.pending(), 0);
    }
}

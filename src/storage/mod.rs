//! SQLite-backed result storage.
//!
//! The aggregation stage loads one row per (instance, result) pair into the
//! `bin_packing_results` table. Rows are buffered in fixed-size batches and
//! flushed as single bulk inserts; the trailing-partial-batch policy is
//! configurable (see [`batch::FlushPolicy`]).

pub mod batch;
pub mod results;

pub use batch::{FlushPolicy, RecordBatcher};
pub use results::{solution_optimality, ResultRecord, ResultStore, StoreError, BATCH_SIZE};

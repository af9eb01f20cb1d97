//! `binsort` is a heap-based external sorter for binary integer files.
//!
//! External sorting is a class of sorting algorithms that can handle massive amounts of data. External sorting
//! is required when the data being sorted do not fit into the main memory (RAM) of a computer and instead must be
//! resided in slower external memory, usually a hard disk drive. Sorting is achieved in two passes. During the
//! first pass it sorts chunks of data that each fit in RAM, during the second pass it merges the sorted chunks
//! together. For more information see [External Sorting](https://en.wikipedia.org/wiki/External_sorting).
//!
//! # Overview
//!
//! `binsort` sorts a headerless binary file of 4-byte native-endian signed integers:
//!
//! * **Run generation:**
//!   the input is consumed in bounded chunks; each chunk is sorted through a fixed-capacity
//!   max-heap and written out as an independent sorted run.
//! * **K-way merging:**
//!   the runs are merged `k` at a time through a min-heap keyed on each run's head record,
//!   pass after pass, until a single fully sorted file remains.
//!
//! Both phases are built on the same generic [`BoundedHeap`], parameterized by a priority
//! comparison, so the max- and min-oriented heaps share one sift implementation.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use binsort::ExternalSorterBuilder;
//!
//! fn main() {
//!     let sorter = ExternalSorterBuilder::new()
//!         .with_chunk_size(1_000_000)
//!         .with_fan_in(8)
//!         .with_tmp_dir(Path::new("./"))
//!         .build()
//!         .unwrap();
//!
//!     let summary = sorter.sort(Path::new("input.bin"), Path::new("output.bin")).unwrap();
//!     println!("sorted {} records in {:?}", summary.records, summary.elapsed);
//! }
//! ```

pub mod heap;
pub mod merger;
pub mod record;
pub mod run;
pub mod sort;

pub use heap::{BoundedHeap, HeapError};
pub use merger::{MergeOutcome, RunCursor, RunMerger};
pub use record::{RecordError, RecordReader, RecordWriter, RECORD_BYTES};
pub use run::{GeneratedRuns, RunGenerator, RunNamer};
pub use sort::{ExternalSorter, ExternalSorterBuilder, SortError, SortSummary};

//! K-way run merging.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use log;

use crate::heap::BoundedHeap;
use crate::record::{RecordReader, RecordWriter};
use crate::run::RunNamer;
use crate::sort::SortError;

/// A run being drained during a merge: the open reader paired with the head
/// record read from it but not yet written out.
///
/// Dropping the cursor closes the run, so retiring an exhausted run is just
/// letting its cursor go out of scope.
pub struct RunCursor {
    head: i32,
    source: RecordReader,
}

impl RunCursor {
    /// Opens `path` and buffers its first record.
    /// Returns `None` for a run holding no records.
    pub fn open(path: &Path) -> Result<Option<Self>, SortError> {
        let mut source = RecordReader::open(path).map_err(SortError::Record)?;

        match source.read_next().map_err(SortError::Record)? {
            Some(head) => Ok(Some(RunCursor { head, source })),
            None => Ok(None),
        }
    }

    /// The next record to emit from this run.
    pub fn head(&self) -> i32 {
        self.head
    }

    /// Buffers the next record, returning `false` once the run is drained.
    pub fn advance(&mut self) -> Result<bool, SortError> {
        match self.source.read_next().map_err(SortError::Record)? {
            Some(value) => {
                self.head = value;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Orders cursors so the smallest head sits at the heap root.
fn min_head_first(a: &RunCursor, b: &RunCursor) -> Ordering {
    a.head.cmp(&b.head).reverse()
}

/// Final run produced by [`RunMerger::merge`] and the pass count it took.
pub struct MergeOutcome {
    pub final_run: PathBuf,
    pub passes: usize,
}

/// Merges sorted runs `fan_in` at a time until a single run remains.
pub struct RunMerger {
    fan_in: usize,
}

impl RunMerger {
    /// Creates a merger with the given fan-in. A fan-in below 2 cannot reduce
    /// the run count and is rejected.
    pub fn new(fan_in: usize) -> Result<Self, SortError> {
        if fan_in < 2 {
            return Err(SortError::InvalidFanIn(fan_in));
        }

        return Ok(RunMerger { fan_in });
    }

    /// Reduces `runs` pass by pass until one run remains, returning it along
    /// with the number of passes taken. Returns `None` for an empty run list.
    ///
    /// Each pass merges consecutive groups of `fan_in` runs. A trailing group
    /// of one run is carried into the next pass untouched; a shorter trailing
    /// group is merged at its own width. Group inputs are deleted as soon as
    /// their output run is complete.
    pub fn merge(
        &self,
        mut runs: Vec<PathBuf>,
        namer: &mut RunNamer,
    ) -> Result<Option<MergeOutcome>, SortError> {
        let mut passes = 0;

        while runs.len() > 1 {
            passes += 1;
            let mut next = Vec::with_capacity(runs.len() / self.fan_in + 1);

            for group in runs.chunks(self.fan_in) {
                if group.len() == 1 {
                    next.push(group[0].clone());
                    continue;
                }

                let output = namer.next_run();
                self.merge_group(group, &output)?;

                for path in group {
                    fs::remove_file(path).map_err(SortError::Io)?;
                }
                next.push(output);
            }

            log::debug!("merge pass {}: {} runs -> {}", passes, runs.len(), next.len());
            runs = next;
        }

        return Ok(runs.pop().map(|final_run| MergeOutcome { final_run, passes }));
    }

    /// Merges one group of sorted runs into `output`.
    ///
    /// A min-heap holds one cursor per live run. The root cursor's head is
    /// written out, then the cursor either advances and re-enters the heap or,
    /// when its run is drained, is dropped to release the handle.
    fn merge_group(&self, group: &[PathBuf], output: &Path) -> Result<(), SortError> {
        let mut heap = BoundedHeap::new(group.len(), min_head_first);
        for path in group {
            if let Some(cursor) = RunCursor::open(path)? {
                heap.insert(cursor).map_err(SortError::Heap)?;
            }
        }

        let mut writer = RecordWriter::create(output).map_err(SortError::Record)?;
        while !heap.is_empty() {
            let mut cursor = heap.extract_root().map_err(SortError::Heap)?;
            writer.write_record(cursor.head()).map_err(SortError::Record)?;

            if cursor.advance()? {
                heap.insert(cursor).map_err(SortError::Heap)?;
            }
        }
        writer.finish().map_err(SortError::Record)?;

        return Ok(());
    }
}

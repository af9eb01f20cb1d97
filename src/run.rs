//! Sorted run generation.

use std::path::{Path, PathBuf};

use log;

use crate::heap::BoundedHeap;
use crate::record::{RecordReader, RecordWriter};
use crate::sort::SortError;

/// Allocates unique, creation-ordered names for run files.
///
/// One namer is shared across run generation and all merge passes, so a run
/// created by a later pass never collides with an earlier one.
pub struct RunNamer {
    dir: PathBuf,
    counter: usize,
}

impl RunNamer {
    /// Creates a namer placing runs under `dir`.
    pub fn new(dir: &Path) -> Self {
        RunNamer {
            dir: dir.into(),
            counter: 0,
        }
    }

    /// Returns the next run path.
    pub fn next_run(&mut self) -> PathBuf {
        self.counter += 1;
        self.dir.join(format!("run-{:06}.bin", self.counter))
    }
}

/// Result of the run generation phase.
pub struct GeneratedRuns {
    /// Run paths in creation order.
    pub runs: Vec<PathBuf>,
    /// Total records consumed from the input.
    pub records: u64,
}

/// Splits unsorted input into bounded sorted runs.
///
/// The input is consumed sequentially in chunks of at most `chunk_size`
/// records; each chunk is sorted through a fixed-capacity max-heap and
/// written out as an independent run.
pub struct RunGenerator {
    chunk_size: usize,
}

impl RunGenerator {
    /// Creates a generator producing runs of at most `chunk_size` records.
    pub fn new(chunk_size: usize) -> Result<Self, SortError> {
        if chunk_size < 1 {
            return Err(SortError::InvalidChunkSize(chunk_size));
        }

        return Ok(RunGenerator { chunk_size });
    }

    /// Consumes `input` and writes one sorted run per chunk. The final chunk
    /// may be short when the input length is not a multiple of the chunk size.
    pub fn generate(&self, input: &Path, namer: &mut RunNamer) -> Result<GeneratedRuns, SortError> {
        let mut reader = RecordReader::open(input).map_err(SortError::Record)?;
        let mut runs = Vec::new();
        let mut records: u64 = 0;

        loop {
            let mut heap = BoundedHeap::new(self.chunk_size, i32::cmp);
            while heap.len() < self.chunk_size {
                match reader.read_next().map_err(SortError::Record)? {
                    Some(value) => heap.insert(value).map_err(SortError::Heap)?,
                    None => break,
                }
            }

            if heap.is_empty() {
                break;
            }
            records += heap.len() as u64;

            log::debug!("sorting chunk data ...");
            let sorted = heap.into_sorted_vec();

            log::debug!("saving chunk data");
            let path = namer.next_run();
            let mut writer = RecordWriter::create(&path).map_err(SortError::Record)?;
            for value in sorted {
                writer.write_record(value).map_err(SortError::Record)?;
            }
            writer.finish().map_err(SortError::Record)?;

            runs.push(path);
        }

        log::debug!("run generation done ({} runs, {} records)", runs.len(), records);

        return Ok(GeneratedRuns { runs, records });
    }
}

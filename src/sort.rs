//! External sorter.

use log;
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display};
use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::heap::HeapError;
use crate::merger::RunMerger;
use crate::record::{RecordError, RecordWriter};
use crate::run::{RunGenerator, RunNamer};

/// Default number of records held in memory per run.
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 20;
/// Default number of runs merged together in one pass.
pub const DEFAULT_FAN_IN: usize = 16;

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Temporary directory or file creation error.
    TempDir(io::Error),
    /// Common I/O error.
    Io(io::Error),
    /// Record file access or format error.
    Record(RecordError),
    /// Heap misuse uncovered during sorting.
    Heap(HeapError),
    /// Chunk size must hold at least one record.
    InvalidChunkSize(usize),
    /// Fan-in must be at least two.
    InvalidFanIn(usize),
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            SortError::TempDir(err) => Some(err),
            SortError::Io(err) => Some(err),
            SortError::Record(err) => Some(err),
            SortError::Heap(err) => Some(err),
            SortError::InvalidChunkSize(_) | SortError::InvalidFanIn(_) => None,
        }
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::TempDir(err) => write!(f, "temporary directory or file not created: {}", err),
            SortError::Io(err) => write!(f, "I/O operation failed: {}", err),
            SortError::Record(err) => write!(f, "record file error: {}", err),
            SortError::Heap(err) => write!(f, "heap operation failed: {}", err),
            SortError::InvalidChunkSize(size) => {
                write!(f, "chunk size must be at least 1, got {}", size)
            }
            SortError::InvalidFanIn(k) => write!(f, "fan-in must be at least 2, got {}", k),
        }
    }
}

/// Figures reported after a completed sort.
#[derive(Debug, Clone, Copy)]
pub struct SortSummary {
    /// Records read from the input and written to the output.
    pub records: u64,
    /// Sorted runs produced by the generation phase.
    pub runs: usize,
    /// Merge passes needed to reduce the runs to one.
    pub passes: usize,
    /// Wall-clock time for the whole sort.
    pub elapsed: Duration,
}

/// External sorter builder. Provides methods for [`ExternalSorter`] initialization.
#[derive(Clone)]
pub struct ExternalSorterBuilder {
    /// Maximum number of records held in memory per run.
    chunk_size: usize,
    /// Number of runs merged together in one pass.
    fan_in: usize,
    /// Directory to be used to store temporary data.
    tmp_dir: Option<Box<Path>>,
}

impl ExternalSorterBuilder {
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        ExternalSorterBuilder::default()
    }

    /// Builds an [`ExternalSorter`] instance using provided configuration.
    pub fn build(self) -> Result<ExternalSorter, SortError> {
        ExternalSorter::new(self.chunk_size, self.fan_in, self.tmp_dir.as_deref())
    }

    /// Sets the maximum number of records held in memory per run.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> ExternalSorterBuilder {
        self.chunk_size = chunk_size;
        return self;
    }

    /// Sets the number of runs merged together in one pass.
    pub fn with_fan_in(mut self, fan_in: usize) -> ExternalSorterBuilder {
        self.fan_in = fan_in;
        return self;
    }

    /// Sets directory to be used to store temporary data.
    pub fn with_tmp_dir(mut self, path: &Path) -> ExternalSorterBuilder {
        self.tmp_dir = Some(path.into());
        return self;
    }
}

impl Default for ExternalSorterBuilder {
    fn default() -> Self {
        ExternalSorterBuilder {
            chunk_size: DEFAULT_CHUNK_SIZE,
            fan_in: DEFAULT_FAN_IN,
            tmp_dir: None,
        }
    }
}

/// External sorter for binary integer files.
pub struct ExternalSorter {
    /// Run generation phase.
    generator: RunGenerator,
    /// Run merging phase.
    merger: RunMerger,
    /// Directory holding intermediate runs, removed when the sorter is dropped.
    tmp_dir: tempfile::TempDir,
}

impl ExternalSorter {
    /// Creates a new external sorter instance.
    ///
    /// # Arguments
    /// * `chunk_size` - Maximum number of records held in memory per run. Must be at least 1.
    /// * `fan_in` - Number of runs merged together in one pass. Must be at least 2.
    /// * `tmp_path` - Directory to be used to store temporary data. If the parameter is [`None`]
    ///   the default OS temporary directory will be used.
    pub fn new(chunk_size: usize, fan_in: usize, tmp_path: Option<&Path>) -> Result<Self, SortError> {
        return Ok(ExternalSorter {
            generator: RunGenerator::new(chunk_size)?,
            merger: RunMerger::new(fan_in)?,
            tmp_dir: Self::init_tmp_directory(tmp_path)?,
        });
    }

    fn init_tmp_directory(tmp_path: Option<&Path>) -> Result<tempfile::TempDir, SortError> {
        let tmp_dir = if let Some(tmp_path) = tmp_path {
            tempfile::tempdir_in(tmp_path)
        } else {
            tempfile::tempdir()
        }
        .map_err(SortError::TempDir)?;

        log::info!("using {} as a temporary directory", tmp_dir.path().display());

        return Ok(tmp_dir);
    }

    /// Sorts the records of `input` into `output`.
    ///
    /// The input is split into bounded sorted runs which are then merged
    /// `fan_in` at a time until one remains; that run becomes the output file.
    /// Intermediate runs are staged in the temporary directory and removed as
    /// soon as a later pass has consumed them; anything left behind on an
    /// error path is removed together with the directory.
    pub fn sort(&self, input: &Path, output: &Path) -> Result<SortSummary, SortError> {
        let started = Instant::now();
        let mut namer = RunNamer::new(self.tmp_dir.path());

        let generated = self.generator.generate(input, &mut namer)?;
        let runs = generated.runs.len();
        log::debug!("external sort preparation done");

        match self.merger.merge(generated.runs, &mut namer)? {
            Some(outcome) => {
                persist(&outcome.final_run, output).map_err(SortError::Io)?;

                return Ok(SortSummary {
                    records: generated.records,
                    runs,
                    passes: outcome.passes,
                    elapsed: started.elapsed(),
                });
            }
            None => {
                // No runs means no records: the sorted image of an empty
                // input is an empty file.
                RecordWriter::create(output)
                    .map_err(SortError::Record)?
                    .finish()
                    .map_err(SortError::Record)?;

                return Ok(SortSummary {
                    records: 0,
                    runs: 0,
                    passes: 0,
                    elapsed: started.elapsed(),
                });
            }
        }
    }
}

/// Moves the final run to its destination, falling back to copy-and-remove
/// when the temporary directory and the output live on different filesystems.
fn persist(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::path::Path;

    use rand::seq::SliceRandom;
    use rstest::*;

    use crate::record::{RecordError, RecordReader, RecordWriter};

    use super::{ExternalSorterBuilder, SortError};

    fn write_input(path: &Path, values: &[i32]) {
        let mut writer = RecordWriter::create(path).unwrap();
        for &value in values {
            writer.write_record(value).unwrap();
        }
        writer.finish().unwrap();
    }

    fn read_output(path: &Path) -> Vec<i32> {
        let mut reader = RecordReader::open(path).unwrap();
        let mut values = Vec::new();
        while let Some(value) = reader.read_next().unwrap() {
            values.push(value);
        }
        values
    }

    #[fixture]
    fn work_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[rstest]
    #[case(8, 2)]
    #[case(8, 3)]
    #[case(3, 7)]
    #[case(100, 2)]
    #[case(1000, 16)]
    fn test_external_sorter(
        work_dir: tempfile::TempDir,
        #[case] chunk_size: usize,
        #[case] fan_in: usize,
    ) {
        let input = work_dir.path().join("input.bin");
        let output = work_dir.path().join("output.bin");

        let mut values = Vec::from_iter(0..100);
        values.shuffle(&mut rand::thread_rng());
        write_input(&input, &values);

        let sorter = ExternalSorterBuilder::new()
            .with_chunk_size(chunk_size)
            .with_fan_in(fan_in)
            .with_tmp_dir(work_dir.path())
            .build()
            .unwrap();

        let summary = sorter.sort(&input, &output).unwrap();

        assert_eq!(read_output(&output), Vec::from_iter(0..100));
        assert_eq!(summary.records, 100);
        assert_eq!(summary.runs, (100 + chunk_size - 1) / chunk_size);
    }

    #[rstest]
    fn test_duplicate_heavy_input(work_dir: tempfile::TempDir) {
        let input = work_dir.path().join("input.bin");
        let output = work_dir.path().join("output.bin");

        let mut values = Vec::from_iter((0..10).flat_map(|x| (0..5).map(move |_| x)));
        values.shuffle(&mut rand::thread_rng());
        write_input(&input, &values);

        let sorter = ExternalSorterBuilder::new()
            .with_chunk_size(4)
            .with_fan_in(2)
            .with_tmp_dir(work_dir.path())
            .build()
            .unwrap();

        sorter.sort(&input, &output).unwrap();

        let expected = Vec::from_iter((0..10).flat_map(|x| (0..5).map(move |_| x)));
        assert_eq!(read_output(&output), expected);
    }

    #[rstest]
    fn test_empty_input(work_dir: tempfile::TempDir) {
        let input = work_dir.path().join("input.bin");
        let output = work_dir.path().join("output.bin");
        write_input(&input, &[]);

        let sorter = ExternalSorterBuilder::new()
            .with_tmp_dir(work_dir.path())
            .build()
            .unwrap();

        let summary = sorter.sort(&input, &output).unwrap();

        assert_eq!(summary.records, 0);
        assert_eq!(summary.runs, 0);
        assert_eq!(summary.passes, 0);
        assert!(read_output(&output).is_empty());
    }

    #[rstest]
    fn test_dangling_partial_record(work_dir: tempfile::TempDir) {
        let input = work_dir.path().join("input.bin");
        let output = work_dir.path().join("output.bin");
        fs::write(&input, [0u8; 10]).unwrap();

        let sorter = ExternalSorterBuilder::new()
            .with_tmp_dir(work_dir.path())
            .build()
            .unwrap();

        match sorter.sort(&input, &output) {
            Err(SortError::Record(RecordError::Format { length, .. })) => assert_eq!(length, 10),
            _ => panic!("a torn input file must fail the sort"),
        }
    }

    #[rstest]
    fn test_missing_input(work_dir: tempfile::TempDir) {
        let sorter = ExternalSorterBuilder::new()
            .with_tmp_dir(work_dir.path())
            .build()
            .unwrap();

        let result = sorter.sort(
            &work_dir.path().join("absent.bin"),
            &work_dir.path().join("output.bin"),
        );

        assert!(matches!(result, Err(SortError::Record(RecordError::Io(_)))));
    }

    #[rstest]
    fn test_invalid_parameters() {
        let chunk = ExternalSorterBuilder::new().with_chunk_size(0).build();
        assert!(matches!(chunk, Err(SortError::InvalidChunkSize(0))));

        let fan_in = ExternalSorterBuilder::new().with_fan_in(1).build();
        assert!(matches!(fan_in, Err(SortError::InvalidFanIn(1))));
    }
}

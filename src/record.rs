//! Fixed-width binary record files.
//!
//! A record file is a headerless sequence of 4-byte signed integers in the
//! platform's native byte order. A file whose length is not a whole number of
//! records is malformed.

use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

/// Width of a single record in bytes.
pub const RECORD_BYTES: usize = 4;

/// Record file access error.
#[derive(Debug)]
pub enum RecordError {
    /// Common I/O error.
    Io(io::Error),
    /// File length is not a whole number of records.
    Format { path: PathBuf, length: u64 },
}

impl Error for RecordError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            RecordError::Io(err) => Some(err),
            RecordError::Format { .. } => None,
        }
    }
}

impl Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            RecordError::Io(err) => write!(f, "I/O operation failed: {}", err),
            RecordError::Format { path, length } => write!(
                f,
                "{}: length {} is not a multiple of the {}-byte record width",
                path.display(),
                length,
                RECORD_BYTES
            ),
        }
    }
}

/// Sequential reader of fixed-width records.
pub struct RecordReader {
    inner: io::BufReader<fs::File>,
    position: u64,
    length: u64,
}

impl RecordReader {
    /// Opens `path` for reading, validating that it contains whole records
    /// only. The file handle is released when the reader is dropped.
    pub fn open(path: &Path) -> Result<Self, RecordError> {
        let file = fs::File::open(path).map_err(RecordError::Io)?;
        let length = file.metadata().map_err(RecordError::Io)?.len();

        if length % RECORD_BYTES as u64 != 0 {
            return Err(RecordError::Format {
                path: path.into(),
                length,
            });
        }

        return Ok(RecordReader {
            inner: io::BufReader::new(file),
            position: 0,
            length,
        });
    }

    /// Reads the next record, or `None` once the file is exhausted.
    pub fn read_next(&mut self) -> Result<Option<i32>, RecordError> {
        if self.position == self.length {
            return Ok(None);
        }

        let mut buf = [0u8; RECORD_BYTES];
        self.inner.read_exact(&mut buf).map_err(RecordError::Io)?;
        self.position += RECORD_BYTES as u64;

        return Ok(Some(i32::from_ne_bytes(buf)));
    }

    /// Current read offset in bytes.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Total file length in bytes.
    pub fn len(&self) -> u64 {
        self.length
    }

    /// Whether every record has been read.
    pub fn is_exhausted(&self) -> bool {
        self.position == self.length
    }
}

/// Sequential writer of fixed-width records.
pub struct RecordWriter {
    inner: io::BufWriter<fs::File>,
    position: u64,
}

impl RecordWriter {
    /// Creates `path` for writing, truncating any previous content.
    pub fn create(path: &Path) -> Result<Self, RecordError> {
        let file = fs::File::create(path).map_err(RecordError::Io)?;

        return Ok(RecordWriter {
            inner: io::BufWriter::new(file),
            position: 0,
        });
    }

    /// Appends a single record.
    pub fn write_record(&mut self, value: i32) -> Result<(), RecordError> {
        self.inner
            .write_all(&value.to_ne_bytes())
            .map_err(RecordError::Io)?;
        self.position += RECORD_BYTES as u64;

        return Ok(());
    }

    /// Current write offset in bytes.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Flushes buffered records. The file handle is released on drop.
    pub fn finish(mut self) -> Result<(), RecordError> {
        self.inner.flush().map_err(RecordError::Io)
    }
}

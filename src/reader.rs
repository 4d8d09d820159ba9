//! Streaming record reader: lazy, forward-only iteration over an ADIF
//! text stream.
//!
//! The reader buffers input line by line but never assumes record
//! boundaries align with line boundaries; a value with an embedded newline
//! or `<eor>`-shaped text is carried until the codec can consume its full
//! declared span.

use std::fmt;
use std::io::{self, BufRead};

use crate::codec::ParseError;
use crate::record::Record;

/// Failure while reading records from a stream.
#[derive(Debug)]
pub enum ReadError {
    /// Underlying stream error.
    Io(io::Error),
    /// The stream ended before the `<EOH>` marker closed the header.
    NoHeaderTerminator {
        /// Absolute byte offset of the end of the stream.
        offset: u64,
    },
    /// The header block itself failed structural parsing.
    Header {
        /// Absolute byte offset of the failure.
        offset: u64,
        /// The codec error.
        source: ParseError,
    },
    /// A record body failed structural parsing. Iteration stops here; a
    /// corrupt record is never silently skipped.
    Record {
        /// Zero-based index of the record that failed.
        index: u64,
        /// Absolute byte offset of the failure.
        offset: u64,
        /// The codec error.
        source: ParseError,
    },
}

impl From<io::Error> for ReadError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "read error: {err}"),
            Self::NoHeaderTerminator { offset } => {
                write!(f, "stream ended without <EOH> at offset {offset}")
            }
            Self::Header { offset, source } => {
                write!(f, "corrupt header at offset {offset}: {source}")
            }
            Self::Record {
                index,
                offset,
                source,
            } => write!(f, "corrupt record {index} at offset {offset}: {source}"),
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Header { source, .. } | Self::Record { source, .. } => Some(source),
            Self::NoHeaderTerminator { .. } => None,
        }
    }
}

/// Result alias for reader operations.
pub type ReadResult<T> = Result<T, ReadError>;

/// Reader configuration.
#[derive(Debug, Clone, Default)]
pub struct ReaderOptions {
    /// Require a header block closed by `<EOH>` even when the stream
    /// begins directly with a field tag. Default: headerless input is
    /// accepted.
    pub strict_header: bool,
}

/// Pull-based record iterator over a buffered text stream.
///
/// Single pass and not restartable; construct a fresh reader to re-scan.
/// The header block is consumed before the first record and exposed via
/// [`AdifReader::header`].
pub struct AdifReader<R> {
    input: R,
    options: ReaderOptions,
    buf: String,
    pos: usize,
    drained: u64,
    header: Option<Record>,
    header_done: bool,
    finished: bool,
    records_read: u64,
}

impl<R: BufRead> AdifReader<R> {
    /// Creates a reader with default options.
    pub fn new(input: R) -> Self {
        Self::with_options(input, ReaderOptions::default())
    }

    /// Creates a reader with explicit options.
    pub fn with_options(input: R, options: ReaderOptions) -> Self {
        Self {
            input,
            options,
            buf: String::new(),
            pos: 0,
            drained: 0,
            header: None,
            header_done: false,
            finished: false,
            records_read: 0,
        }
    }

    /// The parsed header record, if the stream carried one. `None` until
    /// the header region has been consumed.
    pub fn header(&self) -> Option<&Record> {
        self.header.as_ref()
    }

    /// Forces header consumption and returns the parsed header, if any.
    pub fn read_header(&mut self) -> ReadResult<Option<&Record>> {
        self.ensure_header()?;
        Ok(self.header.as_ref())
    }

    /// Number of records yielded so far.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Pulls the next record, or `None` at a clean end of stream.
    pub fn next_record(&mut self) -> ReadResult<Option<Record>> {
        if self.finished {
            return Ok(None);
        }
        if let Err(err) = self.ensure_header() {
            self.finished = true;
            return Err(err);
        }

        loop {
            self.skip_whitespace();
            if self.buf[self.pos..].is_empty() {
                if self.fill()? == 0 {
                    self.finished = true;
                    return Ok(None);
                }
                continue;
            }

            match Record::parse(&self.buf, self.pos) {
                Ok((record, next)) => {
                    self.pos = next;
                    self.compact();
                    self.records_read += 1;
                    return Ok(Some(record));
                }
                Err(err) => {
                    if incomplete(&err) && self.fill()? > 0 {
                        continue;
                    }
                    self.finished = true;
                    return Err(ReadError::Record {
                        index: self.records_read,
                        offset: self.absolute(err.offset()),
                        source: err,
                    });
                }
            }
        }
    }

    fn ensure_header(&mut self) -> ReadResult<()> {
        if self.header_done {
            return Ok(());
        }
        self.header_done = true;

        loop {
            self.skip_whitespace();
            if !self.buf[self.pos..].is_empty() {
                break;
            }
            if self.fill()? == 0 {
                // Empty stream: no header, no records.
                return Ok(());
            }
        }

        // ADIF convention: a stream whose first character is `<` has no
        // header block.
        if self.buf[self.pos..].starts_with('<') && !self.options.strict_header {
            return Ok(());
        }

        // Free preamble text runs up to the first tag and is discarded.
        let start = loop {
            if let Some(i) = self.buf[self.pos..].find('<') {
                break self.pos + i;
            }
            if self.fill()? == 0 {
                self.finished = true;
                return Err(ReadError::NoHeaderTerminator {
                    offset: self.absolute(self.buf.len()),
                });
            }
        };
        self.pos = start;

        loop {
            match Record::parse_header(&self.buf, self.pos) {
                Ok((header, next)) => {
                    self.header = Some(header);
                    self.pos = next;
                    self.compact();
                    return Ok(());
                }
                Err(err) => {
                    if incomplete(&err) {
                        if self.fill()? > 0 {
                            continue;
                        }
                        self.finished = true;
                        return Err(ReadError::NoHeaderTerminator {
                            offset: self.absolute(self.buf.len()),
                        });
                    }
                    self.finished = true;
                    return Err(ReadError::Header {
                        offset: self.absolute(err.offset()),
                        source: err,
                    });
                }
            }
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.buf[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn fill(&mut self) -> io::Result<usize> {
        self.input.read_line(&mut self.buf)
    }

    fn compact(&mut self) {
        if self.pos == 0 {
            return;
        }
        self.drained += self.pos as u64;
        self.buf.drain(..self.pos);
        self.pos = 0;
    }

    fn absolute(&self, offset: usize) -> u64 {
        self.drained + offset as u64
    }
}

impl<R: BufRead> Iterator for AdifReader<R> {
    type Item = ReadResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

fn incomplete(err: &ParseError) -> bool {
    matches!(
        err,
        ParseError::UnterminatedTag { .. }
            | ParseError::TruncatedInput { .. }
            | ParseError::MissingTerminator { .. }
    )
}

//! Fixed-length record reading and writing.
//!
//! A fixed-length record is one whole line; fields live at fixed character
//! offsets within it. The reader shares the delimited reader's
//! continuation, comment and terminator machinery but has no delimiter or
//! escape handling, so a logical record is simply the concatenation of its
//! physical lines with the continuation characters and terminators
//! removed.

use std::io::{self, BufRead, Write};

use log::{trace, warn};

use crate::error::{ConfigError, ReadError};
use crate::record::{RawRecord, RecordReader, RecordValue, RecordWriter};
use crate::stream::{CharReader, CommentSkipper};

/// Configuration shared by [`FixedLengthReader`] and [`FixedLengthWriter`].
#[derive(Debug, Clone, Default)]
pub struct FixedLengthParserConfig {
    /// Line continuation character. Directly before a terminator it elides
    /// the terminator; anywhere else it is literal text.
    pub line_continuation: Option<char>,
    /// Record terminator. `None` auto-detects CR, LF or CRLF.
    pub record_terminator: Option<char>,
    /// Line prefixes marking a whole line as a comment.
    pub comments: Vec<String>,
}

impl FixedLengthParserConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if let Some(c) = self.line_continuation {
            let conflict = match self.record_terminator {
                Some(t) => c == t,
                None => c == '\r' || c == '\n',
            };
            if conflict {
                return Err(ConfigError::ContinuationMatchesTerminator);
            }
        }
        Ok(())
    }
}

/// Reads fixed-length records (one logical line each) from a character
/// stream.
pub struct FixedLengthReader<R: BufRead> {
    chars: CharReader<R>,
    continuation: Option<char>,
    terminator: Option<char>,
    comments: Option<CommentSkipper>,
    /// Physical lines fully consumed.
    line: usize,
    skip_lf: bool,
    eof: bool,
}

impl<R: BufRead> FixedLengthReader<R> {
    pub fn new(reader: R, config: FixedLengthParserConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let comments = CommentSkipper::new(&config.comments, config.record_terminator);
        Ok(Self {
            chars: CharReader::new(reader),
            continuation: config.line_continuation,
            terminator: config.record_terminator,
            comments,
            line: 0,
            skip_lf: false,
            eof: false,
        })
    }

    /// 1-based number of the next physical line to be read.
    pub fn line_number(&self) -> usize {
        self.line + 1
    }

    fn end_of_record(&mut self, c: char) -> bool {
        match self.terminator {
            Some(t) => c == t,
            None => {
                if c == '\r' {
                    self.skip_lf = true;
                    true
                } else {
                    c == '\n'
                }
            }
        }
    }
}

impl<R: BufRead> RecordReader for FixedLengthReader<R> {
    fn read(&mut self) -> Result<Option<RawRecord>, ReadError> {
        if self.eof {
            return Ok(None);
        }

        if self.skip_lf {
            self.skip_lf = false;
            if self.chars.peek()? == Some('\n') {
                self.chars.next_char()?;
            }
        }

        if let Some(skipper) = &self.comments {
            self.line += skipper.skip(&mut self.chars)?;
        }

        let record_line = self.line + 1;
        let mut record = String::new();
        let mut text = String::new();
        let mut continued = false;
        let mut eol = false;

        while let Some(c) = self.chars.next_char()? {
            if self.skip_lf {
                self.skip_lf = false;
                if c == '\n' {
                    continue;
                }
            }

            text.push(c);

            if continued {
                continued = false;
                if self.end_of_record(c) {
                    self.line += 1;
                    continue;
                }
                // the continuation character was literal text
                record.push(self.continuation.unwrap_or_default());
            }

            if self.continuation == Some(c) {
                continued = true;
                continue;
            }

            if self.end_of_record(c) {
                text.pop();
                eol = true;
                break;
            }

            record.push(c);
        }

        if eol {
            self.line += 1;
            trace!("read {}-character record at line {record_line}", record.chars().count());
            return Ok(Some(RawRecord {
                value: RecordValue::Line(record),
                line_number: record_line,
                text,
            }));
        }

        self.eof = true;

        if continued {
            self.line += 1;
            warn!("stream ended after a line continuation at line {}", self.line);
            return Err(ReadError::UnterminatedContinuation { line: self.line });
        }

        if text.is_empty() {
            return Ok(None);
        }

        self.line += 1;
        trace!("read {}-character record at line {record_line}", record.chars().count());
        Ok(Some(RawRecord {
            value: RecordValue::Line(record),
            line_number: record_line,
            text,
        }))
    }
}

/// Writes fixed-length records.
///
/// A [`RecordValue::Fields`] value is written as the concatenation of its
/// fields, which already sit at their fixed offsets when produced by the
/// fixed-length marshalling context.
pub struct FixedLengthWriter<W: Write> {
    out: W,
    terminator: String,
    lines: usize,
    closed: bool,
}

impl<W: Write> FixedLengthWriter<W> {
    pub fn new(out: W, config: FixedLengthParserConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let terminator = config
            .record_terminator
            .map(String::from)
            .unwrap_or_else(|| "\n".to_string());
        Ok(Self {
            out,
            terminator,
            lines: 0,
            closed: false,
        })
    }

    /// Physical lines written so far.
    pub fn line_number(&self) -> usize {
        self.lines
    }
}

impl<W: Write> RecordWriter for FixedLengthWriter<W> {
    fn write(&mut self, record: &RecordValue) -> io::Result<()> {
        match record {
            RecordValue::Line(line) => self.out.write_all(line.as_bytes())?,
            RecordValue::Fields(fields) => {
                for field in fields {
                    self.out.write_all(field.as_bytes())?;
                }
            }
        }
        self.out.write_all(self.terminator.as_bytes())?;
        self.lines += 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.out.flush()
    }
}

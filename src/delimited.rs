//! Delimited record reading and writing.
//!
//! A delimited record is a terminated line of fields separated by a single
//! repeated character. The reader is a single forward pass over the
//! character stream tracking three flags: `continued` (a line continuation
//! was seen and the following terminator is swallowed), `escaped` (the
//! previous character was an unconsumed escape character) and end-of-record.
//! Logical records may span physical lines when a continuation character is
//! configured.

use std::io::{self, BufRead, Write};

use log::{trace, warn};

use crate::error::{ConfigError, ReadError};
use crate::record::{RawRecord, RecordReader, RecordValue, RecordWriter};
use crate::stream::{CharReader, CommentSkipper};

/// Configuration shared by [`DelimitedReader`] and [`DelimitedWriter`].
#[derive(Debug, Clone)]
pub struct DelimitedParserConfig {
    /// Field delimiter.
    pub delimiter: char,
    /// Escape character. Escapes itself and the delimiter; before any other
    /// character it is literal text.
    pub escape: Option<char>,
    /// Line continuation character. Directly before a terminator it elides
    /// the terminator; anywhere else it is literal text.
    pub line_continuation: Option<char>,
    /// Record terminator. `None` auto-detects CR, LF or CRLF.
    pub record_terminator: Option<char>,
    /// Line prefixes marking a whole line as a comment.
    pub comments: Vec<String>,
}

impl Default for DelimitedParserConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            escape: None,
            line_continuation: None,
            record_terminator: None,
            comments: Vec::new(),
        }
    }
}

impl DelimitedParserConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.escape == Some(self.delimiter) {
            return Err(ConfigError::EscapeMatchesDelimiter);
        }
        if self.line_continuation == Some(self.delimiter) {
            return Err(ConfigError::ContinuationMatchesDelimiter);
        }
        if self.record_terminator == Some(self.delimiter) {
            return Err(ConfigError::TerminatorMatchesDelimiter);
        }
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

/// Reads delimited records from a character stream.
pub struct DelimitedReader<R: BufRead> {
    chars: CharReader<R>,
    delimiter: char,
    escape: Option<char>,
    continuation: Option<char>,
    terminator: Option<char>,
    comments: Option<CommentSkipper>,
    /// Physical lines fully consumed.
    line: usize,
    skip_lf: bool,
    eof: bool,
}

impl<R: BufRead> DelimitedReader<R> {
    pub fn new(reader: R, config: DelimitedParserConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let comments = CommentSkipper::new(&config.comments, config.record_terminator);
        Ok(Self {
            chars: CharReader::new(reader),
            delimiter: config.delimiter,
            escape: config.escape,
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

impl<R: BufRead> RecordReader for DelimitedReader<R> {
    fn read(&mut self) -> Result<Option<RawRecord>, ReadError> {
        if self.eof {
            return Ok(None);
        }

        // a CRLF split across reads: consume the pending LF first
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
        let mut fields: Vec<String> = Vec::new();
        let mut field = String::new();
        let mut text = String::new();
        let mut continued = false;
        let mut escaped = false;
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
                    escaped = false;
                    self.line += 1;
                    continue;
                }
                // the continuation character was literal text
                field.push(self.continuation.unwrap_or_default());
            }

            if escaped {
                escaped = false;
                if Some(c) == self.escape || c == self.delimiter {
                    field.push(c);
                    continue;
                }
                // the escape character was literal; c keeps its meaning
                field.push(self.escape.unwrap_or_default());
            }

            if self.escape == Some(c) {
                escaped = true;
                continue;
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

            if c == self.delimiter {
                fields.push(std::mem::take(&mut field));
            } else {
                field.push(c);
            }
        }

        if eol {
            fields.push(field);
            self.line += 1;
            trace!("read {} field(s) at line {record_line}", fields.len());
            return Ok(Some(RawRecord {
                value: RecordValue::Fields(fields),
                line_number: record_line,
                text,
            }));
        }

        // end of stream
        self.eof = true;

        if continued {
            self.line += 1;
            warn!("stream ended after a line continuation at line {}", self.line);
            return Err(ReadError::UnterminatedContinuation { line: self.line });
        }

        if text.is_empty() {
            return Ok(None);
        }

        if escaped {
            // a trailing escape character is literal
            field.push(self.escape.unwrap_or_default());
        }

        // final record without a trailing terminator
        fields.push(field);
        self.line += 1;
        trace!("read {} field(s) at line {record_line}", fields.len());
        Ok(Some(RawRecord {
            value: RecordValue::Fields(fields),
            line_number: record_line,
            text,
        }))
    }
}

/// Writes delimited records, escaping embedded delimiter and escape
/// characters when an escape character is configured.
pub struct DelimitedWriter<W: Write> {
    out: W,
    delimiter: char,
    escape: Option<char>,
    terminator: String,
    lines: usize,
    closed: bool,
}

impl<W: Write> DelimitedWriter<W> {
    pub fn new(out: W, config: DelimitedParserConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let terminator = config
            .record_terminator
            .map(String::from)
            .unwrap_or_else(|| "\n".to_string());
        Ok(Self {
            out,
            delimiter: config.delimiter,
            escape: config.escape,
            terminator,
            lines: 0,
            closed: false,
        })
    }

    /// Physical lines written so far.
    pub fn line_number(&self) -> usize {
        self.lines
    }

    fn write_field(&mut self, field: &str) -> io::Result<()> {
        match self.escape {
            Some(escape) => {
                let mut buf = String::with_capacity(field.len());
                for c in field.chars() {
                    if c == escape || c == self.delimiter {
                        buf.push(escape);
                    }
                    buf.push(c);
                }
                self.out.write_all(buf.as_bytes())
            }
            None => self.out.write_all(field.as_bytes()),
        }
    }
}

impl<W: Write> RecordWriter for DelimitedWriter<W> {
    fn write(&mut self, record: &RecordValue) -> io::Result<()> {
        match record {
            RecordValue::Fields(fields) => {
                let mut delim = [0u8; 4];
                let delim = self.delimiter.encode_utf8(&mut delim).to_string();
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        self.out.write_all(delim.as_bytes())?;
                    }
                    self.write_field(field)?;
                }
            }
            RecordValue::Line(line) => self.out.write_all(line.as_bytes())?,
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

//! CSV record reading and writing.
//!
//! CSV is a delimited format with quoting instead of character escapes: a
//! field containing the delimiter, the quote character or a newline is
//! wrapped in quotes, and embedded quotes are escaped by doubling. The
//! reader is a four-state machine per field (before text, unquoted text,
//! quoted text, after the closing quote). Structural violations reject the
//! record but leave the stream readable.

use std::io::{self, BufRead, Write};

use log::{trace, warn};

use crate::error::{ConfigError, ReadError};
use crate::record::{RawRecord, RecordReader, RecordValue, RecordWriter};
use crate::stream::{CharReader, CommentSkipper};

/// Configuration shared by [`CsvReader`] and [`CsvWriter`].
#[derive(Debug, Clone)]
pub struct CsvParserConfig {
    /// Field delimiter.
    pub delimiter: char,
    /// Quote character wrapping fields that contain special characters.
    pub quote: char,
    /// Escape character inside quoted fields. Defaults to the quote
    /// character, i.e. escaping by doubling. `None` disables escapes, so a
    /// quote always closes the field.
    pub escape: Option<char>,
    /// Allow quoted fields to span physical lines.
    pub multiline: bool,
    /// Allow whitespace around a quoted field.
    pub whitespace_allowed: bool,
    /// Allow unescaped quote characters inside unquoted fields.
    pub unquoted_quotes_allowed: bool,
    /// Writer: quote every field regardless of content.
    pub always_quote: bool,
    /// Record terminator. `None` auto-detects CR, LF or CRLF.
    pub record_terminator: Option<char>,
    /// Line prefixes marking a whole line as a comment.
    pub comments: Vec<String>,
}

impl Default for CsvParserConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: '"',
            escape: Some('"'),
            multiline: false,
            whitespace_allowed: false,
            unquoted_quotes_allowed: false,
            always_quote: false,
            record_terminator: None,
            comments: Vec::new(),
        }
    }
}

impl CsvParserConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.quote == self.delimiter {
            return Err(ConfigError::QuoteMatchesDelimiter);
        }
        if self.escape == Some(self.delimiter) {
            return Err(ConfigError::EscapeMatchesDelimiter);
        }
        if self.record_terminator == Some(self.delimiter) {
            return Err(ConfigError::TerminatorMatchesDelimiter);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldState {
    /// Before any field text; leading whitespace may be skipped here.
    Start,
    Unquoted,
    Quoted,
    /// After the closing quote; only the delimiter, the terminator or
    /// whitespace may follow.
    QuoteDone,
}

/// Reads CSV records from a character stream.
pub struct CsvReader<R: BufRead> {
    chars: CharReader<R>,
    delimiter: char,
    quote: char,
    escape: Option<char>,
    multiline: bool,
    whitespace_allowed: bool,
    unquoted_quotes_allowed: bool,
    terminator: Option<char>,
    comments: Option<CommentSkipper>,
    /// Physical lines fully consumed.
    line: usize,
    skip_lf: bool,
    eof: bool,
}

impl<R: BufRead> CsvReader<R> {
    pub fn new(reader: R, config: CsvParserConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let comments = CommentSkipper::new(&config.comments, config.record_terminator);
        Ok(Self {
            chars: CharReader::new(reader),
            delimiter: config.delimiter,
            quote: config.quote,
            escape: config.escape,
            multiline: config.multiline,
            whitespace_allowed: config.whitespace_allowed,
            unquoted_quotes_allowed: config.unquoted_quotes_allowed,
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

    /// Discard the rest of a malformed record so the next read starts on a
    /// record boundary.
    fn discard_line(&mut self) -> Result<(), ReadError> {
        while let Some(c) = self.chars.next_char()? {
            if self.end_of_record(c) {
                self.line += 1;
                return Ok(());
            }
        }
        self.eof = true;
        self.line += 1;
        Ok(())
    }
}

impl<R: BufRead> RecordReader for CsvReader<R> {
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
        let mut fields: Vec<String> = Vec::new();
        let mut field = String::new();
        let mut text = String::new();
        let mut state = FieldState::Start;
        let mut eol = false;
        let mut malformed: Option<&'static str> = None;
        // set when the char that triggered the error already ended the line
        let mut malformed_terminated = false;

        while let Some(c) = self.chars.next_char()? {
            if self.skip_lf {
                self.skip_lf = false;
                if c == '\n' {
                    continue;
                }
            }

            text.push(c);

            match state {
                FieldState::Start => {
                    if c == self.quote {
                        state = FieldState::Quoted;
                    } else if c == self.delimiter {
                        fields.push(String::new());
                    } else if self.end_of_record(c) {
                        text.pop();
                        eol = true;
                        break;
                    } else if self.whitespace_allowed && c.is_whitespace() {
                        // leading whitespace before a field
                    } else {
                        field.push(c);
                        state = FieldState::Unquoted;
                    }
                }
                FieldState::Unquoted => {
                    if c == self.delimiter {
                        fields.push(std::mem::take(&mut field));
                        state = FieldState::Start;
                    } else if self.end_of_record(c) {
                        text.pop();
                        eol = true;
                        break;
                    } else if c == self.quote && !self.unquoted_quotes_allowed {
                        malformed = Some("quotation character in unquoted field");
                        break;
                    } else {
                        field.push(c);
                    }
                }
                FieldState::Quoted => {
                    if self.escape == Some(c) {
                        // the escape applies to the quote and to itself;
                        // anything else leaves it literal
                        let next = self.chars.peek()?;
                        if next == Some(self.quote) || next == self.escape {
                            let literal = self.chars.next_char()?.unwrap_or_default();
                            text.push(literal);
                            field.push(literal);
                        } else if c == self.quote {
                            state = FieldState::QuoteDone;
                        } else {
                            field.push(c);
                        }
                    } else if c == self.quote {
                        state = FieldState::QuoteDone;
                    } else if self.terminator.is_none() && (c == '\r' || c == '\n') {
                        if !self.multiline {
                            if c == '\r' {
                                self.skip_lf = true;
                            }
                            self.line += 1;
                            malformed = Some("unterminated quoted field");
                            malformed_terminated = true;
                            break;
                        }
                        self.line += 1;
                        field.push('\n');
                        if c == '\r' && self.chars.peek()? == Some('\n') {
                            self.chars.next_char()?;
                            text.push('\n');
                        }
                    } else {
                        field.push(c);
                    }
                }
                FieldState::QuoteDone => {
                    if c == self.delimiter {
                        fields.push(std::mem::take(&mut field));
                        state = FieldState::Start;
                    } else if self.end_of_record(c) {
                        text.pop();
                        eol = true;
                        break;
                    } else if self.whitespace_allowed && c.is_whitespace() {
                        // trailing whitespace after the closing quote
                    } else {
                        malformed = Some("invalid character following the closing quote");
                        break;
                    }
                }
            }
        }

        if let Some(reason) = malformed {
            warn!("malformed record at line {record_line}: {reason}");
            if !malformed_terminated {
                self.discard_line()?;
            }
            return Err(ReadError::Malformed {
                line: record_line,
                reason: reason.to_string(),
            });
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

        if state == FieldState::Quoted {
            self.line += 1;
            return Err(ReadError::Malformed {
                line: record_line,
                reason: "unterminated quoted field".to_string(),
            });
        }

        if text.is_empty() {
            return Ok(None);
        }

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

/// Writes CSV records, quoting fields as needed.
pub struct CsvWriter<W: Write> {
    out: W,
    delimiter: char,
    quote: char,
    escape: char,
    always_quote: bool,
    terminator: String,
    lines: usize,
    closed: bool,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(out: W, config: CsvParserConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let terminator = config
            .record_terminator
            .map(String::from)
            .unwrap_or_else(|| "\n".to_string());
        Ok(Self {
            out,
            delimiter: config.delimiter,
            quote: config.quote,
            escape: config.escape.unwrap_or(config.quote),
            always_quote: config.always_quote,
            terminator,
            lines: 0,
            closed: false,
        })
    }

    /// Physical lines written so far, counting newlines embedded in quoted
    /// fields.
    pub fn line_number(&self) -> usize {
        self.lines
    }

    fn write_field(&mut self, field: &str) -> io::Result<usize> {
        let needs_quote = self.always_quote
            || field
                .chars()
                .any(|c| c == self.delimiter || c == self.quote || c == '\r' || c == '\n');
        if !needs_quote {
            self.out.write_all(field.as_bytes())?;
            return Ok(0);
        }

        let mut buf = String::with_capacity(field.len() + 2);
        let mut embedded_lines = 0;
        buf.push(self.quote);
        for c in field.chars() {
            if c == self.quote || c == self.escape {
                buf.push(self.escape);
            }
            if c == '\n' {
                embedded_lines += 1;
            }
            buf.push(c);
        }
        buf.push(self.quote);
        self.out.write_all(buf.as_bytes())?;
        Ok(embedded_lines)
    }
}

impl<W: Write> RecordWriter for CsvWriter<W> {
    fn write(&mut self, record: &RecordValue) -> io::Result<()> {
        let mut embedded_lines = 0;
        match record {
            RecordValue::Fields(fields) => {
                let mut delim = [0u8; 4];
                let delim = self.delimiter.encode_utf8(&mut delim).to_string();
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        self.out.write_all(delim.as_bytes())?;
                    }
                    embedded_lines += self.write_field(field)?;
                }
            }
            RecordValue::Line(line) => self.out.write_all(line.as_bytes())?,
        }
        self.out.write_all(self.terminator.as_bytes())?;
        self.lines += 1 + embedded_lines;
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

//! Character-level input with a markable lookahead window.
//!
//! [`CharReader`] decodes UTF-8 characters off a byte stream one at a time.
//! A bounded mark/reset window supports the one-line lookahead needed for
//! comment detection, so the tokenizer state machines never know whether
//! comments are enabled. Resetting after the window has been exceeded is a
//! recoverable error, not a crash.

use std::collections::VecDeque;
use std::io::{self, BufRead};

use crate::error::ReadError;

/// A character stream over a buffered byte reader.
pub struct CharReader<R> {
    inner: R,
    /// Characters pushed back by `reset` or `peek`, oldest first.
    lookahead: VecDeque<char>,
    mark: Option<Mark>,
}

#[derive(Debug)]
struct Mark {
    limit: usize,
    replay: Vec<char>,
    exceeded: bool,
}

impl<R: BufRead> CharReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            lookahead: VecDeque::new(),
            mark: None,
        }
    }

    /// Read the next character, or `None` at end of stream.
    pub fn next_char(&mut self) -> Result<Option<char>, ReadError> {
        let next = match self.lookahead.pop_front() {
            Some(c) => Some(c),
            None => self.decode()?,
        };
        if let (Some(c), Some(mark)) = (next, self.mark.as_mut()) {
            if mark.replay.len() < mark.limit {
                mark.replay.push(c);
            } else {
                mark.exceeded = true;
            }
        }
        Ok(next)
    }

    /// Look at the next character without consuming it.
    pub fn peek(&mut self) -> Result<Option<char>, ReadError> {
        if let Some(&c) = self.lookahead.front() {
            return Ok(Some(c));
        }
        match self.decode()? {
            Some(c) => {
                self.lookahead.push_back(c);
                Ok(Some(c))
            }
            None => Ok(None),
        }
    }

    /// Mark the current position. Up to `limit` characters may be read and
    /// replayed by a later [`reset`](Self::reset). A new mark discards any
    /// previous one.
    pub fn mark(&mut self, limit: usize) {
        self.mark = Some(Mark {
            limit,
            replay: Vec::with_capacity(limit),
            exceeded: false,
        });
    }

    /// Rewind to the most recent mark.
    pub fn reset(&mut self) -> Result<(), ReadError> {
        match self.mark.take() {
            None => Err(io::Error::new(io::ErrorKind::InvalidInput, "reset without a mark").into()),
            Some(mark) if mark.exceeded => Err(ReadError::MarkExceeded { limit: mark.limit }),
            Some(mut mark) => {
                for c in mark.replay.drain(..).rev() {
                    self.lookahead.push_front(c);
                }
                Ok(())
            }
        }
    }

    /// Drop the current mark without rewinding.
    pub fn clear_mark(&mut self) {
        self.mark = None;
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let buf = self.inner.fill_buf()?;
        if buf.is_empty() {
            return Ok(None);
        }
        let b = buf[0];
        self.inner.consume(1);
        Ok(Some(b))
    }

    fn decode(&mut self) -> Result<Option<char>, ReadError> {
        let Some(first) = self.next_byte()? else {
            return Ok(None);
        };
        let width = utf8_width(first).ok_or_else(invalid_utf8)?;
        let mut bytes = [first, 0, 0, 0];
        for slot in bytes.iter_mut().take(width).skip(1) {
            *slot = self.next_byte()?.ok_or_else(invalid_utf8)?;
        }
        let s = std::str::from_utf8(&bytes[..width]).map_err(|_| invalid_utf8())?;
        Ok(s.chars().next())
    }
}

fn utf8_width(b: u8) -> Option<usize> {
    match b {
        0x00..=0x7f => Some(1),
        0xc2..=0xdf => Some(2),
        0xe0..=0xef => Some(3),
        0xf0..=0xf4 => Some(4),
        _ => None,
    }
}

fn invalid_utf8() -> ReadError {
    io::Error::new(io::ErrorKind::InvalidData, "stream is not valid UTF-8").into()
}

/// Skips whole comment lines at a record boundary.
pub(crate) struct CommentSkipper {
    prefixes: Vec<String>,
    max_prefix: usize,
    terminator: Option<char>,
}

impl CommentSkipper {
    /// `None` when no prefixes are configured, so readers can skip the
    /// lookahead machinery entirely.
    pub fn new(prefixes: &[String], terminator: Option<char>) -> Option<Self> {
        if prefixes.is_empty() {
            return None;
        }
        let max_prefix = prefixes.iter().map(|p| p.chars().count()).max().unwrap_or(0);
        Some(Self {
            prefixes: prefixes.to_vec(),
            max_prefix,
            terminator,
        })
    }

    fn is_terminator(&self, c: char) -> bool {
        match self.terminator {
            Some(t) => c == t,
            None => c == '\n' || c == '\r',
        }
    }

    /// Consume any comment lines at the current position. Returns the
    /// number of physical lines skipped.
    pub fn skip<R: BufRead>(&self, chars: &mut CharReader<R>) -> Result<usize, ReadError> {
        let mut lines = 0;
        loop {
            chars.mark(self.max_prefix);
            let mut probe = String::new();
            let mut terminated = None;
            let mut at_eof = false;
            while probe.chars().count() < self.max_prefix {
                match chars.next_char()? {
                    None => {
                        at_eof = true;
                        break;
                    }
                    Some(c) if self.is_terminator(c) => {
                        terminated = Some(c);
                        break;
                    }
                    Some(c) => probe.push(c),
                }
            }
            if probe.is_empty() || !self.prefixes.iter().any(|p| probe.starts_with(p.as_str())) {
                chars.reset()?;
                return Ok(lines);
            }
            chars.clear_mark();
            if terminated.is_some() || !at_eof {
                self.finish_line(chars, terminated)?;
            }
            lines += 1;
        }
    }

    /// Consume to the end of the current line. `seen` is a terminator
    /// already consumed, if any.
    fn finish_line<R: BufRead>(
        &self,
        chars: &mut CharReader<R>,
        seen: Option<char>,
    ) -> Result<(), ReadError> {
        let term = match seen {
            Some(c) => Some(c),
            None => loop {
                match chars.next_char()? {
                    None => break None,
                    Some(c) if self.is_terminator(c) => break Some(c),
                    Some(_) => {}
                }
            },
        };
        // CRLF is one terminator in auto-detect mode
        if term == Some('\r') && self.terminator.is_none() && chars.peek()? == Some('\n') {
            chars.next_char()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(text: &str) -> CharReader<&[u8]> {
        CharReader::new(text.as_bytes())
    }

    fn drain<R: BufRead>(chars: &mut CharReader<R>) -> String {
        let mut out = String::new();
        while let Some(c) = chars.next_char().unwrap() {
            out.push(c);
        }
        out
    }

    #[test]
    fn test_reads_multibyte_chars() {
        let mut chars = reader("aé€x");
        assert_eq!(drain(&mut chars), "aé€x");
    }

    #[test]
    fn test_mark_and_reset_replays() {
        let mut chars = reader("abcdef");
        assert_eq!(chars.next_char().unwrap(), Some('a'));
        chars.mark(3);
        assert_eq!(chars.next_char().unwrap(), Some('b'));
        assert_eq!(chars.next_char().unwrap(), Some('c'));
        chars.reset().unwrap();
        assert_eq!(drain(&mut chars), "bcdef");
    }

    #[test]
    fn test_reset_past_window_is_recoverable() {
        let mut chars = reader("abcdef");
        chars.mark(2);
        for _ in 0..3 {
            chars.next_char().unwrap();
        }
        match chars.reset() {
            Err(ReadError::MarkExceeded { limit }) => assert_eq!(limit, 2),
            other => panic!("expected MarkExceeded, got {other:?}"),
        }
        // the stream keeps reading from where it was
        assert_eq!(chars.next_char().unwrap(), Some('d'));
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut chars = reader("xy");
        assert_eq!(chars.peek().unwrap(), Some('x'));
        assert_eq!(chars.peek().unwrap(), Some('x'));
        assert_eq!(chars.next_char().unwrap(), Some('x'));
        assert_eq!(chars.next_char().unwrap(), Some('y'));
        assert_eq!(chars.peek().unwrap(), None);
    }

    #[test]
    fn test_invalid_utf8_is_io_error() {
        let mut chars = CharReader::new(&[0xffu8, b'a'][..]);
        assert!(matches!(chars.next_char(), Err(ReadError::Io(_))));
    }

    #[test]
    fn test_skips_comment_lines() {
        let skipper = CommentSkipper::new(&["#".to_string()], None).unwrap();
        let mut chars = reader("# one\n# two\ndata\n");
        assert_eq!(skipper.skip(&mut chars).unwrap(), 2);
        assert_eq!(drain(&mut chars), "data\n");
    }

    #[test]
    fn test_non_comment_line_untouched() {
        let skipper = CommentSkipper::new(&["//".to_string()], None).unwrap();
        let mut chars = reader("data\n");
        assert_eq!(skipper.skip(&mut chars).unwrap(), 0);
        assert_eq!(drain(&mut chars), "data\n");
    }

    #[test]
    fn test_short_line_shorter_than_prefix() {
        let skipper = CommentSkipper::new(&["//".to_string()], None).unwrap();
        let mut chars = reader("/\nrest");
        assert_eq!(skipper.skip(&mut chars).unwrap(), 0);
        assert_eq!(drain(&mut chars), "/\nrest");
    }

    #[test]
    fn test_comment_crlf_counts_once() {
        let skipper = CommentSkipper::new(&["#".to_string()], None).unwrap();
        let mut chars = reader("#c\r\nabc");
        assert_eq!(skipper.skip(&mut chars).unwrap(), 1);
        assert_eq!(drain(&mut chars), "abc");
    }

    #[test]
    fn test_comment_at_eof_without_newline() {
        let skipper = CommentSkipper::new(&["#".to_string()], None).unwrap();
        let mut chars = reader("#tail");
        assert_eq!(skipper.skip(&mut chars).unwrap(), 1);
        assert_eq!(chars.next_char().unwrap(), None);
    }

    #[test]
    fn test_multiple_prefixes() {
        let skipper =
            CommentSkipper::new(&["#".to_string(), "--".to_string()], None).unwrap();
        let mut chars = reader("-- a\n# b\nvalue");
        assert_eq!(skipper.skip(&mut chars).unwrap(), 2);
        assert_eq!(drain(&mut chars), "value");
    }
}

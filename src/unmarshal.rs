//! Record unmarshalling contexts: positioned field extraction with
//! per-record diagnostics.
//!
//! A context wraps one raw record value at a time and never mutates it.
//! Field positions may be negative (counted from the end of the record),
//! and an `until` bound marks positions near the end of a variable-length
//! record as absent rather than erroring. Everything extracted is cached on
//! a [`RecordContext`] snapshot for error reporting, together with any
//! record-level or field-level structural errors.

use std::collections::HashMap;

/// Read-only diagnostics for the record currently loaded into an
/// unmarshalling context: raw text, line number, per-field raw text and
/// accumulated errors. Snapshots are taken at extraction time, not live
/// views.
#[derive(Debug, Clone, Default)]
pub struct RecordContext {
    line_number: usize,
    record_text: String,
    field_text: HashMap<String, Vec<String>>,
    field_errors: HashMap<String, Vec<String>>,
    record_errors: Vec<String>,
}

impl RecordContext {
    /// Physical line the record started on, 1-based.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// The record's literal text.
    pub fn record_text(&self) -> &str {
        &self.record_text
    }

    /// Raw text of the first extraction of `name`.
    pub fn field_text(&self, name: &str) -> Option<&str> {
        self.field_text_at(name, 0)
    }

    /// Raw text of the `index`th extraction of `name`, for fields repeated
    /// inside an array segment.
    pub fn field_text_at(&self, name: &str, index: usize) -> Option<&str> {
        self.field_text
            .get(name)
            .and_then(|texts| texts.get(index))
            .map(String::as_str)
    }

    /// Errors recorded against one field.
    pub fn field_errors(&self, name: &str) -> &[String] {
        self.field_errors.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Errors recorded against the record as a whole.
    pub fn record_errors(&self) -> &[String] {
        &self.record_errors
    }

    pub fn has_errors(&self) -> bool {
        !self.record_errors.is_empty() || !self.field_errors.is_empty()
    }

    fn set_record(&mut self, line_number: usize, text: String) {
        self.line_number = line_number;
        self.record_text = text;
    }

    fn cache_field_text(&mut self, name: &str, text: String) {
        self.field_text.entry(name.to_string()).or_default().push(text);
    }

    fn add_field_error(&mut self, name: &str, message: String) {
        self.field_errors
            .entry(name.to_string())
            .or_default()
            .push(message);
    }

    fn add_record_error(&mut self, message: String) {
        self.record_errors.push(message);
    }

    fn clear(&mut self) {
        self.line_number = 0;
        self.record_text.clear();
        self.field_text.clear();
        self.field_errors.clear();
        self.record_errors.clear();
    }
}

/// Extracts fields by position from a delimited record.
#[derive(Debug, Default)]
pub struct DelimitedUnmarshalContext {
    fields: Vec<String>,
    field_offset: i32,
    context: RecordContext,
}

impl DelimitedUnmarshalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load one record, resetting all cached diagnostics.
    pub fn set_record(&mut self, fields: Vec<String>, line_number: usize, text: String) {
        self.clear();
        self.context.set_record(line_number, text);
        self.fields = fields;
    }

    /// Reset between records.
    pub fn clear(&mut self) {
        self.fields.clear();
        self.field_offset = 0;
        self.context.clear();
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Base offset added to every resolved position, set per iteration of a
    /// repeating segment by the surrounding configuration tree.
    pub fn set_field_offset(&mut self, offset: i32) {
        self.field_offset = offset;
    }

    /// The raw text of the field at `position`, or `None` if the field is
    /// absent from this record. Absence is not an error here; the caller
    /// decides whether a missing field is acceptable.
    pub fn field_text(&mut self, name: &str, position: i32, until: i32) -> Option<&str> {
        let count = self.fields.len() as i32;
        let index = if position < 0 {
            let index = position + count + self.field_offset;
            if index < 0 || index >= count {
                return None;
            }
            index
        } else {
            let index = position + self.field_offset;
            if index < 0 || index >= count + until {
                return None;
            }
            index
        };
        let text = self.fields[index as usize].clone();
        self.context.cache_field_text(name, text);
        Some(&self.fields[index as usize])
    }

    pub fn add_field_error(&mut self, name: &str, message: String) {
        self.context.add_field_error(name, message);
    }

    pub fn add_record_error(&mut self, message: String) {
        self.context.add_record_error(message);
    }

    /// The diagnostics snapshot for the loaded record.
    pub fn record_context(&self) -> &RecordContext {
        &self.context
    }
}

/// Extracts fields by character position from a fixed-length record.
#[derive(Debug, Default)]
pub struct FixedLengthUnmarshalContext {
    record: String,
    char_count: usize,
    field_offset: i32,
    context: RecordContext,
}

impl FixedLengthUnmarshalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load one record, resetting all cached diagnostics. `line` is the
    /// logical record; `text` its literal form for diagnostics.
    pub fn set_record(&mut self, line: String, line_number: usize, text: String) {
        self.clear();
        self.char_count = line.chars().count();
        self.context.set_record(line_number, text);
        self.record = line;
    }

    /// Reset between records.
    pub fn clear(&mut self) {
        self.record.clear();
        self.char_count = 0;
        self.field_offset = 0;
        self.context.clear();
    }

    /// Record length in characters.
    pub fn record_len(&self) -> usize {
        self.char_count
    }

    /// Base offset added to every resolved position, set per iteration of a
    /// repeating segment by the surrounding configuration tree.
    pub fn set_field_offset(&mut self, offset: i32) {
        self.field_offset = offset;
    }

    /// The raw text of the `length` characters at `position`, clipped to
    /// the record bound, or `None` if the field is absent. `length` of `-1`
    /// reads to the bound.
    pub fn field_text(
        &mut self,
        name: &str,
        position: i32,
        length: i32,
        until: i32,
    ) -> Option<&str> {
        let len = self.char_count as i32;
        let max = len + until;
        let mut index = position;
        if index < 0 {
            index += len;
        }
        index += self.field_offset;
        if index < 0 || index >= max {
            return None;
        }
        let end = if length < 0 {
            max
        } else {
            (index + length).min(max)
        };
        let (byte_start, byte_end) = self.byte_range(index as usize, end as usize);
        let text = self.record[byte_start..byte_end].to_string();
        self.context.cache_field_text(name, text);
        Some(&self.record[byte_start..byte_end])
    }

    pub fn add_field_error(&mut self, name: &str, message: String) {
        self.context.add_field_error(name, message);
    }

    pub fn add_record_error(&mut self, message: String) {
        self.context.add_record_error(message);
    }

    /// The diagnostics snapshot for the loaded record.
    pub fn record_context(&self) -> &RecordContext {
        &self.context
    }

    /// Byte offsets of the character range `start..end`.
    fn byte_range(&self, start: usize, end: usize) -> (usize, usize) {
        if start >= end {
            return (0, 0);
        }
        let mut byte_start = self.record.len();
        let mut byte_end = self.record.len();
        for (n, (b, _)) in self.record.char_indices().enumerate() {
            if n == start {
                byte_start = b;
            }
            if n == end {
                byte_end = b;
                break;
            }
        }
        (byte_start, byte_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delimited(fields: &[&str]) -> DelimitedUnmarshalContext {
        let mut ctx = DelimitedUnmarshalContext::new();
        ctx.set_record(
            fields.iter().map(|s| s.to_string()).collect(),
            1,
            fields.join(","),
        );
        ctx
    }

    fn fixed(line: &str) -> FixedLengthUnmarshalContext {
        let mut ctx = FixedLengthUnmarshalContext::new();
        ctx.set_record(line.to_string(), 1, line.to_string());
        ctx
    }

    #[test]
    fn test_delimited_positional_extraction() {
        let mut ctx = delimited(&["a", "b", "c"]);
        assert_eq!(ctx.field_text("first", 0, 0), Some("a"));
        assert_eq!(ctx.field_text("third", 2, 0), Some("c"));
        assert_eq!(ctx.field_text("fourth", 3, 0), None);
    }

    #[test]
    fn test_delimited_negative_position() {
        let mut ctx = delimited(&["a", "b", "c"]);
        assert_eq!(ctx.field_text("last", -1, 0), Some("c"));
        assert_eq!(ctx.field_text("first", -3, 0), Some("a"));
        assert_eq!(ctx.field_text("missing", -4, 0), None);
    }

    #[test]
    fn test_delimited_until_bound() {
        // a field at position 2 reserved for the record tail: with two
        // trailing fields reserved, it is absent from a 3-field record
        let mut ctx = delimited(&["a", "b", "c"]);
        assert_eq!(ctx.field_text("tail", 2, -1), None);
        assert_eq!(ctx.field_text("body", 1, -1), Some("b"));
    }

    #[test]
    fn test_delimited_field_offset() {
        let mut ctx = delimited(&["h", "x1", "x2", "y1", "y2"]);
        ctx.set_field_offset(1);
        assert_eq!(ctx.field_text("value", 0, 0), Some("x1"));
        ctx.set_field_offset(3);
        assert_eq!(ctx.field_text("value", 0, 0), Some("y1"));
    }

    #[test]
    fn test_fixed_negative_position_extraction() {
        let mut ctx = fixed("ABCDE");
        assert_eq!(ctx.field_text("tail", -2, 2, 0), Some("DE"));
    }

    #[test]
    fn test_fixed_until_bound() {
        let mut ctx = fixed("ABCDE");
        assert_eq!(ctx.field_text("head", 0, -1, -2), Some("ABC"));
    }

    #[test]
    fn test_fixed_length_clipped_to_bound() {
        let mut ctx = fixed("ABCDE");
        assert_eq!(ctx.field_text("wide", 3, 10, 0), Some("DE"));
    }

    #[test]
    fn test_fixed_out_of_bounds_is_absent() {
        let mut ctx = fixed("ABCDE");
        assert_eq!(ctx.field_text("beyond", 5, 1, 0), None);
        assert_eq!(ctx.field_text("far", -9, 1, 0), None);
    }

    #[test]
    fn test_fixed_multibyte_positions() {
        let mut ctx = fixed("éèêAB");
        assert_eq!(ctx.field_text("accents", 0, 3, 0), Some("éèê"));
        assert_eq!(ctx.field_text("ascii", 3, 2, 0), Some("AB"));
    }

    #[test]
    fn test_extraction_cached_for_diagnostics() {
        let mut ctx = delimited(&["a", "b"]);
        ctx.field_text("first", 0, 0);
        ctx.field_text("second", 1, 0);
        let rc = ctx.record_context();
        assert_eq!(rc.field_text("first"), Some("a"));
        assert_eq!(rc.field_text("second"), Some("b"));
        assert_eq!(rc.field_text("third"), None);
        assert_eq!(rc.line_number(), 1);
        assert_eq!(rc.record_text(), "a,b");
    }

    #[test]
    fn test_repeated_extraction_indexed() {
        let mut ctx = delimited(&["x1", "x2"]);
        ctx.field_text("value", 0, 0);
        ctx.set_field_offset(1);
        ctx.field_text("value", 0, 0);
        let rc = ctx.record_context();
        assert_eq!(rc.field_text_at("value", 0), Some("x1"));
        assert_eq!(rc.field_text_at("value", 1), Some("x2"));
    }

    #[test]
    fn test_errors_accumulate() {
        let mut ctx = delimited(&["a"]);
        ctx.add_record_error("too few fields".to_string());
        ctx.add_field_error("amount", "invalid padded length".to_string());
        let rc = ctx.record_context();
        assert!(rc.has_errors());
        assert_eq!(rc.record_errors(), ["too few fields"]);
        assert_eq!(rc.field_errors("amount"), ["invalid padded length"]);
        assert!(rc.field_errors("other").is_empty());
    }

    #[test]
    fn test_clear_resets_diagnostics() {
        let mut ctx = delimited(&["a"]);
        ctx.field_text("first", 0, 0);
        ctx.add_record_error("oops".to_string());
        ctx.set_record(vec!["b".to_string()], 2, "b".to_string());
        let rc = ctx.record_context();
        assert!(!rc.has_errors());
        assert_eq!(rc.field_text("first"), None);
        assert_eq!(rc.line_number(), 2);
    }
}

//! Field and record layout descriptors.
//!
//! A [`FieldDescriptor`] is what the configuration compiler hands this
//! engine per field: a name, a position (negative counts from the end of
//! the record), an `until` bound, a width for fixed-length records and the
//! padding rules. Extraction applies the structural decision table
//! (absent, invalid padded length, optional blank, keep-padding, unpad) and
//! yields a [`FieldValue`]; preparation pads outgoing text for assembly.

use crate::padding::FieldPadding;
use crate::unmarshal::{DelimitedUnmarshalContext, FixedLengthUnmarshalContext};
use crate::value::FieldValue;

/// Layout of one named field within a record.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    /// Offset from the record start (0-based), or from the end when
    /// negative (`-1` is the last field or character).
    pub position: i32,
    /// Maximum position expressed as an offset (≤ 0) from the record's
    /// field/character count; at or beyond it the field is absent.
    pub until: i32,
    /// Width in characters for fixed-length records; `-1` reads to the
    /// `until` bound.
    pub length: i32,
    pub padding: Option<FieldPadding>,
    /// Return the padded text as-is instead of unpadding (fixed-length).
    pub keep_padding: bool,
    /// Accept a padded length that differs from the configured width.
    pub lenient_padding: bool,
    /// Treat a present-but-empty value as missing.
    pub lazy: bool,
}

impl FieldDescriptor {
    pub fn new(name: &str, position: i32) -> Self {
        Self {
            name: name.to_string(),
            position,
            until: 0,
            length: -1,
            padding: None,
            keep_padding: false,
            lenient_padding: false,
            lazy: false,
        }
    }

    /// Extract this field from a delimited record.
    pub fn extract_delimited(&self, ctx: &mut DelimitedUnmarshalContext) -> FieldValue {
        let Some(text) = ctx.field_text(&self.name, self.position, self.until) else {
            return FieldValue::Missing;
        };
        let text = text.to_string();
        self.postprocess(text, false, &mut |message| {
            ctx.add_field_error(&self.name, message)
        })
    }

    /// Extract this field from a fixed-length record.
    pub fn extract_fixed(&self, ctx: &mut FixedLengthUnmarshalContext) -> FieldValue {
        let Some(text) = ctx.field_text(&self.name, self.position, self.length, self.until) else {
            return FieldValue::Missing;
        };
        let text = text.to_string();
        self.postprocess(text, true, &mut |message| {
            ctx.add_field_error(&self.name, message)
        })
    }

    /// Pad outgoing text for assembly. Missing and invalid values
    /// contribute nothing; nil marshals as an empty (padded) value.
    pub fn prepare(&self, value: &FieldValue) -> Option<String> {
        let text = match value {
            FieldValue::Text(text) => text.as_str(),
            FieldValue::Nil => "",
            FieldValue::Missing | FieldValue::Invalid => return None,
        };
        Some(match &self.padding {
            Some(padding) => padding.pad(text),
            None => text.to_string(),
        })
    }

    /// The structural decision table. Order matters: the optional
    /// all-filler rule applies before length validation so an optional
    /// blank field reads as empty even when the record is otherwise
    /// invalid.
    fn postprocess(
        &self,
        text: String,
        fixed: bool,
        report: &mut dyn FnMut(String),
    ) -> FieldValue {
        let unpadded = match &self.padding {
            Some(padding) => {
                if fixed
                    && padding.optional
                    && !text.is_empty()
                    && text.chars().all(|c| c == padding.filler)
                {
                    String::new()
                } else if !self.lenient_padding && text.chars().count() != padding.length {
                    report(format!(
                        "invalid padded length: expected {} characters, got {}",
                        padding.length,
                        text.chars().count()
                    ));
                    return FieldValue::Invalid;
                } else if self.keep_padding && fixed {
                    text
                } else {
                    padding.unpad(&text)
                }
            }
            None => text,
        };
        if self.lazy && unpadded.is_empty() {
            return FieldValue::Missing;
        }
        FieldValue::Text(unpadded)
    }
}

/// Structural bounds of one record layout: field count for delimited
/// records, character length for fixed-length records. The match bounds
/// identify which layout applies without reporting errors.
#[derive(Debug, Clone, Copy)]
pub struct RecordBounds {
    pub min_len: usize,
    pub max_len: Option<usize>,
    pub min_match_len: usize,
    pub max_match_len: Option<usize>,
}

impl Default for RecordBounds {
    fn default() -> Self {
        Self {
            min_len: 0,
            max_len: None,
            min_match_len: 0,
            max_match_len: None,
        }
    }
}

impl RecordBounds {
    /// Validate a delimited record's field count, recording violations as
    /// record errors. Extraction of individual fields continues either way.
    pub fn validate_delimited(&self, ctx: &mut DelimitedUnmarshalContext) -> bool {
        self.validate(ctx.field_count(), "field(s)", &mut |m| ctx.add_record_error(m))
    }

    /// Validate a fixed-length record's character length, recording
    /// violations as record errors.
    pub fn validate_fixed(&self, ctx: &mut FixedLengthUnmarshalContext) -> bool {
        self.validate(ctx.record_len(), "character(s)", &mut |m| {
            ctx.add_record_error(m)
        })
    }

    fn validate(&self, len: usize, unit: &str, report: &mut dyn FnMut(String)) -> bool {
        if len < self.min_len {
            report(format!(
                "record too short: expected at least {} {unit}, got {len}",
                self.min_len
            ));
            return false;
        }
        if let Some(max) = self.max_len {
            if len > max {
                report(format!(
                    "record too long: expected at most {max} {unit}, got {len}"
                ));
                return false;
            }
        }
        true
    }

    /// Whether a record of `len` fields/characters can match this layout.
    pub fn matches_len(&self, len: usize) -> bool {
        len >= self.min_match_len && self.max_match_len.is_none_or(|max| len <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::padding::{FieldPadding, Justify};
    use crate::unmarshal::{DelimitedUnmarshalContext, FixedLengthUnmarshalContext};

    fn fixed_ctx(line: &str) -> FixedLengthUnmarshalContext {
        let mut ctx = FixedLengthUnmarshalContext::new();
        ctx.set_record(line.to_string(), 1, line.to_string());
        ctx
    }

    fn delimited_ctx(fields: &[&str]) -> DelimitedUnmarshalContext {
        let mut ctx = DelimitedUnmarshalContext::new();
        ctx.set_record(
            fields.iter().map(|s| s.to_string()).collect(),
            1,
            fields.join(","),
        );
        ctx
    }

    fn zero_padded(length: usize, optional: bool) -> FieldPadding {
        FieldPadding {
            length,
            filler: '0',
            justify: Justify::Right,
            optional,
        }
    }

    #[test]
    fn test_absent_field_is_missing() {
        let mut ctx = delimited_ctx(&["a"]);
        let field = FieldDescriptor::new("second", 1);
        assert_eq!(field.extract_delimited(&mut ctx), FieldValue::Missing);
    }

    #[test]
    fn test_plain_extraction() {
        let mut ctx = delimited_ctx(&["a", "b"]);
        let field = FieldDescriptor::new("second", 1);
        assert_eq!(field.extract_delimited(&mut ctx), FieldValue::from("b"));
    }

    #[test]
    fn test_padded_extraction_unpads() {
        let mut ctx = fixed_ctx("00042ABC");
        let mut field = FieldDescriptor::new("amount", 0);
        field.length = 5;
        field.padding = Some(zero_padded(5, false));
        assert_eq!(field.extract_fixed(&mut ctx), FieldValue::from("42"));
    }

    #[test]
    fn test_padded_length_mismatch_is_invalid() {
        let mut ctx = delimited_ctx(&["042"]);
        let mut field = FieldDescriptor::new("amount", 0);
        field.padding = Some(zero_padded(5, false));
        assert_eq!(field.extract_delimited(&mut ctx), FieldValue::Invalid);
        assert_eq!(ctx.record_context().field_errors("amount").len(), 1);
    }

    #[test]
    fn test_lenient_padding_accepts_short_text() {
        let mut ctx = delimited_ctx(&["042"]);
        let mut field = FieldDescriptor::new("amount", 0);
        field.padding = Some(zero_padded(5, false));
        field.lenient_padding = true;
        assert_eq!(field.extract_delimited(&mut ctx), FieldValue::from("42"));
    }

    #[test]
    fn test_optional_all_filler_reads_empty() {
        // the optional blank rule outranks length validation
        let mut ctx = fixed_ctx("00000");
        let mut field = FieldDescriptor::new("amount", 0);
        field.length = 5;
        field.padding = Some(zero_padded(5, true));
        assert_eq!(field.extract_fixed(&mut ctx), FieldValue::from(""));
        assert!(!ctx.record_context().has_errors());
    }

    #[test]
    fn test_required_all_filler_keeps_literal() {
        let mut ctx = fixed_ctx("00000");
        let mut field = FieldDescriptor::new("amount", 0);
        field.length = 5;
        field.padding = Some(zero_padded(5, false));
        assert_eq!(field.extract_fixed(&mut ctx), FieldValue::from("00000"));
    }

    #[test]
    fn test_keep_padding_returns_raw_width() {
        let mut ctx = fixed_ctx("00042");
        let mut field = FieldDescriptor::new("amount", 0);
        field.length = 5;
        field.padding = Some(zero_padded(5, false));
        field.keep_padding = true;
        assert_eq!(field.extract_fixed(&mut ctx), FieldValue::from("00042"));
    }

    #[test]
    fn test_keep_padding_optional_blank_still_empty() {
        let mut ctx = fixed_ctx("     ");
        let mut field = FieldDescriptor::new("note", 0);
        field.length = 5;
        field.padding = Some(FieldPadding {
            length: 5,
            filler: ' ',
            justify: Justify::Left,
            optional: true,
        });
        field.keep_padding = true;
        assert_eq!(field.extract_fixed(&mut ctx), FieldValue::from(""));
    }

    #[test]
    fn test_lazy_empty_is_missing() {
        let mut ctx = delimited_ctx(&["a", ""]);
        let mut field = FieldDescriptor::new("note", 1);
        field.lazy = true;
        assert_eq!(field.extract_delimited(&mut ctx), FieldValue::Missing);
    }

    #[test]
    fn test_lazy_blank_padded_is_missing() {
        let mut ctx = fixed_ctx("AB   ");
        let mut field = FieldDescriptor::new("note", 2);
        field.length = 3;
        field.padding = Some(FieldPadding {
            length: 3,
            filler: ' ',
            justify: Justify::Left,
            optional: true,
        });
        field.lazy = true;
        assert_eq!(field.extract_fixed(&mut ctx), FieldValue::Missing);
    }

    #[test]
    fn test_prepare_pads_for_assembly() {
        let mut field = FieldDescriptor::new("amount", 0);
        field.padding = Some(zero_padded(5, false));
        assert_eq!(field.prepare(&FieldValue::from("42")), Some("00042".to_string()));
        assert_eq!(field.prepare(&FieldValue::Missing), None);
        assert_eq!(field.prepare(&FieldValue::Invalid), None);
        assert_eq!(field.prepare(&FieldValue::Nil), Some("00000".to_string()));
    }

    #[test]
    fn test_bounds_validation_reports_record_error() {
        let mut ctx = delimited_ctx(&["a", "b"]);
        let bounds = RecordBounds {
            min_len: 3,
            ..Default::default()
        };
        assert!(!bounds.validate_delimited(&mut ctx));
        assert_eq!(ctx.record_context().record_errors().len(), 1);

        // fields can still be extracted from the short record
        let field = FieldDescriptor::new("first", 0);
        assert_eq!(field.extract_delimited(&mut ctx), FieldValue::from("a"));
    }

    #[test]
    fn test_bounds_validation_max() {
        let mut ctx = fixed_ctx("ABCDEF");
        let bounds = RecordBounds {
            max_len: Some(5),
            ..Default::default()
        };
        assert!(!bounds.validate_fixed(&mut ctx));
        assert!(ctx.record_context().has_errors());
    }

    #[test]
    fn test_match_bounds() {
        let bounds = RecordBounds {
            min_match_len: 2,
            max_match_len: Some(4),
            ..Default::default()
        };
        assert!(!bounds.matches_len(1));
        assert!(bounds.matches_len(2));
        assert!(bounds.matches_len(4));
        assert!(!bounds.matches_len(5));
    }
}

//! Fixed-width field padding.

/// Justification of a padded field within its fixed width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justify {
    /// Text at the start, filler appended.
    Left,
    /// Text at the end, filler prepended.
    Right,
}

/// Pads and unpads field text to a fixed width with a filler character.
///
/// An `optional` padding treats an all-filler field as "not provided":
/// unpadding it yields the empty string instead of the literal filler run,
/// which lets zero-padded optional numeric fields round-trip through blank
/// space. A required all-filler field unpads to the literal padded text
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPadding {
    pub length: usize,
    pub filler: char,
    pub justify: Justify,
    pub optional: bool,
}

impl FieldPadding {
    pub fn new(length: usize) -> Self {
        Self {
            length,
            filler: ' ',
            justify: Justify::Left,
            optional: false,
        }
    }

    /// Pad `text` out to the configured width. Text already at or beyond
    /// the width is returned unchanged.
    pub fn pad(&self, text: &str) -> String {
        let count = text.chars().count();
        if count >= self.length {
            return text.to_string();
        }
        let fill: String = std::iter::repeat_n(self.filler, self.length - count).collect();
        match self.justify {
            Justify::Left => format!("{text}{fill}"),
            Justify::Right => format!("{fill}{text}"),
        }
    }

    /// Strip the filler from `text` according to the justification.
    pub fn unpad(&self, text: &str) -> String {
        let stripped = match self.justify {
            Justify::Left => text.trim_end_matches(self.filler),
            Justify::Right => text.trim_start_matches(self.filler),
        };
        if stripped.is_empty() && !text.is_empty() {
            if self.optional {
                String::new()
            } else {
                // a required field of pure filler keeps its literal text
                text.to_string()
            }
        } else {
            stripped.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_left_justified() {
        let padding = FieldPadding::new(8);
        assert_eq!(padding.pad("abc"), "abc     ");
    }

    #[test]
    fn test_pad_right_justified() {
        let padding = FieldPadding {
            length: 5,
            filler: '0',
            justify: Justify::Right,
            optional: false,
        };
        assert_eq!(padding.pad("42"), "00042");
    }

    #[test]
    fn test_pad_full_width_unchanged() {
        let padding = FieldPadding::new(3);
        assert_eq!(padding.pad("abc"), "abc");
        assert_eq!(padding.pad("abcd"), "abcd");
    }

    #[test]
    fn test_unpad_round_trip() {
        let padding = FieldPadding {
            length: 5,
            filler: '0',
            justify: Justify::Right,
            optional: false,
        };
        assert_eq!(padding.unpad("00042"), "42");
        assert_eq!(padding.pad(&padding.unpad("00042")), "00042");
    }

    #[test]
    fn test_unpad_all_filler_optional_yields_empty() {
        let padding = FieldPadding {
            length: 5,
            filler: '0',
            justify: Justify::Right,
            optional: true,
        };
        assert_eq!(padding.unpad("00000"), "");
    }

    #[test]
    fn test_unpad_all_filler_required_keeps_literal() {
        let padding = FieldPadding {
            length: 5,
            filler: '0',
            justify: Justify::Right,
            optional: false,
        };
        assert_eq!(padding.unpad("00000"), "00000");
    }

    #[test]
    fn test_unpad_strips_one_side_only() {
        let padding = FieldPadding {
            length: 6,
            filler: ' ',
            justify: Justify::Left,
            optional: false,
        };
        assert_eq!(padding.unpad("  ab  "), "  ab");
    }

    #[test]
    fn test_unpad_empty_input() {
        let padding = FieldPadding::new(4);
        assert_eq!(padding.unpad(""), "");
    }
}

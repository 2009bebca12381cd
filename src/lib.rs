//! # flatfile-rs
//!
//! A declarative flat-file record marshalling engine.
//!
//! Given a mapping of named fields to positions (absolute or counted from
//! the end of a record) and per-field padding rules, this library converts
//! between raw flat-file text (delimited, fixed-length, or CSV-quoted
//! lines) and ordered field collections, preserving line numbers and raw
//! text for error reporting.
//!
//! ## Overview
//!
//! Processing is built from small, composable pieces:
//!
//! - **Readers** ([`DelimitedReader`], [`FixedLengthReader`], [`CsvReader`])
//!   pull one record's worth of characters from a stream, handling escape
//!   characters, line continuation, comment lines and record terminators.
//! - **Writers** ([`DelimitedWriter`], [`FixedLengthWriter`], [`CsvWriter`])
//!   turn raw record values back into terminated lines.
//! - **Unmarshalling contexts** extract field text by position, including
//!   positions counted from the end of a variable-length record.
//! - **Marshalling contexts** assemble a record from out-of-order,
//!   conditionally-omitted field writes.
//! - **[`FieldPadding`]** pads and unpads fixed-width fields.
//!
//! ## Example
//!
//! ```
//! use flatfile_rs::{
//!     DelimitedParserConfig, DelimitedReader, DelimitedUnmarshalContext, FieldDescriptor,
//!     FieldValue, RecordReader,
//! };
//!
//! let input = "SMITH,JOHN,SALES\nJONES,MARY,ENGINEER\n";
//! let mut reader = DelimitedReader::new(input.as_bytes(), DelimitedParserConfig::default())
//!     .expect("valid configuration");
//!
//! let record = reader.read().unwrap().expect("a record");
//! assert_eq!(record.line_number, 1);
//! assert_eq!(record.text, "SMITH,JOHN,SALES");
//!
//! let mut context = DelimitedUnmarshalContext::new();
//! context.set_record(
//!     record.value.fields().unwrap().to_vec(),
//!     record.line_number,
//!     record.text.clone(),
//! );
//!
//! let last_name = FieldDescriptor::new("lastName", 0);
//! let department = FieldDescriptor::new("department", -1);
//! assert_eq!(last_name.extract_delimited(&mut context), FieldValue::from("SMITH"));
//! assert_eq!(department.extract_delimited(&mut context), FieldValue::from("SALES"));
//! ```

pub mod csv;
pub mod delimited;
pub mod error;
pub mod fixed;
pub mod layout;
pub mod marshal;
pub mod padding;
pub mod record;
pub mod stream;
pub mod unmarshal;
pub mod value;

pub use csv::{CsvParserConfig, CsvReader, CsvWriter};
pub use delimited::{DelimitedParserConfig, DelimitedReader, DelimitedWriter};
pub use error::{ConfigError, ReadError};
pub use fixed::{FixedLengthParserConfig, FixedLengthReader, FixedLengthWriter};
pub use layout::{FieldDescriptor, RecordBounds};
pub use marshal::{DelimitedMarshalContext, FixedLengthMarshalContext};
pub use padding::{FieldPadding, Justify};
pub use record::{RawRecord, RecordReader, RecordValue, RecordWriter};
pub use stream::CharReader;
pub use unmarshal::{DelimitedUnmarshalContext, FixedLengthUnmarshalContext, RecordContext};
pub use value::FieldValue;

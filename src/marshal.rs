//! Record marshalling contexts: out-of-order field assembly.
//!
//! Field-producing callers run in traversal order, not record order: a
//! trailing optional segment may be evaluated before a preceding required
//! one, and a field anchored to the end of the record is configured
//! independently of the fields before it. The contexts therefore collect
//! `(position, text)` entries into a buffer and render the record in a
//! second pass, so correct left-to-right output is reconstructed no matter
//! the call order.
//!
//! A `commit = false` entry is only rendered if a later entry commits past
//! it; this keeps a trailing optional field that was never actually set
//! from padding out the record.

use crate::record::RecordValue;

#[derive(Debug, Clone)]
struct Entry {
    order: i64,
    position: i32,
    text: String,
}

/// Sort key that places every start-anchored entry before every
/// end-anchored one while preserving relative order among the end-anchored
/// (adding a constant preserves the ordering of negative positions).
fn order_key(position: i32) -> i64 {
    if position < 0 {
        position as i64 + i32::MAX as i64
    } else {
        position as i64
    }
}

/// Entry buffer with a committed-count watermark, shared by both contexts.
#[derive(Debug, Default)]
struct EntryBuffer {
    entries: Vec<Entry>,
    committed: usize,
}

impl EntryBuffer {
    fn push(&mut self, position: i32, text: &str, commit: bool) {
        self.entries.push(Entry {
            order: order_key(position),
            position,
            text: text.to_string(),
        });
        if commit {
            self.committed = self.entries.len();
        }
    }

    /// Committed entries in render order. The sort is stable, so repeated
    /// writes to one position render in arrival order and the last one
    /// wins.
    fn committed_sorted(&self) -> Vec<&Entry> {
        let mut sorted: Vec<&Entry> = self.entries[..self.committed].iter().collect();
        sorted.sort_by_key(|e| e.order);
        sorted
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.committed = 0;
    }
}

/// Resolve an entry's absolute index given the record size so far and the
/// lazily fixed offset for end-anchored positions.
fn resolve_index(entry: &Entry, size: i32, offset: &mut Option<i32>) -> i32 {
    if entry.position < 0 {
        let off = *offset.get_or_insert(size + entry.position.abs());
        (entry.position + off).max(0)
    } else {
        entry.position
    }
}

/// Assembles a delimited record from positioned field writes.
#[derive(Debug, Default)]
pub struct DelimitedMarshalContext {
    buffer: EntryBuffer,
}

impl DelimitedMarshalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one field write. `commit` marks that the record extends at
    /// least this far even if nothing later is set.
    pub fn set_field(&mut self, position: i32, text: &str, commit: bool) {
        self.buffer.push(position, text, commit);
    }

    /// Render the assembled record. Gaps between positioned fields become
    /// empty fields.
    pub fn record_value(&self) -> RecordValue {
        let mut record: Vec<String> = Vec::new();
        let mut offset: Option<i32> = None;
        for entry in self.buffer.committed_sorted() {
            let size = record.len() as i32;
            let index = resolve_index(entry, size, &mut offset);
            if index < size {
                record[index as usize] = entry.text.clone();
            } else {
                while (record.len() as i32) < index {
                    record.push(String::new());
                }
                record.push(entry.text.clone());
            }
        }
        RecordValue::Fields(record)
    }

    /// Reset for the next record.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

// ---------------------------------------------------------------------------

/// Assembles a fixed-length record from positioned field writes.
#[derive(Debug)]
pub struct FixedLengthMarshalContext {
    buffer: EntryBuffer,
    filler: char,
}

impl FixedLengthMarshalContext {
    pub fn new() -> Self {
        Self::with_filler(' ')
    }

    /// Use `filler` for the gaps between positioned fields.
    pub fn with_filler(filler: char) -> Self {
        Self {
            buffer: EntryBuffer::default(),
            filler,
        }
    }

    /// Record one field write. `commit` marks that the record extends at
    /// least this far even if nothing later is set.
    pub fn set_field(&mut self, position: i32, text: &str, commit: bool) {
        self.buffer.push(position, text, commit);
    }

    /// Render the assembled line. Overlapping writes splice over existing
    /// characters; gaps fill with the filler character.
    pub fn record_value(&self) -> RecordValue {
        let mut record: Vec<char> = Vec::new();
        let mut offset: Option<i32> = None;
        for entry in self.buffer.committed_sorted() {
            let size = record.len() as i32;
            let index = resolve_index(entry, size, &mut offset) as usize;
            if index > record.len() {
                record.resize(index, self.filler);
            }
            for (i, c) in entry.text.chars().enumerate() {
                let at = index + i;
                if at < record.len() {
                    record[at] = c;
                } else {
                    record.push(c);
                }
            }
        }
        RecordValue::Line(record.into_iter().collect())
    }

    /// Reset for the next record.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FixedLengthMarshalContext {
    fn default() -> Self {
        Self::new()
    }
}

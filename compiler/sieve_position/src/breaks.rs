//! Per-source index of line-start offsets.
//!
//! A `SourceBreaks` records, for one source, the char-in-file index at which
//! each line starts. Given that index, any flat char-in-file value converts
//! to a `(line, char-in-line)` pair with one binary search, and a span of two
//! flat values converts to a [`FilePosition`].
//!
//! The index is built while the producer reads its input (line starts must be
//! registered once each, in increasing order) and is immutable afterwards:
//! registration takes `&mut self`, and every shared handle (`Rc`) hands out
//! only `&self`.

use std::cell::Cell;

use crate::{FilePosition, InputSource};

/// Sorted index of line-start offsets for one source.
///
/// # Invariant
///
/// Registered line starts are strictly increasing. The first registered
/// start covers the line on which the producer began reading; queries below
/// it fall on "line zero" and are only meaningful for sentinel positions.
#[derive(Clone, Debug)]
pub struct SourceBreaks {
    source: InputSource,
    /// Line number of the line preceding the first registered start.
    line0: u32,
    /// Char-in-file index of each line start, strictly increasing.
    starts: Vec<u32>,
    /// One-slot memo: `(char_in_file, break_index)` of the last query.
    ///
    /// Sequential token scanning queries the same offset several times in a
    /// row (start of one token is the end of the previous), so a single slot
    /// removes most of the binary searches.
    cache: Cell<(u32, u32)>,
}

impl SourceBreaks {
    /// Create an index whose first registered line start begins line
    /// `line0 + 1`.
    pub fn new(source: InputSource, line0: u32) -> Self {
        SourceBreaks {
            source,
            line0,
            starts: Vec::new(),
            cache: Cell::new((0, 0)),
        }
    }

    /// The source this index describes.
    pub fn source(&self) -> &InputSource {
        &self.source
    }

    /// Register that a line starts at `char_in_file`.
    ///
    /// # Contract
    ///
    /// Must be called with strictly increasing values, before any query.
    pub fn line_starts_at(&mut self, char_in_file: u32) {
        debug_assert!(
            self.starts.last().is_none_or(|&last| last < char_in_file),
            "line starts must be registered in strictly increasing order"
        );
        self.starts.push(char_in_file);
    }

    /// Number of registered starts at or below `char_in_file`.
    fn break_index(&self, char_in_file: u32) -> u32 {
        let (cached_cif, cached_idx) = self.cache.get();
        if cached_cif == char_in_file {
            return cached_idx;
        }
        #[allow(
            clippy::cast_possible_truncation,
            reason = "break count is bounded by the u32 char-in-file domain"
        )]
        let idx = self.starts.partition_point(|&s| s <= char_in_file) as u32;
        self.cache.set((char_in_file, idx));
        idx
    }

    /// 1 greater than the number of line breaks before `char_in_file`.
    ///
    /// Offsets past the last known break extrapolate using the final line.
    pub fn line_at(&self, char_in_file: u32) -> u32 {
        self.line0 + self.break_index(char_in_file)
    }

    /// 1 greater than the number of characters since the last line start.
    pub fn char_in_line_at(&self, char_in_file: u32) -> u32 {
        let idx = self.break_index(char_in_file);
        if idx == 0 {
            char_in_file
        } else {
            char_in_file - self.starts[idx as usize - 1] + 1
        }
    }

    /// Zero-length position at `char_in_file`.
    pub fn to_file_position(&self, char_in_file: u32) -> FilePosition {
        self.to_file_position_span(char_in_file, char_in_file)
    }

    /// Position spanning `[start, end)` in char-in-file coordinates.
    pub fn to_file_position_span(&self, start: u32, end: u32) -> FilePosition {
        debug_assert!(start <= end, "span start {start} exceeds end {end}");
        FilePosition::materialize(
            self.source.clone(),
            self.line_at(start),
            start,
            self.char_in_line_at(start),
            self.line_at(end),
            end,
            self.char_in_line_at(end),
        )
    }
}

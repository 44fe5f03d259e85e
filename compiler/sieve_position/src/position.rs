//! Immutable source spans.

use std::fmt;

use crate::{InputSource, SourceBreaks};

/// The range of characters in a source occupied by a token or a group of
/// tokens.
///
/// All coordinates are 1-indexed, the way text editors display them; starts
/// are inclusive and ends exclusive, so a token's length is
/// `end_char_in_file - start_char_in_file`. Line numbers are 1 greater than
/// the number of line breaks before the position, where a line break is one
/// of `CR`, `LF`, `CRLF`, matched greedily; they carry no information about
/// the logical structure of the program.
///
/// Positions are plain values: every coordinate is materialized at
/// construction (by [`SourceBreaks`]), so holding a position keeps nothing
/// else alive.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FilePosition {
    source: InputSource,
    start_line: u32,
    start_char_in_file: u32,
    start_char_in_line: u32,
    end_line: u32,
    end_char_in_file: u32,
    end_char_in_line: u32,
}

impl FilePosition {
    /// The "no real position" sentinel.
    pub const UNKNOWN: FilePosition = FilePosition {
        source: InputSource::Unknown,
        start_line: 1,
        start_char_in_file: 0,
        start_char_in_line: 0,
        end_line: 1,
        end_char_in_file: 0,
        end_char_in_line: 0,
    };

    /// Sentinel for compiler-predefined constructs.
    pub const PREDEFINED: FilePosition = FilePosition {
        source: InputSource::Predefined,
        start_line: 1,
        start_char_in_file: 0,
        start_char_in_line: 0,
        end_line: 1,
        end_char_in_file: 0,
        end_char_in_line: 0,
    };

    /// Assemble a position from already-computed coordinates.
    ///
    /// Only [`SourceBreaks`] calls this; everyone else goes through the
    /// break index so that line/column values stay consistent with offsets.
    pub(crate) fn materialize(
        source: InputSource,
        start_line: u32,
        start_char_in_file: u32,
        start_char_in_line: u32,
        end_line: u32,
        end_char_in_file: u32,
        end_char_in_line: u32,
    ) -> FilePosition {
        FilePosition {
            source,
            start_line,
            start_char_in_file,
            start_char_in_line,
            end_line,
            end_char_in_file,
            end_char_in_line,
        }
    }

    /// Zero-length position at explicit coordinates.
    pub fn instance(
        source: InputSource,
        line_no: u32,
        char_in_file: u32,
        char_in_line: u32,
    ) -> FilePosition {
        let mut breaks = SourceBreaks::new(source, line_no - 1);
        breaks.line_starts_at(char_in_file - char_in_line + 1);
        breaks.to_file_position(char_in_file)
    }

    /// Zero-length position at the very beginning of `source`.
    pub fn start_of_file(source: InputSource) -> FilePosition {
        FilePosition::instance(source, 1, 1, 1)
    }

    /// Position from line/column pairs alone, with char-in-file values
    /// synthesized as if every line before the span held a single character.
    ///
    /// This eases testing against hand-written expectations; real positions
    /// come from a producer's [`SourceBreaks`].
    pub fn from_line_positions(
        source: InputSource,
        start_line_no: u32,
        start_char_in_line: u32,
        end_line_no: u32,
        end_char_in_line: u32,
    ) -> FilePosition {
        let mut line_no = start_line_no - 1;
        let mut breaks = SourceBreaks::new(source, line_no);

        let mut char_in_file = 1u32;
        let mut char_in_line = 1u32;
        while line_no < start_line_no {
            char_in_file += 1;
            breaks.line_starts_at(char_in_file);
            line_no += 1;
        }
        char_in_file += start_char_in_line - char_in_line;
        let start_char_in_file = char_in_file;

        while line_no < end_line_no {
            char_in_line = 1;
            char_in_file += 1;
            breaks.line_starts_at(char_in_file);
            line_no += 1;
        }
        char_in_file += end_char_in_line - char_in_line;
        let end_char_in_file = char_in_file;

        breaks.to_file_position_span(start_char_in_file, end_char_in_file)
    }

    /// The source this position falls in.
    pub fn source(&self) -> &InputSource {
        &self.source
    }

    /// 1 greater than the number of line breaks before the start.
    pub fn start_line(&self) -> u32 {
        self.start_line
    }

    /// 1 greater than the number of characters before the start.
    pub fn start_char_in_file(&self) -> u32 {
        self.start_char_in_file
    }

    /// 1 greater than the number of characters since the last line break.
    pub fn start_char_in_line(&self) -> u32 {
        self.start_char_in_line
    }

    pub fn end_line(&self) -> u32 {
        self.end_line
    }

    pub fn end_char_in_file(&self) -> u32 {
        self.end_char_in_file
    }

    pub fn end_char_in_line(&self) -> u32 {
        self.end_char_in_line
    }

    /// Number of characters covered.
    pub fn length(&self) -> u32 {
        self.end_char_in_file - self.start_char_in_file
    }

    /// True for the [`FilePosition::UNKNOWN`] sentinel (any position in the
    /// unknown source).
    pub fn is_unknown(&self) -> bool {
        self.source.is_unknown()
    }

    /// Span from the start of `start` to the end of `end`.
    ///
    /// Yields [`FilePosition::UNKNOWN`] unless both ends fall in the same
    /// real source.
    pub fn span(start: &FilePosition, end: &FilePosition) -> FilePosition {
        if start == end {
            return start.clone();
        }
        if !start.source.same_real_source(&end.source) {
            return FilePosition::UNKNOWN;
        }
        FilePosition {
            source: start.source.clone(),
            start_line: start.start_line,
            start_char_in_file: start.start_char_in_file,
            start_char_in_line: start.start_char_in_line,
            end_line: end.end_line,
            end_char_in_file: end.end_char_in_file,
            end_char_in_line: end.end_char_in_line,
        }
    }

    /// The gap between the end of `a` and the start of `b`.
    pub fn between(a: &FilePosition, b: &FilePosition) -> FilePosition {
        if !a.source.same_real_source(&b.source) {
            return FilePosition::UNKNOWN;
        }
        FilePosition {
            source: a.source.clone(),
            start_line: a.end_line,
            start_char_in_file: a.end_char_in_file,
            start_char_in_line: a.end_char_in_line,
            end_line: b.start_line,
            end_char_in_file: b.start_char_in_file,
            end_char_in_line: b.start_char_in_line,
        }
    }

    /// Zero-length position at the start of `self`.
    pub fn start_of(&self) -> FilePosition {
        if self.length() == 0 {
            return self.clone();
        }
        FilePosition {
            source: self.source.clone(),
            end_line: self.start_line,
            end_char_in_file: self.start_char_in_file,
            end_char_in_line: self.start_char_in_line,
            ..self.clone()
        }
    }

    /// Zero-length position at the end of `self`.
    pub fn end_of(&self) -> FilePosition {
        if self.length() == 0 {
            return self.clone();
        }
        FilePosition {
            source: self.source.clone(),
            start_line: self.end_line,
            start_char_in_file: self.end_char_in_file,
            start_char_in_line: self.end_char_in_line,
            ..self.clone()
        }
    }

    /// Debug rendering with char-in-file offsets:
    /// `name:line+col@cif[ - [line+]col@cif]`.
    pub fn debug_string(&self) -> String {
        let mut s = format!(
            "{}:{}+{}@{}",
            self.source.short_name(),
            self.start_line,
            self.start_char_in_line,
            self.start_char_in_file
        );
        if self.start_char_in_file != self.end_char_in_file {
            s.push_str(" - ");
            if self.end_line != self.start_line {
                s.push_str(&format!("{}+", self.end_line));
            }
            s.push_str(&format!(
                "{}@{}",
                self.end_char_in_line, self.end_char_in_file
            ));
        }
        s
    }

    /// Short rendering: `name:line`.
    pub fn format_short(&self) -> String {
        format!("{}:{}", self.source.short_name(), self.start_line)
    }
}

/// Diagnostic rendering: `name:line+col[ - [line+]col]`, used verbatim in
/// messages.
impl fmt::Display for FilePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}+{}",
            self.source.short_name(),
            self.start_line,
            self.start_char_in_line
        )?;
        if self.start_char_in_file != self.end_char_in_file {
            f.write_str(" - ")?;
            if self.start_line != self.end_line {
                write!(f, "{}+", self.end_line)?;
            }
            write!(f, "{}", self.end_char_in_line)?;
        }
        Ok(())
    }
}

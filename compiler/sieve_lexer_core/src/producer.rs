//! Character producers: cursors over in-memory buffers that can answer
//! position queries for any offset they expose.

use std::io::Read;
use std::rc::Rc;

use sieve_diagnostic::{Message, MessageType, ParseError, ParseResult};
use sieve_position::{FilePosition, InputSource, SourceBreaks};

/// A consumable, lookahead-capable view over a buffer of characters.
///
/// `offset` is the consumed-through index and `limit` the end of valid
/// data; `offset == limit` means the producer is exhausted. Beyond plain
/// cursor movement, every producer upholds the position contract: for any
/// offset in `[0, limit]` it can report the absolute char-in-file index at
/// that offset and the [`SourceBreaks`] in force there, which is what lets
/// even a decoded or concatenated view compute exact [`FilePosition`]s.
///
/// Cloning via [`clone_producer`](CharProducer::clone_producer) shares the
/// (immutable) buffer and side tables and carries an independent cursor.
pub trait CharProducer {
    /// The backing buffer. Valid data occupies `[0, limit())`; clients must
    /// not assume anything past the limit.
    fn buffer(&self) -> &[char];

    /// Count of consumed characters in the buffer.
    fn offset(&self) -> usize;

    /// End of valid data in the buffer.
    fn limit(&self) -> usize;

    /// Mark everything before `end` as consumed.
    ///
    /// # Contract
    ///
    /// `offset() <= end <= limit()`; offsets never move backwards.
    fn consume_to(&mut self, end: usize);

    /// The char-in-file index (1-based) of the character at buffer `offset`.
    fn char_in_file(&self, offset: usize) -> u32;

    /// The line-break index in force at buffer `offset`.
    fn breaks_at(&self, offset: usize) -> &SourceBreaks;

    /// A distinct producer over the same buffer with the same cursor state.
    fn clone_producer(&self) -> Box<dyn CharProducer>;

    // --- Derived cursor operations ---

    /// Consume the next `n` characters.
    fn consume(&mut self, n: usize) {
        self.consume_to(self.offset() + n);
    }

    /// True iff the cursor has reached the limit.
    fn is_empty(&self) -> bool {
        self.offset() == self.limit()
    }

    /// Characters remaining between offset and limit.
    fn remaining(&self) -> usize {
        self.limit() - self.offset()
    }

    /// The next unconsumed character, without consuming it.
    fn lookahead(&self) -> Option<char> {
        if self.is_empty() {
            None
        } else {
            Some(self.buffer()[self.offset()])
        }
    }

    /// Consume and return the next character.
    fn read(&mut self) -> Option<char> {
        let ch = self.lookahead()?;
        self.consume(1);
        ch.into()
    }

    /// The characters in `buffer()[start..end]` as a `String`.
    fn text(&self, start: usize, end: usize) -> String {
        self.buffer()[start..end].iter().collect()
    }

    /// Zero-length position at the cursor.
    fn current_position(&self) -> FilePosition {
        self.breaks_at(self.offset())
            .to_file_position(self.char_in_file(self.offset()))
    }

    /// Position spanning buffer offsets `[start, end)`.
    fn file_position_for_offsets(&self, start: usize, end: usize) -> FilePosition {
        self.breaks_at(start)
            .to_file_position_span(self.char_in_file(start), self.char_in_file(end))
    }
}

/// Producer over one raw input, fully materialized at construction.
///
/// Construction scans the text once for line breaks (`\n`, and `\r` not
/// followed by `\n`) to populate the [`SourceBreaks`]; after that every
/// position query is a binary search at worst.
#[derive(Clone)]
pub struct BufferedCharProducer {
    buf: Rc<[char]>,
    offset: usize,
    /// Char-in-file index of `buf[0]`.
    char_in_file0: u32,
    breaks: Rc<SourceBreaks>,
}

impl BufferedCharProducer {
    /// Producer over `text`, positioned as continuing from `pos`.
    pub fn from_string(text: &str, pos: &FilePosition) -> BufferedCharProducer {
        let buf: Rc<[char]> = text.chars().collect();
        let char_in_file0 = pos.start_char_in_file();

        let mut breaks = SourceBreaks::new(pos.source().clone(), pos.start_line() - 1);
        breaks.line_starts_at(char_in_file0 - pos.start_char_in_line() + 1);
        for (i, &ch) in buf.iter().enumerate() {
            let is_break = ch == '\n'
                || (ch == '\r' && buf.get(i + 1).is_some_and(|&next| next != '\n'));
            if is_break {
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "char-in-file indexes are bounded to u32 by construction"
                )]
                let cif = char_in_file0 + i as u32 + 1;
                breaks.line_starts_at(cif);
            }
        }

        BufferedCharProducer {
            buf,
            offset: 0,
            char_in_file0,
            breaks: Rc::new(breaks),
        }
    }

    /// Producer over `text` starting at the top of `source`.
    pub fn from_source(text: &str, source: InputSource) -> BufferedCharProducer {
        Self::from_string(text, &FilePosition::start_of_file(source))
    }

    /// Read `reader` to exhaustion (UTF-8) and build a producer.
    ///
    /// The reader is consumed whole before lexing starts; a read or
    /// encoding failure surfaces as an `IoError` message and is not
    /// retried.
    pub fn from_reader(
        mut reader: impl Read,
        pos: &FilePosition,
    ) -> ParseResult<BufferedCharProducer> {
        let mut text = String::new();
        if reader.read_to_string(&mut text).is_err() {
            return Err(ParseError(Message::with_parts(
                MessageType::IoError,
                pos.clone(),
                vec![pos.source().uri().to_owned()],
            )));
        }
        Ok(Self::from_string(&text, pos))
    }

    /// The shared line-break index of this producer's source.
    ///
    /// Callers hand this to the position inferer when synthesizing
    /// positions in the same source.
    pub fn source_breaks(&self) -> Rc<SourceBreaks> {
        Rc::clone(&self.breaks)
    }
}

impl CharProducer for BufferedCharProducer {
    fn buffer(&self) -> &[char] {
        &self.buf
    }

    fn offset(&self) -> usize {
        self.offset
    }

    fn limit(&self) -> usize {
        self.buf.len()
    }

    fn consume_to(&mut self, end: usize) {
        debug_assert!(self.offset <= end && end <= self.limit());
        self.offset = end;
    }

    fn char_in_file(&self, offset: usize) -> u32 {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "buffer lengths are bounded to u32 by construction"
        )]
        let offset = offset as u32;
        self.char_in_file0 + offset
    }

    fn breaks_at(&self, _offset: usize) -> &SourceBreaks {
        &self.breaks
    }

    fn clone_producer(&self) -> Box<dyn CharProducer> {
        Box::new(self.clone())
    }
}

/// Concatenation of several producers presented as one virtual buffer.
///
/// Position queries binary-search the cumulative-length table to find which
/// child an offset falls in, then delegate with a locally rebased offset.
struct ChainCharProducer {
    buf: Rc<[char]>,
    offset: usize,
    /// Cumulative end offset of each child within `buf`.
    ends: Rc<[usize]>,
    /// Each child's cursor offset at the time its characters were copied.
    bases: Rc<[usize]>,
    children: Vec<Box<dyn CharProducer>>,
}

impl ChainCharProducer {
    fn make(children: Vec<Box<dyn CharProducer>>) -> ChainCharProducer {
        let mut buf = Vec::new();
        let mut ends = Vec::with_capacity(children.len());
        let mut bases = Vec::with_capacity(children.len());
        for child in &children {
            bases.push(child.offset());
            buf.extend_from_slice(&child.buffer()[child.offset()..child.limit()]);
            ends.push(buf.len());
        }
        ChainCharProducer {
            buf: buf.into(),
            offset: 0,
            ends: ends.into(),
            bases: bases.into(),
            children,
        }
    }

    /// Index of the child whose copied span contains `offset`, and the
    /// offset rebased into that child's buffer.
    fn locate(&self, offset: usize) -> (usize, usize) {
        let i = match self.ends.binary_search(&offset) {
            Ok(i) | Err(i) => i,
        };
        let prev = if i == 0 { 0 } else { self.ends[i - 1] };
        (i, self.bases[i] + (offset - prev))
    }
}

impl CharProducer for ChainCharProducer {
    fn buffer(&self) -> &[char] {
        &self.buf
    }

    fn offset(&self) -> usize {
        self.offset
    }

    fn limit(&self) -> usize {
        self.buf.len()
    }

    fn consume_to(&mut self, end: usize) {
        debug_assert!(self.offset <= end && end <= self.limit());
        self.offset = end;
    }

    fn char_in_file(&self, offset: usize) -> u32 {
        let (i, local) = self.locate(offset);
        self.children[i].char_in_file(local)
    }

    fn breaks_at(&self, offset: usize) -> &SourceBreaks {
        let (i, local) = self.locate(offset);
        self.children[i].breaks_at(local)
    }

    fn clone_producer(&self) -> Box<dyn CharProducer> {
        Box::new(ChainCharProducer {
            buf: Rc::clone(&self.buf),
            offset: self.offset,
            ends: Rc::clone(&self.ends),
            bases: Rc::clone(&self.bases),
            children: self.children.iter().map(|c| c.clone_producer()).collect(),
        })
    }
}

/// A producer yielding all the characters of `producers` in turn.
///
/// The inputs are not consumed. Zero producers yields an empty producer at
/// the unknown position; a single producer is returned unchanged, with no
/// wrapping overhead.
pub fn chain(mut producers: Vec<Box<dyn CharProducer>>) -> Box<dyn CharProducer> {
    match producers.len() {
        0 => Box::new(BufferedCharProducer::from_string(
            "",
            &FilePosition::UNKNOWN,
        )),
        1 => producers.remove(0),
        _ => Box::new(ChainCharProducer::make(producers)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn source() -> InputSource {
        InputSource::new("file:///chars.txt")
    }

    fn from_str(text: &str) -> BufferedCharProducer {
        BufferedCharProducer::from_source(text, source())
    }

    /// Drain `p`, checking the produced text and that the position at each
    /// `(chars_read, debug_string)` pair matches.
    fn assert_producer(
        p: &mut dyn CharProducer,
        golden: &str,
        positions: &[(usize, &str)],
    ) {
        let mut read = String::new();
        let mut expected = positions.iter();
        let mut next_check = expected.next();
        loop {
            if let Some(&(at, want)) = next_check {
                if read.chars().count() == at {
                    let pos = p
                        .breaks_at(p.offset())
                        .to_file_position(p.char_in_file(p.offset()));
                    assert_eq!(pos.debug_string(), want, "after [{read}]");
                    next_check = expected.next();
                }
            }
            match p.read() {
                Some(ch) => read.push(ch),
                None => break,
            }
        }
        assert_eq!(read, golden);
        assert_eq!(next_check, None, "not all positions were reached");
    }

    // === BufferedCharProducer ===

    #[test]
    fn tracks_lines_through_mixed_breaks() {
        let text = "but was shocked to learn\n\rthe lazy dog had\r\na fox-seeking missle.";
        let mut p = from_str(text);
        assert_producer(
            &mut p,
            text,
            &[
                (0, "chars.txt:1+1@1"),
                (24, "chars.txt:1+25@25"),
                (25, "chars.txt:2+1@26"),
                (26, "chars.txt:3+1@27"),
                (42, "chars.txt:3+17@43"),
                (43, "chars.txt:3+18@44"),
                (44, "chars.txt:4+1@45"),
                (65, "chars.txt:4+22@66"),
            ],
        );
    }

    #[test]
    fn empty_input() {
        let mut p = from_str("");
        assert!(p.is_empty());
        assert_eq!(p.read(), None);
        assert_producer(&mut from_str(""), "", &[]);
    }

    #[test]
    fn offsets_are_monotonic() {
        let mut p = from_str("abc\ndef");
        let mut last = p.offset();
        while p.read().is_some() {
            assert!(p.offset() > last);
            last = p.offset();
        }
        assert_eq!(p.char_in_file(p.offset()), 8);
    }

    #[test]
    fn text_extracts_buffer_ranges() {
        let p = from_str("hello world");
        assert_eq!(p.text(0, 5), "hello");
        assert_eq!(p.text(6, 11), "world");
        assert_eq!(p.text(3, 3), "");
    }

    #[test]
    fn continues_from_a_mid_file_position() {
        // A producer beginning at line 2, char-in-file 30, char-in-line 1.
        let pos = FilePosition::instance(source(), 2, 30, 1);
        let p = BufferedCharProducer::from_string(", now);", &pos);
        assert_eq!(p.file_position_for_offsets(1, 2).debug_string(), "chars.txt:2+2@31");
    }

    #[test]
    fn from_reader_reads_to_completion() {
        let pos = FilePosition::start_of_file(source());
        let p = BufferedCharProducer::from_reader("ab\ncd".as_bytes(), &pos)
            .map_err(|e| e.to_string());
        let p = match p {
            Ok(p) => p,
            Err(e) => panic!("{e}"),
        };
        assert_eq!(p.limit(), 5);
        assert_eq!(p.file_position_for_offsets(3, 4).debug_string(), "chars.txt:2+1@4");
    }

    #[test]
    fn from_reader_reports_io_failure() {
        struct FailingReader;
        impl Read for FailingReader {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("boom"))
            }
        }
        let pos = FilePosition::start_of_file(source());
        let err = BufferedCharProducer::from_reader(FailingReader, &pos);
        assert!(matches!(
            err.map(|_| ()),
            Err(ParseError(m)) if m.message_type() == MessageType::IoError
        ));
    }

    // === Chaining ===

    #[test]
    fn chain_concatenates_and_rebases() {
        let p1 = from_str("ab");
        let p2 = from_str("cd");
        let chained = chain(vec![Box::new(p1), Box::new(p2)]);
        let text: String = chained.buffer()[..chained.limit()].iter().collect();
        assert_eq!(text, "abcd");
        // Offset 3 ('d') maps to the second child's local offset 1.
        assert_eq!(chained.char_in_file(3), 2);
    }

    #[test]
    fn chain_spans_both_sources() {
        let a = BufferedCharProducer::from_source("The quick brown fox\n", InputSource::new("file:///one.txt"));
        let b = BufferedCharProducer::from_source("jumps over", InputSource::new("file:///two.txt"));
        let mut chained = chain(vec![Box::new(a), Box::new(b)]);
        assert_producer(
            &mut *chained,
            "The quick brown fox\njumps over",
            &[
                (0, "one.txt:1+1@1"),
                (19, "one.txt:1+20@20"),
                // The exact boundary still reports the first child's end.
                (20, "one.txt:2+1@21"),
                (21, "two.txt:1+2@2"),
                (29, "two.txt:1+10@10"),
            ],
        );
    }

    #[test]
    fn chain_of_zero_is_empty_unknown() {
        let p = chain(Vec::new());
        assert!(p.is_empty());
        assert!(p.current_position().is_unknown());
    }

    #[test]
    fn chain_of_one_is_identity() {
        let p = chain(vec![Box::new(from_str("xyz"))]);
        assert_eq!(p.limit(), 3);
        assert_eq!(p.char_in_file(0), 1);
    }

    #[test]
    fn chain_copies_only_unconsumed_tails() {
        let mut a = from_str("abc");
        a.consume(1);
        let chained = chain(vec![Box::new(a), Box::new(from_str("d"))]);
        let text: String = chained.buffer()[..chained.limit()].iter().collect();
        assert_eq!(text, "bcd");
        // Offset 0 is 'b', the second character of its file.
        assert_eq!(chained.char_in_file(0), 2);
    }

    // === Cloning ===

    #[test]
    fn clones_share_buffer_but_not_cursor() {
        let mut p = from_str("abcdef");
        p.consume(2);
        let mut q = p.clone_producer();
        q.consume(3);
        assert_eq!(p.offset(), 2);
        assert_eq!(q.offset(), 5);
        assert_eq!(p.lookahead(), Some('c'));
        assert_eq!(q.lookahead(), Some('f'));
    }
}

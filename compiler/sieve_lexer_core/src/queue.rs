//! A backtrackable queue of tokens with parsing conveniences.
//!
//! Parsers pull from a [`TokenQueue`] rather than a raw stream: the queue
//! filters out tokens the parser never wants to see (comments, usually),
//! supports arbitrary lookahead, and allows rewinding to a [`Mark`].
//! Produced tokens accumulate in an arena that lives as long as the queue --
//! marks are plain indices into it, so rewinding is O(1) and nothing needs
//! reference counting. The arena trades memory for simplicity; one parse's
//! tokens are not worth reclaiming early.

use sieve_diagnostic::{Message, MessageType, ParseError, ParseResult};
use sieve_position::{FilePosition, InputSource};

use crate::token::{Token, TokenStream};

/// Accepted token plus whatever filtered-out tokens preceded it.
struct QueueEntry<T> {
    token: Token<T>,
    filtered: Vec<Token<T>>,
}

/// A position in a [`TokenQueue`] that can be rewound to.
///
/// Marks stay valid for the lifetime of the queue they came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mark(usize);

/// A queue of tokens extracted from a lexer, with lookahead, rewind, and
/// expectation helpers.
pub struct TokenQueue<T> {
    stream: Box<dyn TokenStream<T>>,
    source: InputSource,
    /// Range of the input being parsed, used in end-of-file reports.
    input_range: Option<FilePosition>,
    /// Tokens for which this returns `false` are diverted into the
    /// `filtered` list of the next accepted token.
    filter: Box<dyn Fn(&Token<T>) -> bool>,
    arena: Vec<QueueEntry<T>>,
    cursor: usize,
    eof: bool,
}

impl<T: Clone + PartialEq + std::fmt::Debug> TokenQueue<T> {
    /// Queue over `stream` accepting every token.
    pub fn new(stream: Box<dyn TokenStream<T>>, source: InputSource) -> TokenQueue<T> {
        Self::with_filter(stream, source, |_| true)
    }

    /// Queue over `stream` accepting only tokens matching `filter`.
    pub fn with_filter(
        stream: Box<dyn TokenStream<T>>,
        source: InputSource,
        filter: impl Fn(&Token<T>) -> bool + 'static,
    ) -> TokenQueue<T> {
        TokenQueue {
            stream,
            source,
            input_range: None,
            filter: Box::new(filter),
            arena: Vec::new(),
            cursor: 0,
            eof: false,
        }
    }

    /// The source this queue's tokens come from.
    pub fn input_source(&self) -> &InputSource {
        &self.source
    }

    /// The range of the input being parsed, if set.
    pub fn input_range(&self) -> Option<&FilePosition> {
        self.input_range.as_ref()
    }

    pub fn set_input_range(&mut self, range: FilePosition) {
        self.input_range = Some(range);
    }

    /// Pull from the stream until the arena covers `cursor`, or EOF.
    fn fetch(&mut self) -> ParseResult<()> {
        while self.cursor >= self.arena.len() && !self.eof {
            let mut filtered = Vec::new();
            loop {
                match self.stream.next()? {
                    Some(token) if (self.filter)(&token) => {
                        self.arena.push(QueueEntry { token, filtered });
                        break;
                    }
                    Some(token) => filtered.push(token),
                    None => {
                        self.eof = true;
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn end_of_file_error(&self) -> ParseError {
        let pos = self
            .input_range
            .clone()
            .unwrap_or(FilePosition::UNKNOWN);
        ParseError(Message::with_parts(
            MessageType::EndOfFile,
            pos,
            vec![self.source.uri().to_owned()],
        ))
    }

    /// True iff there are no more acceptable tokens.
    pub fn is_empty(&mut self) -> ParseResult<bool> {
        self.fetch()?;
        Ok(self.cursor >= self.arena.len())
    }

    /// Fails with an `UnusedTokens` diagnostic unless the queue is empty.
    pub fn expect_empty(&mut self) -> ParseResult<()> {
        if self.is_empty()? {
            return Ok(());
        }
        let t = self.peek()?.clone();
        Err(ParseError(Message::with_parts(
            MessageType::UnusedTokens,
            t.pos,
            vec![t.text],
        )))
    }

    /// The current token, without consuming it.
    pub fn peek(&mut self) -> ParseResult<&Token<T>> {
        self.fetch()?;
        match self.arena.get(self.cursor) {
            Some(entry) => Ok(&entry.token),
            None => Err(self.end_of_file_error()),
        }
    }

    /// Advance past the current token.
    pub fn advance(&mut self) -> ParseResult<()> {
        self.peek()?;
        self.cursor += 1;
        Ok(())
    }

    /// The current token, consuming it.
    pub fn pop(&mut self) -> ParseResult<Token<T>> {
        let t = self.peek()?.clone();
        self.cursor += 1;
        Ok(t)
    }

    /// The filtered-out tokens (e.g. comments) between the previous
    /// accepted token and the current one.
    pub fn filtered_tokens(&mut self) -> ParseResult<&[Token<T>]> {
        self.fetch()?;
        match self.arena.get(self.cursor) {
            Some(entry) => Ok(&entry.filtered),
            None => Err(self.end_of_file_error()),
        }
    }

    /// Pin the current position for a later [`rewind`](Self::rewind).
    pub fn mark(&mut self) -> Mark {
        Mark(self.cursor)
    }

    /// Return to a previously marked position.
    pub fn rewind(&mut self, mark: Mark) {
        debug_assert!(mark.0 <= self.arena.len());
        self.cursor = mark.0;
    }

    /// The position a mark points at: the token there, or just past the
    /// last token if the mark sits at EOF.
    pub fn mark_position(&mut self, mark: Mark) -> ParseResult<FilePosition> {
        let here = self.mark();
        self.rewind(mark);
        let pos = if self.is_empty()? {
            self.last_position().map_or(FilePosition::UNKNOWN, |p| p.end_of())
        } else {
            self.current_position()?
        };
        self.rewind(here);
        Ok(pos)
    }

    /// Position of the current token.
    pub fn current_position(&mut self) -> ParseResult<FilePosition> {
        Ok(self.peek()?.pos.clone())
    }

    /// Position of the most recently consumed token, if any.
    pub fn last_position(&self) -> Option<&FilePosition> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.arena.get(i))
            .map(|entry| &entry.token.pos)
    }

    /// Pop the current token iff its text matches.
    pub fn check_token(&mut self, text: &str) -> ParseResult<bool> {
        if self.is_empty()? {
            return Ok(false);
        }
        if self.peek()?.text_is(text) {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// True iff the current token's text matches, without consuming.
    pub fn lookahead_token(&mut self, text: &str) -> ParseResult<bool> {
        Ok(!self.is_empty()? && self.peek()?.text_is(text))
    }

    /// Pop the current token if its text matches; fail with an
    /// `ExpectedToken` diagnostic otherwise, naming what was found (or
    /// `EOF`).
    pub fn expect_token(&mut self, text: &str) -> ParseResult<()> {
        if self.is_empty()? {
            let pos = self
                .last_position()
                .map_or(FilePosition::UNKNOWN, |p| p.end_of());
            return Err(ParseError(Message::with_parts(
                MessageType::ExpectedToken,
                pos,
                vec![text.to_owned(), "EOF".to_owned()],
            )));
        }
        let t = self.peek()?;
        if t.text_is(text) {
            self.advance()?;
            return Ok(());
        }
        let (pos, actual) = (t.pos.clone(), t.text.clone());
        Err(ParseError(Message::with_parts(
            MessageType::ExpectedToken,
            pos,
            vec![text.to_owned(), actual],
        )))
    }

    /// Pop and return the current token if it has the given kind; fail with
    /// an `ExpectedToken` diagnostic otherwise.
    pub fn expect_token_of_kind(&mut self, kind: &T) -> ParseResult<Token<T>> {
        let t = self.peek()?;
        if &t.kind == kind {
            return self.pop();
        }
        let (pos, actual) = (t.pos.clone(), t.text.clone());
        Err(ParseError(Message::with_parts(
            MessageType::ExpectedToken,
            pos,
            vec![format!("{kind:?}"), actual],
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Kind {
        Word,
        Comment,
    }

    struct FixedStream(std::vec::IntoIter<Token<Kind>>);

    impl TokenStream<Kind> for FixedStream {
        fn next(&mut self) -> ParseResult<Option<Token<Kind>>> {
            Ok(self.0.next())
        }
    }

    fn source() -> InputSource {
        InputSource::new("file:///q.txt")
    }

    fn tok(text: &str, kind: Kind, at: u32) -> Token<Kind> {
        let pos = FilePosition::instance(source(), 1, at, at);
        Token::new(text, kind, FilePosition::span(&pos, &pos))
    }

    fn queue(tokens: Vec<Token<Kind>>) -> TokenQueue<Kind> {
        TokenQueue::with_filter(
            Box::new(FixedStream(tokens.into_iter())),
            source(),
            |t| t.kind != Kind::Comment,
        )
    }

    fn words() -> TokenQueue<Kind> {
        queue(vec![
            tok("a", Kind::Word, 1),
            tok("#c", Kind::Comment, 2),
            tok("b", Kind::Word, 4),
            tok("c", Kind::Word, 5),
        ])
    }

    // === Basic pulls ===

    #[test]
    fn peek_pop_advance() {
        let mut q = words();
        assert_eq!(q.peek().map(|t| t.text.clone()), Ok("a".to_owned()));
        assert_eq!(q.pop().map(|t| t.text), Ok("a".to_owned()));
        assert_eq!(q.pop().map(|t| t.text), Ok("b".to_owned()));
        assert!(matches!(q.advance(), Ok(())));
        assert_eq!(q.is_empty(), Ok(true));
    }

    #[test]
    fn peek_past_end_reports_eof() {
        let mut q = queue(Vec::new());
        let err = q.peek().map(|t| t.text.clone());
        assert!(matches!(
            err,
            Err(ParseError(m)) if m.message_type() == MessageType::EndOfFile
        ));
    }

    // === Filtering ===

    #[test]
    fn filtered_tokens_precede_current() {
        let mut q = words();
        assert_eq!(q.filtered_tokens().map(<[Token<Kind>]>::len), Ok(0));
        assert_eq!(q.pop().map(|t| t.text), Ok("a".to_owned()));
        // The comment sits between "a" and "b".
        let filtered: Vec<String> = match q.filtered_tokens() {
            Ok(f) => f.iter().map(|t| t.text.clone()).collect(),
            Err(e) => panic!("{e}"),
        };
        assert_eq!(filtered, vec!["#c".to_owned()]);
    }

    // === Mark and rewind ===

    #[test]
    fn rewind_restores_position() {
        let mut q = words();
        let start = q.mark();
        assert_eq!(q.pop().map(|t| t.text), Ok("a".to_owned()));
        assert_eq!(q.pop().map(|t| t.text), Ok("b".to_owned()));
        q.rewind(start);
        assert_eq!(q.pop().map(|t| t.text), Ok("a".to_owned()));
    }

    #[test]
    fn mark_position_survives_reads() {
        let mut q = words();
        let start = q.mark();
        let _ = q.pop();
        let _ = q.pop();
        let pos = q.mark_position(start);
        assert_eq!(pos.map(|p| p.start_char_in_file()), Ok(1));
        // The cursor is unaffected by the position query.
        assert_eq!(q.pop().map(|t| t.text), Ok("c".to_owned()));
    }

    // === Expectations ===

    #[test]
    fn check_token_consumes_only_on_match() {
        let mut q = words();
        assert_eq!(q.check_token("x"), Ok(false));
        assert_eq!(q.check_token("a"), Ok(true));
        assert_eq!(q.peek().map(|t| t.text.clone()), Ok("b".to_owned()));
    }

    #[test]
    fn expect_token_mismatch_names_both() {
        let mut q = words();
        let err = q.expect_token("b");
        match err {
            Err(ParseError(m)) => {
                assert_eq!(m.message_type(), MessageType::ExpectedToken);
                assert_eq!(m.parts(), ["b".to_owned(), "a".to_owned()]);
            }
            Ok(()) => panic!("expected a mismatch"),
        }
    }

    #[test]
    fn expect_token_at_eof_names_eof() {
        let mut q = queue(vec![tok("a", Kind::Word, 1)]);
        let _ = q.pop();
        let err = q.expect_token(")");
        match err {
            Err(ParseError(m)) => {
                assert_eq!(m.message_type(), MessageType::ExpectedToken);
                assert_eq!(m.parts()[1], "EOF");
            }
            Ok(()) => panic!("expected an EOF mismatch"),
        }
    }

    #[test]
    fn expect_token_of_kind() {
        let mut q = words();
        assert!(q.expect_token_of_kind(&Kind::Word).is_ok());
        assert!(q.expect_token_of_kind(&Kind::Comment).is_err());
    }

    #[test]
    fn expect_empty_flags_leftovers() {
        let mut q = words();
        let err = q.expect_empty();
        assert!(matches!(
            err,
            Err(ParseError(m)) if m.message_type() == MessageType::UnusedTokens
        ));
        while !matches!(q.is_empty(), Ok(true)) {
            let _ = q.advance();
        }
        assert_eq!(q.expect_empty(), Ok(()));
    }

    #[test]
    fn lookahead_does_not_consume() {
        let mut q = words();
        assert_eq!(q.lookahead_token("a"), Ok(true));
        assert_eq!(q.lookahead_token("b"), Ok(false));
        assert_eq!(q.pop().map(|t| t.text), Ok("a".to_owned()));
    }
}

//! First-pass JavaScript token splitting.

use sieve_diagnostic::{Message, MessageType, ParseError, ParseResult};
use sieve_lexer_core::{CharProducer, PunctuationTrie, Token, TokenStream};

use super::number::NumberRecognizer;
use super::{is_js_line_separator, is_js_space, is_regexp_preceder, JsTokenType};

/// Splits the input into strings, comments, regular expression literals,
/// punctuation runs, and words.
///
/// The splitter is greedy with one character of lookahead; everything it
/// cannot decide at that horizon (exponent signs, keyword-ness) is left to
/// the joiner and classifier passes.
pub struct InputElementSplitter {
    p: Box<dyn CharProducer>,
    punctuation: &'static PunctuationTrie<()>,
    /// Text of the last token that was not a comment, which decides
    /// whether a `/` starts a regex or a division operator.
    last_non_comment: Option<String>,
    /// Whether `@word` quasiliteral identifiers are admitted.
    quasiliteral: bool,
}

impl InputElementSplitter {
    pub fn new(
        p: Box<dyn CharProducer>,
        punctuation: &'static PunctuationTrie<()>,
        quasiliteral: bool,
    ) -> InputElementSplitter {
        InputElementSplitter {
            p,
            punctuation,
            last_non_comment: None,
            quasiliteral,
        }
    }

    fn error(&self, message_type: MessageType, start: usize, end: usize) -> ParseError {
        ParseError(Message::new(
            message_type,
            self.p.file_position_for_offsets(start, end),
        ))
    }

    fn produce(&mut self) -> ParseResult<Option<Token<JsTokenType>>> {
        let limit = self.p.limit();
        let mut start = self.p.offset();
        {
            let buf = self.p.buffer();
            while start < limit && is_js_space(buf[start]) {
                start += 1;
            }
        }
        self.p.consume_to(start);
        if self.p.is_empty() {
            return Ok(None);
        }

        let (kind, end) = self.split_at(start)?;
        let pos = self.p.file_position_for_offsets(start, end);
        let text = self.p.text(start, end);
        self.p.consume_to(end);
        Ok(Some(Token::new(text, kind, pos)))
    }

    /// Classify the token starting at `start`, returning its kind and end
    /// offset. Does not consume.
    fn split_at(&self, start: usize) -> ParseResult<(JsTokenType, usize)> {
        let buf = self.p.buffer();
        let limit = self.p.limit();
        let mut end = start + 1;
        let ch = buf[start];

        let kind = match ch {
            '"' | '\'' => {
                let mut closed = false;
                let mut escaped = false;
                while end < limit {
                    let ch2 = buf[end];
                    end += 1;
                    if ch2 == ch && !escaped {
                        closed = true;
                        break;
                    }
                    escaped = !escaped && ch2 == '\\';
                }
                if !closed {
                    return Err(self.error(MessageType::UnterminatedStringToken, start, end));
                }
                JsTokenType::String
            }
            '/' if end == limit => JsTokenType::Punctuation,
            '/' => match buf[end] {
                '/' => {
                    while end < limit && !is_js_line_separator(buf[end]) {
                        end += 1;
                    }
                    JsTokenType::Comment
                }
                '*' => {
                    let mut star = false;
                    let mut closed = false;
                    end += 1;
                    while end < limit {
                        let ch2 = buf[end];
                        end += 1;
                        if star && ch2 == '/' {
                            closed = true;
                            break;
                        }
                        star = ch2 == '*';
                    }
                    if !closed {
                        return Err(self.error(
                            MessageType::UnterminatedCommentToken,
                            start,
                            end,
                        ));
                    }
                    JsTokenType::Comment
                }
                _ => {
                    let regex_may_follow = self
                        .last_non_comment
                        .as_deref()
                        .is_none_or(is_regexp_preceder);
                    if regex_may_follow {
                        let mut closed = false;
                        let mut escaped = false;
                        let mut in_charset = false;
                        while end < limit {
                            let ch2 = buf[end];
                            if is_js_line_separator(ch2) {
                                break;
                            }
                            if escaped {
                                escaped = false;
                            } else {
                                match ch2 {
                                    '/' if !in_charset => {
                                        closed = true;
                                        end += 1;
                                        break;
                                    }
                                    '[' => in_charset = true,
                                    ']' => in_charset = false,
                                    '\\' => escaped = true,
                                    _ => {}
                                }
                            }
                            end += 1;
                        }
                        if !closed {
                            return Err(self.error(
                                MessageType::UnterminatedStringToken,
                                start,
                                end,
                            ));
                        }
                        // Pick up modifiers, e.g. /foo/g. All letters, since
                        // engines reject identifiers straight after a regex
                        // anyway.
                        while end < limit && buf[end].is_alphabetic() {
                            end += 1;
                        }
                        JsTokenType::Regexp
                    } else {
                        end = self.scan_punctuation(start, end);
                        JsTokenType::Punctuation
                    }
                }
            },
            '.' => {
                // Punctuation that may start a number.
                if end < limit && buf[end].is_ascii_digit() {
                    let (kind, number_end) = self.scan_number(start, end);
                    end = number_end;
                    kind
                } else {
                    end = self.scan_punctuation(start, end);
                    JsTokenType::Punctuation
                }
            }
            '0'..='9' => {
                let (kind, number_end) = self.scan_number(start, end);
                end = number_end;
                kind
            }
            _ if self.punctuation.contains(ch) => {
                end = self.scan_punctuation(start, end);
                JsTokenType::Punctuation
            }
            _ => {
                let is_quasi = self.quasiliteral && ch == '@';
                while end < limit {
                    let ch2 = buf[end];
                    if is_quasi && matches!(ch2, '*' | '+' | '?') {
                        end += 1;
                        break;
                    }
                    if is_js_space(ch2)
                        || ch2 == '\''
                        || ch2 == '"'
                        || self.punctuation.contains(ch2)
                    {
                        break;
                    }
                    end += 1;
                }
                JsTokenType::Word
            }
        };
        Ok((kind, end))
    }

    /// Extend a numeric token via the recognizer FSM.
    fn scan_number(&self, start: usize, end: usize) -> (JsTokenType, usize) {
        let buf = self.p.buffer();
        let limit = self.p.limit();
        let mut nr = NumberRecognizer::new(self.punctuation);
        for i in start..end {
            if !nr.recognize(buf[i]) {
                return (nr.token_type(), end);
            }
        }
        let mut end = end;
        while end < limit && nr.recognize(buf[end]) {
            end += 1;
        }
        (nr.token_type(), end)
    }

    /// Extend a punctuation token by greedy longest-prefix matching.
    ///
    /// Relies on the vocabulary invariant documented on
    /// [`PunctuationTrie`]: extending only through terminal nodes keeps the
    /// scan one-character-lookahead and lets the joiner fix the rest.
    fn scan_punctuation(&self, start: usize, mut end: usize) -> usize {
        let buf = self.p.buffer();
        let limit = self.p.limit();
        let mut node = self.punctuation;
        for i in start..end {
            match node.lookup(buf[i]) {
                Some(next) => node = next,
                None => return end,
            }
        }
        debug_assert!(node.is_terminal());
        while end < limit {
            match node.lookup(buf[end]) {
                Some(next) if next.is_terminal() => {
                    node = next;
                    end += 1;
                }
                _ => break,
            }
        }
        end
    }
}

impl TokenStream<JsTokenType> for InputElementSplitter {
    fn next(&mut self) -> ParseResult<Option<Token<JsTokenType>>> {
        let token = self.produce()?;
        if let Some(t) = &token {
            if t.kind != JsTokenType::Comment {
                self.last_non_comment = Some(t.text.clone());
            }
        }
        Ok(token)
    }
}

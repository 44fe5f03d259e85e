//! Second-pass fixups: exponent joining and word classification.

use sieve_diagnostic::{Message, MessageType, ParseError, ParseResult};
use sieve_lexer_core::{Token, TokenStream};
use sieve_position::FilePosition;

use super::{is_keyword, InputElementSplitter, JsTokenType};

/// True iff `b` starts exactly where `a` ends, in the same source.
fn adjacent(a: &FilePosition, b: &FilePosition) -> bool {
    a.source().same_real_source(b.source())
        && a.end_char_in_file() == b.start_char_in_file()
}

/// True iff `text` is a plain decimal integer (no hex prefix, no sign).
fn is_plain_integer(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

/// Re-attaches exponent signs across the split boundary.
///
/// The splitter never consumes the sign of an exponent, so `1e+5` arrives
/// as the three tokens `1e`, `+`, `5`. This pass joins them back into one
/// float when (and only when) the sign and a plain decimal integer sit
/// immediately adjacent in the source; a dangling exponent that cannot be
/// completed is a malformed number.
pub struct InputElementJoiner {
    stream: InputElementSplitter,
    lookahead: Vec<Token<JsTokenType>>,
}

impl InputElementJoiner {
    pub fn new(stream: InputElementSplitter) -> InputElementJoiner {
        InputElementJoiner {
            stream,
            lookahead: Vec::new(),
        }
    }

    fn read(&mut self) -> ParseResult<Option<Token<JsTokenType>>> {
        if let Some(t) = self.lookahead.pop() {
            return Ok(Some(t));
        }
        self.stream.next()
    }

    fn unread(&mut self, token: Token<JsTokenType>) {
        self.lookahead.push(token);
    }

    fn malformed(token: &Token<JsTokenType>) -> ParseError {
        ParseError(Message::with_parts(
            MessageType::MalformedNumber,
            token.pos.clone(),
            vec![token.text.clone()],
        ))
    }

    /// Complete a float ending in `e`/`E` by consuming `[+-]<integer>`.
    fn join_exponent(
        &mut self,
        token: Token<JsTokenType>,
    ) -> ParseResult<Token<JsTokenType>> {
        let Some(sign) = self.read()? else {
            return Err(Self::malformed(&token));
        };
        let sign_joins = sign.kind == JsTokenType::Punctuation
            && (sign.text_is("+") || sign.text_is("-"))
            && adjacent(&token.pos, &sign.pos);
        if !sign_joins {
            self.unread(sign);
            return Err(Self::malformed(&token));
        }
        let Some(digits) = self.read()? else {
            return Err(Self::malformed(&token));
        };
        let digits_join = digits.kind == JsTokenType::Integer
            && is_plain_integer(&digits.text)
            && adjacent(&sign.pos, &digits.pos);
        if !digits_join {
            self.unread(digits);
            return Err(Self::malformed(&token));
        }
        let pos = FilePosition::span(&token.pos, &digits.pos);
        let text = format!("{}{}{}", token.text, sign.text, digits.text);
        Ok(Token::new(text, JsTokenType::Float, pos))
    }
}

impl TokenStream<JsTokenType> for InputElementJoiner {
    fn next(&mut self) -> ParseResult<Option<Token<JsTokenType>>> {
        let Some(token) = self.read()? else {
            return Ok(None);
        };
        let dangling_exponent = token.kind == JsTokenType::Float
            && token.text.ends_with(['e', 'E']);
        if dangling_exponent {
            return self.join_exponent(token).map(Some);
        }
        Ok(Some(token))
    }
}

/// Resolves words into keywords and numeric literals.
///
/// A word that matches the keyword table becomes a keyword; a word that
/// starts like a number is verified as an integer (`0x` hex, `0` octal, or
/// decimal) or a parseable float, and otherwise stays a word for the
/// parser to reject as an identifier.
pub struct WordClassifier {
    stream: InputElementJoiner,
}

impl WordClassifier {
    pub fn new(stream: InputElementJoiner) -> WordClassifier {
        WordClassifier { stream }
    }

    fn is_integer_literal(text: &str) -> bool {
        let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
        if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X"))
        {
            return hex.chars().all(|c| c.is_ascii_hexdigit());
        }
        if let Some(octal) = digits.strip_prefix('0') {
            return octal.chars().all(|c| matches!(c, '0'..='7'));
        }
        let mut chars = digits.chars();
        matches!(chars.next(), Some('1'..='9')) && chars.all(|c| c.is_ascii_digit())
    }

    fn classify(text: &str) -> Option<JsTokenType> {
        if is_keyword(text) {
            return Some(JsTokenType::Keyword);
        }
        let first = text.chars().next()?;
        if first.is_ascii_digit() || matches!(first, '-' | '+' | '.') {
            if Self::is_integer_literal(text) {
                return Some(JsTokenType::Integer);
            }
            if text.parse::<f64>().is_ok() {
                return Some(JsTokenType::Float);
            }
        }
        None
    }
}

impl TokenStream<JsTokenType> for WordClassifier {
    fn next(&mut self) -> ParseResult<Option<Token<JsTokenType>>> {
        let Some(token) = self.stream.next()? else {
            return Ok(None);
        };
        if token.kind == JsTokenType::Word {
            if let Some(kind) = Self::classify(&token.text) {
                return Ok(Some(token.reclassify(kind)));
            }
        }
        Ok(Some(token))
    }
}

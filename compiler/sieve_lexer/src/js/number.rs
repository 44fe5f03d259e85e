//! Numeric-token recognition.

use sieve_lexer_core::PunctuationTrie;

use super::{is_js_space, JsTokenType};

/// The recognizer's progress through a numeric literal.
///
/// Anything not obviously a number falls through to [`State::Word`] and the
/// whole run is labeled a word; the classifier pass sorts out what it
/// really was.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Start,
    /// A leading `0`: may begin octal, hex, or a fraction.
    Zero,
    Integer,
    Octal,
    /// Saw `0x`; hex digits expected.
    HexStart,
    Hex,
    /// A `.` opening the literal; the splitter guarantees a digit follows.
    LeadingDot,
    /// A `.` after digits. Terminal on its own: `0.` is a valid float.
    Dot,
    Fraction,
    /// Saw `e`/`E`. The sign, if any, is punctuation and is *not* consumed;
    /// the joiner pass re-attaches it.
    ExpMarker,
    ExpDigits,
    Word,
}

/// An explicit FSM recognizing `0x<hex>`, `<decimal>("."<decimal>*)?<exp>?`,
/// and `"."<decimal>+<exp>?`, one character at a time.
///
/// Feed characters through [`recognize`](Self::recognize) until it returns
/// `false` (the token ends before that character), then read the type off
/// [`token_type`](Self::token_type).
pub struct NumberRecognizer {
    punctuation: &'static PunctuationTrie<()>,
    state: State,
}

impl NumberRecognizer {
    pub fn new(punctuation: &'static PunctuationTrie<()>) -> NumberRecognizer {
        NumberRecognizer {
            punctuation,
            state: State::Start,
        }
    }

    /// True iff `ch` continues the token. On an unexpected character that
    /// is still word material, the recognizer degrades to word mode rather
    /// than ending the token.
    pub fn recognize(&mut self, ch: char) -> bool {
        use State::{
            Dot, ExpDigits, ExpMarker, Fraction, Hex, HexStart, Integer, LeadingDot,
            Octal, Start, Word, Zero,
        };
        let next = match self.state {
            Start => match ch {
                '0' => Some(Zero),
                '1'..='9' => Some(Integer),
                '.' => Some(LeadingDot),
                _ => None,
            },
            Zero => match ch {
                'x' | 'X' => Some(HexStart),
                '0'..='7' => Some(Octal),
                '8' | '9' => Some(Integer),
                '.' => Some(Dot),
                'e' | 'E' => Some(ExpMarker),
                _ => None,
            },
            Integer => match ch {
                '0'..='9' => Some(Integer),
                '.' => Some(Dot),
                'e' | 'E' => Some(ExpMarker),
                _ => None,
            },
            Octal => match ch {
                '0'..='7' => Some(Octal),
                '8' | '9' => Some(Integer),
                '.' => Some(Dot),
                'e' | 'E' => Some(ExpMarker),
                _ => None,
            },
            HexStart | Hex => ch.is_ascii_hexdigit().then_some(Hex),
            LeadingDot | Dot | Fraction => match ch {
                '0'..='9' => Some(Fraction),
                'e' | 'E' if self.state != LeadingDot => Some(ExpMarker),
                _ => None,
            },
            ExpMarker | ExpDigits => ch.is_ascii_digit().then_some(ExpDigits),
            Word => self.is_word_char(ch).then_some(Word),
        };
        match next {
            Some(state) => {
                self.state = state;
                true
            }
            None if self.state != Word && self.is_word_char(ch) => {
                self.state = Word;
                true
            }
            None => false,
        }
    }

    fn is_word_char(&self, ch: char) -> bool {
        !(is_js_space(ch) || ch == '"' || ch == '\'' || self.punctuation.contains(ch))
    }

    /// The token type for everything recognized so far.
    pub fn token_type(&self) -> JsTokenType {
        match self.state {
            State::Word | State::Start => JsTokenType::Word,
            State::Zero
            | State::Integer
            | State::Octal
            | State::HexStart
            | State::Hex => JsTokenType::Integer,
            State::LeadingDot
            | State::Dot
            | State::Fraction
            | State::ExpMarker
            | State::ExpDigits => JsTokenType::Float,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::punctuation_trie;
    use super::*;
    use pretty_assertions::assert_eq;

    /// Run the recognizer over `text`, returning the recognized length and
    /// type.
    fn recognize(text: &str) -> (usize, JsTokenType) {
        let mut nr = NumberRecognizer::new(punctuation_trie());
        let mut len = 0;
        for ch in text.chars() {
            if !nr.recognize(ch) {
                break;
            }
            len += 1;
        }
        (len, nr.token_type())
    }

    #[test]
    fn integers() {
        assert_eq!(recognize("0"), (1, JsTokenType::Integer));
        assert_eq!(recognize("42;"), (2, JsTokenType::Integer));
        assert_eq!(recognize("0x01 "), (4, JsTokenType::Integer));
        assert_eq!(recognize("0755)"), (4, JsTokenType::Integer));
        assert_eq!(recognize("089,"), (3, JsTokenType::Integer));
    }

    #[test]
    fn floats() {
        assert_eq!(recognize("1.5+"), (3, JsTokenType::Float));
        assert_eq!(recognize("0.."), (2, JsTokenType::Float)); // "0." then "."
        assert_eq!(recognize(".5 "), (2, JsTokenType::Float));
        assert_eq!(recognize("1e5;"), (3, JsTokenType::Float));
        assert_eq!(recognize("1.25e7 "), (6, JsTokenType::Float));
    }

    #[test]
    fn exponent_sign_is_not_consumed() {
        // The '+' is punctuation; the joiner re-attaches it later.
        assert_eq!(recognize("1e+5"), (2, JsTokenType::Float));
        assert_eq!(recognize("1E-5"), (2, JsTokenType::Float));
    }

    #[test]
    fn hex_has_no_exponent() {
        // 'e' is a hex digit, so 0xe is an integer, not a dangling exponent.
        assert_eq!(recognize("0xe+1"), (3, JsTokenType::Integer));
    }

    #[test]
    fn word_fallback() {
        assert_eq!(recognize("0x1z3 "), (5, JsTokenType::Word));
        assert_eq!(recognize("12abc;"), (5, JsTokenType::Word));
    }
}

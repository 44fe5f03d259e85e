//! CSS tokenizing, per the CSS 2.1 scanner grammar.
//!
//! [`CssSplitter`] produces raw tokens; [`CssLexer`] is the joining pass
//! that rebuilds the grammar's two odd multi-token productions:
//! `!{w}important` becomes a single DIRECTIVE, and a lone `-` immediately
//! followed by an identifier becomes one hyphen-prefixed IDENT (the
//! splitter never starts an identifier at `-`, which would collide with
//! negative numbers under one-character lookahead).

mod splitter;

pub use splitter::CssSplitter;

use std::collections::VecDeque;

use sieve_diagnostic::{MessageQueue, ParseResult};
use sieve_lexer_core::{CharProducer, Token, TokenStream};
use sieve_position::FilePosition;

/// Token classes the CSS pipeline produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CssTokenType {
    Space,
    Comment,
    String,
    /// A number with an optional unit or `%`, e.g. `12`, `1.5em`, `50%`.
    Quantity,
    /// `#` followed by a name.
    Hash,
    /// `U+…` unicode range.
    UnicodeRange,
    /// `url(…)`, whole.
    Uri,
    /// An identifier directly followed by `(`.
    Function,
    Ident,
    /// `@ident` at-keywords.
    Symbol,
    /// `!important`, joined.
    Directive,
    Punctuation,
    /// `${…}` substitution block (only when enabled).
    Substitution,
}

/// Whitespace per the CSS 2 `s` production.
pub fn is_css_space(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n' | '\u{c}')
}

/// Hex digit per the CSS 2 `h` production.
pub fn is_hex_char(ch: char) -> bool {
    ch.is_ascii_hexdigit()
}

/// Decode backslash escapes in an identifier: up to six hex digits plus one
/// optional trailing space, or a literal escaped character.
///
/// Escape decoding is not baked into the token stream; callers apply this
/// on demand when they need the identifier's meaning rather than its
/// spelling.
pub fn decode_css_identifier(ident: &str) -> String {
    if !ident.contains('\\') {
        return ident.to_owned();
    }
    let chars: Vec<char> = ident.chars().collect();
    let mut out = String::with_capacity(ident.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '\\' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        i += 1;
        let hex_start = i;
        let mut code_point: u32 = 0;
        while i < chars.len() && i - hex_start < 6 && is_hex_char(chars[i]) {
            code_point = (code_point << 4) | chars[i].to_digit(16).unwrap_or(0);
            i += 1;
        }
        if i == hex_start {
            // Not a hex escape; the next character stands for itself.
            if i < chars.len() {
                out.push(chars[i]);
                i += 1;
            }
        } else {
            out.push(char::from_u32(code_point).unwrap_or('\u{fffd}'));
            if i < chars.len() && is_css_space(chars[i]) {
                i += 1;
            }
        }
    }
    out
}

/// The assembled CSS token stream.
pub struct CssLexer {
    splitter: CssSplitter,
    pending: VecDeque<Token<CssTokenType>>,
}

impl CssLexer {
    /// Lex CSS from `producer`, reporting non-fatal conditions to
    /// `messages`.
    pub fn new(producer: Box<dyn CharProducer>, messages: Box<dyn MessageQueue>) -> CssLexer {
        Self::with_options(producer, false, messages)
    }

    /// Lex CSS; when `allow_substitutions` is set, `${…}` blocks lex as
    /// SUBSTITUTION tokens.
    pub fn with_options(
        producer: Box<dyn CharProducer>,
        allow_substitutions: bool,
        messages: Box<dyn MessageQueue>,
    ) -> CssLexer {
        CssLexer {
            splitter: CssSplitter::new(producer, allow_substitutions, messages),
            pending: VecDeque::new(),
        }
    }

    pub fn substitutions_allowed(&self) -> bool {
        self.splitter.substitutions_allowed()
    }

    /// Replace the pending tokens with one token of the given type whose
    /// text is their concatenation.
    fn reduce(&mut self, kind: CssTokenType) {
        let Some(first) = self.pending.front() else { return };
        let Some(last) = self.pending.back() else { return };
        let pos = FilePosition::span(&first.pos, &last.pos);
        let text: String = self.pending.iter().map(|t| t.text.as_str()).collect();
        self.pending.clear();
        self.pending.push_back(Token::new(text, kind, pos));
    }

    /// Ensure a token is pending, joining split productions.
    fn produce(&mut self) -> ParseResult<()> {
        if !self.pending.is_empty() {
            return Ok(());
        }
        let Some(t) = self.splitter.next()? else {
            return Ok(());
        };
        let is_punctuation = t.kind == CssTokenType::Punctuation;
        let text = t.text.clone();
        self.pending.push_back(t);
        if !is_punctuation {
            return Ok(());
        }

        if text == "!" {
            // IMPORTANT_SYM "!"({w}|{comment})*{I}{M}{P}{O}{R}{T}{A}{N}{T}
            loop {
                let Some(t2) = self.splitter.next()? else {
                    return Ok(());
                };
                let done = !matches!(t2.kind, CssTokenType::Space | CssTokenType::Comment);
                self.pending.push_back(t2);
                if done {
                    break;
                }
            }
            let joins = self.pending.back().is_some_and(|t2| {
                t2.kind == CssTokenType::Ident
                    && decode_css_identifier(&t2.text).eq_ignore_ascii_case("important")
            });
            if joins {
                self.reduce(CssTokenType::Directive);
            }
        } else if text == "-" {
            // '-'{nmstart}{nmchar}* -- rejoin the hyphen onto the ident.
            if let Some(t2) = self.splitter.next()? {
                let joins = t2.kind == CssTokenType::Ident;
                self.pending.push_back(t2);
                if joins {
                    self.reduce(CssTokenType::Ident);
                }
            }
        }
        Ok(())
    }
}

impl TokenStream<CssTokenType> for CssLexer {
    fn next(&mut self) -> ParseResult<Option<Token<CssTokenType>>> {
        self.produce()?;
        Ok(self.pending.pop_front())
    }
}

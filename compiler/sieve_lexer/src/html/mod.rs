//! HTML tokenizing.
//!
//! [`HtmlInputSplitter`] breaks the character stream into raw
//! text/tag/comment/directive tokens, each starting where the previous one
//! ended. [`HtmlLexer`] is the second pass: it drops ignorable whitespace,
//! collapses adjacent text, and promotes text inside tags to attribute
//! names and values.

mod escaping;
mod splitter;

pub use escaping::HtmlTextEscapingMode;
pub use splitter::HtmlInputSplitter;

use std::collections::VecDeque;

use sieve_diagnostic::ParseResult;
use sieve_lexer_core::{CharProducer, Token, TokenStream};
use sieve_position::FilePosition;

/// Token classes the HTML pipeline produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HtmlTokenType {
    /// Ordinary character data, entities still encoded.
    Text,
    /// Raw text inside an escape-exempt block; entities do not decode.
    Unescaped,
    /// A quoted attribute value, quotes included.
    Qstring,
    /// `<` through the tag name, e.g. `<p` or `</p`.
    Tagbegin,
    /// `>` or `/>`.
    Tagend,
    /// An attribute name, promoted from text by the second pass.
    Attrname,
    /// An attribute value, promoted from text by the second pass.
    Attrvalue,
    Comment,
    /// `<![CDATA[…]]>` (XML input only).
    Cdata,
    /// `<!DOCTYPE …>`, `<?…?>`, and other declarations.
    Directive,
    /// `<%…%>` server-side code.
    Servercode,
    /// Whitespace inside a tag body; dropped by the second pass.
    Ignorable,
    /// IE downlevel-revealed conditional marker `<![if …]>`.
    IeDrCommentBegin,
    /// IE downlevel-revealed conditional marker `<![endif]>`.
    IeDrCommentEnd,
}

/// Attributes that may appear in HTML without a value; an unquoted
/// attribute value stops absorbing text when one of these follows.
/// Sorted for binary search.
const VALUELESS_ATTRIB_NAMES: &[&str] = &[
    "checked", "compact", "declare", "defer", "disabled", "ismap", "multiple",
    "nohref", "noresize", "noshade", "nowrap", "readonly", "selected",
];

fn is_valueless_attribute(name: &str) -> bool {
    VALUELESS_ATTRIB_NAMES
        .binary_search(&name.to_ascii_lowercase().as_str())
        .is_ok()
}

/// The FSM that reclassifies text tokens inside tags as attribute names
/// and values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    OutsideTag,
    InTag,
    SawName,
    SawEq,
}

/// The assembled HTML token stream.
pub struct HtmlLexer {
    splitter: HtmlInputSplitter,
    state: State,
    lookahead: VecDeque<Token<HtmlTokenType>>,
}

impl HtmlLexer {
    /// Lex HTML from `producer`.
    pub fn new(producer: Box<dyn CharProducer>) -> HtmlLexer {
        Self::with_options(producer, false)
    }

    /// Lex from `producer`, optionally with XML rules (case-sensitive tag
    /// names, CDATA sections, no escape-exempt blocks).
    pub fn with_options(producer: Box<dyn CharProducer>, as_xml: bool) -> HtmlLexer {
        HtmlLexer {
            splitter: HtmlInputSplitter::new(producer, as_xml),
            state: State::OutsideTag,
            lookahead: VecDeque::new(),
        }
    }

    pub fn treated_as_xml(&self) -> bool {
        self.splitter.treated_as_xml()
    }

    fn read_token(&mut self) -> ParseResult<Option<Token<HtmlTokenType>>> {
        if let Some(t) = self.lookahead.pop_front() {
            return Ok(Some(t));
        }
        self.splitter.next()
    }

    fn peek_token(&mut self, i: usize) -> ParseResult<Option<&Token<HtmlTokenType>>> {
        while self.lookahead.len() <= i {
            match self.splitter.next()? {
                Some(t) => self.lookahead.push_back(t),
                None => break,
            }
        }
        Ok(self.lookahead.get(i))
    }

    fn pushback_token(&mut self, token: Token<HtmlTokenType>) {
        self.lookahead.push_front(token);
    }

    fn join(a: Token<HtmlTokenType>, b: &Token<HtmlTokenType>) -> Token<HtmlTokenType> {
        let pos = FilePosition::span(&a.pos, &b.pos);
        Token::new(format!("{}{}", a.text, b.text), a.kind, pos)
    }

    /// Collapse all immediately following tokens of the same type into one.
    fn collapse_subsequent(
        &mut self,
        token: Token<HtmlTokenType>,
    ) -> ParseResult<Token<HtmlTokenType>> {
        let mut collapsed = token;
        while self
            .peek_token(0)?
            .is_some_and(|next| next.kind == collapsed.kind)
        {
            let Some(next) = self.read_token()? else { break };
            collapsed = Self::join(collapsed, &next);
        }
        Ok(collapsed)
    }

    /// Absorb the tokens of an unquoted attribute value.
    ///
    /// Space and text adjacent to the value belong to it, but the
    /// absorption stops at end of file, a valueless attribute name, a tag
    /// end, or a `name=` pattern -- exactly the places where what follows
    /// must be a new attribute rather than more of this value.
    fn collapse_attribute_name(
        &mut self,
        token: Token<HtmlTokenType>,
    ) -> ParseResult<Token<HtmlTokenType>> {
        if self.treated_as_xml() {
            return Ok(token);
        }
        let mut n_to_merge = 0;
        loop {
            let Some(kind) = self.peek_token(n_to_merge)?.map(|t| t.kind) else {
                break;
            };
            if kind == HtmlTokenType::Ignorable {
                let Some(text) = self.peek_token(n_to_merge + 1)? else { break };
                if text.kind != HtmlTokenType::Text {
                    break;
                }
                let text_text = text.text.clone();
                if is_valueless_attribute(&text_text) {
                    break;
                }
                let mut eq_index = n_to_merge + 2;
                if self.peek_token(eq_index)?.is_some_and(|eq| {
                    eq.kind == HtmlTokenType::Ignorable
                }) {
                    eq_index += 1;
                }
                match self.peek_token(eq_index)? {
                    None => break,
                    Some(eq) if eq.text_is("=") => break,
                    Some(_) => {}
                }
            } else if kind != HtmlTokenType::Text {
                break;
            }
            n_to_merge += 1;
        }
        let mut collapsed = token;
        for _ in 0..n_to_merge {
            let Some(next) = self.read_token()? else { break };
            collapsed = Self::join(collapsed, &next);
        }
        Ok(collapsed)
    }

    fn produce(&mut self) -> ParseResult<Option<Token<HtmlTokenType>>> {
        loop {
            let Some(token) = self.read_token()? else {
                return Ok(None);
            };

            match token.kind {
                HtmlTokenType::Tagbegin => {
                    self.state = State::InTag;
                    return Ok(Some(token));
                }
                HtmlTokenType::Tagend => {
                    if self.state == State::SawEq && !self.treated_as_xml() {
                        // Distinguish <input checked=> from <input checked>:
                        // the dangling = gets an empty value.
                        let pos = token.pos.start_of();
                        self.pushback_token(token);
                        self.state = State::InTag;
                        return Ok(Some(Token::new("", HtmlTokenType::Attrvalue, pos)));
                    }
                    self.state = State::OutsideTag;
                    return Ok(Some(token));
                }
                HtmlTokenType::Ignorable => continue,
                _ => {}
            }

            return Ok(Some(match self.state {
                State::OutsideTag => {
                    if matches!(token.kind, HtmlTokenType::Text | HtmlTokenType::Unescaped)
                    {
                        self.collapse_subsequent(token)?
                    } else {
                        token
                    }
                }
                State::InTag => {
                    if token.kind == HtmlTokenType::Text && !token.text_is("=") {
                        self.state = State::SawName;
                        token.reclassify(HtmlTokenType::Attrname)
                    } else {
                        token
                    }
                }
                State::SawName => {
                    if token.kind == HtmlTokenType::Text {
                        if token.text_is("=") {
                            self.state = State::SawEq;
                            continue;
                        }
                        token.reclassify(HtmlTokenType::Attrname)
                    } else {
                        self.state = State::InTag;
                        token
                    }
                }
                State::SawEq => {
                    if matches!(token.kind, HtmlTokenType::Text | HtmlTokenType::Qstring) {
                        self.state = State::InTag;
                        let value = if token.kind == HtmlTokenType::Text {
                            self.collapse_attribute_name(token)?
                        } else {
                            token
                        };
                        value.reclassify(HtmlTokenType::Attrvalue)
                    } else {
                        token
                    }
                }
            }));
        }
    }
}

impl TokenStream<HtmlTokenType> for HtmlLexer {
    fn next(&mut self) -> ParseResult<Option<Token<HtmlTokenType>>> {
        self.produce()
    }
}

//! JavaScript tokenizing.
//!
//! [`JsLexer`] stacks three passes over one producer: the
//! [`InputElementSplitter`](splitter::InputElementSplitter) cuts the input
//! into strings, comments, regexes, punctuation runs, and words; the
//! [`InputElementJoiner`](joiner::InputElementJoiner) re-attaches exponent
//! signs the splitter deliberately left split; and the
//! [`WordClassifier`](joiner::WordClassifier) resolves words into keywords
//! and numeric literals. Line continuations (`\` before a line terminator)
//! are elided by a decoding wrapper before the splitter ever sees them.

mod joiner;
mod number;
mod splitter;

pub use joiner::{InputElementJoiner, WordClassifier};
pub use number::NumberRecognizer;
pub use splitter::InputElementSplitter;

use std::sync::LazyLock;

use sieve_diagnostic::ParseResult;
use sieve_lexer_core::{
    CharProducer, DecodingCharProducer, PunctuationTrie, Token, TokenStream,
};

/// Token classes the JavaScript pipeline produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JsTokenType {
    Comment,
    String,
    Regexp,
    Punctuation,
    Word,
    Keyword,
    Integer,
    Float,
}

/// Every JavaScript punctuation string.
///
/// The set satisfies the trie's greedy-split invariant: each multi-character
/// member has a one-character terminal prefix, and every member string
/// between a member and a longer member it prefixes is itself a member
/// (`.`, `..`, `...` being the interesting chain).
#[rustfmt::skip]
const PUNCTUATION: &[&str] = &[
    "!", "!=", "!==", "%", "%=", "&", "&&", "&&=", "&=", "(", ")",
    "*", "*=", "+", "++", "+=", ",", "-", "--", "-=", "->", ".", "..",
    "...", "/", "/=", ":", "::", ";", "<", "<<", "<<=", "<=", "=", "==",
    "===", ">", ">=", ">>", ">>=", ">>>", ">>>=", "?", "[", "]",
    "^", "^=", "^^", "^^=", "{", "|", "|=", "||", "||=", "}", "~",
];

static PUNCTUATION_TRIE: LazyLock<PunctuationTrie<()>> = LazyLock::new(|| {
    let entries: Vec<(&str, ())> = PUNCTUATION.iter().map(|p| (*p, ())).collect();
    PunctuationTrie::new(&entries)
});

/// The shared trie over [`PUNCTUATION`].
pub fn punctuation_trie() -> &'static PunctuationTrie<()> {
    &PUNCTUATION_TRIE
}

/// ES3 keywords plus reserved words, sorted for binary search.
#[rustfmt::skip]
const KEYWORDS: &[&str] = &[
    "abstract", "boolean", "break", "byte", "case", "catch", "char",
    "class", "const", "continue", "debugger", "default", "delete", "do",
    "double", "else", "enum", "export", "extends", "false", "final",
    "finally", "float", "for", "function", "goto", "if", "implements",
    "import", "in", "instanceof", "int", "interface", "long", "native",
    "new", "null", "package", "private", "protected", "public", "return",
    "short", "static", "super", "switch", "synchronized", "this", "throw",
    "throws", "transient", "true", "try", "typeof", "var", "void",
    "volatile", "while", "with",
];

/// True iff `word` is a keyword or reserved word.
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.binary_search(&word).is_ok()
}

/// Tokens after which a `/` starts a regular expression literal rather than
/// a division operator. Sorted for binary search.
///
/// Per the JS2 rationale, the lexical grammar decides regex-vs-division
/// solely from the previous token; this is that token list. `//` is a
/// comment regardless.
#[rustfmt::skip]
const REGEXP_PRECEDERS: &[&str] = &[
    "!", "!=", "!==", "#", "%", "%=", "&", "&&", "&&=", "&=", "(", "*",
    "*=", "+", "+=", ",", "-", "-=", "->", ".", "..", "...", "/", "/=",
    ":", "::", ";", "<", "<<", "<<=", "<=", "=", "==", "===", ">", ">=",
    ">>", ">>=", ">>>", ">>>=", "?", "@", "[", "^", "^=", "^^", "^^=",
    "abstract", "break", "case", "catch", "class", "const", "continue",
    "debugger", "default", "delete", "do", "else", "enum", "export",
    "extends", "field", "final", "finally", "for", "function", "goto",
    "if", "implements", "import", "in", "instanceof", "is", "namespace",
    "native", "new", "package", "return", "static", "switch",
    "synchronized", "throw", "throws", "transient", "try", "typeof",
    "use", "var", "volatile", "while", "with", "{", "|", "|=", "||",
    "||=", "~",
];

/// May a regular expression literal follow a token with this text?
pub fn is_regexp_preceder(previous: &str) -> bool {
    if REGEXP_PRECEDERS.binary_search(&previous).is_err() {
        return false;
    }
    // A number ending in a decimal point would otherwise be mistaken for
    // the "." member above.
    if previous.len() >= 2 && previous.ends_with('.') {
        let bytes = previous.as_bytes();
        if bytes[bytes.len() - 2].is_ascii_digit() {
            return false;
        }
    }
    true
}

/// JS whitespace, including the exotic spaces and the byte-order marker
/// (treated as whitespace so a BOM between tokens never breaks lexing).
pub fn is_js_space(ch: char) -> bool {
    matches!(
        ch,
        ' ' | '\t'
            | '\r'
            | '\n'
            | '\u{c}'
            | '\u{a0}'
            | '\u{2000}'..='\u{200b}'
            | '\u{3000}'
            | '\u{feff}'
    )
}

/// JS line terminators.
pub fn is_js_line_separator(ch: char) -> bool {
    matches!(ch, '\r' | '\n' | '\u{2028}' | '\u{2029}')
}

/// The assembled JavaScript token stream.
pub struct JsLexer {
    stream: WordClassifier,
}

impl JsLexer {
    /// Lex plain JavaScript from `producer`.
    pub fn new(producer: Box<dyn CharProducer>) -> JsLexer {
        Self::with_options(producer, false)
    }

    /// Lex from `producer`; when `quasiliteral` is set, `@word` patterns
    /// (optionally suffixed `*`, `+`, or `?`) lex as single words.
    pub fn with_options(producer: Box<dyn CharProducer>, quasiliteral: bool) -> JsLexer {
        let elided = DecodingCharProducer::elide_line_continuations(producer);
        let splitter =
            InputElementSplitter::new(Box::new(elided), punctuation_trie(), quasiliteral);
        JsLexer {
            stream: WordClassifier::new(InputElementJoiner::new(splitter)),
        }
    }
}

impl TokenStream<JsTokenType> for JsLexer {
    fn next(&mut self) -> ParseResult<Option<Token<JsTokenType>>> {
        self.stream.next()
    }
}

#[cfg(test)]
mod tests;

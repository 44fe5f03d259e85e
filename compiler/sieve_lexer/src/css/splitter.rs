//! First-pass CSS token splitting, per the CSS 2.1 scanner grammar.

use sieve_diagnostic::{Message, MessageQueue, MessageType, ParseError, ParseResult};
use sieve_lexer_core::{CharProducer, Token, TokenStream};

use super::{is_css_space, is_hex_char, CssTokenType};

/// Nonascii characters may start and continue identifiers.
fn is_non_ascii(ch: char) -> bool {
    ch as u32 >= 0x80
}

/// Characters allowed in a bare (unquoted) `url(...)` body.
fn is_uri_char(ch: char) -> bool {
    matches!(ch, '!' | '#' | '$' | '%' | '&') || ('*'..='~').contains(&ch) || is_non_ascii(ch)
}

/// Splits CSS into spaces, comments, strings, quantities, hashes, unicode
/// ranges, URIs, functions, identifiers, symbols, substitutions, and
/// punctuation.
///
/// Identifiers never start at a `-` here (that would be ambiguous with
/// negative numbers under one-character lookahead); the joining pass glues
/// a lone `-` onto a following identifier instead. Likewise `!important`
/// leaves the splitter as separate tokens.
pub struct CssSplitter {
    p: Box<dyn CharProducer>,
    /// Whether `${…}` substitution blocks are recognized.
    allow_substitutions: bool,
    messages: Box<dyn MessageQueue>,
}

impl CssSplitter {
    pub fn new(
        p: Box<dyn CharProducer>,
        allow_substitutions: bool,
        messages: Box<dyn MessageQueue>,
    ) -> CssSplitter {
        CssSplitter {
            p,
            allow_substitutions,
            messages,
        }
    }

    pub fn substitutions_allowed(&self) -> bool {
        self.allow_substitutions
    }

    fn error(&self, message_type: MessageType, start: usize, end: usize) -> ParseError {
        ParseError(Message::new(
            message_type,
            self.p.file_position_for_offsets(start, end),
        ))
    }

    fn error_with(
        &self,
        message_type: MessageType,
        at: usize,
        parts: Vec<String>,
    ) -> ParseError {
        ParseError(Message::with_parts(
            message_type,
            self.p.file_position_for_offsets(at, at),
            parts,
        ))
    }

    fn produce(&mut self) -> ParseResult<Option<Token<CssTokenType>>> {
        let start = self.p.offset();
        let limit = self.p.limit();
        if start == limit {
            return Ok(None);
        }
        let ch = self.p.buffer()[start];
        let mut end = start + 1;

        let kind = if is_css_space(ch) {
            self.parse_whitespace(&mut end);
            CssTokenType::Space
        } else if ch == '/' {
            match self.peek(end) {
                Some('*') => {
                    // /\*[^*]*\*+([^/*][^*]*\*+)*\/
                    let mut state = 0u8; // 0 start, 1 body, 2 saw *, 3 done
                    while state != 3 {
                        let Some(ch2) = self.peek(end) else {
                            return Err(self.error(
                                MessageType::UnterminatedCommentToken,
                                start,
                                end,
                            ));
                        };
                        end += 1;
                        state = match (state, ch2) {
                            (0, _) => 1,
                            (1, '*') | (2, '*') => 2,
                            (2, '/') => 3,
                            _ => 1,
                        };
                    }
                    CssTokenType::Comment
                }
                Some('/') => {
                    // Not part of standard CSS; tolerated with a warning.
                    self.messages.add_message(Message::new(
                        MessageType::InvalidLineComment,
                        self.p.file_position_for_offsets(start, end + 1),
                    ));
                    while self
                        .peek(end)
                        .is_some_and(|c| !matches!(c, '\n' | '\r' | '\u{c}'))
                    {
                        end += 1;
                    }
                    CssTokenType::Comment
                }
                _ => CssTokenType::Punctuation,
            }
        } else if ch == '~' || ch == '|' {
            // "~=" INCLUDES, "|=" DASHMATCH
            if self.peek(end) == Some('=') {
                end += 1;
            }
            CssTokenType::Punctuation
        } else if ch == '\'' || ch == '"' {
            end = start;
            self.parse_string(start, &mut end)?;
            CssTokenType::String
        } else if ch == '@' {
            // "@import", "@media", "@"{ident} ...
            if self.parse_ident(&mut end)? {
                CssTokenType::Symbol
            } else {
                CssTokenType::Punctuation
            }
        } else if ch == '!' {
            // "!{w}important" is joined from these pieces in a later pass.
            CssTokenType::Punctuation
        } else if ch == '#' {
            if self.parse_name(&mut end)? {
                CssTokenType::Hash
            } else {
                CssTokenType::Punctuation
            }
        } else if ch == '<' || ch == '-' {
            // "<!--" CDO and "-->" CDC
            let tail = if ch == '<' { "!--" } else { "->" };
            if self.matches_at(end, tail) {
                end += tail.len();
            }
            CssTokenType::Punctuation
        } else if ch.is_ascii_digit() || ch == '.' {
            let is_num = if ch == '.' {
                self.parse_int(&mut end)
            } else {
                end = start;
                self.parse_num(start, &mut end)?;
                true
            };
            if is_num {
                // {num}{ident} DIMEN, {num}% PERCENTAGE, {num} NUMBER
                if !self.parse_ident(&mut end)? && self.peek(end) == Some('%') {
                    end += 1;
                }
                CssTokenType::Quantity
            } else {
                // lone '.'
                CssTokenType::Punctuation
            }
        } else if self.try_ident(start, &mut end)? {
            if end == start + 1 && ch == 'U' && self.peek(end) == Some('+') {
                // U\+{h}{1,6}(-{h}{1,6})?  and the ?-wildcard forms
                end += 1;
                self.parse_range(&mut end)?;
                CssTokenType::UnicodeRange
            } else if self.peek(end) == Some('(') {
                end += 1;
                let head = self.p.text(start, end);
                if head.eq_ignore_ascii_case("url(") {
                    // "url("{w}{string|url}{w}")" URI
                    self.parse_whitespace(&mut end);
                    if matches!(self.peek(end), Some('\'' | '"')) {
                        self.parse_string(start, &mut end)?;
                    } else {
                        self.parse_uri_body(&mut end)?;
                    }
                    self.parse_whitespace(&mut end);
                    match self.peek(end) {
                        Some(')') => end += 1,
                        found => {
                            return Err(self.error_with(
                                MessageType::ExpectedToken,
                                end,
                                vec![
                                    ")".to_owned(),
                                    found.map_or_else(
                                        || "<end-of-input>".to_owned(),
                                        String::from,
                                    ),
                                ],
                            ));
                        }
                    }
                    CssTokenType::Uri
                } else {
                    // {ident}"(" FUNCTION
                    CssTokenType::Function
                }
            } else {
                CssTokenType::Ident
            }
        } else if ch == '$' && self.allow_substitutions {
            // ${...} with balanced braces; a quoted string may contain
            // braces without ending the block early.
            if self.peek(end) != Some('{') {
                CssTokenType::Punctuation
            } else {
                let mut state = 0u8; // 0 code, 1 string, 2 escape, 3 done
                let mut n_open = 0u32;
                let mut delim = '\0';
                while state != 3 {
                    let Some(ch2) = self.peek(end) else {
                        return Err(self.error(
                            MessageType::UnterminatedSubstitution,
                            start,
                            end,
                        ));
                    };
                    end += 1;
                    match state {
                        0 => match ch2 {
                            '"' | '\'' => {
                                delim = ch2;
                                state = 1;
                            }
                            '{' => n_open += 1,
                            '}' => {
                                n_open -= 1;
                                if n_open == 0 {
                                    state = 3;
                                }
                            }
                            _ => {}
                        },
                        1 if ch2 == delim => state = 0,
                        1 if ch2 == '\\' => state = 2,
                        2 => state = 1,
                        _ => {}
                    }
                }
                // A trailing unit makes the substitution a quantity-shaped
                // value, e.g. ${x}px or ${x}%.
                if !self.parse_ident(&mut end)? && self.peek(end) == Some('%') {
                    end += 1;
                }
                CssTokenType::Substitution
            }
        } else {
            CssTokenType::Punctuation
        };

        debug_assert!(end > start);
        let pos = self.p.file_position_for_offsets(start, end);
        let text = self.p.text(start, end);
        self.p.consume_to(end);
        Ok(Some(Token::new(text, kind, pos)))
    }

    fn peek(&self, at: usize) -> Option<char> {
        (at < self.p.limit()).then(|| self.p.buffer()[at])
    }

    /// Attempt an identifier from `start`, rewinding `end` first.
    fn try_ident(&self, start: usize, end: &mut usize) -> ParseResult<bool> {
        *end = start;
        let ok = self.parse_ident(end)?;
        if !ok {
            *end = start + 1;
        }
        Ok(ok)
    }

    fn matches_at(&self, at: usize, pat: &str) -> bool {
        let buf = self.p.buffer();
        let limit = self.p.limit();
        pat.len() <= limit.saturating_sub(at)
            && pat.bytes().zip(&buf[at..]).all(|(p, &c)| char::from(p) == c)
    }

    // w [ \t\r\n\f]*
    fn parse_whitespace(&self, end: &mut usize) {
        while self.peek(*end).is_some_and(is_css_space) {
            *end += 1;
        }
    }

    // string1 \"([^\n\r\f\\"]|\\{nl}|{escape})*\"  and the ' form
    fn parse_string(&self, start: usize, end: &mut usize) -> ParseResult<bool> {
        let Some(delim) = self.peek(*end).filter(|&c| c == '\'' || c == '"') else {
            return Ok(false);
        };
        *end += 1;
        loop {
            let Some(ch) = self.peek(*end) else {
                return Err(self.error(MessageType::UnterminatedStringToken, start, *end));
            };
            match ch {
                '\n' | '\r' | '\u{c}' => {
                    return Err(self.error_with(
                        MessageType::MalformedString,
                        *end,
                        vec![ch.to_string()],
                    ));
                }
                '\\' => {
                    self.parse_escape_or_newline(end)?;
                }
                _ => {
                    *end += 1;
                    if ch == delim {
                        return Ok(true);
                    }
                }
            }
        }
    }

    // url ([!#$%&*-~]|{nonascii}|{escape})*
    fn parse_uri_body(&self, end: &mut usize) -> ParseResult<()> {
        loop {
            match self.peek(*end) {
                Some(ch) if is_uri_char(ch) => *end += 1,
                Some('\\') => {
                    self.parse_escape(end)?;
                }
                _ => return Ok(()),
            }
        }
    }

    // num [0-9]+|[0-9]*"."[0-9]+ -- the leading-dot case is handled by the
    // caller, since "." alone is punctuation under one-char lookahead.
    fn parse_num(&self, start: usize, end: &mut usize) -> ParseResult<()> {
        let had_int = self.parse_int(end);
        debug_assert!(had_int);
        if self.peek(*end) == Some('.') {
            *end += 1;
            if !self.peek(*end).is_some_and(|c| c.is_ascii_digit()) {
                return Err(self.error_with(
                    MessageType::MalformedNumber,
                    *end,
                    vec![self.p.text(start, *end)],
                ));
            }
            self.parse_int(end);
        }
        Ok(())
    }

    fn parse_int(&self, end: &mut usize) -> bool {
        let mut any = false;
        while self.peek(*end).is_some_and(|c| c.is_ascii_digit()) {
            *end += 1;
            any = true;
        }
        any
    }

    // ident -?{nmstart}{nmchar}*  -- the '-' is joined in a later pass.
    fn parse_ident(&self, end: &mut usize) -> ParseResult<bool> {
        if !self.parse_nm_start(end)? {
            return Ok(false);
        }
        while self.parse_nm_char(end)? {}
        Ok(true)
    }

    // name {nmchar}+
    fn parse_name(&self, end: &mut usize) -> ParseResult<bool> {
        if !self.parse_nm_char(end)? {
            return Ok(false);
        }
        while self.parse_nm_char(end)? {}
        Ok(true)
    }

    // nmstart [_a-z]|{nonascii}|{escape}
    fn parse_nm_start(&self, end: &mut usize) -> ParseResult<bool> {
        match self.peek(*end) {
            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' || is_non_ascii(ch) => {
                *end += 1;
                Ok(true)
            }
            Some('\\') => self.parse_escape(end),
            _ => Ok(false),
        }
    }

    // nmchar [_a-z0-9-]|{nonascii}|{escape}
    fn parse_nm_char(&self, end: &mut usize) -> ParseResult<bool> {
        if self.parse_nm_start(end)? {
            return Ok(true);
        }
        match self.peek(*end) {
            Some(ch) if ch.is_ascii_digit() || ch == '-' => {
                *end += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    // escape {unicode}|\\[^\r\n\f0-9a-f]
    fn parse_escape(&self, end: &mut usize) -> ParseResult<bool> {
        if self.peek(*end) != Some('\\') {
            return Ok(false);
        }
        *end += 1;
        self.parse_escape_body(end)?;
        Ok(true)
    }

    // escape, or \\{nl} inside a string
    fn parse_escape_or_newline(&self, end: &mut usize) -> ParseResult<bool> {
        if self.peek(*end) != Some('\\') {
            return Ok(false);
        }
        *end += 1;
        match self.peek(*end) {
            Some('\n' | '\u{c}') => *end += 1,
            Some('\r') => {
                *end += 1;
                if self.peek(*end) == Some('\n') {
                    *end += 1;
                }
            }
            _ => self.parse_escape_body(end)?,
        }
        Ok(true)
    }

    // unicode \\{h}{1,6}(\r\n|[ \t\r\n\f])?
    fn parse_escape_body(&self, end: &mut usize) -> ParseResult<()> {
        let Some(ch) = self.peek(*end) else {
            return Err(self.error_with(
                MessageType::ExpectedToken,
                *end,
                vec!["<hex-digit>".to_owned(), "<end-of-input>".to_owned()],
            ));
        };
        *end += 1;
        if is_hex_char(ch) {
            for _ in 0..5 {
                match self.peek(*end) {
                    Some(c) if is_hex_char(c) => *end += 1,
                    _ => break,
                }
            }
            if let Some(space) = self.peek(*end).filter(|&c| is_css_space(c)) {
                *end += 1;
                if space == '\r' && self.peek(*end) == Some('\n') {
                    *end += 1;
                }
            }
            Ok(())
        } else if !matches!(ch, '\r' | '\n' | '\u{c}') {
            Ok(())
        } else {
            Err(self.error_with(
                MessageType::UnrecognizedEscape,
                *end - 1,
                vec![ch.to_string()],
            ))
        }
    }

    // range \?{1,6} | {h}{1,6}(\?{0,5…})? (-{h}{1,6})?
    fn parse_range(&self, end: &mut usize) -> ParseResult<()> {
        let wildcard = self.peek(*end) == Some('?');
        let consumed = self.parse_range_half(end);
        if consumed == 0 {
            return Err(self.error_with(
                MessageType::ExpectedToken,
                *end,
                vec![
                    "<hex-digit>".to_owned(),
                    self.peek(*end)
                        .map_or_else(|| "<end-of-input>".to_owned(), String::from),
                ],
            ));
        }
        // A second half follows a '-' in the non-wildcard form.
        if !wildcard && self.peek(*end) == Some('-') {
            *end += 1;
            if self.parse_range_half(end) == 0 {
                return Err(self.error_with(
                    MessageType::ExpectedToken,
                    *end,
                    vec![
                        "<hex-digit>".to_owned(),
                        self.peek(*end)
                            .map_or_else(|| "<end-of-input>".to_owned(), String::from),
                    ],
                ));
            }
        }
        Ok(())
    }

    /// Up to six hex digits followed by `?` wildcards; returns characters
    /// consumed.
    fn parse_range_half(&self, end: &mut usize) -> usize {
        let mut len = 0;
        while len < 6 && self.peek(*end).is_some_and(is_hex_char) {
            *end += 1;
            len += 1;
        }
        while len < 6 && self.peek(*end) == Some('?') {
            *end += 1;
            len += 1;
        }
        len
    }
}

impl TokenStream<CssTokenType> for CssSplitter {
    fn next(&mut self) -> ParseResult<Option<Token<CssTokenType>>> {
        self.produce()
    }
}

//! First-pass HTML token splitting.

use sieve_diagnostic::ParseResult;
use sieve_lexer_core::{CharProducer, Token, TokenStream};

use super::escaping::HtmlTextEscapingMode;
use super::HtmlTokenType;

/// States for optimistically identifying tags and the other `<`-introduced
/// structures.
///
/// The escaping-text-span states implement HTML5's rule that `<!--…-->`
/// inside CDATA/RCDATA content hides what would otherwise look like the
/// element's close tag: the span's start may even share its hyphens with
/// its end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Tagname,
    Slash,
    Bang,
    BangDash,
    Cdata,
    CdataSq1,
    CdataSq2,
    Comment,
    CommentDash,
    CommentDashDash,
    IeDhCommentBegin,
    IeDhCommentEnd,
    IeDrCommentBegin,
    IeDrCommentEnd,
    Directive,
    AppDirective,
    AppDirectiveQmark,
    ServerCode,
    ServerCodePct,
    UnescapedLtBang,
    UnescapedLtBangDash,
    EscapingTextSpan,
    EscapingTextSpanDash,
    EscapingTextSpanDashDash,
}

/// True iff `buf[at..]` starts with the ASCII pattern `pat`.
fn lookahead_matches(buf: &[char], at: usize, limit: usize, pat: &str) -> bool {
    pat.len() <= limit.saturating_sub(at)
        && pat
            .bytes()
            .zip(&buf[at..])
            .all(|(p, &ch)| char::from(p) == ch)
}

fn is_tagname_start(ch: char, as_xml: bool) -> bool {
    if ch.is_ascii_alphabetic() {
        return true;
    }
    if !as_xml {
        return false;
    }
    // XML NameStartChar, beyond ASCII letters.
    match ch {
        ':' | '_' => true,
        _ => matches!(ch as u32,
            0xc0..=0xd6
            | 0xd8..=0x2ff
            | 0x370..=0x37d
            | 0x37f..=0x1fff
            | 0x200c..=0x200d
            | 0x2070..=0x218f
            | 0x2c00..=0x2fef
            | 0x3001..=0xd7ff
            | 0xf900..=0xfdcf
            | 0xfdf0..=0xfffd),
    }
}

/// Breaks the character stream into
/// `TEXT/TAGBEGIN/TAGEND/QSTRING/COMMENT/CDATA/DIRECTIVE/SERVERCODE/…`
/// tokens such that each token starts where the previous one ended.
/// Attribute matching is a later pass; so is collapsing of adjacent text.
pub struct HtmlInputSplitter {
    p: Box<dyn CharProducer>,
    /// Whether the input is treated as XML, which disables escape-exempt
    /// blocks and IE conditional comments and makes tag names
    /// case-sensitive.
    as_xml: bool,
    /// True iff the cursor is inside a tag body.
    in_tag: bool,
    /// True iff inside a script/style/… block whose content does not
    /// follow the normal escaping rules.
    in_escape_exempt_block: bool,
    /// The close tag name required to end the current escape-exempt block.
    escape_exempt_tag_name: Option<String>,
    text_escaping_mode: Option<HtmlTextEscapingMode>,
    /// Text of the last non-ignorable token, which decides whether a quote
    /// opens an attribute-value string.
    last_non_ignorable: Option<String>,
}

impl HtmlInputSplitter {
    pub fn new(p: Box<dyn CharProducer>, as_xml: bool) -> HtmlInputSplitter {
        HtmlInputSplitter {
            p,
            as_xml,
            in_tag: false,
            in_escape_exempt_block: false,
            escape_exempt_tag_name: None,
            text_escaping_mode: None,
            last_non_ignorable: None,
        }
    }

    pub fn treated_as_xml(&self) -> bool {
        self.as_xml
    }

    /// Canonical form of a tag name: lowercased unless XML or namespaced.
    fn canonical_name(as_xml: bool, raw: &str) -> String {
        if as_xml || raw.contains(':') {
            raw.to_owned()
        } else {
            raw.to_ascii_lowercase()
        }
    }

    fn produce(&mut self) -> Option<Token<HtmlTokenType>> {
        let token = self.parse_token()?;

        // The tag machine is only dimly aware of escape-exempt blocks: it
        // reports the tokens, and this pass tracks block entry/exit and
        // reclassifies everything in the middle.
        if self.in_escape_exempt_block {
            if token.kind != HtmlTokenType::Servercode {
                let kind = if self.text_escaping_mode == Some(HtmlTextEscapingMode::Rcdata)
                {
                    // RCDATA stays TEXT since it can contain entities.
                    HtmlTokenType::Text
                } else {
                    HtmlTokenType::Unescaped
                };
                return Some(token.reclassify(kind));
            }
        } else if !self.as_xml {
            match token.kind {
                HtmlTokenType::Tagbegin => {
                    let name = Self::canonical_name(self.as_xml, &token.text[1..]);
                    if HtmlTextEscapingMode::is_tag_followed_by_literal_content(&name) {
                        self.text_escaping_mode = Some(HtmlTextEscapingMode::for_tag(&name));
                        self.escape_exempt_tag_name = Some(name);
                    }
                }
                HtmlTokenType::Tagend => {
                    self.in_escape_exempt_block = self.escape_exempt_tag_name.is_some();
                }
                _ => {}
            }
        }
        Some(token)
    }

    /// Split one raw token off the producer.
    #[allow(
        clippy::too_many_lines,
        reason = "one state machine, kept whole so the transitions read top to bottom"
    )]
    fn parse_token(&mut self) -> Option<Token<HtmlTokenType>> {
        let start = self.p.offset();
        let limit = self.p.limit();
        if start == limit {
            return None;
        }

        let buf = self.p.buffer();
        let mut end = start + 1;
        let mut ty: Option<HtmlTokenType> = None;
        let mut exit_exempt_block = false;

        let ch = buf[start];
        if self.in_tag {
            if ch == '>' {
                ty = Some(HtmlTokenType::Tagend);
                self.in_tag = false;
            } else if ch == '/' {
                if end != limit && buf[end] == '>' {
                    ty = Some(HtmlTokenType::Tagend);
                    self.in_tag = false;
                    end += 1;
                } else {
                    ty = Some(HtmlTokenType::Text);
                }
            } else if ch == '=' {
                ty = Some(HtmlTokenType::Text);
            } else if ch == '"' || ch == '\'' {
                if self.last_non_ignorable.as_deref() == Some("=") {
                    ty = Some(HtmlTokenType::Qstring);
                    while end < limit {
                        let done = buf[end] == ch;
                        end += 1;
                        if done {
                            break;
                        }
                    }
                } else {
                    ty = Some(HtmlTokenType::Text);
                }
            } else if !ch.is_whitespace() {
                ty = Some(HtmlTokenType::Text);
                let value_pending = self.last_non_ignorable.as_deref() == Some("=");
                while end < limit {
                    let ch2 = buf[end];
                    // A text chunk ends before />, a delimiter, or a quote
                    // that closes off the run.
                    if !value_pending && ch2 == '/' && end + 1 < limit && buf[end + 1] == '>'
                    {
                        break;
                    } else if ch2 == '>' || ch2 == '=' || ch2.is_whitespace() {
                        break;
                    } else if ch2 == '"' || ch2 == '\'' {
                        if let Some(&ch3) = buf.get(end + 1) {
                            if ch3.is_whitespace() || ch3 == '>' || ch3 == '/' {
                                end += 1;
                                break;
                            }
                        }
                    }
                    end += 1;
                }
            } else {
                // Whitespace inside tag bodies is dropped by later passes.
                ty = Some(HtmlTokenType::Ignorable);
                while end < limit && buf[end].is_whitespace() {
                    end += 1;
                }
            }
        } else if ch == '<' {
            if end == limit {
                ty = Some(HtmlTokenType::Text);
            } else {
                let ch2 = buf[end];
                let mut state: Option<State> = None;
                match ch2 {
                    '/' => {
                        state = Some(State::Slash);
                        end += 1;
                    }
                    '!' => {
                        if !self.in_escape_exempt_block {
                            state = Some(State::Bang);
                        } else if self
                            .escape_exempt_tag_name
                            .as_deref()
                            .is_some_and(HtmlTextEscapingMode::allows_escaping_text_span)
                        {
                            // Directives and CDATA sections could obscure
                            // the close of the escape-exempt block, but
                            // escaping text spans are significant in CDATA
                            // and RCDATA content.
                            state = Some(State::UnescapedLtBang);
                        }
                        end += 1;
                    }
                    '?' => {
                        if !self.in_escape_exempt_block {
                            state = Some(State::AppDirective);
                        }
                        end += 1;
                    }
                    '%' => {
                        state = Some(State::ServerCode);
                        end += 1;
                    }
                    _ => {
                        if is_tagname_start(ch2, self.as_xml) && !self.in_escape_exempt_block
                        {
                            state = Some(State::Tagname);
                            end += 1;
                        } else if ch2 == '<' {
                            ty = Some(HtmlTokenType::Text);
                        } else {
                            end += 1;
                        }
                    }
                }
                if let Some(mut st) = state {
                    // Open IE downlevel-hidden begin markers seen so far.
                    let mut ie_dh_comment_depth = 0u32;
                    let mut done = false;
                    while end < limit {
                        let ch = buf[end];
                        match st {
                            State::Tagname => {
                                if ch.is_whitespace() || ch == '>' || ch == '/' || ch == '<'
                                {
                                    // A matching close tag ends the escape
                                    // exempt block.
                                    if self.in_escape_exempt_block
                                        && buf[start + 1] == '/'
                                        && self.text_escaping_mode
                                            != Some(HtmlTextEscapingMode::PlainText)
                                    {
                                        let name: String =
                                            buf[start + 2..end].iter().collect();
                                        let name =
                                            Self::canonical_name(self.as_xml, &name);
                                        if Some(name.as_str())
                                            == self.escape_exempt_tag_name.as_deref()
                                        {
                                            exit_exempt_block = true;
                                        }
                                    }
                                    ty = Some(HtmlTokenType::Tagbegin);
                                    break;
                                }
                            }
                            State::Slash => {
                                if ch.is_alphabetic() {
                                    st = State::Tagname;
                                } else {
                                    if ch == '<' {
                                        ty = Some(HtmlTokenType::Text);
                                    } else {
                                        end += 1;
                                    }
                                    break;
                                }
                            }
                            State::Bang => {
                                if ch == '[' && self.as_xml {
                                    st = State::Cdata;
                                } else if ch == '-' {
                                    st = State::BangDash;
                                } else if !self.as_xml
                                    && lookahead_matches(buf, end, limit, "[if ")
                                {
                                    st = State::IeDrCommentBegin;
                                } else if !self.as_xml
                                    && lookahead_matches(buf, end, limit, "[endif]>")
                                {
                                    st = State::IeDrCommentEnd;
                                } else {
                                    st = State::Directive;
                                }
                            }
                            State::Cdata => {
                                if ch == ']' {
                                    st = State::CdataSq1;
                                }
                            }
                            State::CdataSq1 => {
                                st = if ch == ']' { State::CdataSq2 } else { State::Cdata };
                            }
                            State::CdataSq2 => {
                                if ch == '>' {
                                    ty = Some(HtmlTokenType::Cdata);
                                    done = true;
                                } else if ch != ']' {
                                    st = State::Cdata;
                                }
                            }
                            State::BangDash => {
                                st = if ch == '-' {
                                    State::Comment
                                } else {
                                    State::Directive
                                };
                            }
                            State::Comment => {
                                if ch == '-' {
                                    st = State::CommentDash;
                                } else if !self.as_xml
                                    && lookahead_matches(buf, end, limit, "[if ")
                                {
                                    ie_dh_comment_depth += 1;
                                    st = State::IeDhCommentBegin;
                                }
                            }
                            State::CommentDash => {
                                st = if ch == '-' {
                                    State::CommentDashDash
                                } else {
                                    State::Comment
                                };
                            }
                            State::CommentDashDash => {
                                if ch == '>' {
                                    ty = Some(HtmlTokenType::Comment);
                                    done = true;
                                } else if ch != '-' {
                                    st = State::CommentDash;
                                }
                            }
                            State::IeDhCommentBegin => {
                                if lookahead_matches(buf, end, limit, "<!--[if ") {
                                    ie_dh_comment_depth += 1;
                                } else if lookahead_matches(buf, end, limit, "[endif]-->")
                                {
                                    ie_dh_comment_depth -= 1;
                                }
                                if ie_dh_comment_depth == 0 {
                                    st = State::IeDhCommentEnd;
                                }
                            }
                            State::IeDhCommentEnd => {
                                if ch == '>' {
                                    ty = Some(HtmlTokenType::Comment);
                                    done = true;
                                }
                            }
                            State::IeDrCommentBegin => {
                                if ch == '>' {
                                    ty = Some(HtmlTokenType::IeDrCommentBegin);
                                    done = true;
                                }
                            }
                            State::IeDrCommentEnd => {
                                if ch == '>' {
                                    ty = Some(HtmlTokenType::IeDrCommentEnd);
                                    done = true;
                                }
                            }
                            State::Directive => {
                                if ch == '>' {
                                    ty = Some(HtmlTokenType::Directive);
                                    done = true;
                                }
                            }
                            State::AppDirective => {
                                if ch == '?' {
                                    st = State::AppDirectiveQmark;
                                }
                            }
                            State::AppDirectiveQmark => {
                                if ch == '>' {
                                    ty = Some(HtmlTokenType::Directive);
                                    done = true;
                                } else if ch != '?' {
                                    st = State::AppDirective;
                                }
                            }
                            State::ServerCode => {
                                if ch == '%' {
                                    st = State::ServerCodePct;
                                }
                            }
                            State::ServerCodePct => {
                                if ch == '>' {
                                    ty = Some(HtmlTokenType::Servercode);
                                    done = true;
                                } else if ch != '%' {
                                    st = State::ServerCode;
                                }
                            }
                            State::UnescapedLtBang => {
                                if ch == '-' {
                                    st = State::UnescapedLtBangDash;
                                } else {
                                    ty = Some(HtmlTokenType::Text);
                                    done = true;
                                }
                            }
                            State::UnescapedLtBangDash => {
                                if ch == '-' {
                                    // The span's start shares its hyphens
                                    // with a possible immediate end.
                                    st = State::EscapingTextSpanDashDash;
                                } else {
                                    ty = Some(HtmlTokenType::Text);
                                    done = true;
                                }
                            }
                            State::EscapingTextSpan => {
                                if ch == '-' {
                                    st = State::EscapingTextSpanDash;
                                }
                            }
                            State::EscapingTextSpanDash => {
                                st = if ch == '-' {
                                    State::EscapingTextSpanDashDash
                                } else {
                                    State::EscapingTextSpan
                                };
                            }
                            State::EscapingTextSpanDashDash => {
                                if ch == '>' {
                                    ty = Some(HtmlTokenType::Text);
                                    done = true;
                                } else if ch != '-' {
                                    st = State::EscapingTextSpan;
                                }
                            }
                        }
                        if ty == Some(HtmlTokenType::Tagbegin) {
                            // The tag-name delimiter is not consumed.
                            break;
                        }
                        end += 1;
                        if done {
                            break;
                        }
                    }
                    if end == limit && !done && ty != Some(HtmlTokenType::Tagbegin) {
                        // Ran off the end mid-construct: close what we have.
                        ty = Some(match st {
                            State::Cdata | State::CdataSq1 | State::CdataSq2 => {
                                HtmlTokenType::Cdata
                            }
                            State::Comment
                            | State::CommentDash
                            | State::CommentDashDash
                            | State::IeDhCommentBegin
                            | State::IeDhCommentEnd => HtmlTokenType::Comment,
                            State::IeDrCommentBegin => HtmlTokenType::IeDrCommentBegin,
                            State::IeDrCommentEnd => HtmlTokenType::IeDrCommentEnd,
                            State::Directive
                            | State::AppDirective
                            | State::AppDirectiveQmark => HtmlTokenType::Directive,
                            State::ServerCode | State::ServerCodePct => {
                                HtmlTokenType::Servercode
                            }
                            State::Tagname => HtmlTokenType::Tagbegin,
                            _ => HtmlTokenType::Text,
                        });
                    }
                }
            }
        }

        if ty == Some(HtmlTokenType::Tagbegin) {
            if exit_exempt_block {
                self.in_escape_exempt_block = false;
                self.escape_exempt_tag_name = None;
                self.text_escaping_mode = None;
            }
            // Content after the tag name lexes as attributes, except in
            // an escape-exempt block.
            self.in_tag = !self.in_escape_exempt_block;
        }

        let ty = ty.unwrap_or_else(|| {
            // A plain text run up to the next markup introduction.
            while end < limit && buf[end] != '<' {
                end += 1;
            }
            HtmlTokenType::Text
        });

        let pos = self.p.file_position_for_offsets(start, end);
        let text = self.p.text(start, end);
        self.p.consume_to(end);
        if ty != HtmlTokenType::Ignorable {
            self.last_non_ignorable = Some(text.clone());
        }
        Some(Token::new(text, ty, pos))
    }
}

impl TokenStream<HtmlTokenType> for HtmlInputSplitter {
    fn next(&mut self) -> ParseResult<Option<Token<HtmlTokenType>>> {
        Ok(self.produce())
    }
}

//! Per-tag content-escaping modes.

/// How the content of an element is interpreted by the lexer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HtmlTextEscapingMode {
    /// Normal content: entities decode, tags nest.
    Pcdata,
    /// Raw text up to the matching close tag; entities do not decode.
    Cdata,
    /// Like CDATA, but entities decode (`<textarea>`, `<title>`).
    Rcdata,
    /// Raw text to the end of input; there is no close tag (`<plaintext>`).
    PlainText,
    /// The element has no content at all.
    Void,
}

impl HtmlTextEscapingMode {
    /// The escaping mode for a canonicalized (lowercase) tag name.
    pub fn for_tag(tag_name: &str) -> HtmlTextEscapingMode {
        match tag_name {
            "iframe" | "listing" | "noembed" | "noframes" | "noscript" | "script"
            | "style" | "xmp" => HtmlTextEscapingMode::Cdata,
            "textarea" | "title" => HtmlTextEscapingMode::Rcdata,
            "plaintext" => HtmlTextEscapingMode::PlainText,
            "area" | "base" | "br" | "col" | "hr" | "img" | "input" | "link" | "meta"
            | "param" | "wbr" => HtmlTextEscapingMode::Void,
            _ => HtmlTextEscapingMode::Pcdata,
        }
    }

    /// True iff the text following an open tag with this name is literal,
    /// i.e. not tokenized as markup until the matching close tag.
    pub fn is_tag_followed_by_literal_content(tag_name: &str) -> bool {
        matches!(
            Self::for_tag(tag_name),
            HtmlTextEscapingMode::Cdata
                | HtmlTextEscapingMode::Rcdata
                | HtmlTextEscapingMode::PlainText
        )
    }

    /// True iff `<!--…-->` escaping text spans are significant inside this
    /// element's content. They matter in CDATA and RCDATA elements, except
    /// inside `<xmp>`.
    pub fn allows_escaping_text_span(tag_name: &str) -> bool {
        tag_name != "xmp"
            && matches!(
                Self::for_tag(tag_name),
                HtmlTextEscapingMode::Cdata | HtmlTextEscapingMode::Rcdata
            )
    }
}

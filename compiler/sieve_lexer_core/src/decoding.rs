//! Decoded views of other producers.
//!
//! A [`DecodingCharProducer`] re-expresses an underlying producer's
//! characters as decoded code points while remembering, for every decoded
//! offset, how to map back to the raw offset that produced it. The mapping
//! is a single array lookup, so position queries on decoded text cost the
//! same as on raw text.

use std::rc::Rc;

use sieve_position::SourceBreaks;

use crate::producer::CharProducer;

/// Result of one decoder step.
pub struct Decoded {
    /// The decoded code point, or `None` when the consumed raw characters
    /// produce no output at all (line-continuation elision).
    pub code_point: Option<char>,
    /// Raw offset just past the consumed characters. Always greater than
    /// the offset passed in.
    pub end: usize,
}

impl Decoded {
    fn unit(code_point: char, end: usize) -> Decoded {
        Decoded {
            code_point: Some(code_point),
            end,
        }
    }

    fn elided(end: usize) -> Decoded {
        Decoded {
            code_point: None,
            end,
        }
    }
}

/// One step of a decoding scheme.
///
/// Called repeatedly from the underlying producer's offset up to its limit;
/// each call consumes at least one raw character. Decoders hold no
/// per-call state.
pub trait Decoder {
    fn decode(&self, buf: &[char], offset: usize, limit: usize) -> Decoded;
}

/// A producer presenting the decoded form of another producer.
///
/// Built once at construction by running the [`Decoder`] over the
/// underlying producer's unconsumed characters; immutable afterwards. The
/// underlying producer is owned and never mutated.
pub struct DecodingCharProducer {
    buf: Rc<[char]>,
    offset: usize,
    /// `deltas[i]` is the number of extra raw characters consumed by
    /// decoding everything before decoded index `i`, so the raw offset for
    /// `i` is `poffset + i + deltas[i]`. One trailing entry covers
    /// `i == limit`.
    deltas: Rc<[u32]>,
    /// The underlying producer's offset when this view was built.
    poffset: usize,
    underlying: Box<dyn CharProducer>,
}

impl DecodingCharProducer {
    /// Decode `underlying`'s unconsumed characters through `decoder`.
    pub fn new(decoder: &dyn Decoder, underlying: Box<dyn CharProducer>) -> DecodingCharProducer {
        let poffset = underlying.offset();
        let limit = underlying.limit();
        let raw = underlying.buffer();

        let mut buf: Vec<char> = Vec::with_capacity(limit - poffset);
        let mut deltas: Vec<u32> = Vec::with_capacity(limit - poffset + 1);
        let mut p = poffset;
        while p < limit {
            let step = decoder.decode(raw, p, limit);
            debug_assert!(step.end > p, "decoder must consume at least one character");
            if let Some(cp) = step.code_point {
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "raw/decoded skew is bounded by the u32 buffer domain"
                )]
                deltas.push((p - poffset - buf.len()) as u32);
                buf.push(cp);
            }
            p = step.end;
        }
        #[allow(
            clippy::cast_possible_truncation,
            reason = "raw/decoded skew is bounded by the u32 buffer domain"
        )]
        deltas.push((limit - poffset - buf.len()) as u32);

        DecodingCharProducer {
            buf: buf.into(),
            offset: 0,
            deltas: deltas.into(),
            poffset,
            underlying,
        }
    }

    /// Decoded view applying JavaScript string-escape decoding.
    pub fn from_js_string(underlying: Box<dyn CharProducer>) -> DecodingCharProducer {
        Self::new(&JsEscapeDecoder, underlying)
    }

    /// Decoded view applying HTML attribute entity decoding.
    pub fn from_html_attribute(underlying: Box<dyn CharProducer>) -> DecodingCharProducer {
        Self::new(&crate::entities::HtmlEntityDecoder, underlying)
    }

    /// Decoded view applying URI percent decoding.
    pub fn from_uri(underlying: Box<dyn CharProducer>) -> DecodingCharProducer {
        Self::new(&UriDecoder, underlying)
    }

    /// Decoded view with JS line continuations (`\` + line terminator)
    /// elided.
    pub fn elide_line_continuations(
        underlying: Box<dyn CharProducer>,
    ) -> DecodingCharProducer {
        Self::new(&LineContinuationDecoder, underlying)
    }

    /// The raw offset in the underlying producer corresponding to decoded
    /// offset `offset`.
    ///
    /// Non-decreasing in `offset`; for an offset that begins a decoded
    /// unit, this is the first raw character of the span that produced it.
    pub fn underlying_offset(&self, offset: usize) -> usize {
        let i = offset.min(self.deltas.len() - 1);
        self.poffset + offset.min(self.buf.len()) + self.deltas[i] as usize
    }

    /// The producer this view decodes.
    pub fn underlying(&self) -> &dyn CharProducer {
        self.underlying.as_ref()
    }
}

impl CharProducer for DecodingCharProducer {
    fn buffer(&self) -> &[char] {
        &self.buf
    }

    fn offset(&self) -> usize {
        self.offset
    }

    fn limit(&self) -> usize {
        self.buf.len()
    }

    fn consume_to(&mut self, end: usize) {
        debug_assert!(self.offset <= end && end <= self.limit());
        self.offset = end;
    }

    fn char_in_file(&self, offset: usize) -> u32 {
        self.underlying.char_in_file(self.underlying_offset(offset))
    }

    fn breaks_at(&self, offset: usize) -> &SourceBreaks {
        self.underlying.breaks_at(self.underlying_offset(offset))
    }

    fn clone_producer(&self) -> Box<dyn CharProducer> {
        Box::new(DecodingCharProducer {
            buf: Rc::clone(&self.buf),
            offset: self.offset,
            deltas: Rc::clone(&self.deltas),
            poffset: self.poffset,
            underlying: self.underlying.clone_producer(),
        })
    }
}

fn hex_value(ch: char) -> Option<u32> {
    ch.to_digit(16)
}

/// Parse exactly `[start, end)` as hex digits, requiring `end <= limit`.
fn parse_hex(buf: &[char], start: usize, end: usize, limit: usize) -> Option<u32> {
    if end > limit {
        return None;
    }
    let mut value = 0u32;
    for &ch in &buf[start..end] {
        value = (value << 4) | hex_value(ch)?;
    }
    Some(value)
}

const HIGH_SURROGATES: std::ops::RangeInclusive<u32> = 0xD800..=0xDBFF;
const LOW_SURROGATES: std::ops::RangeInclusive<u32> = 0xDC00..=0xDFFF;

fn combine_surrogates(high: u32, low: u32) -> Option<char> {
    char::from_u32(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00))
}

/// JavaScript string-escape decoding.
///
/// Recognizes the single-character escapes `\b \r \n \f \t \v`, hex
/// (`\xHH`), unicode (`\uHHHH`, with an immediately following low-surrogate
/// escape folded into one code point), and octal `\0`–`\377` (clipped to
/// three digits only when the first digit is at most `3`). Anything else
/// degrades to the escaped character itself: the backslash disappears from
/// the decoded view but the raw-offset accounting still covers it.
pub struct JsEscapeDecoder;

impl Decoder for JsEscapeDecoder {
    fn decode(&self, buf: &[char], offset: usize, limit: usize) -> Decoded {
        let ch = buf[offset];
        if ch != '\\' || offset + 1 >= limit {
            return Decoded::unit(ch, offset + 1);
        }
        let ch2 = buf[offset + 1];
        let end = offset + 2;
        match ch2 {
            'b' => Decoded::unit('\u{8}', end),
            'r' => Decoded::unit('\r', end),
            'n' => Decoded::unit('\n', end),
            'f' => Decoded::unit('\u{c}', end),
            't' => Decoded::unit('\t', end),
            'v' => Decoded::unit('\u{b}', end),
            'u' | 'x' => {
                let n_hex = if ch2 == 'u' { 4 } else { 2 };
                let hex_end = end + n_hex;
                match parse_hex(buf, end, hex_end, limit) {
                    Some(cp) if HIGH_SURROGATES.contains(&cp) => {
                        // A following \uHHHH low surrogate completes a
                        // supplementary code point; otherwise the lone half
                        // degrades to U+FFFD.
                        let pair = (buf.get(hex_end) == Some(&'\\')
                            && buf.get(hex_end + 1) == Some(&'u'))
                        .then(|| parse_hex(buf, hex_end + 2, hex_end + 6, limit))
                        .flatten()
                        .filter(|low| LOW_SURROGATES.contains(low))
                        .and_then(|low| combine_surrogates(cp, low));
                        match pair {
                            Some(combined) => Decoded::unit(combined, hex_end + 6),
                            None => Decoded::unit(char::REPLACEMENT_CHARACTER, hex_end),
                        }
                    }
                    Some(cp) if LOW_SURROGATES.contains(&cp) => {
                        Decoded::unit(char::REPLACEMENT_CHARACTER, hex_end)
                    }
                    Some(cp) => match char::from_u32(cp) {
                        Some(decoded) => Decoded::unit(decoded, hex_end),
                        None => Decoded::unit(ch2, end),
                    },
                    None => Decoded::unit(ch2, end),
                }
            }
            '0'..='7' => {
                // Octal escapes cover 0-377, so clip one digit unless the
                // first digit keeps the value under 0o400.
                let max_end = (offset + 1 + if ch2 <= '3' { 3 } else { 2 }).min(limit);
                let mut value = 0u32;
                let mut i = offset + 1;
                while i < max_end {
                    let Some(digit) = buf[i].to_digit(8) else { break };
                    value = (value << 3) | digit;
                    i += 1;
                }
                match char::from_u32(value) {
                    Some(decoded) => Decoded::unit(decoded, i),
                    None => Decoded::unit(ch2, end),
                }
            }
            other => Decoded::unit(other, end),
        }
    }
}

/// URI percent decoding.
///
/// `%HH` decodes one byte. A percent-encoded UTF-8 lead byte starts a
/// 2/3/4-byte sequence that decodes to a single code point only if every
/// continuation byte is a well-formed `%HH` matching `10xxxxxx`; otherwise
/// the lead byte alone decodes as Latin-1. Percent-encoded surrogate halves
/// (CESU-8) pair up into one supplementary code point; a lone half decodes
/// to U+FFFD. `+` is not an escape here: the decoder serves URI bodies, not
/// form data.
pub struct UriDecoder;

impl UriDecoder {
    /// Parse `%HH` at `offset`, yielding the byte.
    fn pct_byte(buf: &[char], offset: usize, limit: usize) -> Option<u8> {
        if offset + 3 > limit || buf[offset] != '%' {
            return None;
        }
        let hi = hex_value(buf[offset + 1])?;
        let lo = hex_value(buf[offset + 2])?;
        #[allow(
            clippy::cast_possible_truncation,
            reason = "two hex digits always fit in a byte"
        )]
        Some(((hi << 4) | lo) as u8)
    }

    /// Decode one percent-encoded UTF-8 sequence starting at `offset`.
    ///
    /// Returns the raw code-unit value (which may be a surrogate half) and
    /// the end offset, or `None` when the bytes do not form a sequence.
    fn pct_sequence(buf: &[char], offset: usize, limit: usize) -> Option<(u32, usize)> {
        let b0 = Self::pct_byte(buf, offset, limit)?;
        let after_lead = offset + 3;
        if b0 < 0x80 {
            return Some((u32::from(b0), after_lead));
        }
        let (n_cont, lead_bits) = match b0 {
            0xC0..=0xDF => (1, u32::from(b0 & 0x1F)),
            0xE0..=0xEF => (2, u32::from(b0 & 0x0F)),
            0xF0..=0xF7 => (3, u32::from(b0 & 0x07)),
            _ => return None, // stray continuation or invalid lead
        };
        let mut cp = lead_bits;
        let mut p = after_lead;
        for _ in 0..n_cont {
            let b = Self::pct_byte(buf, p, limit)?;
            if b & 0xC0 != 0x80 {
                return None;
            }
            cp = (cp << 6) | u32::from(b & 0x3F);
            p += 3;
        }
        Some((cp, p))
    }
}

impl Decoder for UriDecoder {
    fn decode(&self, buf: &[char], offset: usize, limit: usize) -> Decoded {
        let ch = buf[offset];
        if ch != '%' {
            return Decoded::unit(ch, offset + 1);
        }
        let Some(b0) = Self::pct_byte(buf, offset, limit) else {
            // No two hex digits follow; the percent stays literal.
            return Decoded::unit('%', offset + 1);
        };
        let after_lead = offset + 3;

        match Self::pct_sequence(buf, offset, limit) {
            Some((cp, end)) if HIGH_SURROGATES.contains(&cp) => {
                let pair = Self::pct_sequence(buf, end, limit)
                    .filter(|(low, _)| LOW_SURROGATES.contains(low))
                    .and_then(|(low, low_end)| {
                        combine_surrogates(cp, low).map(|c| (c, low_end))
                    });
                match pair {
                    Some((combined, low_end)) => Decoded::unit(combined, low_end),
                    None => Decoded::unit(char::REPLACEMENT_CHARACTER, end),
                }
            }
            Some((cp, end)) if LOW_SURROGATES.contains(&cp) => {
                Decoded::unit(char::REPLACEMENT_CHARACTER, end)
            }
            Some((cp, end)) => match char::from_u32(cp) {
                Some(decoded) => Decoded::unit(decoded, end),
                None => Decoded::unit(char::REPLACEMENT_CHARACTER, end),
            },
            // Ill-formed multi-byte sequence: the first byte alone decodes
            // as Latin-1.
            None => match char::from_u32(u32::from(b0)) {
                Some(latin1) => Decoded::unit(latin1, after_lead),
                None => Decoded::unit('%', offset + 1),
            },
        }
    }
}

fn is_js_line_terminator(ch: char) -> bool {
    matches!(ch, '\r' | '\n' | '\u{2028}' | '\u{2029}')
}

/// Elides `\` followed by a JS line terminator (`\r\n` counting as one), so
/// escaped line breaks neither end tokens nor appear in token text. Real
/// line terminators pass through untouched, which keeps whitespace runs
/// splitting at semantically significant newlines.
pub struct LineContinuationDecoder;

impl Decoder for LineContinuationDecoder {
    fn decode(&self, buf: &[char], offset: usize, limit: usize) -> Decoded {
        let ch = buf[offset];
        if ch == '\\' && offset + 1 < limit && is_js_line_terminator(buf[offset + 1]) {
            let mut end = offset + 2;
            if buf[offset + 1] == '\r' && end < limit && buf[end] == '\n' {
                end += 1;
            }
            return Decoded::elided(end);
        }
        Decoded::unit(ch, offset + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::BufferedCharProducer;
    use pretty_assertions::assert_eq;
    use sieve_position::InputSource;

    fn raw(text: &str) -> Box<dyn CharProducer> {
        Box::new(BufferedCharProducer::from_source(
            text,
            InputSource::new("file:///dec.txt"),
        ))
    }

    fn decoded_text(p: &DecodingCharProducer) -> String {
        p.buffer()[..p.limit()].iter().collect()
    }

    fn js(text: &str) -> String {
        decoded_text(&DecodingCharProducer::from_js_string(raw(text)))
    }

    fn uri(text: &str) -> String {
        decoded_text(&DecodingCharProducer::from_uri(raw(text)))
    }

    // === JS escapes ===

    #[test]
    fn js_named_escapes() {
        assert_eq!(js("\\n"), "\n");
        assert_eq!(js("\\r"), "\r");
        assert_eq!(js("\\r\\n"), "\r\n");
        assert_eq!(js("\\t"), "\t");
        assert_eq!(js("\\b"), "\u{8}");
        assert_eq!(js("\\f"), "\u{c}");
        assert_eq!(js("\\v"), "\u{b}");
    }

    #[test]
    fn js_mixed_text() {
        assert_eq!(
            js("The quick\\u0020brown fox\\njumps\\40over\\r\\nthe lazy dog\\n"),
            "The quick brown fox\njumps over\r\nthe lazy dog\n"
        );
    }

    #[test]
    fn js_interrupted_unicode_escapes() {
        // An escaped backslash shields the escape that follows it.
        assert_eq!(js("\\\\u000a"), "\\u000a");
        assert_eq!(js("\\u00ziggy"), "u00ziggy");
        assert_eq!(js("\\u\\u000a"), "u\n");
        assert_eq!(js("\\u0\\u000a"), "u0\n");
        assert_eq!(js("\\u00\\u000a"), "u00\n");
        assert_eq!(js("\\u0"), "u0");
        assert_eq!(js("\\u000"), "u000");
        assert_eq!(js("\\u"), "u");
        assert_eq!(js("\\uffff"), "\u{ffff}");
        assert_eq!(js("\\"), "\\");
    }

    #[test]
    fn js_interrupted_hex_escapes() {
        assert_eq!(js("\\\\x0a"), "\\x0a");
        assert_eq!(js("\\x0ziggy"), "x0ziggy");
        assert_eq!(js("\\x\\u000a"), "x\n");
        assert_eq!(js("\\x0\\u000a"), "x0\n");
        assert_eq!(js("\\s0"), "s0");
        assert_eq!(js("\\x"), "x");
    }

    #[test]
    fn js_octal_escapes() {
        assert_eq!(js("\\0"), "\0");
        assert_eq!(js("\\11"), "\t");
        assert_eq!(js("\\011"), "\t");
        assert_eq!(js("\\009"), "\u{0}9");
        assert_eq!(js("\\09"), "\u{0}9");
        assert_eq!(js("\\9"), "9");
        assert_eq!(js("\\00"), "\0");
        assert_eq!(js("\\000"), "\0");
        assert_eq!(js("\\0000"), "\u{0}0");
        assert_eq!(js("\\37"), "\u{1f}");
        assert_eq!(js("\\037"), "\u{1f}");
        assert_eq!(js("\\040"), " ");
        assert_eq!(js("\\40"), " ");
        assert_eq!(js("\\400"), " 0");
        assert_eq!(js("\\380"), "\u{3}80");
    }

    #[test]
    fn js_surrogate_pair_escape() {
        assert_eq!(js("\\ud834\\udd1e"), "\u{1d11e}");
        assert_eq!(js("\\ud834x"), "\u{fffd}x");
    }

    // === Offset mapping ===

    #[test]
    fn underlying_offsets_skip_escape_lengths() {
        // Decoded "The f": the space comes from a six-character escape.
        let p = DecodingCharProducer::from_js_string(raw("The\\u0020f"));
        assert_eq!(decoded_text(&p), "The f");
        assert_eq!(p.underlying_offset(0), 0);
        assert_eq!(p.underlying_offset(3), 3); // the space's escape starts here
        assert_eq!(p.underlying_offset(4), 9); // 'f' sits after the escape
        assert_eq!(p.underlying_offset(5), 10); // limit maps to limit
    }

    #[test]
    fn decoded_positions_point_at_raw_source() {
        let p = DecodingCharProducer::from_js_string(raw("ab\\ncd"));
        // Decoded offset 3 is 'c', raw offset 4, char-in-file 5.
        assert_eq!(p.char_in_file(3), 5);
        assert_eq!(
            p.file_position_for_offsets(0, 3).debug_string(),
            "dec.txt:1+1@1 - 5@5"
        );
    }

    #[test]
    fn offsets_past_the_limit_are_clamped() {
        let p = DecodingCharProducer::from_js_string(raw("\\u0041"));
        assert_eq!(decoded_text(&p), "A");
        assert_eq!(p.underlying_offset(0), 0);
        assert_eq!(p.underlying_offset(1), 6);
        // Queries past the limit clamp to the end of the table.
        assert_eq!(p.underlying_offset(9), 6);
    }

    // === URI decoding ===

    #[test]
    fn uri_basic() {
        assert_eq!(uri(""), "");
        assert_eq!(uri("foo"), "foo");
        assert_eq!(uri("foo+bar"), "foo+bar"); // + is not an escape here
        assert_eq!(uri("foo%2bbar"), "foo+bar");
        assert_eq!(uri("foo%40bar"), "foo@bar");
        assert_eq!(uri("%A0"), "\u{a0}");
    }

    #[test]
    fn uri_utf8_sequences() {
        assert_eq!(uri("foo%C4%a3bar"), "foo\u{123}bar");
        assert_eq!(uri("foo%e2%82%Acbar"), "foo\u{20ac}bar");
        assert_eq!(uri("%F0%9d%84%9E"), "\u{1d11e}");
        assert_eq!(uri("%f0%9D%84%9e"), "\u{1d11e}");
    }

    #[test]
    fn uri_surrogate_pairs_combine() {
        assert_eq!(uri("%ed%a0%B4%eD%b4%9E"), "\u{1d11e}");
        assert_eq!(uri("%ed%a0%B4x"), "\u{fffd}x");
    }

    #[test]
    fn uri_boundary_conditions() {
        assert_eq!(uri("%"), "%");
        assert_eq!(uri("%2"), "%2");
        assert_eq!(uri("%z"), "%z");
        assert_eq!(uri("%25"), "%");
        assert_eq!(uri("%252"), "%2");
        assert_eq!(uri("%2525"), "%25"); // don't over-decode
    }

    #[test]
    fn uri_malformed_utf8_falls_back_to_latin1() {
        assert_eq!(uri("%C4x"), "\u{c4}x");
        assert_eq!(uri("%e2%82"), "\u{e2}\u{82}");
    }

    // === Line continuations ===

    #[test]
    fn continuations_are_elided() {
        let p = DecodingCharProducer::elide_line_continuations(raw("a\\\nb"));
        assert_eq!(decoded_text(&p), "ab");
        // 'b' maps back past the two elided characters.
        assert_eq!(p.underlying_offset(1), 3);
    }

    #[test]
    fn crlf_continuation_is_one_elision() {
        let p = DecodingCharProducer::elide_line_continuations(raw("a\\\r\nb"));
        assert_eq!(decoded_text(&p), "ab");
        assert_eq!(p.underlying_offset(1), 4);
    }

    #[test]
    fn trailing_continuation_elides_to_nothing() {
        let p = DecodingCharProducer::elide_line_continuations(raw("ab\\\n"));
        assert_eq!(decoded_text(&p), "ab");
        assert_eq!(p.underlying_offset(2), 4); // limit accounts for elision
    }

    #[test]
    fn real_newlines_pass_through() {
        let p = DecodingCharProducer::elide_line_continuations(raw("a\nb"));
        assert_eq!(decoded_text(&p), "a\nb");
    }

    // === Properties ===

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn underlying_offset_is_nondecreasing(input in "[ -~]{0,40}") {
                let p = DecodingCharProducer::from_js_string(raw(&input));
                let mut last = 0;
                for i in 0..=p.limit() {
                    let u = p.underlying_offset(i);
                    prop_assert!(u >= last);
                    last = u;
                }
            }

            #[test]
            fn uri_decoding_never_panics(input in "[%a-f0-9zA-F]{0,24}") {
                let p = DecodingCharProducer::from_uri(raw(&input));
                prop_assert!(p.limit() <= input.chars().count());
                for i in 0..=p.limit() {
                    prop_assert!(p.underlying_offset(i) <= input.chars().count());
                }
            }
        }
    }
}

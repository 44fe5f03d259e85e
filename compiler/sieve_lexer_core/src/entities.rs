//! HTML entity names and decoding.
//!
//! Named entities resolve through a [`PunctuationTrie`] built once from the
//! HTML4 + XML 1.0 table; numeric entities decode inline. The decoder is
//! deliberately forgiving: anything that does not form a complete entity is
//! left in the text as a literal `&`.

use std::sync::LazyLock;

use crate::decoding::{Decoded, Decoder};
use crate::trie::PunctuationTrie;

/// Named entities: HTML4 (Latin-1, symbols, Greek, punctuation) plus the
/// XML 1.0 `apos`.
#[rustfmt::skip]
const NAMED_ENTITIES: &[(&str, char)] = &[
    // C0 Controls and Basic Latin
    ("quot", '"'), ("amp", '&'), ("lt", '<'), ("gt", '>'),
    // XML 1.0
    ("apos", '\''),
    // Latin-1 Supplement
    ("nbsp", '\u{a0}'), ("iexcl", '\u{a1}'), ("cent", '\u{a2}'),
    ("pound", '\u{a3}'), ("curren", '\u{a4}'), ("yen", '\u{a5}'),
    ("brvbar", '\u{a6}'), ("sect", '\u{a7}'), ("uml", '\u{a8}'),
    ("copy", '\u{a9}'), ("ordf", '\u{aa}'), ("laquo", '\u{ab}'),
    ("not", '\u{ac}'), ("shy", '\u{ad}'), ("reg", '\u{ae}'),
    ("macr", '\u{af}'), ("deg", '\u{b0}'), ("plusmn", '\u{b1}'),
    ("sup2", '\u{b2}'), ("sup3", '\u{b3}'), ("acute", '\u{b4}'),
    ("micro", '\u{b5}'), ("para", '\u{b6}'), ("middot", '\u{b7}'),
    ("cedil", '\u{b8}'), ("sup1", '\u{b9}'), ("ordm", '\u{ba}'),
    ("raquo", '\u{bb}'), ("frac14", '\u{bc}'), ("frac12", '\u{bd}'),
    ("frac34", '\u{be}'), ("iquest", '\u{bf}'), ("Agrave", '\u{c0}'),
    ("Aacute", '\u{c1}'), ("Acirc", '\u{c2}'), ("Atilde", '\u{c3}'),
    ("Auml", '\u{c4}'), ("Aring", '\u{c5}'), ("AElig", '\u{c6}'),
    ("Ccedil", '\u{c7}'), ("Egrave", '\u{c8}'), ("Eacute", '\u{c9}'),
    ("Ecirc", '\u{ca}'), ("Euml", '\u{cb}'), ("Igrave", '\u{cc}'),
    ("Iacute", '\u{cd}'), ("Icirc", '\u{ce}'), ("Iuml", '\u{cf}'),
    ("ETH", '\u{d0}'), ("Ntilde", '\u{d1}'), ("Ograve", '\u{d2}'),
    ("Oacute", '\u{d3}'), ("Ocirc", '\u{d4}'), ("Otilde", '\u{d5}'),
    ("Ouml", '\u{d6}'), ("times", '\u{d7}'), ("Oslash", '\u{d8}'),
    ("Ugrave", '\u{d9}'), ("Uacute", '\u{da}'), ("Ucirc", '\u{db}'),
    ("Uuml", '\u{dc}'), ("Yacute", '\u{dd}'), ("THORN", '\u{de}'),
    ("szlig", '\u{df}'), ("agrave", '\u{e0}'), ("aacute", '\u{e1}'),
    ("acirc", '\u{e2}'), ("atilde", '\u{e3}'), ("auml", '\u{e4}'),
    ("aring", '\u{e5}'), ("aelig", '\u{e6}'), ("ccedil", '\u{e7}'),
    ("egrave", '\u{e8}'), ("eacute", '\u{e9}'), ("ecirc", '\u{ea}'),
    ("euml", '\u{eb}'), ("igrave", '\u{ec}'), ("iacute", '\u{ed}'),
    ("icirc", '\u{ee}'), ("iuml", '\u{ef}'), ("eth", '\u{f0}'),
    ("ntilde", '\u{f1}'), ("ograve", '\u{f2}'), ("oacute", '\u{f3}'),
    ("ocirc", '\u{f4}'), ("otilde", '\u{f5}'), ("ouml", '\u{f6}'),
    ("divide", '\u{f7}'), ("oslash", '\u{f8}'), ("ugrave", '\u{f9}'),
    ("uacute", '\u{fa}'), ("ucirc", '\u{fb}'), ("uuml", '\u{fc}'),
    ("yacute", '\u{fd}'), ("thorn", '\u{fe}'), ("yuml", '\u{ff}'),
    // Latin Extended
    ("OElig", '\u{152}'), ("oelig", '\u{153}'), ("Scaron", '\u{160}'),
    ("scaron", '\u{161}'), ("Yuml", '\u{178}'), ("fnof", '\u{192}'),
    // Spacing Modifier Letters
    ("circ", '\u{2c6}'), ("tilde", '\u{2dc}'),
    // Greek
    ("Alpha", '\u{391}'), ("Beta", '\u{392}'), ("Gamma", '\u{393}'),
    ("Delta", '\u{394}'), ("Epsilon", '\u{395}'), ("Zeta", '\u{396}'),
    ("Eta", '\u{397}'), ("Theta", '\u{398}'), ("Iota", '\u{399}'),
    ("Kappa", '\u{39a}'), ("Lambda", '\u{39b}'), ("Mu", '\u{39c}'),
    ("Nu", '\u{39d}'), ("Xi", '\u{39e}'), ("Omicron", '\u{39f}'),
    ("Pi", '\u{3a0}'), ("Rho", '\u{3a1}'), ("Sigma", '\u{3a3}'),
    ("Tau", '\u{3a4}'), ("Upsilon", '\u{3a5}'), ("Phi", '\u{3a6}'),
    ("Chi", '\u{3a7}'), ("Psi", '\u{3a8}'), ("Omega", '\u{3a9}'),
    ("alpha", '\u{3b1}'), ("beta", '\u{3b2}'), ("gamma", '\u{3b3}'),
    ("delta", '\u{3b4}'), ("epsilon", '\u{3b5}'), ("zeta", '\u{3b6}'),
    ("eta", '\u{3b7}'), ("theta", '\u{3b8}'), ("iota", '\u{3b9}'),
    ("kappa", '\u{3ba}'), ("lambda", '\u{3bb}'), ("mu", '\u{3bc}'),
    ("nu", '\u{3bd}'), ("xi", '\u{3be}'), ("omicron", '\u{3bf}'),
    ("pi", '\u{3c0}'), ("rho", '\u{3c1}'), ("sigmaf", '\u{3c2}'),
    ("sigma", '\u{3c3}'), ("tau", '\u{3c4}'), ("upsilon", '\u{3c5}'),
    ("phi", '\u{3c6}'), ("chi", '\u{3c7}'), ("psi", '\u{3c8}'),
    ("omega", '\u{3c9}'), ("thetasym", '\u{3d1}'), ("upsih", '\u{3d2}'),
    ("piv", '\u{3d6}'),
    // General Punctuation
    ("ensp", '\u{2002}'), ("emsp", '\u{2003}'), ("thinsp", '\u{2009}'),
    ("zwnj", '\u{200c}'), ("zwj", '\u{200d}'), ("lrm", '\u{200e}'),
    ("rlm", '\u{200f}'), ("ndash", '\u{2013}'), ("mdash", '\u{2014}'),
    ("lsquo", '\u{2018}'), ("rsquo", '\u{2019}'), ("sbquo", '\u{201a}'),
    ("ldquo", '\u{201c}'), ("rdquo", '\u{201d}'), ("bdquo", '\u{201e}'),
    ("dagger", '\u{2020}'), ("Dagger", '\u{2021}'), ("bull", '\u{2022}'),
    ("hellip", '\u{2026}'), ("permil", '\u{2030}'), ("prime", '\u{2032}'),
    ("Prime", '\u{2033}'), ("lsaquo", '\u{2039}'), ("rsaquo", '\u{203a}'),
    ("oline", '\u{203e}'), ("frasl", '\u{2044}'), ("euro", '\u{20ac}'),
    // Letterlike Symbols
    ("image", '\u{2111}'), ("weierp", '\u{2118}'), ("real", '\u{211c}'),
    ("trade", '\u{2122}'), ("alefsym", '\u{2135}'),
    // Arrows
    ("larr", '\u{2190}'), ("uarr", '\u{2191}'), ("rarr", '\u{2192}'),
    ("darr", '\u{2193}'), ("harr", '\u{2194}'), ("crarr", '\u{21b5}'),
    ("lArr", '\u{21d0}'), ("uArr", '\u{21d1}'), ("rArr", '\u{21d2}'),
    ("dArr", '\u{21d3}'), ("hArr", '\u{21d4}'),
    // Mathematical Operators
    ("forall", '\u{2200}'), ("part", '\u{2202}'), ("exist", '\u{2203}'),
    ("empty", '\u{2205}'), ("nabla", '\u{2207}'), ("isin", '\u{2208}'),
    ("notin", '\u{2209}'), ("ni", '\u{220b}'), ("prod", '\u{220f}'),
    ("sum", '\u{2211}'), ("minus", '\u{2212}'), ("lowast", '\u{2217}'),
    ("radic", '\u{221a}'), ("prop", '\u{221d}'), ("infin", '\u{221e}'),
    ("ang", '\u{2220}'), ("and", '\u{2227}'), ("or", '\u{2228}'),
    ("cap", '\u{2229}'), ("cup", '\u{222a}'), ("int", '\u{222b}'),
    ("there4", '\u{2234}'), ("sim", '\u{223c}'), ("cong", '\u{2245}'),
    ("asymp", '\u{2248}'), ("ne", '\u{2260}'), ("equiv", '\u{2261}'),
    ("le", '\u{2264}'), ("ge", '\u{2265}'), ("sub", '\u{2282}'),
    ("sup", '\u{2283}'), ("nsub", '\u{2284}'), ("sube", '\u{2286}'),
    ("supe", '\u{2287}'), ("oplus", '\u{2295}'), ("otimes", '\u{2297}'),
    ("perp", '\u{22a5}'), ("sdot", '\u{22c5}'),
    // Miscellaneous Technical
    ("lceil", '\u{2308}'), ("rceil", '\u{2309}'), ("lfloor", '\u{230a}'),
    ("rfloor", '\u{230b}'), ("lang", '\u{2329}'), ("rang", '\u{232a}'),
    // Geometric Shapes
    ("loz", '\u{25ca}'),
    // Miscellaneous Symbols
    ("spades", '\u{2660}'), ("clubs", '\u{2663}'), ("hearts", '\u{2665}'),
    ("diams", '\u{2666}'),
];

static ENTITY_TRIE: LazyLock<PunctuationTrie<char>> =
    LazyLock::new(|| PunctuationTrie::new(NAMED_ENTITIES));

/// The trie mapping entity names to their code points.
pub fn entity_trie() -> &'static PunctuationTrie<char> {
    &ENTITY_TRIE
}

/// A possible entity name like `amp` or `gt`.
///
/// Exact-case names match directly; an all-uppercase name (`AMP`) is
/// treated as its lowercase form, but mixed case (`Amp`) is not.
pub fn is_entity_name(name: &str) -> bool {
    let all_upper = !name.is_empty() && name.chars().all(|c| c.is_ascii_uppercase());
    let node = if all_upper {
        ENTITY_TRIE.lookup_str(&name.to_ascii_lowercase())
    } else {
        ENTITY_TRIE.lookup_str(name)
    };
    node.is_some_and(PunctuationTrie::is_terminal)
}

/// The longest entity, `&thetasym;`, fits in 10 characters; the scan for a
/// terminating `;` gives up past that.
const MAX_ENTITY_LEN: usize = 10;

/// Decode any HTML entity at `offset`, named or numeric.
///
/// Returns the decoded code point and the offset just past the consumed
/// sequence. Anything that fails to form an entity -- no terminating `;`
/// within range, an empty or invalid digit run, a name that reaches no
/// terminal trie node -- leaves the `&` as a literal character: the result
/// is `('&', offset + 1)`.
pub fn decode_entity_at(buf: &[char], offset: usize, limit: usize) -> (char, usize) {
    let ch = buf[offset];
    if ch != '&' {
        return (ch, offset + 1);
    }

    let entity_limit = limit.min(offset + MAX_ENTITY_LEN);
    let Some(end) = (offset + 1..entity_limit).find(|&i| buf[i] == ';') else {
        return ('&', offset + 1);
    };
    if offset + 2 >= end {
        return ('&', offset + 1);
    }
    // The entity body is buf[offset+1..end], at least two characters long.

    let code_point = if buf[offset + 1] == '#' {
        let ch2 = buf[offset + 2];
        if ch2 == 'x' || ch2 == 'X' {
            parse_digits(&buf[offset + 3..end], 16)
        } else {
            parse_digits(&buf[offset + 2..end], 10)
        }
    } else {
        named_entity(&buf[offset + 1..end])
    };

    match code_point.and_then(char::from_u32) {
        Some(decoded) => (decoded, end + 1),
        None => ('&', offset + 1),
    }
}

fn parse_digits(digits: &[char], radix: u32) -> Option<u32> {
    let mut value: u32 = 0;
    for &ch in digits {
        let digit = ch.to_digit(radix)?;
        value = value.checked_mul(radix)?.checked_add(digit)?;
    }
    Some(value)
}

fn named_entity(name: &[char]) -> Option<u32> {
    let walk = |lower: bool| {
        let mut node = &*ENTITY_TRIE;
        for &ch in name {
            let key = if lower { ch.to_ascii_lowercase() } else { ch };
            node = node.lookup(key)?;
        }
        Some(node)
    };
    // Exact case first, then a lowercase sweep so `&AMP;` still resolves.
    let node = walk(false)
        .filter(|n| n.is_terminal())
        .or_else(|| walk(true))?;
    node.value().map(|&c| c as u32)
}

/// Entity decoding as a [`Decoder`], for building decoded producers over
/// HTML attribute values.
pub struct HtmlEntityDecoder;

impl Decoder for HtmlEntityDecoder {
    fn decode(&self, buf: &[char], offset: usize, limit: usize) -> Decoded {
        let (code_point, end) = decode_entity_at(buf, offset, limit);
        Decoded {
            code_point: Some(code_point),
            end,
        }
    }
}

//! The per-language lexers.
//!
//! Each language follows the same two-phase shape: a *splitter* walks the
//! character producer one token at a time with bounded lookahead, and a
//! *joiner* (or reclassifier) fixes up what the splitter could not decide --
//! exponent signs in JavaScript, `!important` and leading-hyphen idents in
//! CSS, attribute names and values in HTML. Splitting pessimistically and
//! rejoining afterwards is what keeps every splitter a one-pass machine
//! over the buffer.

pub mod css;
pub mod html;
pub mod js;

//! Position-preserving character and token plumbing.
//!
//! Everything the per-language lexers share lives here:
//!
//! - [`CharProducer`] -- the cursor over an in-memory `char` buffer, with the
//!   contract that any buffer offset can be mapped back to an absolute
//!   char-in-file index and the [`SourceBreaks`](sieve_position::SourceBreaks)
//!   in force there. Concrete producers: [`BufferedCharProducer`] (one raw
//!   input), [`DecodingCharProducer`] (a decoded view of another producer),
//!   and the chaining producer returned by [`chain`].
//! - The [`Decoder`]s: JS string escapes, HTML entities, URI percent
//!   escapes, and JS line-continuation elision.
//! - [`PunctuationTrie`] -- greedy longest-match lookup over a fixed string
//!   vocabulary, used for punctuation scanning and entity names.
//! - [`Token`], [`TokenStream`], and [`TokenQueue`] -- the exchange types
//!   parsers consume.
//!
//! The pipeline is strictly single threaded and pull based; nothing here
//! locks, and the only I/O is the eager read-to-completion when a producer
//! is built from a reader.

mod decoding;
mod entities;
mod producer;
mod queue;
mod token;
mod trie;

pub use decoding::{
    Decoded, Decoder, DecodingCharProducer, JsEscapeDecoder, LineContinuationDecoder,
    UriDecoder,
};
pub use entities::{decode_entity_at, entity_trie, is_entity_name, HtmlEntityDecoder};
pub use producer::{chain, BufferedCharProducer, CharProducer};
pub use queue::{Mark, TokenQueue};
pub use token::{Token, TokenStream};
pub use trie::PunctuationTrie;

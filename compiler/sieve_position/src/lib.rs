//! Position model for the lexical front end.
//!
//! Every character that flows through the pipeline can be traced back to a
//! `(source, line, column, char-in-file)` coordinate, no matter how many
//! layers of decoding or concatenation sit between the lexer and the raw
//! input. This crate holds the three building blocks of that contract:
//!
//! - [`InputSource`] -- the identity of one raw input (usually a URI).
//! - [`SourceBreaks`] -- the per-source index of line-start offsets, which
//!   turns a flat char-in-file index into a line/column pair.
//! - [`FilePosition`] -- an immutable `(source, start, end)` span with all
//!   coordinates materialized, safe to copy around and render verbatim in
//!   diagnostics.
//!
//! Positions are language independent: line numbers count `CR`, `LF`, and
//! `CRLF` breaks greedily, and say nothing about the logical structure of
//! the program being lexed.

mod breaks;
mod input_source;
mod position;

pub use breaks::SourceBreaks;
pub use input_source::InputSource;
pub use position::FilePosition;

//! Diagnostics for the lexical front end.
//!
//! Two channels exist:
//!
//! - **Fatal**: a lexical failure aborts the current parse. It travels as a
//!   [`ParseError`] wrapping a single [`Message`], propagated by early
//!   return; the lexers never resynchronize after one.
//! - **Non-fatal**: tolerated-but-dubious input (for example `//` comments
//!   in CSS) is reported to an injected [`MessageQueue`] sink and lexing
//!   continues.
//!
//! Every message carries a [`MessageType`], the offending [`FilePosition`],
//! and zero or more free-text parts interpolated into the rendering.

mod message;
mod queue;

pub use message::{Message, MessageLevel, MessageType};
pub use queue::{MessageQueue, SimpleMessageQueue};

/// A fatal lexical failure.
///
/// Carries the diagnostic explaining what went wrong and where. Lexing of
/// the offending input stops at the first such failure.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ParseError(pub Message);

impl ParseError {
    /// The diagnostic this failure carries.
    pub fn message(&self) -> &Message {
        &self.0
    }
}

/// Result alias used throughout the lexers.
pub type ParseResult<T> = Result<T, ParseError>;

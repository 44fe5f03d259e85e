//! Message types and rendering.

use std::fmt;

use sieve_position::FilePosition;

/// How serious a message is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageLevel {
    /// Tolerated input worth flagging.
    Lint,
    /// Suspicious input that was interpreted anyway.
    Warning,
    /// Input that could not be lexed; the parse is abandoned.
    Error,
}

/// Every kind of diagnostic the front end can raise.
///
/// The rendering template uses `%p` for the position and `%0`, `%1`, … for
/// the free-text parts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// String or regex literal ran off the end of the input.
    UnterminatedStringToken,
    /// Block comment ran off the end of the input.
    UnterminatedCommentToken,
    /// `${…}` substitution block ran off the end of the input.
    UnterminatedSubstitution,
    /// Numeric literal with a dangling exponent or equivalent.
    MalformedNumber,
    /// String literal broken by an unescaped newline or stray quote.
    MalformedString,
    /// Escape sequence the grammar forbids outright.
    UnrecognizedEscape,
    /// The queue expected one token text and saw another (or EOF).
    ExpectedToken,
    /// The queue ran out of tokens where one was required.
    EndOfFile,
    /// Tokens remained after the parse consumed what it wanted.
    UnusedTokens,
    /// The input stream failed while being read.
    IoError,
    /// `//` comment in CSS; tolerated, standard CSS has none.
    InvalidLineComment,
}

impl MessageType {
    /// Default severity for this kind of message.
    pub fn level(self) -> MessageLevel {
        match self {
            MessageType::InvalidLineComment => MessageLevel::Warning,
            _ => MessageLevel::Error,
        }
    }

    fn template(self) -> &'static str {
        match self {
            MessageType::UnterminatedStringToken => "%p: unterminated string token",
            MessageType::UnterminatedCommentToken => "%p: unterminated comment token",
            MessageType::UnterminatedSubstitution => "%p: unterminated substitution",
            MessageType::MalformedNumber => "%p: malformed number %0",
            MessageType::MalformedString => "%p: malformed string %0",
            MessageType::UnrecognizedEscape => "%p: unrecognized escape %0",
            MessageType::ExpectedToken => "%p: expected %0, not %1",
            MessageType::EndOfFile => "%p: unexpected end of input",
            MessageType::UnusedTokens => "%p: unused tokens %0",
            MessageType::IoError => "error reading %0",
            MessageType::InvalidLineComment => {
                "%p: line comments are not part of standard CSS"
            }
        }
    }
}

/// One diagnostic: a kind, the offending span, and free-text parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    message_type: MessageType,
    pos: FilePosition,
    parts: Vec<String>,
}

impl Message {
    pub fn new(message_type: MessageType, pos: FilePosition) -> Message {
        Message {
            message_type,
            pos,
            parts: Vec::new(),
        }
    }

    /// Message with interpolated free-text parts.
    pub fn with_parts(
        message_type: MessageType,
        pos: FilePosition,
        parts: Vec<String>,
    ) -> Message {
        Message {
            message_type,
            pos,
            parts,
        }
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn pos(&self) -> &FilePosition {
        &self.pos
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn level(&self) -> MessageLevel {
        self.message_type.level()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rest = self.message_type.template();
        while let Some(i) = rest.find('%') {
            f.write_str(&rest[..i])?;
            let tail = &rest[i + 1..];
            let mut it = tail.chars();
            match it.next() {
                Some('p') => {
                    write!(f, "{}", self.pos)?;
                    rest = &tail[1..];
                }
                Some(d @ '0'..='9') => {
                    let idx = (d as u8 - b'0') as usize;
                    match self.parts.get(idx) {
                        Some(part) => f.write_str(part)?,
                        None => f.write_str("?")?,
                    }
                    rest = &tail[1..];
                }
                _ => {
                    f.write_str("%")?;
                    rest = tail;
                }
            }
        }
        f.write_str(rest)
    }
}

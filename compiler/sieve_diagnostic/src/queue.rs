//! Sinks for non-fatal messages.

use std::cell::RefCell;
use std::rc::Rc;

use crate::{Message, MessageLevel};

/// Receives non-fatal messages emitted while lexing.
///
/// The lexers take `&mut dyn MessageQueue` so callers decide whether to
/// collect, print, or drop warnings; emitting never interrupts lexing.
pub trait MessageQueue {
    fn add_message(&mut self, message: Message);
}

/// A `MessageQueue` that records messages in order of arrival.
#[derive(Debug, Default)]
pub struct SimpleMessageQueue {
    messages: Vec<Message>,
}

impl SimpleMessageQueue {
    pub fn new() -> SimpleMessageQueue {
        SimpleMessageQueue::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// True iff any recorded message is at least `level` severe.
    pub fn has_message_at_level(&self, level: MessageLevel) -> bool {
        self.messages.iter().any(|m| m.level() >= level)
    }
}

impl MessageQueue for SimpleMessageQueue {
    fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }
}

/// A shared handle to a queue, for when the emitter owns its sink but the
/// caller wants to read the messages afterwards.
impl MessageQueue for Rc<RefCell<SimpleMessageQueue>> {
    fn add_message(&mut self, message: Message) {
        self.borrow_mut().add_message(message);
    }
}

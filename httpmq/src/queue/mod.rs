pub mod manager;
pub mod store;
pub mod waiter;

use serde_derive::Serialize;
use std::collections::VecDeque;

/// Message payload. It is immutable once pushed and has no identity beyond its position in the
/// queue.
pub type Message = String;

/// A single named FIFO sequence of messages.
#[derive(Debug, Default)]
pub struct Queue {
    messages: VecDeque<Message>,
}

impl Queue {
    pub fn push_back(&mut self, message: Message) {
        self.messages.push_back(message);
    }

    /// Put back a message which has been taken but couldn't be handed to its consumer, so it
    /// will be the next one to be delivered.
    pub fn push_front(&mut self, message: Message) {
        self.messages.push_front(message);
    }

    /// Remove and return the oldest message. Lookup and unlink is one step.
    pub fn pop_front(&mut self) -> Option<Message> {
        self.messages.pop_front()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Introspection data about a queue, served by the admin API.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueueInfo {
    pub name: String,
    pub messages: usize,
    pub waiters: usize,
}

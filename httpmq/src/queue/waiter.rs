//! Consumers parked on an empty queue. Every waiter has a single delivery slot, a oneshot
//! channel, and the consumer side owns the receiver. Delivery is exactly-once: a send either puts
//! the message in the slot or fails and gives the message back because the consumer has already
//! closed its receiver (timeout or disconnect).
use super::Message;
use log::trace;
use std::collections::VecDeque;
use tokio::sync::oneshot;

pub type WaiterId = u64;

/// The sending half of a waiter's delivery slot.
pub type Slot = oneshot::Sender<Message>;

#[derive(Debug)]
pub struct Waiter {
    pub id: WaiterId,
    slot: Slot,
}

/// Waiters of one queue in arrival order.
#[derive(Debug, Default)]
pub struct WaiterList {
    waiters: VecDeque<Waiter>,
}

impl WaiterList {
    pub fn park(&mut self, id: WaiterId, slot: Slot) {
        self.prune();
        self.waiters.push_back(Waiter { id, slot });
    }

    /// Hand over the message to the longest waiting consumer which is still listening. If nobody
    /// took the message it is given back.
    pub fn deliver(&mut self, mut message: Message) -> Option<Message> {
        while let Some(waiter) = self.waiters.pop_front() {
            match waiter.slot.send(message) {
                Ok(()) => {
                    trace!("Message delivered to waiter {}", waiter.id);

                    return None;
                }
                Err(returned) => {
                    trace!("Waiter {} is gone", waiter.id);

                    message = returned;
                }
            }
        }

        Some(message)
    }

    /// Remove the waiter. Returns false if it was not parked (already served).
    pub fn cancel(&mut self, id: WaiterId) -> bool {
        match self.waiters.iter().position(|w| w.id == id) {
            Some(p) => {
                self.waiters.remove(p);
                true
            }
            None => false,
        }
    }

    /// Drop waiters whose consumer has closed the receiving side.
    pub fn prune(&mut self) {
        self.waiters.retain(|w| !w.slot.is_closed());
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

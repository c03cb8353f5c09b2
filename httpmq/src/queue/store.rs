use super::waiter::{Slot, WaiterId, WaiterList};
use super::{Message, Queue, QueueInfo};
use std::collections::HashMap;

#[derive(Debug, Default)]
struct QueueEntry {
    queue: Queue,
    waiters: WaiterList,
}

impl QueueEntry {
    fn is_idle(&mut self) -> bool {
        self.waiters.prune();

        self.queue.is_empty() && self.waiters.is_empty()
    }
}

/// Mapping of queue names to queues together with the consumers waiting on them.
///
/// The store itself is not synchronized, every operation takes `&mut self`, so the owner decides
/// how the store is shared. A queue entry is created by the first push to an unseen name and it
/// is removed as soon as it has neither messages nor parked waiters.
#[derive(Debug, Default)]
pub struct QueueStore {
    queues: HashMap<String, QueueEntry>,
    next_waiter_id: WaiterId,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a message. A parked waiter gets it directly, in that case it never becomes visible
    /// to other poppers.
    pub fn enqueue(&mut self, queue_name: &str, message: Message) {
        let entry = self.queues.entry(queue_name.to_string()).or_default();

        if let Some(message) = entry.waiters.deliver(message) {
            entry.queue.push_back(message);
        }

        self.remove_if_idle(queue_name);
    }

    /// Give back a message which was delivered to a waiter but the consumer went away before
    /// it could be passed on. It goes to the next waiter or to the head of the queue.
    pub fn requeue(&mut self, queue_name: &str, message: Message) {
        let entry = self.queues.entry(queue_name.to_string()).or_default();

        if let Some(message) = entry.waiters.deliver(message) {
            entry.queue.push_front(message);
        }

        self.remove_if_idle(queue_name);
    }

    pub fn dequeue(&mut self, queue_name: &str) -> Option<Message> {
        let entry = self.queues.get_mut(queue_name)?;
        let message = entry.queue.pop_front();

        self.remove_if_idle(queue_name);

        message
    }

    /// Send the head of the queue into the slot or, if the queue is empty, park the slot as a
    /// waiter of the queue. Returns the id of the parked waiter.
    pub fn pop_or_park(&mut self, queue_name: &str, slot: Slot) -> Option<WaiterId> {
        match self.dequeue(queue_name) {
            Some(message) => {
                if let Err(message) = slot.send(message) {
                    self.requeue(queue_name, message);
                }

                None
            }
            None => Some(self.park(queue_name, slot)),
        }
    }

    pub fn park(&mut self, queue_name: &str, slot: Slot) -> WaiterId {
        self.next_waiter_id += 1;

        let id = self.next_waiter_id;

        self.queues
            .entry(queue_name.to_string())
            .or_default()
            .waiters
            .park(id, slot);

        id
    }

    /// Remove a parked waiter. Returns false if the waiter has already been served or removed.
    pub fn cancel_waiter(&mut self, queue_name: &str, id: WaiterId) -> bool {
        let cancelled = match self.queues.get_mut(queue_name) {
            Some(entry) => entry.waiters.cancel(id),
            None => false,
        };

        self.remove_if_idle(queue_name);

        cancelled
    }

    /// Drop the waiters of the queue which don't listen anymore.
    pub fn prune(&mut self, queue_name: &str) {
        self.remove_if_idle(queue_name);
    }

    pub fn queues(&mut self) -> Vec<QueueInfo> {
        let mut infos: Vec<QueueInfo> = self
            .queues
            .iter_mut()
            .map(|(name, entry)| {
                entry.waiters.prune();

                QueueInfo {
                    name: name.clone(),
                    messages: entry.queue.len(),
                    waiters: entry.waiters.len(),
                }
            })
            .collect();

        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    fn remove_if_idle(&mut self, queue_name: &str) {
        if let Some(entry) = self.queues.get_mut(queue_name) {
            if entry.is_idle() {
                self.queues.remove(queue_name);
            }
        }
    }
}

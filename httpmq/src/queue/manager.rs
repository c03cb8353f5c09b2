
use crate::queue::store::QueueStore;
use crate::queue::waiter::WaiterId;
use crate::queue::{Message, QueueInfo};
use crate::{logerr, Result};
use log::{debug, error, trace};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};

// Queue manager task
//   owns the queue store, so every command is executed in isolation from the others
//   handles:
//     - push (deliver to the oldest waiter or append to the queue)
//     - pop
//     - pop or park a waiter (long-poll)
//     - cancel waiter (timeout, disconnect)
//     - prune closed waiters of a queue
//     - requeue a message whose waiter vanished after delivery
//     - get queues (admin API)
//
//  Waiting consumers don't block the manager, they await their own delivery slot.

const COMMAND_BUFFER: usize = 1024;

/// Roughly 30 years.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

#[derive(Debug)]
pub enum QueueManagerCommand {
    Push {
        queue_name: String,
        message: Message,
        result: oneshot::Sender<()>,
    },
    Pop {
        queue_name: String,
        result: oneshot::Sender<Option<Message>>,
    },
    PopOrPark {
        queue_name: String,
        slot: oneshot::Sender<Message>,
        result: oneshot::Sender<Option<WaiterId>>,
    },
    CancelWaiter {
        queue_name: String,
        waiter_id: WaiterId,
    },
    Requeue {
        queue_name: String,
        message: Message,
    },
    Prune {
        queue_name: String,
    },
    GetQueues(oneshot::Sender<Vec<QueueInfo>>),
}

pub type QueueManagerSink = mpsc::Sender<QueueManagerCommand>;

/// Start the queue manager with an empty store.
pub fn start() -> QueueManagerSink {
    let (sink, stream) = mpsc::channel(COMMAND_BUFFER);

    tokio::spawn(async move {
        let mut manager = QueueManagerState {
            command_stream: stream,
            store: QueueStore::new(),
        };

        manager.command_loop().await;
    });

    sink
}

pub async fn push(mgr: &QueueManagerSink, queue_name: &str, message: Message) -> Result<()> {
    let (tx, rx) = oneshot::channel();

    mgr.send(QueueManagerCommand::Push {
        queue_name: queue_name.to_string(),
        message,
        result: tx,
    })
    .await?;

    Ok(rx.await?)
}

/// Non-blocking pop, `None` if the queue doesn't exist or it is empty.
pub async fn pop(mgr: &QueueManagerSink, queue_name: &str) -> Result<Option<Message>> {
    let (tx, rx) = oneshot::channel();

    mgr.send(QueueManagerCommand::Pop {
        queue_name: queue_name.to_string(),
        result: tx,
    })
    .await?;

    Ok(rx.await?)
}

/// Pop a message waiting at most `timeout` for one to arrive. Returns `None` if the deadline
/// elapsed without a message.
///
/// If the returned future is dropped while waiting, the waiter is cancelled. A message which was
/// already delivered to it is given back to the queue.
pub async fn pop_timeout(mgr: &QueueManagerSink, queue_name: &str, timeout: Duration) -> Result<Option<Message>> {
    if timeout.is_zero() {
        return pop(mgr, queue_name).await;
    }

    // Timeouts beyond what the clock can represent wait for a practically infinite time.
    let deadline = Instant::now()
        .checked_add(timeout)
        .unwrap_or_else(|| Instant::now() + FAR_FUTURE);
    let (slot, slot_rx) = oneshot::channel();
    let (tx, rx) = oneshot::channel();

    // The guard exists before the waiter can be parked, so a delivery cannot be lost.
    let mut pending = PendingPop::new(mgr.clone(), queue_name, slot_rx);

    mgr.send(QueueManagerCommand::PopOrPark {
        queue_name: queue_name.to_string(),
        slot,
        result: tx,
    })
    .await?;

    // Either the head of the queue is already in the slot or we are parked.
    pending.waiter_id = rx.await?;

    if let Some(id) = pending.waiter_id {
        trace!("Waiter {} parked on {}", id, queue_name);
    }

    match time::timeout_at(deadline, &mut pending.slot).await {
        Ok(Ok(message)) => {
            pending.received = true;

            Ok(Some(message))
        }
        Ok(Err(e)) => {
            // The manager dropped the slot, so it is not running anymore.
            pending.received = true;

            Err(Box::new(e))
        }
        Err(_) => {
            let delivered = pending.expire();

            debug!("Pop on {} timed out, delivered in the meantime: {}", queue_name, delivered.is_some());

            Ok(delivered)
        }
    }
}

pub async fn get_queues(mgr: &QueueManagerSink) -> Vec<QueueInfo> {
    let (tx, rx) = oneshot::channel();

    logerr!(mgr.send(QueueManagerCommand::GetQueues(tx)).await);

    rx.await.unwrap_or_default()
}

/// A pop waiting on its delivery slot. Dropping it before the message is received cancels the
/// waiter, and requeues the message if it had been delivered already.
struct PendingPop {
    mgr: QueueManagerSink,
    queue_name: String,
    waiter_id: Option<WaiterId>,
    slot: oneshot::Receiver<Message>,
    received: bool,
}

impl PendingPop {
    fn new(mgr: QueueManagerSink, queue_name: &str, slot: oneshot::Receiver<Message>) -> Self {
        PendingPop {
            mgr,
            queue_name: queue_name.to_string(),
            waiter_id: None,
            slot,
            received: false,
        }
    }

    /// The deadline elapsed. Delivery and deadline can race: whatever is in the slot when it is
    /// closed wins, later deliveries fail and go to someone else.
    fn expire(&mut self) -> Option<Message> {
        let delivered = self.close();

        self.received = delivered.is_some();

        delivered
    }

    /// Close the slot for further deliveries and take the message if one arrived before.
    fn close(&mut self) -> Option<Message> {
        self.slot.close();
        self.slot.try_recv().ok()
    }
}

impl Drop for PendingPop {
    fn drop(&mut self) {
        if self.received {
            return;
        }

        let queue_name = self.queue_name.clone();
        let command = match (self.close(), self.waiter_id) {
            (Some(message), _) => {
                debug!("Consumer of {} is gone, requeue delivered message", queue_name);

                QueueManagerCommand::Requeue { queue_name, message }
            }
            (None, Some(waiter_id)) => QueueManagerCommand::CancelWaiter { queue_name, waiter_id },
            // Parking may be in flight, the closed slot is dropped by pruning.
            (None, None) => QueueManagerCommand::Prune { queue_name },
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let mgr = self.mgr.clone();

                handle.spawn(async move {
                    logerr!(mgr.send(command).await);
                });
            }
            Err(e) => error!("Cannot notify queue manager {:?} {:?}", command, e),
        }
    }
}

struct QueueManagerState {
    command_stream: mpsc::Receiver<QueueManagerCommand>,
    store: QueueStore,
}

impl QueueManagerState {
    async fn command_loop(&mut self) {
        while let Some(command) = self.command_stream.recv().await {
            self.handle_command(command);
        }

        debug!("Queue manager stopped");
    }

    fn handle_command(&mut self, command: QueueManagerCommand) {
        use QueueManagerCommand::*;

        match command {
            Push {
                queue_name,
                message,
                result,
            } => {
                debug!("Push {:?} to {}", message, queue_name);

                self.store.enqueue(&queue_name, message);

                logerr!(result.send(()));
            }
            Pop { queue_name, result } => {
                let message = self.store.dequeue(&queue_name);

                debug!("Pop from {} {:?}", queue_name, message);

                if let Err(Some(message)) = result.send(message) {
                    self.store.requeue(&queue_name, message);
                }
            }
            PopOrPark {
                queue_name,
                slot,
                result,
            } => {
                let waiter_id = self.store.pop_or_park(&queue_name, slot);

                if result.send(waiter_id).is_err() {
                    // The caller is gone and its slot is closed.
                    self.store.prune(&queue_name);
                }
            }
            CancelWaiter { queue_name, waiter_id } => {
                if self.store.cancel_waiter(&queue_name, waiter_id) {
                    trace!("Waiter {} of {} cancelled", waiter_id, queue_name);
                }
            }
            Requeue { queue_name, message } => {
                self.store.requeue(&queue_name, message);
            }
            Prune { queue_name } => {
                self.store.prune(&queue_name);
            }
            GetQueues(result) => {
                logerr!(result.send(self.store.queues()));
            }
        }
    }
}

//! Unbounded multi-producer, single-consumer queue of formatted lines.
//!
//! Closing the queue drops the only sender held by the shared state, so the consumer keeps
//! receiving every line enqueued before the close and then observes [`Dequeued::Closed`].

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;

use crate::LogLine;

#[derive(Debug)]
struct Shared {
    sender: RwLock<Option<Sender<LogLine>>>,
}

impl Shared {
    fn close(&self) -> bool {
        self.sender.write().take().is_some()
    }

    fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }
}

/// Creates a new open queue.
pub fn unbounded() -> (QueueProducer, QueueConsumer) {
    let (sender, receiver) = crossbeam_channel::unbounded();
    let shared = Arc::new(Shared {
        sender: RwLock::new(Some(sender)),
    });
    (
        QueueProducer {
            shared: Arc::clone(&shared),
        },
        QueueConsumer { receiver, shared },
    )
}

/// Enqueueing end of the queue. Cheap to clone and share between threads.
#[derive(Debug, Clone)]
pub struct QueueProducer {
    shared: Arc<Shared>,
}

impl QueueProducer {
    /// Appends `line` to the tail of the queue without blocking.
    ///
    /// Returns `false` and drops the line if the queue is closed.
    pub fn enqueue(&self, line: LogLine) -> bool {
        match self.shared.sender.read().as_ref() {
            Some(sender) => sender.send(line).is_ok(),
            None => false,
        }
    }

    /// Stops accepting lines and wakes the consumer. Idempotent.
    ///
    /// Returns `true` if this call closed the queue.
    pub fn close(&self) -> bool {
        self.shared.close()
    }

    /// Whether the queue has been closed.
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

/// Outcome of [`QueueConsumer::dequeue_blocking`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dequeued {
    /// The next line in FIFO order.
    Line(LogLine),

    /// The queue was closed and every line enqueued before the close has been delivered.
    Closed,
}

/// Dequeueing end of the queue.
///
/// Not `Clone`: the writer is the only consumer there can be.
#[derive(Debug)]
pub struct QueueConsumer {
    receiver: Receiver<LogLine>,
    shared: Arc<Shared>,
}

impl QueueConsumer {
    /// Blocks until a line is available or the queue is closed and drained.
    pub fn dequeue_blocking(&self) -> Dequeued {
        match self.receiver.recv() {
            Ok(line) => Dequeued::Line(line),
            Err(crossbeam_channel::RecvError) => Dequeued::Closed,
        }
    }

    /// Stops accepting lines. Idempotent.
    pub fn close(&self) -> bool {
        self.shared.close()
    }

    /// Whether the queue has been closed.
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Number of lines waiting to be dequeued.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether no lines are waiting.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

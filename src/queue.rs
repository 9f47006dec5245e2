//! Ordered event channel between producers and a single display engine.

use std::time::Duration;

use tokio::{
    sync::mpsc::{self, error::TryRecvError},
    time::timeout,
};

use crate::event::Event;

/// Producer half of an event queue. Cheap to clone; one per producer thread or task.
#[derive(Debug, Clone)]
pub struct EventQueue(mpsc::UnboundedSender<Event>);

/// Consumer half of an event queue, owned by exactly one engine.
#[derive(Debug)]
pub struct EventReceiver(mpsc::UnboundedReceiver<Event>);

/// Outcome of a bounded wait on the queue
#[derive(Debug, PartialEq, Eq)]
pub enum Popped {
    Event(Event),
    Timeout,
    /// Every producer handle has been dropped and the queue is drained.
    Closed,
}

#[must_use]
pub fn channel() -> (EventQueue, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventQueue(tx), EventReceiver(rx))
}

impl EventQueue {
    /// Append an event. Returns `false` if the consumer has gone away.
    pub fn push(&self, event: Event) -> bool {
        self.0.send(event).is_ok()
    }
}

impl EventReceiver {
    /// Take the oldest event without waiting.
    pub fn try_pop(&mut self) -> Option<Event> {
        match self.0.try_recv() {
            Ok(e) => Some(e),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Wait for the next event, giving up after `wait`.
    pub async fn pop_timeout(&mut self, wait: Duration) -> Popped {
        match timeout(wait, self.0.recv()).await {
            Ok(Some(e)) => Popped::Event(e),
            Ok(None) => Popped::Closed,
            Err(_) => Popped::Timeout,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Delivers every event to several queues, one per display engine.
#[derive(Debug, Clone, Default)]
pub struct Fanout(Vec<EventQueue>);

impl Fanout {
    #[must_use]
    pub const fn new(queues: Vec<EventQueue>) -> Self {
        Self(queues)
    }

    /// Push a copy of `event` into each queue. Returns `false` once no queue accepts events anymore.
    pub fn push(&self, event: &Event) -> bool {
        self.0
            .iter()
            .map(|q| q.push(event.clone()))
            .fold(false, |acc, delivered| acc || delivered)
    }
}

use crate::bus::{Signal, SubscriptionId};
use tokio::sync::mpsc;

/// Everything the dispatch loop reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Signal {
        subscription: SubscriptionId,
        signal: Signal,
    },
    /// A raw button token from the input reader.
    Input(String),
    Shutdown,
}

pub type EventSender = mpsc::UnboundedSender<Event>;
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

//! Player discovery and session state for the now-playing line.
//!
//! A [`Session`] tracks exactly one MPRIS player at a time. It resolves the
//! configured name to a bus identity (the bare name, or the most recent of
//! several `name.instanceN` endpoints), subscribes to the player's signals
//! through a [`BusGateway`], and renders every status/metadata change to an
//! [`OutputSink`].
//!
//! Everything arrives as an [`Event`] on one channel and is handled to
//! completion before the next one, so session state needs no locking.

mod bus;
mod event;
mod output;
mod player;
mod registry;
mod session;

pub use bus::{
    BusError, BusGateway, BusResult, Metadata, OwnerChange, PlayerProperty, PropertiesUpdate,
    PropertyValue, Signal, SignalMatch, SubscriptionId,
};
pub use event::{channel, Event, EventReceiver, EventSender};
pub use output::{OutputSink, StdoutSink};
pub use player::{
    MatchMode, PlayerName, MPRIS_BUS_NAME_PREFIX, MPRIS_OBJECT_PATH, MPRIS_PLAYER_INTERFACE,
};
pub use registry::InstanceRegistry;
pub use session::{
    ErrorCallback, Flow, Session, SessionError, SessionResult, SessionSettings, Startup,
};

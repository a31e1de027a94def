#![allow(dead_code)]

use nowbar_format::{Formatter, FormatterOptions, Template};
use nowbar_session::{
    channel, BusError, BusGateway, BusResult, Event, EventReceiver, EventSender, Metadata,
    OwnerChange, PlayerName, PlayerProperty, PropertiesUpdate, PropertyValue, Session,
    SessionSettings, Signal, SignalMatch, SubscriptionId,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub const NAMESPACE: &str = "org.mpris.MediaPlayer2.vlc";

pub fn instance(suffix: &str) -> String {
    format!("{NAMESPACE}.{suffix}")
}

#[derive(Default)]
struct State {
    /// Registered names in registration order with their unique owner.
    owners: Vec<(String, String)>,
    next_owner: u64,
    next_subscription: u64,
    subscriptions: BTreeMap<SubscriptionId, SignalMatch>,
    properties: HashMap<String, (String, Metadata)>,
    failing_owner_queries: HashSet<String>,
    failing_property_reads: HashSet<String>,
    invoked: Vec<(String, String)>,
    released: Vec<SubscriptionId>,
}

/// In-memory session bus. Owner changes and property updates are routed
/// to every live subscription that matches them.
pub struct FakeBus {
    events: EventSender,
    state: Mutex<State>,
}

impl FakeBus {
    pub fn new() -> (Arc<Self>, EventReceiver) {
        let (events, receiver) = channel();
        let bus = Arc::new(Self {
            events,
            state: Mutex::new(State::default()),
        });
        (bus, receiver)
    }

    pub fn sender(&self) -> EventSender {
        self.events.clone()
    }

    /// Registers `name` and announces it, as a player starting up would.
    pub fn start_player(&self, name: &str, status: &str, metadata: Metadata) {
        let owner = {
            let mut state = self.state.lock().unwrap();
            state.next_owner += 1;
            let owner = format!(":1.{}", state.next_owner);
            state.owners.push((name.to_string(), owner.clone()));
            state
                .properties
                .insert(name.to_string(), (status.to_string(), metadata));
            owner
        };
        self.announce(OwnerChange {
            name: name.to_string(),
            old_owner: None,
            new_owner: Some(owner),
        });
    }

    /// Registers `name` without announcing it, as if it was already there
    /// before anyone listened.
    pub fn preregister(&self, name: &str, status: &str, metadata: Metadata) {
        let mut state = self.state.lock().unwrap();
        state.next_owner += 1;
        let owner = format!(":1.{}", state.next_owner);
        state.owners.push((name.to_string(), owner));
        state
            .properties
            .insert(name.to_string(), (status.to_string(), metadata));
    }

    pub fn stop_player(&self, name: &str) {
        let owner = {
            let mut state = self.state.lock().unwrap();
            let Some(index) = state.owners.iter().position(|(n, _)| n == name) else {
                return;
            };
            state.owners.remove(index).1
        };
        self.announce(OwnerChange {
            name: name.to_string(),
            old_owner: Some(owner),
            new_owner: None,
        });
    }

    /// Drops the owner without any signal.
    pub fn vanish_silently(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.owners.retain(|(n, _)| n != name);
    }

    pub fn fail_owner_query(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_owner_queries
            .insert(name.to_string());
    }

    /// Makes every `Get` on `name` fail while the player stays registered.
    pub fn fail_get_property(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_property_reads
            .insert(name.to_string());
    }

    pub fn change_properties(&self, name: &str, update: PropertiesUpdate) {
        {
            let mut state = self.state.lock().unwrap();
            if let Some((status, metadata)) = state.properties.get_mut(name) {
                if let Some(new_status) = &update.status {
                    *status = new_status.clone();
                }
                if let Some(new_metadata) = &update.metadata {
                    *metadata = new_metadata.clone();
                }
            }
        }
        let targets: Vec<SubscriptionId> = self
            .state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .filter(|(_, signal)| {
                matches!(signal, SignalMatch::PropertiesChanged { sender } if sender == name)
            })
            .map(|(id, _)| *id)
            .collect();
        for subscription in targets {
            let _ = self.events.send(Event::Signal {
                subscription,
                signal: Signal::PropertiesChanged(update.clone()),
            });
        }
    }

    pub fn invoked(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().invoked.clone()
    }

    pub fn subscriptions(&self) -> Vec<SignalMatch> {
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .values()
            .cloned()
            .collect()
    }

    pub fn released(&self) -> Vec<SubscriptionId> {
        self.state.lock().unwrap().released.clone()
    }

    fn announce(&self, change: OwnerChange) {
        let targets: Vec<SubscriptionId> = self
            .state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .filter(|(_, signal)| match signal {
                SignalMatch::NameOwnerChanged { name: None } => true,
                SignalMatch::NameOwnerChanged { name: Some(name) } => *name == change.name,
                SignalMatch::PropertiesChanged { .. } => false,
            })
            .map(|(id, _)| *id)
            .collect();
        for subscription in targets {
            let _ = self.events.send(Event::Signal {
                subscription,
                signal: Signal::NameOwnerChanged(change.clone()),
            });
        }
    }
}

#[async_trait::async_trait]
impl BusGateway for FakeBus {
    async fn name_has_owner(&self, name: &str) -> BusResult<bool> {
        let state = self.state.lock().unwrap();
        if state.failing_owner_queries.contains(name) {
            return Err(BusError::Call {
                destination: "org.freedesktop.DBus".into(),
                method: "NameHasOwner".into(),
                message: "timed out".into(),
            });
        }
        Ok(state.owners.iter().any(|(n, _)| n == name))
    }

    async fn list_names(&self) -> BusResult<Vec<String>> {
        let state = self.state.lock().unwrap();
        let mut names = vec!["org.freedesktop.DBus".to_string()];
        names.extend(state.owners.iter().map(|(name, _)| name.clone()));
        Ok(names)
    }

    async fn get_property(
        &self,
        identity: &str,
        property: PlayerProperty,
    ) -> BusResult<PropertyValue> {
        let state = self.state.lock().unwrap();
        let failure = |message: &str| BusError::Call {
            destination: identity.to_string(),
            method: "Get".into(),
            message: message.to_string(),
        };
        if state.failing_property_reads.contains(identity) {
            return Err(failure("no reply"));
        }
        let Some((status, metadata)) = state.properties.get(identity) else {
            return Err(failure("service unknown"));
        };
        Ok(match property {
            PlayerProperty::PlaybackStatus => PropertyValue::PlaybackStatus(status.clone()),
            PlayerProperty::Metadata => PropertyValue::Metadata(metadata.clone()),
        })
    }

    fn invoke_method(&self, identity: &str, method: &str) -> BusResult<()> {
        self.state
            .lock()
            .unwrap()
            .invoked
            .push((identity.to_string(), method.to_string()));
        Ok(())
    }

    async fn subscribe(&self, signal: SignalMatch) -> BusResult<SubscriptionId> {
        let mut state = self.state.lock().unwrap();
        state.next_subscription += 1;
        let id = SubscriptionId(state.next_subscription);
        state.subscriptions.insert(id, signal);
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let mut state = self.state.lock().unwrap();
        state.subscriptions.remove(&id);
        state.released.push(id);
    }
}

pub fn track(artists: &[&str], title: &str) -> Metadata {
    Metadata {
        artists: artists.iter().map(|a| a.to_string()).collect(),
        title: title.to_string(),
    }
}

pub fn properties_of(sender: &str) -> SignalMatch {
    SignalMatch::PropertiesChanged {
        sender: sender.to_string(),
    }
}

pub fn owner_of(name: &str) -> SignalMatch {
    SignalMatch::NameOwnerChanged {
        name: Some(name.to_string()),
    }
}

pub fn settings(format: &str) -> SessionSettings {
    SessionSettings::new(
        PlayerName::normalize("vlc"),
        Template::parse(format).unwrap(),
        Formatter::new(FormatterOptions::default()),
    )
}

pub type TestSession = Session<FakeBus, Vec<String>>;

pub fn session(bus: &Arc<FakeBus>, settings: SessionSettings) -> TestSession {
    Session::new(bus.clone(), Vec::new(), settings)
}

/// Handles every event queued so far, including ones queued while handling.
pub async fn drain(session: &mut TestSession, events: &mut EventReceiver) {
    while let Ok(event) = events.try_recv() {
        session.handle(event).await.unwrap();
    }
}

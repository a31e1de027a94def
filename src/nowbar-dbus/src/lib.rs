//! MPRIS over the D-Bus session bus.
//!
//! [`DBusGateway`] implements [`BusGateway`] with zbus. Every subscription
//! gets its own forwarder task that turns matched signals into
//! [`Event::Signal`]s on the session's channel; unsubscribing aborts it.

mod values;

use futures::{Stream, StreamExt};
use nowbar_session::{
    BusError, BusGateway, BusResult, Event, EventSender, OwnerChange, PlayerProperty,
    PropertyValue, Signal, SignalMatch, SubscriptionId, MPRIS_OBJECT_PATH, MPRIS_PLAYER_INTERFACE,
};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use zbus::fdo::{DBusProxy, PropertiesProxy};
use zbus::names::{BusName, InterfaceName};
use zbus::proxy::CacheProperties;
use zbus::Connection;

const DBUS_NAME: &str = "org.freedesktop.DBus";

pub struct DBusGateway {
    connection: Connection,
    dbus: DBusProxy<'static>,
    events: EventSender,
    next_id: AtomicU64,
    forwarders: Mutex<HashMap<SubscriptionId, JoinHandle<()>>>,
}

impl std::fmt::Debug for DBusGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DBusGateway")
            .field("unique_name", &self.connection.unique_name())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl DBusGateway {
    /// Connects to the session bus.
    pub async fn session(events: EventSender) -> BusResult<Self> {
        let connection = Connection::session()
            .await
            .map_err(|err| BusError::Connection {
                message: err.to_string(),
            })?;
        Self::new(connection, events).await
    }

    pub async fn new(connection: Connection, events: EventSender) -> BusResult<Self> {
        let dbus = DBusProxy::new(&connection)
            .await
            .map_err(call_error(DBUS_NAME, "Hello"))?;
        Ok(Self {
            connection,
            dbus,
            events,
            next_id: AtomicU64::new(1),
            forwarders: Mutex::new(HashMap::new()),
        })
    }

    async fn properties_proxy(&self, identity: &str) -> BusResult<PropertiesProxy<'static>> {
        let builder = PropertiesProxy::builder(&self.connection)
            .destination(bus_name(identity)?.into_owned())
            .and_then(|builder| builder.path(MPRIS_OBJECT_PATH))
            .map_err(call_error(identity, "Properties"))?;
        builder
            .cache_properties(CacheProperties::No)
            .build()
            .await
            .map_err(call_error(identity, "Properties"))
    }

    /// Pushes every stream item that maps to a signal into the event
    /// channel, until the stream ends or the session is gone.
    fn spawn_forwarder<S, F>(&self, id: SubscriptionId, stream: S, to_signal: F) -> JoinHandle<()>
    where
        S: Stream + Send + 'static,
        S::Item: Send,
        F: Fn(S::Item) -> Option<Signal> + Send + 'static,
    {
        let events = self.events.clone();
        tokio::spawn(async move {
            futures::pin_mut!(stream);
            while let Some(item) = stream.next().await {
                let Some(signal) = to_signal(item) else {
                    continue;
                };
                let event = Event::Signal {
                    subscription: id,
                    signal,
                };
                if events.send(event).is_err() {
                    break;
                }
            }
            debug!(subscription = id.0, "forwarder finished");
        })
    }
}

#[async_trait::async_trait]
impl BusGateway for DBusGateway {
    async fn name_has_owner(&self, name: &str) -> BusResult<bool> {
        self.dbus
            .name_has_owner(bus_name(name)?)
            .await
            .map_err(call_error(DBUS_NAME, "NameHasOwner"))
    }

    async fn list_names(&self) -> BusResult<Vec<String>> {
        let names = self
            .dbus
            .list_names()
            .await
            .map_err(call_error(DBUS_NAME, "ListNames"))?;
        Ok(names.into_iter().map(|name| name.to_string()).collect())
    }

    async fn get_property(
        &self,
        identity: &str,
        property: PlayerProperty,
    ) -> BusResult<PropertyValue> {
        let proxy = self.properties_proxy(identity).await?;
        let interface = InterfaceName::from_static_str_unchecked(MPRIS_PLAYER_INTERFACE);
        let value = proxy
            .get(interface, property.name())
            .await
            .map_err(call_error(identity, "Get"))?;
        match property {
            PlayerProperty::PlaybackStatus => {
                let status = values::status_from_value(&value)?;
                Ok(PropertyValue::PlaybackStatus(status))
            }
            PlayerProperty::Metadata => {
                let metadata = values::metadata_from_value(&value)?;
                Ok(PropertyValue::Metadata(metadata))
            }
        }
    }

    /// The call runs on its own task. A failed reply is logged here and
    /// does not reach the session's error callback.
    fn invoke_method(&self, identity: &str, method: &str) -> BusResult<()> {
        let destination = bus_name(identity)?.into_owned();
        let connection = self.connection.clone();
        let method = method.to_string();
        tokio::spawn(async move {
            let reply = connection
                .call_method(
                    Some(destination.clone()),
                    MPRIS_OBJECT_PATH,
                    Some(MPRIS_PLAYER_INTERFACE),
                    method.as_str(),
                    &(),
                )
                .await;
            if let Err(err) = reply {
                warn!(
                    destination = %destination,
                    method = %method,
                    error = %err,
                    "player method failed"
                );
            }
        });
        Ok(())
    }

    async fn subscribe(&self, signal: SignalMatch) -> BusResult<SubscriptionId> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handle = match &signal {
            SignalMatch::PropertiesChanged { sender } => {
                let stream = self
                    .properties_proxy(sender)
                    .await?
                    .receive_properties_changed()
                    .await
                    .map_err(call_error(sender, "AddMatch"))?;
                self.spawn_forwarder(id, stream, |changed| {
                    let args = changed.args().ok()?;
                    if args.interface_name().as_str() != MPRIS_PLAYER_INTERFACE {
                        return None;
                    }
                    let update = values::properties_update(args.changed_properties());
                    Some(Signal::PropertiesChanged(update))
                })
            }
            SignalMatch::NameOwnerChanged { name } => {
                let stream = match name {
                    Some(name) => {
                        self.dbus
                            .receive_name_owner_changed_with_args(&[(0, name.as_str())])
                            .await
                    }
                    None => self.dbus.receive_name_owner_changed().await,
                }
                .map_err(call_error(DBUS_NAME, "AddMatch"))?;
                self.spawn_forwarder(id, stream, |changed| {
                    let args = changed.args().ok()?;
                    let old_owner: &Option<_> = args.old_owner();
                    let new_owner: &Option<_> = args.new_owner();
                    Some(Signal::NameOwnerChanged(OwnerChange {
                        name: args.name().to_string(),
                        old_owner: old_owner.as_ref().map(ToString::to_string),
                        new_owner: new_owner.as_ref().map(ToString::to_string),
                    }))
                })
            }
        };
        debug!(subscription = id.0, signal = ?signal, "subscribed");
        self.forwarders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, handle);
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let handle = self
            .forwarders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if let Some(handle) = handle {
            handle.abort();
            debug!(subscription = id.0, "unsubscribed");
        }
    }
}

impl Drop for DBusGateway {
    fn drop(&mut self) {
        let forwarders = self
            .forwarders
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for (_, handle) in forwarders.drain() {
            handle.abort();
        }
    }
}

fn bus_name(name: &str) -> BusResult<BusName<'_>> {
    BusName::try_from(name).map_err(|_| BusError::InvalidName(name.to_string()))
}

fn call_error<E: Display>(destination: &str, method: &str) -> impl FnOnce(E) -> BusError {
    let destination = destination.to_string();
    let method = method.to_string();
    move |err| BusError::Call {
        destination,
        method,
        message: err.to_string(),
    }
}

use crate::bus::{
    BusError, BusGateway, Metadata, OwnerChange, PlayerProperty, PropertiesUpdate, Signal,
    SignalMatch, SubscriptionId,
};
use crate::event::{Event, EventReceiver};
use crate::output::OutputSink;
use crate::player::{MatchMode, PlayerName};
use crate::registry::InstanceRegistry;
use nowbar_format::{FormatError, Formatter, Template, Value, Values};
use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that end the session. Bus failures are reported, not returned,
/// except during startup resolution.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to render template: {0}")]
    Format(#[from] FormatError),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
    #[error("bus error during startup: {0}")]
    Bus(#[from] BusError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Invoked with every bus error the session swallows.
pub type ErrorCallback = Box<dyn Fn(&BusError) + Send + Sync>;

/// Immutable settings the session is built with.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub player: PlayerName,
    pub template: Template,
    pub formatter: Formatter,
    /// Printed whenever nothing is playing.
    pub placeholder: String,
    /// Input token to player method, e.g. `"1" -> "PlayPause"`.
    pub mouse_buttons: BTreeMap<String, String>,
    pub dedupe: bool,
}

impl SessionSettings {
    pub fn new(player: PlayerName, template: Template, formatter: Formatter) -> Self {
        Self {
            player,
            template,
            formatter,
            placeholder: String::new(),
            mouse_buttons: BTreeMap::from([("1".to_string(), "PlayPause".to_string())]),
            dedupe: true,
        }
    }
}

/// Outcome of [`Session::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Startup {
    Attached,
    /// No player yet; discovery is armed.
    Waiting,
    /// No player and waiting was not requested. Nothing is subscribed.
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub struct Session<G, O> {
    gateway: Arc<G>,
    output: O,
    settings: SessionSettings,
    identity: String,
    mode: MatchMode,
    connected: bool,
    registry: InstanceRegistry,
    properties_sub: Option<SubscriptionId>,
    owner_sub: Option<SubscriptionId>,
    discovery_sub: Option<SubscriptionId>,
    last_status: Option<String>,
    last_metadata: Option<Metadata>,
    last_line: Option<String>,
    error_callback: Option<ErrorCallback>,
}

impl<G, O> std::fmt::Debug for Session<G, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("player", &self.settings.player)
            .field("identity", &self.identity)
            .field("mode", &self.mode)
            .field("connected", &self.connected)
            .field("instances", &self.registry.len())
            .finish()
    }
}

impl<G, O> Session<G, O>
where
    G: BusGateway,
    O: OutputSink,
{
    pub fn new(gateway: Arc<G>, output: O, settings: SessionSettings) -> Self {
        Self {
            identity: settings.player.as_str().to_string(),
            gateway,
            output,
            settings,
            mode: MatchMode::Unknown,
            connected: false,
            registry: InstanceRegistry::new(),
            properties_sub: None,
            owner_sub: None,
            discovery_sub: None,
            last_status: None,
            last_metadata: None,
            last_line: None,
            error_callback: None,
        }
    }

    /// Set a callback for swallowed bus errors. Only errors the gateway
    /// returns reach it: a method call that fails after dispatch is logged
    /// by the gateway and never comes back to the session.
    pub fn set_error_callback<F>(&mut self, callback: F)
    where
        F: Fn(&BusError) + Send + Sync + 'static,
    {
        self.error_callback = Some(Box::new(callback));
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn match_mode(&self) -> MatchMode {
        self.mode
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn last_line(&self) -> Option<&str> {
        self.last_line.as_deref()
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    /// Resolves the player and attaches to it. With `wait`, a missing
    /// player leaves the session listening for one to appear.
    pub async fn start(&mut self, wait: bool) -> SessionResult<Startup> {
        let found = self.resolve().await?;
        if !found && !wait {
            info!(player = %self.settings.player, "player not found");
            return Ok(Startup::NotFound);
        }
        if self.mode != MatchMode::Exact {
            self.arm_discovery().await;
        }
        if found {
            self.connect().await?;
            Ok(Startup::Attached)
        } else {
            info!(player = %self.settings.player, "waiting for player");
            if !self.settings.placeholder.is_empty() {
                self.output.emit(&self.settings.placeholder)?;
            }
            Ok(Startup::Waiting)
        }
    }

    /// Dispatches events until shutdown or until every sender is gone,
    /// then drops all subscriptions.
    pub async fn run(&mut self, events: &mut EventReceiver) -> SessionResult<()> {
        let result = loop {
            let Some(event) = events.recv().await else {
                debug!("event channel closed");
                break Ok(());
            };
            match self.handle(event).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => break Ok(()),
                Err(err) => break Err(err),
            }
        };
        self.shutdown();
        result
    }

    pub async fn handle(&mut self, event: Event) -> SessionResult<Flow> {
        match event {
            Event::Shutdown => return Ok(Flow::Stop),
            Event::Input(token) => self.on_input(&token),
            Event::Signal {
                subscription,
                signal,
            } => self.on_signal(subscription, signal).await?,
        }
        Ok(Flow::Continue)
    }

    /// Releases every subscription the session still holds.
    pub fn shutdown(&mut self) {
        self.connected = false;
        for id in [
            self.properties_sub.take(),
            self.owner_sub.take(),
            self.discovery_sub.take(),
        ]
        .into_iter()
        .flatten()
        {
            self.gateway.unsubscribe(id);
        }
    }

    async fn resolve(&mut self) -> SessionResult<bool> {
        let namespace = self.settings.player.as_str().to_string();
        if self.gateway.name_has_owner(&namespace).await? {
            debug!(name = %namespace, "exact player name has an owner");
            self.mode = MatchMode::Exact;
            self.identity = namespace;
            return Ok(true);
        }

        for name in self.gateway.list_names().await? {
            if self.settings.player.is_instance(&name) {
                self.registry.insert(name);
            }
        }
        match self.pick_instance().await {
            Some(name) => {
                self.mode = MatchMode::Prefix;
                self.identity = name;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Most recent live instance. Candidates without an owner are evicted.
    async fn pick_instance(&mut self) -> Option<String> {
        let candidates: Vec<String> = self.registry.recent_first().map(str::to_string).collect();
        for name in candidates {
            match self.gateway.name_has_owner(&name).await {
                Ok(true) => return Some(name),
                Ok(false) => debug!(name = %name, "evicting stale instance"),
                Err(err) => self.report("owner query", &err),
            }
            self.registry.remove(&name);
        }
        None
    }

    async fn arm_discovery(&mut self) {
        if self.discovery_sub.is_some() {
            return;
        }
        match self
            .gateway
            .subscribe(SignalMatch::NameOwnerChanged { name: None })
            .await
        {
            Ok(id) => self.discovery_sub = Some(id),
            Err(err) => self.report("discovery subscription", &err),
        }
    }

    fn disarm_discovery(&mut self) {
        if let Some(id) = self.discovery_sub.take() {
            self.gateway.unsubscribe(id);
        }
    }

    async fn connect(&mut self) -> SessionResult<()> {
        if self.connected {
            return Ok(());
        }
        info!(identity = %self.identity, mode = ?self.mode, "attaching to player");
        self.connected = true;

        if self.properties_sub.is_none() {
            let signal = SignalMatch::PropertiesChanged {
                sender: self.identity.clone(),
            };
            match self.gateway.subscribe(signal).await {
                Ok(id) => self.properties_sub = Some(id),
                Err(err) => self.report("properties subscription", &err),
            }
        }
        if self.owner_sub.is_none() {
            let signal = SignalMatch::NameOwnerChanged {
                name: Some(self.identity.clone()),
            };
            match self.gateway.subscribe(signal).await {
                Ok(id) => self.owner_sub = Some(id),
                Err(err) => self.report("owner subscription", &err),
            }
        }

        self.show_initial_info().await
    }

    fn disconnect(&mut self) {
        info!(identity = %self.identity, "detaching from player");
        self.connected = false;
        if self.mode != MatchMode::Exact {
            for id in [self.properties_sub.take(), self.owner_sub.take()]
                .into_iter()
                .flatten()
            {
                self.gateway.unsubscribe(id);
            }
        }
    }

    async fn show_initial_info(&mut self) -> SessionResult<()> {
        let fetched = async {
            let status = self
                .gateway
                .get_property(&self.identity, PlayerProperty::PlaybackStatus)
                .await?
                .into_status()?;
            let metadata = self
                .gateway
                .get_property(&self.identity, PlayerProperty::Metadata)
                .await?
                .into_metadata()?;
            Ok::<_, BusError>((status, metadata))
        }
        .await;

        match fetched {
            Ok((status, metadata)) => self.show_info(
                PropertiesUpdate {
                    status: Some(status),
                    metadata: Some(metadata),
                },
                false,
            ),
            Err(err) => {
                self.report("initial property fetch", &err);
                Ok(())
            }
        }
    }

    async fn on_signal(
        &mut self,
        subscription: SubscriptionId,
        signal: Signal,
    ) -> SessionResult<()> {
        let id = Some(subscription);
        match signal {
            Signal::PropertiesChanged(update) if id == self.properties_sub => {
                if self.connected {
                    self.show_info(update, self.settings.dedupe)?;
                }
            }
            Signal::NameOwnerChanged(change) if id == self.owner_sub => {
                self.on_owner_changed(change).await?;
            }
            Signal::NameOwnerChanged(change) if id == self.discovery_sub => {
                self.on_discovery(change).await?;
            }
            _ => debug!(
                subscription = subscription.0,
                "dropping event from released subscription"
            ),
        }
        Ok(())
    }

    async fn on_owner_changed(&mut self, change: OwnerChange) -> SessionResult<()> {
        if change.name != self.identity {
            return Ok(());
        }
        if change.appeared() {
            return self.connect().await;
        }
        if !change.vanished() {
            return Ok(());
        }

        self.disconnect();
        if self.mode == MatchMode::Prefix {
            if let Some(next) = self.pick_instance().await {
                debug!(from = %self.identity, to = %next, "switching instance");
                self.identity = next;
                return self.connect().await;
            }
        }
        self.show_placeholder()
    }

    async fn on_discovery(&mut self, change: OwnerChange) -> SessionResult<()> {
        if change.vanished() {
            if self.settings.player.is_instance(&change.name) {
                self.registry.remove(&change.name);
            }
            return Ok(());
        }
        if !change.appeared() {
            return Ok(());
        }

        if self.settings.player.is_exact(&change.name) {
            if self.connected {
                self.disconnect();
            }
            self.mode = MatchMode::Exact;
            self.identity = change.name;
            self.disarm_discovery();
            return self.connect().await;
        }
        if self.settings.player.is_instance(&change.name) {
            self.registry.insert(change.name.clone());
            self.mode = MatchMode::Prefix;
            if !self.connected {
                self.identity = change.name;
                return self.connect().await;
            }
        }
        Ok(())
    }

    fn on_input(&mut self, token: &str) {
        if !self.connected {
            return;
        }
        let Some(method) = self.settings.mouse_buttons.get(token) else {
            debug!(token, "unmapped input");
            return;
        };
        debug!(token, method = %method, identity = %self.identity, "invoking player method");
        if let Err(err) = self.gateway.invoke_method(&self.identity, method) {
            self.report("method invocation", &err);
        }
    }

    fn show_info(&mut self, update: PropertiesUpdate, only_if_changed: bool) -> SessionResult<()> {
        if let Some(status) = update.status {
            self.last_status = Some(status);
        }
        if let Some(metadata) = update.metadata {
            self.last_metadata = Some(metadata);
        }
        let (Some(status), Some(metadata)) = (&self.last_status, &self.last_metadata) else {
            return Ok(());
        };

        let values = Values::from([
            ("status".to_string(), Value::from(status.as_str())),
            ("artist".to_string(), Value::from(metadata.artist_line())),
            ("title".to_string(), Value::from(metadata.title.as_str())),
        ]);
        let line = self
            .settings
            .formatter
            .render(&self.settings.template, &values)?;
        if only_if_changed && self.last_line.as_deref() == Some(line.as_str()) {
            return Ok(());
        }
        self.output.emit(&line)?;
        self.last_line = Some(line);
        Ok(())
    }

    fn show_placeholder(&mut self) -> SessionResult<()> {
        self.output.emit(&self.settings.placeholder)?;
        self.last_status = None;
        self.last_metadata = None;
        self.last_line = None;
        Ok(())
    }

    fn report(&self, context: &str, err: &BusError) {
        warn!(context, identity = %self.identity, error = %err, "bus call failed");
        if let Some(callback) = &self.error_callback {
            callback(err);
        }
    }
}

use thiserror::Error;

/// Bus transport failures. Reported and otherwise ignored by the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("bus connection error: {message}")]
    Connection { message: String },
    #[error("call to {method} on {destination} failed: {message}")]
    Call {
        destination: String,
        method: String,
        message: String,
    },
    #[error("invalid bus name '{0}'")]
    InvalidName(String),
    #[error("unexpected value for property {property}")]
    UnexpectedValue { property: &'static str },
    #[error("{message}")]
    Other { message: String },
}

pub type BusResult<T> = Result<T, BusError>;

/// Handle returned by [`BusGateway::subscribe`]. Signals are delivered
/// tagged with the handle of the subscription that matched them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// What a subscription listens for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalMatch {
    /// `PropertiesChanged` on the player interface, sent by `sender`.
    PropertiesChanged { sender: String },
    /// `NameOwnerChanged` for one bus name, or for every name when `None`.
    NameOwnerChanged { name: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    PropertiesChanged(PropertiesUpdate),
    NameOwnerChanged(OwnerChange),
}

/// The changed subset of the properties the session renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertiesUpdate {
    pub status: Option<String>,
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerChange {
    pub name: String,
    pub old_owner: Option<String>,
    pub new_owner: Option<String>,
}

impl OwnerChange {
    pub fn appeared(&self) -> bool {
        self.old_owner.is_none() && self.new_owner.is_some()
    }

    pub fn vanished(&self) -> bool {
        self.old_owner.is_some() && self.new_owner.is_none()
    }
}

/// Track metadata. Absent keys read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub artists: Vec<String>,
    pub title: String,
}

impl Metadata {
    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerProperty {
    PlaybackStatus,
    Metadata,
}

impl PlayerProperty {
    pub fn name(self) -> &'static str {
        match self {
            PlayerProperty::PlaybackStatus => "PlaybackStatus",
            PlayerProperty::Metadata => "Metadata",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    PlaybackStatus(String),
    Metadata(Metadata),
}

impl PropertyValue {
    pub fn into_status(self) -> BusResult<String> {
        match self {
            PropertyValue::PlaybackStatus(status) => Ok(status),
            PropertyValue::Metadata(_) => Err(BusError::UnexpectedValue {
                property: PlayerProperty::PlaybackStatus.name(),
            }),
        }
    }

    pub fn into_metadata(self) -> BusResult<Metadata> {
        match self {
            PropertyValue::Metadata(metadata) => Ok(metadata),
            PropertyValue::PlaybackStatus(_) => Err(BusError::UnexpectedValue {
                property: PlayerProperty::Metadata.name(),
            }),
        }
    }
}

/// The message bus as seen by the session.
///
/// Implementations push matched signals into the session's event channel
/// as [`crate::Event::Signal`]; after [`BusGateway::unsubscribe`] returns,
/// no further signals may be sent for that handle.
#[async_trait::async_trait]
pub trait BusGateway: Send + Sync {
    async fn name_has_owner(&self, name: &str) -> BusResult<bool>;

    async fn list_names(&self) -> BusResult<Vec<String>>;

    async fn get_property(
        &self,
        identity: &str,
        property: PlayerProperty,
    ) -> BusResult<PropertyValue>;

    /// Calls a no-argument player method without waiting for the reply.
    /// An `Err` means the call could not be dispatched; failures reported
    /// by the player afterwards are only logged by the implementation.
    fn invoke_method(&self, identity: &str, method: &str) -> BusResult<()>;

    async fn subscribe(&self, signal: SignalMatch) -> BusResult<SubscriptionId>;

    fn unsubscribe(&self, id: SubscriptionId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_transitions() {
        let appeared = OwnerChange {
            name: "org.mpris.MediaPlayer2.vlc".into(),
            old_owner: None,
            new_owner: Some(":1.42".into()),
        };
        assert!(appeared.appeared());
        assert!(!appeared.vanished());

        let handover = OwnerChange {
            old_owner: Some(":1.41".into()),
            ..appeared
        };
        assert!(!handover.appeared());
        assert!(!handover.vanished());
    }

    #[test]
    fn artists_are_comma_joined() {
        let metadata = Metadata {
            artists: vec!["A".into(), "B".into()],
            title: "Song".into(),
        };
        assert_eq!(metadata.artist_line(), "A, B");
        assert_eq!(Metadata::default().artist_line(), "");
    }

    #[test]
    fn property_values_check_their_kind() {
        let status = PropertyValue::PlaybackStatus("Playing".into());
        assert_eq!(status.clone().into_status().unwrap(), "Playing");
        let mismatch = BusError::UnexpectedValue {
            property: "Metadata",
        };
        assert_eq!(status.into_metadata(), Err(mismatch));
    }
}

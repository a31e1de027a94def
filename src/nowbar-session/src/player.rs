use std::fmt;

pub const MPRIS_BUS_NAME_PREFIX: &str = "org.mpris.MediaPlayer2.";
pub const MPRIS_OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";
pub const MPRIS_PLAYER_INTERFACE: &str = "org.mpris.MediaPlayer2.Player";

/// How the tracked bus name relates to the configured namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// No resolution attempted yet.
    #[default]
    Unknown,
    /// The namespace itself is the player's bus name.
    Exact,
    /// One of several `namespace.suffix` instances is tracked.
    Prefix,
}

/// The configured player namespace, e.g. `org.mpris.MediaPlayer2.vlc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerName(String);

impl PlayerName {
    /// Prefixes `name` with the MPRIS namespace unless it already has it.
    pub fn normalize(name: &str) -> Self {
        if name.starts_with(MPRIS_BUS_NAME_PREFIX) {
            Self(name.to_string())
        } else {
            Self(format!("{MPRIS_BUS_NAME_PREFIX}{name}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_exact(&self, bus_name: &str) -> bool {
        bus_name == self.0
    }

    /// True for `namespace.suffix`, where the suffix holds no further dots.
    pub fn is_instance(&self, bus_name: &str) -> bool {
        match bus_name.rsplit_once('.') {
            Some((head, _)) => head == self.0,
            None => false,
        }
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PlayerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

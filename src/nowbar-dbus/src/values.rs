//! Conversion of MPRIS property values into session types.

use nowbar_session::{BusError, BusResult, Metadata, PlayerProperty, PropertiesUpdate};
use std::collections::HashMap;
use zbus::zvariant::{OwnedValue, Value};

const ARTIST_KEY: &str = "xesam:artist";
const TITLE_KEY: &str = "xesam:title";

/// Strips variant wrappers (`v`) around the actual value.
fn peel<'v, 'a>(value: &'v Value<'a>) -> &'v Value<'a> {
    match value {
        Value::Value(inner) => peel(inner),
        other => other,
    }
}

pub(crate) fn string_value(value: &Value<'_>) -> Option<String> {
    match peel(value) {
        Value::Str(text) => Some(text.as_str().to_string()),
        _ => None,
    }
}

/// `xesam:artist` is a list of strings; some players send a single string.
fn string_list(value: &Value<'_>) -> Vec<String> {
    match peel(value) {
        Value::Array(items) => items.iter().filter_map(string_value).collect(),
        Value::Str(text) => vec![text.as_str().to_string()],
        _ => Vec::new(),
    }
}

pub(crate) fn status_from_value(value: &Value<'_>) -> BusResult<String> {
    string_value(value).ok_or(BusError::UnexpectedValue {
        property: PlayerProperty::PlaybackStatus.name(),
    })
}

pub(crate) fn metadata_from_value(value: &Value<'_>) -> BusResult<Metadata> {
    let unexpected = || BusError::UnexpectedValue {
        property: PlayerProperty::Metadata.name(),
    };
    let Value::Dict(dict) = peel(value) else {
        return Err(unexpected());
    };
    let entries: HashMap<String, OwnedValue> = dict
        .try_clone()
        .and_then(HashMap::try_from)
        .map_err(|_| unexpected())?;
    Ok(metadata_from_entries(&entries))
}

fn metadata_from_entries(entries: &HashMap<String, OwnedValue>) -> Metadata {
    Metadata {
        artists: entries
            .get(ARTIST_KEY)
            .map(|value| string_list(value))
            .unwrap_or_default(),
        title: entries
            .get(TITLE_KEY)
            .and_then(|value| string_value(value))
            .unwrap_or_default(),
    }
}

/// Picks the rendered properties out of a `PropertiesChanged` payload.
/// Values of the wrong shape are treated as absent.
pub(crate) fn properties_update(changed: &HashMap<&str, Value<'_>>) -> PropertiesUpdate {
    PropertiesUpdate {
        status: changed
            .get(PlayerProperty::PlaybackStatus.name())
            .and_then(|value| status_from_value(value).ok()),
        metadata: changed
            .get(PlayerProperty::Metadata.name())
            .and_then(|value| metadata_from_value(value).ok()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata_value(pairs: Vec<(&'static str, Value<'static>)>) -> Value<'static> {
        let map: HashMap<&str, Value<'static>> = pairs.into_iter().collect();
        Value::from(map)
    }

    #[test]
    fn status_is_read_through_variants() {
        let wrapped = Value::Value(Box::new(Value::from("Playing")));
        assert_eq!(status_from_value(&wrapped).unwrap(), "Playing");
        assert!(status_from_value(&Value::from(3u32)).is_err());
    }

    #[test]
    fn metadata_reads_artists_and_title() {
        let value = metadata_value(vec![
            (ARTIST_KEY, Value::from(vec!["A", "B"])),
            (TITLE_KEY, Value::from("Song")),
            ("xesam:album", Value::from("Album")),
        ]);
        let metadata = metadata_from_value(&value).unwrap();
        assert_eq!(metadata.artists, ["A", "B"]);
        assert_eq!(metadata.title, "Song");
    }

    #[test]
    fn missing_metadata_keys_are_empty() {
        let value = metadata_value(vec![("mpris:length", Value::from(1_000_000i64))]);
        assert_eq!(metadata_from_value(&value).unwrap(), Metadata::default());
    }

    #[test]
    fn non_dict_metadata_is_rejected() {
        let mismatch = BusError::UnexpectedValue {
            property: "Metadata",
        };
        assert_eq!(metadata_from_value(&Value::from("nope")), Err(mismatch));
    }

    #[test]
    fn properties_update_keeps_only_known_keys() {
        let mut changed = HashMap::new();
        changed.insert("PlaybackStatus", Value::from("Paused"));
        changed.insert("Volume", Value::from(0.5f64));
        let update = properties_update(&changed);
        assert_eq!(update.status.as_deref(), Some("Paused"));
        assert_eq!(update.metadata, None);
    }
}

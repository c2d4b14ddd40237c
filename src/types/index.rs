use serde::de::{self, DeserializeOwned};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

const CHANNELS: &str = "channels";
const VERSIONS: &str = "versions";

const ID: &str = "id";
const NAME: &str = "name";
const CURRENT_VERSION: &str = "currentVersion";

/// the repository root record, stored as index.json
///
/// top-level fields keep the order and presence they had on disk; fields
/// written by other tools survive a load/save cycle untouched.
#[derive(Clone, Debug)]
pub struct Index {
    pub channels: Vec<Channel>,
    pub versions: Vec<VersionSummary>,
    /// every field as read, in file order. known keys hold placeholders.
    fields: Map<String, Value>,
}

/// a named pointer to the version a client should track
#[derive(Clone, Debug)]
pub struct Channel {
    pub id: String,
    pub name: String,
    /// absent or negative means no pinned version
    pub current_version: Option<i64>,
    fields: Map<String, Value>,
}

/// pointer from the index to a version manifest file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSummary {
    pub id: i64,
    pub name: String,
}

/// what setting a channel did to the index
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelChange {
    Created,
    Updated,
    Removed,
}

impl Channel {
    /// a channel whose display name is its id
    pub fn new(id: impl Into<String>, current_version: Option<i64>) -> Self {
        let id = id.into();
        let mut fields = Map::new();
        fields.insert(ID.into(), Value::Null);
        fields.insert(NAME.into(), Value::Null);
        Self {
            name: id.clone(),
            id,
            current_version,
            fields,
        }
    }

    /// the pinned version, if any
    pub fn pinned_version(&self) -> Option<i64> {
        self.current_version.filter(|v| *v >= 0)
    }
}

impl Default for Index {
    fn default() -> Self {
        let mut fields = Map::new();
        fields.insert(CHANNELS.into(), Value::Null);
        fields.insert(VERSIONS.into(), Value::Null);
        Self {
            channels: vec![],
            versions: vec![],
            fields,
        }
    }
}

impl Index {
    /// an empty index for a fresh repository
    pub fn new() -> Self {
        Self::default()
    }

    /// look up a channel by exact id
    pub fn channel(&self, id: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    /// look up a version summary by id
    pub fn version(&self, id: i64) -> Option<&VersionSummary> {
        self.versions.iter().find(|v| v.id == id)
    }

    /// point `channel_id` at `version`.
    ///
    /// an existing channel is updated, or removed when `version` is absent or
    /// negative. a missing channel is appended with `version` as given.
    pub fn set_channel(&mut self, channel_id: &str, version: Option<i64>) -> ChannelChange {
        match self.channels.iter().position(|c| c.id == channel_id) {
            Some(i) => match version.filter(|v| *v >= 0) {
                Some(v) => {
                    self.channels[i].current_version = Some(v);
                    ChannelChange::Updated
                }
                None => {
                    self.channels.retain(|c| c.id != channel_id);
                    ChannelChange::Removed
                }
            },
            None => {
                self.channels.push(Channel::new(channel_id, version));
                ChannelChange::Created
            }
        }
    }

    /// add a channel with no pinned version
    pub fn create_channel(&mut self, channel_id: &str) -> Result<()> {
        if self.channel(channel_id).is_some() {
            return Err(Error::ChannelAlreadyExists(channel_id.to_string()));
        }
        self.channels.push(Channel::new(channel_id, None));
        Ok(())
    }

    /// append a version summary.
    ///
    /// callers must have written the version manifest first.
    pub fn append_version(&mut self, id: i64, name: impl Into<String>) {
        self.versions.push(VersionSummary {
            id,
            name: name.into(),
        });
    }
}

/// fields other than `known`, in file order
fn unknown_fields<'a>(
    fields: &'a Map<String, Value>,
    known: &'a [&'a str],
) -> impl Iterator<Item = (&'a String, &'a Value)> {
    fields.iter().filter(move |(k, _)| !known.contains(&k.as_str()))
}

impl PartialEq for Index {
    fn eq(&self, other: &Self) -> bool {
        const KNOWN: &[&str] = &[CHANNELS, VERSIONS];
        self.channels == other.channels
            && self.versions == other.versions
            && unknown_fields(&self.fields, KNOWN).eq(unknown_fields(&other.fields, KNOWN))
    }
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        const KNOWN: &[&str] = &[ID, NAME, CURRENT_VERSION];
        self.id == other.id
            && self.name == other.name
            && self.current_version == other.current_version
            && unknown_fields(&self.fields, KNOWN).eq(unknown_fields(&other.fields, KNOWN))
    }
}

fn take_required<T: DeserializeOwned>(
    fields: &mut Map<String, Value>,
    key: &'static str,
) -> serde_json::Result<T> {
    match fields.get_mut(key) {
        Some(value) => serde_json::from_value(value.take()),
        None => Err(de::Error::missing_field(key)),
    }
}

fn take_or_default<T: DeserializeOwned + Default>(
    fields: &mut Map<String, Value>,
    key: &str,
) -> serde_json::Result<T> {
    match fields.get_mut(key) {
        Some(value) => serde_json::from_value(value.take()),
        None => Ok(T::default()),
    }
}

impl<'de> Deserialize<'de> for Index {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut fields = Map::<String, Value>::deserialize(deserializer)?;
        let channels = take_or_default(&mut fields, CHANNELS).map_err(de::Error::custom)?;
        let versions = take_or_default(&mut fields, VERSIONS).map_err(de::Error::custom)?;
        Ok(Self {
            channels,
            versions,
            fields,
        })
    }
}

impl Serialize for Index {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in &self.fields {
            match key.as_str() {
                CHANNELS => map.serialize_entry(key, &self.channels)?,
                VERSIONS => map.serialize_entry(key, &self.versions)?,
                _ => map.serialize_entry(key, value)?,
            }
        }
        // lists absent from the file are only written once they have entries
        if !self.fields.contains_key(CHANNELS) && !self.channels.is_empty() {
            map.serialize_entry(CHANNELS, &self.channels)?;
        }
        if !self.fields.contains_key(VERSIONS) && !self.versions.is_empty() {
            map.serialize_entry(VERSIONS, &self.versions)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Channel {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut fields = Map::<String, Value>::deserialize(deserializer)?;
        let id = take_required(&mut fields, ID).map_err(de::Error::custom)?;
        let name = take_required(&mut fields, NAME).map_err(de::Error::custom)?;
        let current_version =
            take_or_default(&mut fields, CURRENT_VERSION).map_err(de::Error::custom)?;
        Ok(Self {
            id,
            name,
            current_version,
            fields,
        })
    }
}

impl Serialize for Channel {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in &self.fields {
            match key.as_str() {
                ID => map.serialize_entry(key, &self.id)?,
                NAME => map.serialize_entry(key, &self.name)?,
                // an explicit null on disk stays null while unpinned
                CURRENT_VERSION => map.serialize_entry(key, &self.current_version)?,
                _ => map.serialize_entry(key, value)?,
            }
        }
        if !self.fields.contains_key(CURRENT_VERSION) {
            if let Some(v) = self.current_version {
                map.serialize_entry(CURRENT_VERSION, &v)?;
            }
        }
        map.end()
    }
}

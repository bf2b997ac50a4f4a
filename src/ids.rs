//! Identifier types for the node graph.
//!
//! `Oid` is the semantic identifier: two nodes sharing an `Oid` represent the
//! same logical datum stored in different places. `Uid` is unique per node
//! instance and is what the event broadcaster, wiring tables and descriptor
//! maps key on.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Semantic identifier shared by all instances of the same logical datum.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid(Arc<str>);

impl Oid {
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<T: Into<Arc<str>>> From<T> for Oid {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl Serialize for Oid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Oid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Oid::new)
    }
}

/// Globally unique identifier for a single node instance.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uid(Arc<str>);

impl Uid {
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    /// Generates a fresh random UID (v4 UUID, textual form).
    pub fn generate() -> Self {
        Self(Arc::from(uuid::Uuid::new_v4().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<T: Into<Arc<str>>> From<T> for Uid {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl Serialize for Uid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Uid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Uid::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uids_generated_are_distinct() {
        assert_ne!(Uid::generate(), Uid::generate());
    }

    #[test]
    fn oid_display_round_trips() {
        let oid = Oid::new("dataset-a");
        assert_eq!(oid.to_string(), "dataset-a");
    }
}

//! Graph descriptor (spec §4.8): a schema-free intermediate representation
//! used to construct nodes from serialized form. This is the one place the
//! crate stays stringly-typed on purpose — the whole point of a descriptor
//! is to carry fields the core doesn't know the shape of ahead of time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};
use crate::ids::{Oid, Uid};

/// A descriptor field value. `serde_json::Value` would also work here, but
/// a closed enum keeps the set of representable shapes explicit and keeps
/// serialization dependency-free of `serde_json`'s full value model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// The authoritative edge-kind vocabulary (spec §4.8). `Parent` is the only
/// N-to-1 kind; the rest are 1-to-N.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkKind {
    Consumer,
    StreamingConsumer,
    Input,
    StreamingInput,
    Output,
    Child,
    Producer,
    Parent,
}

impl LinkKind {
    fn is_singular(self) -> bool {
        matches!(self, LinkKind::Parent)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphDescriptor {
    oid: Oid,
    uid: Uid,
    fields: HashMap<String, FieldValue>,
    links: HashMap<LinkKind, Vec<Uid>>,
}

impl GraphDescriptor {
    pub fn new(oid: impl Into<Oid>, uid: impl Into<Uid>) -> Self {
        Self {
            oid: oid.into(),
            uid: uid.into(),
            fields: HashMap::new(),
            links: HashMap::new(),
        }
    }

    pub fn oid(&self) -> &Oid {
        &self.oid
    }

    pub fn uid(&self) -> &Uid {
        &self.uid
    }

    pub fn set_field(&mut self, key: impl Into<String>, value: FieldValue) {
        self.fields.insert(key.into(), value);
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn links(&self, kind: LinkKind) -> &[Uid] {
        self.links.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parent(&self) -> Option<&Uid> {
        self.links(LinkKind::Parent).first()
    }

    /// Accumulates a link of the given kind; `Parent` rejects a second
    /// distinct target (spec §3: parent is write-once).
    pub fn add_link(&mut self, kind: LinkKind, target: impl Into<Uid>) -> Result<()> {
        let target = target.into();
        let list = self.links.entry(kind).or_default();
        if kind.is_singular() {
            match list.first() {
                Some(existing) if *existing != target => {
                    return Err(FlowError::wiring("parent is write-once"));
                }
                Some(_) => {}
                None => list.push(target),
            }
        } else if !list.contains(&target) {
            list.push(target);
        }
        Ok(())
    }

    pub fn add_consumer(&mut self, target: impl Into<Uid>) -> Result<()> {
        self.add_link(LinkKind::Consumer, target)
    }

    pub fn add_streaming_consumer(&mut self, target: impl Into<Uid>) -> Result<()> {
        self.add_link(LinkKind::StreamingConsumer, target)
    }

    pub fn add_input(&mut self, target: impl Into<Uid>) -> Result<()> {
        self.add_link(LinkKind::Input, target)
    }

    pub fn add_streaming_input(&mut self, target: impl Into<Uid>) -> Result<()> {
        self.add_link(LinkKind::StreamingInput, target)
    }

    pub fn add_output(&mut self, target: impl Into<Uid>) -> Result<()> {
        self.add_link(LinkKind::Output, target)
    }

    pub fn add_producer(&mut self, target: impl Into<Uid>) -> Result<()> {
        self.add_link(LinkKind::Producer, target)
    }

    pub fn add_child(&mut self, target: impl Into<Uid>) -> Result<()> {
        self.add_link(LinkKind::Child, target)
    }

    pub fn set_parent(&mut self, target: impl Into<Uid>) -> Result<()> {
        self.add_link(LinkKind::Parent, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulating_the_same_consumer_twice_is_idempotent() {
        let mut descriptor = GraphDescriptor::new("oid-a", "uid-a1");
        descriptor.add_consumer("uid-c1").unwrap();
        descriptor.add_consumer("uid-c1").unwrap();
        assert_eq!(descriptor.links(LinkKind::Consumer).len(), 1);
    }

    #[test]
    fn parent_rejects_a_second_distinct_target() {
        let mut descriptor = GraphDescriptor::new("oid-a", "uid-a1");
        descriptor.set_parent("uid-p1").unwrap();
        assert!(descriptor.set_parent("uid-p2").is_err());
        descriptor.set_parent("uid-p1").unwrap();
    }
}

//! Uniform reference type used for wiring (spec Design Notes §9: "dynamic
//! dispatch over storage back-ends" generalizes here to dispatch over node
//! kinds). A closed set of three variants rather than a trait object, since
//! every node in the graph is exactly one of these three things.

use std::sync::Arc;

use crate::error::Result;
use crate::event::EventBroadcaster;
use crate::ids::{Oid, Uid};
use crate::node::application_node::ApplicationNode;
use crate::node::container_node::ContainerNode;
use crate::node::data_node::DataNode;
use crate::status::DataStatus;

#[derive(Clone)]
pub enum NodeHandle {
    Data(Arc<DataNode>),
    Container(Arc<ContainerNode>),
    Application(Arc<ApplicationNode>),
}

impl NodeHandle {
    pub fn oid(&self) -> Oid {
        match self {
            NodeHandle::Data(n) => n.oid().clone(),
            NodeHandle::Container(n) => n.oid().clone(),
            NodeHandle::Application(n) => n.oid().clone(),
        }
    }

    pub fn uid(&self) -> Uid {
        match self {
            NodeHandle::Data(n) => n.uid().clone(),
            NodeHandle::Container(n) => n.uid().clone(),
            NodeHandle::Application(n) => n.uid().clone(),
        }
    }

    pub fn status(&self) -> DataStatus {
        match self {
            NodeHandle::Data(n) => n.status(),
            NodeHandle::Container(n) => n.status(),
            NodeHandle::Application(n) => n.status(),
        }
    }

    pub fn events(&self) -> &EventBroadcaster {
        match self {
            NodeHandle::Data(n) => n.events(),
            NodeHandle::Container(n) => n.events(),
            NodeHandle::Application(n) => n.events(),
        }
    }

    /// Registers `producer` as one of this node's inputs. No-op for kinds
    /// that don't track inputs (only application nodes do).
    pub fn add_input(&self, producer: NodeHandle) -> Result<()> {
        match self {
            NodeHandle::Application(n) => n.add_input(producer),
            NodeHandle::Data(_) | NodeHandle::Container(_) => Ok(()),
        }
    }

    pub fn add_streaming_input(&self, producer: NodeHandle) -> Result<()> {
        match self {
            NodeHandle::Application(n) => n.add_streaming_input(producer),
            NodeHandle::Data(_) | NodeHandle::Container(_) => Ok(()),
        }
    }

    /// Registers `consumer` as a producer of this node's outputs. No-op
    /// outside application nodes.
    pub fn add_output(&self, consumer: NodeHandle) -> Result<()> {
        match self {
            NodeHandle::Application(n) => n.add_output(consumer),
            NodeHandle::Data(_) | NodeHandle::Container(_) => Ok(()),
        }
    }

    /// Every node kind has a `dropCompleted` callback; the default is a
    /// no-op, overridden meaningfully by barrier-style application nodes.
    pub fn drop_completed(&self, producer_uid: &Uid) {
        match self {
            NodeHandle::Data(n) => n.drop_completed(producer_uid),
            NodeHandle::Container(n) => n.drop_completed(producer_uid),
            NodeHandle::Application(n) => n.drop_completed(producer_uid),
        }
    }

    pub fn data_written(&self, producer_uid: &Uid, data: &[u8]) {
        match self {
            NodeHandle::Data(n) => n.data_written(producer_uid, data),
            NodeHandle::Container(n) => n.data_written(producer_uid, data),
            NodeHandle::Application(n) => n.data_written(producer_uid, data),
        }
    }

    pub fn handle_interest(&self, other: &NodeHandle) {
        match self {
            NodeHandle::Data(n) => n.handle_interest(other),
            NodeHandle::Container(n) => n.handle_interest(other),
            NodeHandle::Application(n) => n.handle_interest(other),
        }
    }

    pub fn as_application(&self) -> Option<&Arc<ApplicationNode>> {
        match self {
            NodeHandle::Application(n) => Some(n),
            _ => None,
        }
    }

    pub fn exists(&self) -> Result<bool> {
        match self {
            NodeHandle::Data(n) => n.exists(),
            NodeHandle::Container(n) => n.exists(),
            NodeHandle::Application(n) => n.exists(),
        }
    }

    pub fn expiration_date(&self) -> i64 {
        match self {
            NodeHandle::Data(n) => n.expiration_date(),
            NodeHandle::Container(n) => n.expiration_date(),
            NodeHandle::Application(n) => n.expiration_date(),
        }
    }

    /// Write-once parent assignment shared by every node kind (spec §3).
    pub fn set_parent(&self, parent: Arc<ContainerNode>) -> Result<()> {
        match self {
            NodeHandle::Data(n) => n.core.set_parent(parent),
            NodeHandle::Container(n) => n.core.set_parent(parent),
            NodeHandle::Application(n) => n.core.set_parent(parent),
        }
    }

    pub fn file_path(&self) -> Option<std::path::PathBuf> {
        match self {
            NodeHandle::Data(n) => n.file_path(),
            _ => None,
        }
    }

    /// Informational dataURL (spec §6); empty for kinds that don't back
    /// onto a single I/O resource.
    pub fn data_url(&self) -> String {
        match self {
            NodeHandle::Data(n) => n.data_url(),
            NodeHandle::Container(_) | NodeHandle::Application(_) => String::new(),
        }
    }

    pub fn add_consumer(&self, c: NodeHandle) -> Result<()> {
        match self {
            NodeHandle::Data(n) => n.add_consumer(c),
            NodeHandle::Container(n) => n.add_consumer(c),
            NodeHandle::Application(n) => n.add_consumer(c),
        }
    }

    pub fn add_streaming_consumer(&self, c: NodeHandle) -> Result<()> {
        match self {
            NodeHandle::Data(n) => n.add_streaming_consumer(c),
            NodeHandle::Container(n) => n.add_streaming_consumer(c),
            NodeHandle::Application(n) => n.add_streaming_consumer(c),
        }
    }

    pub fn add_producer(&self, p: NodeHandle) -> Result<()> {
        match self {
            NodeHandle::Data(n) => n.add_producer(p),
            NodeHandle::Container(n) => n.add_producer(p),
            NodeHandle::Application(n) => n.add_producer(p),
        }
    }

    pub fn producer_finished(&self, uid: &Uid) -> Result<()> {
        match self {
            NodeHandle::Data(n) => n.producer_finished(uid),
            NodeHandle::Container(n) => n.producer_finished(uid),
            NodeHandle::Application(n) => n.producer_finished(uid),
        }
    }
}

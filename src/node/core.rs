//! Fields and wiring logic shared by every node kind (spec §3).
//!
//! Rust has no class inheritance, so rather than a `DataNode` base class
//! with `ApplicationNode`/`ContainerNode` subclasses, each concrete node
//! struct embeds a [`NodeCore`] and forwards the shared operations to it.
//! The back-reference guard in [`NodeCore::add_consumer`] and
//! [`NodeCore::add_producer`] is the one named in Design Notes §9: the first
//! caller registers then invokes the symmetric method on the other side,
//! which finds itself already registered and returns immediately.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::FlowError;
use crate::error::Result;
use crate::event::{EventBroadcaster, EventKind, EventPayload};
use crate::ids::{Oid, Uid};
use crate::node::container_node::ContainerNode;
use crate::node::node_handle::NodeHandle;
use crate::status::{DataStatus, ExecutionMode};

/// Construction-time options common to every node kind.
#[derive(Clone, Debug)]
pub struct NodeOptions {
    pub phase: Option<String>,
    pub execution_mode: ExecutionMode,
    pub location: Option<String>,
    pub node: String,
    pub expiration_date: i64,
    pub precious: bool,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            phase: None,
            execution_mode: ExecutionMode::Auto,
            location: None,
            node: crate::status::LOOPBACK_NODE.to_string(),
            expiration_date: -1,
            precious: true,
        }
    }
}

pub(crate) struct NodeCore {
    oid: Oid,
    uid: Uid,
    status: Mutex<DataStatus>,
    events: EventBroadcaster,
    options: NodeOptions,
    parent: Mutex<Option<Arc<ContainerNode>>>,
    consumers: Mutex<Vec<NodeHandle>>,
    streaming_consumers: Mutex<Vec<NodeHandle>>,
    producers: Mutex<Vec<NodeHandle>>,
    finished_producers: Mutex<HashSet<Uid>>,
}

impl NodeCore {
    pub fn new(oid: Oid, uid: Uid, options: NodeOptions) -> Self {
        Self {
            oid,
            uid,
            status: Mutex::new(DataStatus::Initialized),
            events: EventBroadcaster::new(),
            options,
            parent: Mutex::new(None),
            consumers: Mutex::new(Vec::new()),
            streaming_consumers: Mutex::new(Vec::new()),
            producers: Mutex::new(Vec::new()),
            finished_producers: Mutex::new(HashSet::new()),
        }
    }

    pub fn oid(&self) -> &Oid {
        &self.oid
    }

    pub fn uid(&self) -> &Uid {
        &self.uid
    }

    pub fn events(&self) -> &EventBroadcaster {
        &self.events
    }

    pub fn options(&self) -> &NodeOptions {
        &self.options
    }

    pub fn status(&self) -> DataStatus {
        *self.status.lock()
    }

    /// Moves to `new`, releases the status lock, then fires the `Status`
    /// event (spec §5: "the `status` event is fired after the lock is
    /// released").
    pub fn set_status(&self, new: DataStatus) {
        {
            let mut guard = self.status.lock();
            *guard = new;
        }
        self.events
            .fire(&self.oid, &self.uid, EventKind::Status, EventPayload::Status(new));
    }

    pub fn parent(&self) -> Option<Arc<ContainerNode>> {
        self.parent.lock().clone()
    }

    /// Write-once: fails if a parent is already set (spec §3: "write-once
    /// from null to a non-null container; cross-container moves are
    /// forbidden").
    pub fn set_parent(&self, parent: Arc<ContainerNode>) -> Result<()> {
        let mut guard = self.parent.lock();
        if guard.is_some() {
            return Err(FlowError::wiring("node already has a parent container"));
        }
        *guard = Some(parent);
        Ok(())
    }

    pub fn consumers(&self) -> Vec<NodeHandle> {
        self.consumers.lock().clone()
    }

    pub fn streaming_consumers(&self) -> Vec<NodeHandle> {
        self.streaming_consumers.lock().clone()
    }

    pub fn producers(&self) -> Vec<NodeHandle> {
        self.producers.lock().clone()
    }

    /// `addConsumer` (spec §4.3). `self_handle` is the caller's own
    /// [`NodeHandle`], needed to hand back to `c.add_input`.
    pub fn add_consumer(&self, self_handle: &NodeHandle, c: NodeHandle) -> Result<()> {
        if self
            .streaming_consumers
            .lock()
            .iter()
            .any(|h| h.uid() == c.uid())
        {
            return Err(FlowError::wiring(
                "node is already registered as a streaming consumer",
            ));
        }

        {
            let mut consumers = self.consumers.lock();
            if consumers.iter().any(|h| h.uid() == c.uid()) {
                return Ok(());
            }
            consumers.push(c.clone());
        }

        c.add_input(self_handle.clone())?;

        if matches!(self.options.execution_mode, ExecutionMode::Auto) {
            let target = c.clone();
            let producer_uid = self.uid.clone();
            self.events
                .subscribe(Some(EventKind::Status), move |event| {
                    if let EventPayload::Status(DataStatus::Completed) = &event.payload {
                        target.drop_completed(&producer_uid);
                    }
                });
        }
        Ok(())
    }

    /// `addStreamingConsumer` (spec §4.3).
    pub fn add_streaming_consumer(&self, self_handle: &NodeHandle, c: NodeHandle) -> Result<()> {
        if self.consumers.lock().iter().any(|h| h.uid() == c.uid()) {
            return Err(FlowError::wiring(
                "node is already registered as a normal consumer",
            ));
        }

        {
            let mut streaming = self.streaming_consumers.lock();
            if streaming.iter().any(|h| h.uid() == c.uid()) {
                return Ok(());
            }
            streaming.push(c.clone());
        }

        c.add_streaming_input(self_handle.clone())
    }

    /// `addProducer` (spec §4.3).
    pub fn add_producer(&self, self_handle: &NodeHandle, p: NodeHandle) -> Result<()> {
        {
            let mut producers = self.producers.lock();
            if producers.iter().any(|h| h.uid() == p.uid()) {
                return Ok(());
            }
            producers.push(p.clone());
        }
        p.add_output(self_handle.clone())
    }

    /// `producerFinished` (spec §4.3). Returns `true` once every registered
    /// producer has reported in.
    pub fn producer_finished(&self, uid: &Uid) -> Result<bool> {
        let registered = self.producers.lock().iter().any(|h| &h.uid() == uid);
        if !registered {
            return Err(FlowError::wiring(format!(
                "{uid} is not a registered producer"
            )));
        }
        let mut finished = self.finished_producers.lock();
        if !finished.insert(uid.clone()) {
            return Err(FlowError::wiring(format!(
                "producer {uid} already reported finished"
            )));
        }
        let total = self.producers.lock().len();
        Ok(finished.len() == total)
    }

    pub fn fire_attribute(&self, name: &'static str, value: crate::event::AttributeValue) {
        self.events.fire(
            &self.oid,
            &self.uid,
            EventKind::Attribute(name),
            EventPayload::Attribute(value),
        );
    }
}

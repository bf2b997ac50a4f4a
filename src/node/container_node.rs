//! Container node (spec §3, §4.4): a data node whose "data" is the union of
//! its children, with no direct I/O of its own.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{FlowError, Result};
use crate::event::EventBroadcaster;
use crate::ids::{Oid, Uid};
use crate::node::core::{NodeCore, NodeOptions};
use crate::node::node_handle::NodeHandle;
use crate::status::DataStatus;

pub struct ContainerNode {
    pub(crate) core: NodeCore,
    children: Mutex<Vec<NodeHandle>>,
}

impl ContainerNode {
    pub fn new(oid: impl Into<Oid>, uid: impl Into<Uid>, options: NodeOptions) -> Arc<Self> {
        Arc::new(Self {
            core: NodeCore::new(oid.into(), uid.into(), options),
            children: Mutex::new(Vec::new()),
        })
    }

    fn self_handle(self: &Arc<Self>) -> NodeHandle {
        NodeHandle::Container(self.clone())
    }

    pub fn oid(&self) -> &Oid {
        self.core.oid()
    }

    pub fn uid(&self) -> &Uid {
        self.core.uid()
    }

    pub fn status(&self) -> DataStatus {
        self.core.status()
    }

    pub fn events(&self) -> &EventBroadcaster {
        self.core.events()
    }

    pub fn children(&self) -> Vec<NodeHandle> {
        self.children.lock().clone()
    }

    /// Adds `child`, rejecting self-reference and leaving general cycle
    /// detection out of scope (spec Design Notes §9: the graph is acyclic
    /// by construction).
    pub fn add_child(self: &Arc<Self>, child: NodeHandle) -> Result<()> {
        if child.uid() == *self.core.uid() {
            return Err(FlowError::wiring("a container cannot be its own child"));
        }
        self.validate_child(&child)?;
        child.set_parent(self.clone())?;
        self.children.lock().push(child);
        Ok(())
    }

    /// Hook for specializations (e.g. [`DirectoryContainer`]) to reject
    /// children of the wrong kind or placement. The base container accepts
    /// anything.
    fn validate_child(&self, _child: &NodeHandle) -> Result<()> {
        Ok(())
    }

    /// `exists()` is the logical OR of the children; an empty container
    /// reports `true` (spec Design Notes §9, following the source).
    pub fn exists(&self) -> Result<bool> {
        let children = self.children.lock();
        if children.is_empty() {
            return Ok(true);
        }
        for child in children.iter() {
            if child.exists()? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// `expirationDate` is the max over children; childless reports -1.
    pub fn expiration_date(&self) -> i64 {
        self.children
            .lock()
            .iter()
            .map(|c| c.expiration_date())
            .max()
            .unwrap_or(-1)
    }

    pub fn delete(self: &Arc<Self>) -> Result<()> {
        self.core.set_status(DataStatus::Deleted);
        Ok(())
    }

    pub fn add_consumer(self: &Arc<Self>, c: NodeHandle) -> Result<()> {
        let handle = self.self_handle();
        self.core.add_consumer(&handle, c)
    }

    pub fn add_streaming_consumer(self: &Arc<Self>, c: NodeHandle) -> Result<()> {
        let handle = self.self_handle();
        self.core.add_streaming_consumer(&handle, c)
    }

    pub fn add_producer(self: &Arc<Self>, p: NodeHandle) -> Result<()> {
        let handle = self.self_handle();
        self.core.add_producer(&handle, p)
    }

    /// `producerFinished` (spec §8: "N.status=COMPLETED iff all k producers
    /// have called producerFinished(N)"). A container has no I/O of its own
    /// to close, so completion is just the status transition.
    pub fn producer_finished(&self, uid: &Uid) -> Result<()> {
        if self.core.producer_finished(uid)? {
            self.complete();
        }
        Ok(())
    }

    /// Forces status to COMPLETED, mirroring `DataNode::set_completed` for a
    /// node with no backing I/O.
    pub fn complete(&self) {
        if self.core.status() != DataStatus::Completed {
            self.core.set_status(DataStatus::Completed);
        }
    }

    pub fn handle_interest(&self, _other: &NodeHandle) {}
    pub fn drop_completed(&self, _producer_uid: &Uid) {}
    pub fn data_written(&self, _producer_uid: &Uid, _data: &[u8]) {}
}

/// Container specialization that only accepts file or directory-container
/// children whose path sits directly under this container's own path (spec
/// §4.4, scenario 6).
pub struct DirectoryContainer {
    container: Arc<ContainerNode>,
    path: PathBuf,
}

impl DirectoryContainer {
    pub fn new(oid: impl Into<Oid>, uid: impl Into<Uid>, path: impl Into<PathBuf>, options: NodeOptions) -> Arc<Self> {
        Arc::new(Self {
            container: ContainerNode::new(oid, uid, options),
            path: path.into(),
        })
    }

    pub fn container(&self) -> &Arc<ContainerNode> {
        &self.container
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn add_child(&self, child: NodeHandle) -> Result<()> {
        let child_path = child
            .file_path()
            .ok_or_else(|| FlowError::wiring("directory containers only accept file-backed children"))?;
        if child_path.parent() != Some(self.path.as_path()) {
            return Err(FlowError::wiring(format!(
                "{} is not directly under {}",
                child_path.display(),
                self.path.display()
            )));
        }
        self.container.add_child(child)
    }
}

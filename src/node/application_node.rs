//! Application node (spec §3, §4.5): a data node subclass that additionally
//! tracks inputs, streaming inputs, outputs, and a separate execution status.
//!
//! Barrier and container-process semantics are not separate structs in an
//! inheritance sense — Rust has none — they are [`AppBehavior`]
//! implementations plugged into the same `ApplicationNode`, matching Design
//! Notes §9's preference for explicit composition over a class hierarchy.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{FlowError, Result};
use crate::event::{EventBroadcaster, EventKind, EventPayload};
use crate::ids::{Oid, Uid};
use crate::node::core::{NodeCore, NodeOptions};
use crate::node::node_handle::NodeHandle;
use crate::status::{DataStatus, ExecStatus};

/// Pluggable scheduling/triggering strategy for an application node. The
/// default is inert; [`crate::node::barrier::BarrierBehavior`] is the one
/// named by the spec.
pub trait AppBehavior: Send + Sync {
    fn allows_streaming_inputs(&self) -> bool {
        true
    }

    fn drop_completed(&self, app: &Arc<ApplicationNode>, producer_uid: &Uid);

    fn data_written(&self, _app: &Arc<ApplicationNode>, _producer_uid: &Uid, _data: &[u8]) {}

    fn handle_interest(&self, _app: &Arc<ApplicationNode>, _other: &NodeHandle) {}
}

/// Behavior for an application that never auto-executes; `dropCompleted` is
/// observed but produces no effect. Useful for tests and for applications
/// driven entirely by an external scheduler.
pub struct NoopBehavior;

impl AppBehavior for NoopBehavior {
    fn drop_completed(&self, _app: &Arc<ApplicationNode>, _producer_uid: &Uid) {}
}

pub struct ApplicationNode {
    pub(crate) core: NodeCore,
    inputs: Mutex<Vec<(Uid, NodeHandle)>>,
    streaming_inputs: Mutex<Vec<(Uid, NodeHandle)>>,
    outputs: Mutex<Vec<(Uid, NodeHandle)>>,
    exec_status: Mutex<ExecStatus>,
    behavior: Arc<dyn AppBehavior>,
}

impl ApplicationNode {
    pub fn new(oid: impl Into<Oid>, uid: impl Into<Uid>, options: NodeOptions, behavior: Arc<dyn AppBehavior>) -> Arc<Self> {
        Arc::new(Self {
            core: NodeCore::new(oid.into(), uid.into(), options),
            inputs: Mutex::new(Vec::new()),
            streaming_inputs: Mutex::new(Vec::new()),
            outputs: Mutex::new(Vec::new()),
            exec_status: Mutex::new(ExecStatus::NotRun),
            behavior,
        })
    }

    fn self_handle(self: &Arc<Self>) -> NodeHandle {
        NodeHandle::Application(self.clone())
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

    pub fn exec_status(&self) -> ExecStatus {
        *self.exec_status.lock()
    }

    /// Fires an `execStatus` event (spec §4.5).
    pub fn set_exec_status(&self, new: ExecStatus) {
        *self.exec_status.lock() = new;
        self.core
            .events()
            .fire(self.core.oid(), self.core.uid(), EventKind::ExecStatus, EventPayload::ExecStatus(new));
    }

    pub fn inputs(&self) -> Vec<NodeHandle> {
        self.inputs.lock().iter().map(|(_, h)| h.clone()).collect()
    }

    pub fn streaming_inputs(&self) -> Vec<NodeHandle> {
        self.streaming_inputs.lock().iter().map(|(_, h)| h.clone()).collect()
    }

    pub fn outputs(&self) -> Vec<NodeHandle> {
        self.outputs.lock().iter().map(|(_, h)| h.clone()).collect()
    }

    pub fn input_count(&self) -> usize {
        self.inputs.lock().len()
    }

    /// `addInput` (spec §4.5).
    pub fn add_input(self: &Arc<Self>, d: NodeHandle) -> Result<()> {
        {
            let mut inputs = self.inputs.lock();
            if inputs.iter().any(|(uid, _)| *uid == d.uid()) {
                return Ok(());
            }
            inputs.push((d.uid(), d.clone()));
        }
        d.add_consumer(self.self_handle())
    }

    /// `addStreamingInput` (spec §4.5). Rejected by barrier-style behaviors.
    pub fn add_streaming_input(self: &Arc<Self>, d: NodeHandle) -> Result<()> {
        if !self.behavior.allows_streaming_inputs() {
            return Err(FlowError::wiring("this application forbids streaming inputs"));
        }
        {
            let mut streaming = self.streaming_inputs.lock();
            if streaming.iter().any(|(uid, _)| *uid == d.uid()) {
                return Ok(());
            }
            streaming.push((d.uid(), d.clone()));
        }
        d.add_streaming_consumer(self.self_handle())
    }

    /// `addOutput` (spec §4.5): rejects self-output, wires the symmetric
    /// producer relationship, and arranges for `d.producerFinished` to be
    /// called once this application's `execStatus` leaves RUNNING.
    pub fn add_output(self: &Arc<Self>, d: NodeHandle) -> Result<()> {
        if d.uid() == *self.core.uid() {
            return Err(FlowError::wiring("an application cannot output to itself"));
        }
        {
            let mut outputs = self.outputs.lock();
            if outputs.iter().any(|(uid, _)| *uid == d.uid()) {
                return Ok(());
            }
            outputs.push((d.uid(), d.clone()));
        }

        let target = d.clone();
        let app_uid = self.core.uid().clone();
        self.core
            .events()
            .subscribe(Some(EventKind::ExecStatus), move |event| {
                if let EventPayload::ExecStatus(status) = &event.payload {
                    if matches!(status, ExecStatus::Finished | ExecStatus::Error) {
                        if let Err(err) = target.producer_finished(&app_uid) {
                            tracing::warn!(%err, "producerFinished rejected for output");
                        }
                    }
                }
            });

        d.add_producer(self.self_handle())
    }

    pub fn drop_completed(self: &Arc<Self>, producer_uid: &Uid) {
        self.behavior.drop_completed(self, producer_uid);
    }

    pub fn data_written(self: &Arc<Self>, producer_uid: &Uid, data: &[u8]) {
        self.behavior.data_written(self, producer_uid, data);
    }

    pub fn handle_interest(self: &Arc<Self>, other: &NodeHandle) {
        self.behavior.handle_interest(self, other);
    }

    /// Forces status to COMPLETED regardless of the prior state. Used by
    /// barrier-style behaviors (spec §4.6): the application must reach
    /// COMPLETED even when `run()` failed, so downstream wiring is not
    /// starved (spec §5, §8 scenario 5).
    pub fn complete(&self) {
        if self.core.status() != DataStatus::Completed {
            self.core.set_status(DataStatus::Completed);
        }
    }

    pub fn exists(&self) -> Result<bool> {
        Ok(true)
    }

    pub fn expiration_date(&self) -> i64 {
        self.core.options().expiration_date
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
    /// have called producerFinished(N)"). Distinct from the barrier's own
    /// `complete()` call after `run()`: this is for an application node
    /// wired as someone else's *output*, not for its own execution result.
    pub fn producer_finished(&self, uid: &Uid) -> Result<()> {
        if self.core.producer_finished(uid)? {
            self.complete();
        }
        Ok(())
    }

    /// Publishes a runtime attribute (e.g. `containerIp`), firing the event
    /// that wakes up any interested peers (spec §4.7 Interest).
    pub fn fire_attribute(&self, name: &'static str, value: crate::event::AttributeValue) {
        self.core.fire_attribute(name, value);
    }
}

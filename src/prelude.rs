//! Curated re-exports for downstream crates wiring up a graph.

pub use crate::checksum::{ChecksumType, RunningChecksum};
pub use crate::descriptor::{FieldValue, GraphDescriptor, LinkKind};
pub use crate::error::{ErrorKind, FlowError, Result};
pub use crate::event::{AttributeValue, Event, EventBroadcaster, EventKind, EventPayload, SubscriptionId};
pub use crate::ids::{Oid, Uid};
pub use crate::io::{IoHandle, IoReader, OpenMode};
pub use crate::node::{
    AppBehavior, AppRunner, ApplicationNode, BarrierBehavior, ContainerNode, ContainerProcessOptions,
    ContainerProcessRunner, ContainerRuntime, DataNode, DirectoryContainer, FnRunner, IpWaiter, NodeHandle,
    NodeOptions, NoopBehavior,
};
pub use crate::runtime::{InlineExecutor, TaskExecutor, ThreadExecutor};
pub use crate::status::{DataStatus, ExecStatus, ExecutionMode, LOOPBACK_NODE};

//! The node graph: data nodes, container nodes, application nodes, and the
//! barrier / container-process behaviors that drive execution (spec §3-§4).

pub mod application_node;
pub mod barrier;
pub mod container_node;
pub mod container_process;
pub(crate) mod core;
pub mod data_node;
pub mod node_handle;

pub use application_node::{AppBehavior, ApplicationNode, NoopBehavior};
pub use barrier::{AppRunner, BarrierBehavior, FnRunner};
pub use container_node::{ContainerNode, DirectoryContainer};
pub use container_process::{ContainerProcessOptions, ContainerProcessRunner, ContainerRuntime, IpWaiter};
pub use core::NodeOptions;
pub use data_node::DataNode;
pub use node_handle::NodeHandle;

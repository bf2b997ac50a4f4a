//! Status enums shared across the node graph (spec §3).

use std::fmt;

/// Data-node lifecycle status. Monotonic along
/// `Initialized -> Writing -> Completed`; the remaining three are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataStatus {
    Initialized,
    Writing,
    Completed,
    Expired,
    Deleted,
    Error,
}

impl DataStatus {
    /// Rank in the monotonic `Initialized < Writing < Completed` order used
    /// by the non-decreasing-status invariant (spec §8). Terminal states are
    /// absorbing and are not comparable against the others via this rank.
    pub fn rank(self) -> Option<u8> {
        match self {
            DataStatus::Initialized => Some(0),
            DataStatus::Writing => Some(1),
            DataStatus::Completed => Some(2),
            DataStatus::Expired | DataStatus::Deleted | DataStatus::Error => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DataStatus::Expired | DataStatus::Deleted | DataStatus::Error
        )
    }
}

impl fmt::Display for DataStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataStatus::Initialized => "INITIALIZED",
            DataStatus::Writing => "WRITING",
            DataStatus::Completed => "COMPLETED",
            DataStatus::Expired => "EXPIRED",
            DataStatus::Deleted => "DELETED",
            DataStatus::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Execution status of an application node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExecStatus {
    NotRun,
    Running,
    Finished,
    Error,
    Cancelled,
}

impl fmt::Display for ExecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecStatus::NotRun => "NOT_RUN",
            ExecStatus::Running => "RUNNING",
            ExecStatus::Finished => "FINISHED",
            ExecStatus::Error => "ERROR",
            ExecStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// Whether a data node triggers its own consumers on completion (`Auto`) or
/// defers to an external driver (`External`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ExecutionMode {
    #[default]
    Auto,
    External,
}

/// Loopback address used as the default `node` placement tag (spec §3).
pub const LOOPBACK_NODE: &str = "127.0.0.1";

//! Barrier application (spec §4.6): runs `run()` exactly once, after every
//! non-streaming input has completed, off the event-dispatch thread.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::ids::Uid;
use crate::node::application_node::{AppBehavior, ApplicationNode};
use crate::node::node_handle::NodeHandle;
use crate::runtime::TaskExecutor;
use crate::status::ExecStatus;

/// What a barrier application actually does when all inputs are ready. A
/// plain closure-backed runner is enough for tests; [`crate::node::container_process::ContainerProcessRunner`]
/// is the spec's container-launching one.
pub trait AppRunner: Send + Sync {
    fn run(&self, app: &Arc<ApplicationNode>) -> Result<()>;

    fn handle_interest(&self, _app: &Arc<ApplicationNode>, _other: &NodeHandle) {}
}

/// Runs a boxed closure; used where the work to perform doesn't warrant its
/// own type.
pub struct FnRunner<F>(pub F)
where
    F: Fn(&Arc<ApplicationNode>) -> Result<()> + Send + Sync + 'static;

impl<F> AppRunner for FnRunner<F>
where
    F: Fn(&Arc<ApplicationNode>) -> Result<()> + Send + Sync + 'static,
{
    fn run(&self, app: &Arc<ApplicationNode>) -> Result<()> {
        (self.0)(app)
    }
}

pub struct BarrierBehavior {
    runner: Arc<dyn AppRunner>,
    executor: Arc<dyn TaskExecutor>,
    completed_inputs: Mutex<HashSet<Uid>>,
}

impl BarrierBehavior {
    pub fn new(runner: Arc<dyn AppRunner>, executor: Arc<dyn TaskExecutor>) -> Arc<Self> {
        Arc::new(Self {
            runner,
            executor,
            completed_inputs: Mutex::new(HashSet::new()),
        })
    }

    /// `execute` (spec §4.6): RUNNING -> run() -> FINISHED/ERROR, then
    /// unconditionally COMPLETED so output wiring advances even on failure
    /// (spec §5, §8 scenario 5).
    fn execute(runner: Arc<dyn AppRunner>, app: Arc<ApplicationNode>) {
        app.set_exec_status(ExecStatus::Running);
        let result = runner.run(&app);
        match &result {
            Ok(()) => app.set_exec_status(ExecStatus::Finished),
            Err(err) => {
                tracing::error!(oid = %app.oid(), uid = %app.uid(), %err, "barrier run() failed");
                app.set_exec_status(ExecStatus::Error);
            }
        }
        if let Err(err) = complete_despite_failure(&app) {
            tracing::warn!(oid = %app.oid(), uid = %app.uid(), %err, "failed to advance status to COMPLETED");
        }
    }
}

fn complete_despite_failure(app: &Arc<ApplicationNode>) -> Result<()> {
    app.complete();
    Ok(())
}

impl AppBehavior for BarrierBehavior {
    fn allows_streaming_inputs(&self) -> bool {
        false
    }

    fn drop_completed(&self, app: &Arc<ApplicationNode>, producer_uid: &Uid) {
        let ready = {
            let mut completed = self.completed_inputs.lock();
            completed.insert(producer_uid.clone());
            completed.len() >= app.input_count()
        };
        if ready {
            let runner = self.runner.clone();
            let app = app.clone();
            self.executor.spawn(Box::new(move || BarrierBehavior::execute(runner, app)));
        }
    }

    fn handle_interest(&self, app: &Arc<ApplicationNode>, other: &NodeHandle) {
        self.runner.handle_interest(app, other);
    }
}

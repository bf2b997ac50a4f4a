//! End-to-end graph scenarios wiring multiple node kinds together, as
//! opposed to the single-module unit tests under `src/`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use flowdrop_core::prelude::*;

fn memory_data(oid: &str, uid: &str) -> Arc<DataNode> {
    DataNode::new(oid, uid, IoHandle::Memory(MemoryBackend::new(uid)), NodeOptions::default())
}

fn barrier_app(oid: &str, uid: &str, run_count: Arc<AtomicUsize>) -> Arc<ApplicationNode> {
    let runner = Arc::new(FnRunner(move |_: &Arc<ApplicationNode>| {
        run_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }));
    let behavior = BarrierBehavior::new(runner, Arc::new(InlineExecutor));
    ApplicationNode::new(oid, uid, NodeOptions::default(), behavior)
}

/// Two file/memory nodes feeding a barrier application: `execute` fires
/// exactly once, after both inputs complete, and the downstream output
/// reaches COMPLETED carrying the combined size and checksum.
#[test]
fn barrier_runs_once_and_completes_downstream() {
    let run_count = Arc::new(AtomicUsize::new(0));
    let a = memory_data("oid-a", "uid-a1");
    let b = memory_data("oid-b", "uid-b1");
    let out = memory_data("oid-out", "uid-out1");
    let x = barrier_app("oid-x", "uid-x1", run_count.clone());

    a.add_consumer(NodeHandle::Application(x.clone())).unwrap();
    b.add_consumer(NodeHandle::Application(x.clone())).unwrap();
    x.add_output(NodeHandle::Data(out.clone())).unwrap();

    a.write(b"hello").unwrap();
    a.set_completed().unwrap();
    assert_eq!(run_count.load(Ordering::SeqCst), 0, "must not run until every input completes");

    b.write(b"world").unwrap();
    b.set_completed().unwrap();

    assert_eq!(run_count.load(Ordering::SeqCst), 1);
    assert_eq!(x.exec_status(), ExecStatus::Finished);
    assert_eq!(out.status(), DataStatus::Completed);
    assert_eq!(a.size(), 5);
    assert_eq!(b.size(), 5);

    let mut expected = RunningChecksum::new();
    expected.update(b"hello");
    assert_eq!(a.checksum(), expected.value());
}

/// A node with an `expectedSize` auto-completes once enough bytes have been
/// written, with no explicit `setCompleted` call.
#[test]
fn expected_size_drives_auto_completion() {
    let node = DataNode::with_expected_size(
        "oid-sized",
        "uid-sized1",
        IoHandle::Memory(MemoryBackend::new("uid-sized1")),
        NodeOptions::default(),
        4,
    );
    node.write(b"ab").unwrap();
    assert_eq!(node.status(), DataStatus::Writing);
    node.write(b"cd").unwrap();
    assert_eq!(node.status(), DataStatus::Completed);
    assert_eq!(node.size(), 4);
}

/// `executionMode: External` suppresses the automatic `dropCompleted` fan-out
/// to consumers; only the producer's own status transitions.
#[test]
fn external_execution_mode_does_not_drive_consumers() {
    let run_count = Arc::new(AtomicUsize::new(0));
    let producer = DataNode::new(
        "oid-ext",
        "uid-ext1",
        IoHandle::Memory(MemoryBackend::new("uid-ext1")),
        NodeOptions {
            execution_mode: ExecutionMode::External,
            ..Default::default()
        },
    );
    let consumer = barrier_app("oid-consumer", "uid-consumer1", run_count.clone());
    producer.add_consumer(NodeHandle::Application(consumer.clone())).unwrap();

    producer.write(b"payload").unwrap();
    producer.set_completed().unwrap();

    assert_eq!(producer.status(), DataStatus::Completed);
    assert_eq!(run_count.load(Ordering::SeqCst), 0, "EXTERNAL must not auto-trigger the consumer");
    assert_eq!(consumer.exec_status(), ExecStatus::NotRun);
}

/// A barrier application whose `run` fails still reaches a terminal
/// `execStatus` of ERROR, its own status still advances to COMPLETED, and
/// its outputs are still notified via `producerFinished`.
#[test]
fn failing_run_still_completes_and_notifies_outputs() {
    let runner = Arc::new(FnRunner(|_: &Arc<ApplicationNode>| {
        Err(FlowError::invalid_state("external command exited non-zero"))
    }));
    let behavior = BarrierBehavior::new(runner, Arc::new(InlineExecutor));
    let app = ApplicationNode::new("oid-fails", "uid-fails1", NodeOptions::default(), behavior);

    let input = memory_data("oid-in", "uid-in1");
    let output = memory_data("oid-downstream", "uid-downstream1");
    input.add_consumer(NodeHandle::Application(app.clone())).unwrap();
    app.add_output(NodeHandle::Data(output.clone())).unwrap();

    input.write(b"x").unwrap();
    input.set_completed().unwrap();

    assert_eq!(app.exec_status(), ExecStatus::Error);
    assert_eq!(app.status(), DataStatus::Completed);
    assert_eq!(output.status(), DataStatus::Completed, "producerFinished must still fire on error");
}

/// A directory container accepts a file-backed child placed directly under
/// its own path, and rejects one placed elsewhere.
#[test]
fn directory_container_enforces_direct_placement() {
    let dir = std::env::temp_dir().join(format!("flowdrop-scenario-{}", uuid::Uuid::new_v4()));
    let other = std::env::temp_dir().join(format!("flowdrop-scenario-other-{}", uuid::Uuid::new_v4()));
    let container = DirectoryContainer::new("oid-dir", "uid-dir1", &dir, NodeOptions::default());

    let child = DataNode::new("oid-f", "uid-f1", IoHandle::File(FileBackend::new(&dir, "oid-f", "uid-f1")), NodeOptions::default());
    container.add_child(NodeHandle::Data(child)).unwrap();

    let stray = DataNode::new("oid-g", "uid-g1", IoHandle::File(FileBackend::new(&other, "oid-g", "uid-g1")), NodeOptions::default());
    let err = container.add_child(NodeHandle::Data(stray)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WiringError);
}

/// Two container-process applications P and Q, where Q's command references
/// P's `containerIp`: once P publishes the attribute, Q's `run` substitutes
/// it into the command handed to the runtime exactly once.
#[test]
fn container_ip_interest_resolves_into_command() {
    use std::sync::Mutex as StdMutex;

    struct FakeRuntime {
        assigned_ip: String,
        last_command: Arc<StdMutex<Option<String>>>,
    }

    impl ContainerRuntime for FakeRuntime {
        fn images(&self) -> Result<Vec<String>> {
            Ok(vec![])
        }
        fn pull(&self, _image: &str) -> Result<()> {
            Ok(())
        }
        fn create_container(
            &self,
            _image: &str,
            command: &str,
            _binds: &[String],
            _user: Option<&str>,
            _environment: &[(String, String)],
        ) -> Result<String> {
            *self.last_command.lock().unwrap() = Some(command.to_string());
            Ok("container-1".to_string())
        }
        fn start(&self, _container_id: &str) -> Result<()> {
            Ok(())
        }
        fn inspect_ip(&self, _container_id: &str) -> Result<String> {
            Ok(self.assigned_ip.clone())
        }
        fn wait(&self, _container_id: &str) -> Result<i32> {
            Ok(0)
        }
        fn logs(&self, _container_id: &str) -> Result<(Vec<u8>, Vec<u8>)> {
            Ok((Vec::new(), Vec::new()))
        }
        fn remove_container(&self, _container_id: &str) -> Result<()> {
            Ok(())
        }
    }

    let runner_p = ContainerProcessRunner::new(
        Arc::new(FakeRuntime {
            assigned_ip: "10.0.0.9".to_string(),
            last_command: Arc::new(StdMutex::new(None)),
        }),
        ContainerProcessOptions::new("demo:1.0", "serve"),
    )
    .unwrap();
    let p = ApplicationNode::new(
        "p-oid",
        "p-uid1",
        NodeOptions::default(),
        BarrierBehavior::new(runner_p, Arc::new(InlineExecutor)),
    );

    let q_last_command = Arc::new(StdMutex::new(None));
    let runner_q = ContainerProcessRunner::new(
        Arc::new(FakeRuntime {
            assigned_ip: "10.0.0.10".to_string(),
            last_command: q_last_command.clone(),
        }),
        ContainerProcessOptions {
            ensure_user_and_switch: false,
            ..ContainerProcessOptions::new("demo:1.0", "connect %containerIp[p-oid]%")
        },
    )
    .unwrap();
    let q = ApplicationNode::new(
        "q-oid",
        "q-uid1",
        NodeOptions::default(),
        BarrierBehavior::new(runner_q.clone(), Arc::new(InlineExecutor)),
    );
    runner_q.handle_interest(&q, &NodeHandle::Application(p.clone()));

    let p_trigger = memory_data("oid-p-trigger", "uid-p-trigger1");
    p_trigger.add_consumer(NodeHandle::Application(p.clone())).unwrap();
    p_trigger.write(b"go").unwrap();
    p_trigger.set_completed().unwrap();
    assert_eq!(p.exec_status(), ExecStatus::Finished, "P must publish containerIp before Q can run");

    let q_trigger = memory_data("oid-q-trigger", "uid-q-trigger1");
    q_trigger.add_consumer(NodeHandle::Application(q.clone())).unwrap();
    q_trigger.write(b"go").unwrap();
    q_trigger.set_completed().unwrap();

    assert_eq!(q.exec_status(), ExecStatus::Finished);
    assert_eq!(q_last_command.lock().unwrap().as_deref(), Some("connect 10.0.0.9"));
}

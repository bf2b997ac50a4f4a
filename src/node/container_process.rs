//! Container-process application (spec §4.7): a barrier application whose
//! `run()` launches an external sandboxed process and waits for it to exit.
//!
//! Grounded on `dfms/apps/dockerapp.py`: `ContainerIpWaiter` becomes
//! [`IpWaiter`], the placeholder substitution and user-containment shell
//! prologue are carried over, and the container runtime itself stays a pure
//! interface (spec §1, §6 scope it out as an external collaborator).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::error::{FlowError, Result};
use crate::event::{AttributeValue, EventKind, EventPayload};
use crate::ids::Oid;
use crate::node::application_node::ApplicationNode;
use crate::node::barrier::AppRunner;
use crate::node::node_handle::NodeHandle;
use crate::util::{self, PlaceholderContext};

/// Fixed sandbox-internal path prefix (spec §6).
pub const SANDBOX_ROOT: &str = "/sandbox_root";

/// The external collaborator this module assumes (spec §6). No concrete
/// Docker-wire implementation ships here — callers plug in a real client.
pub trait ContainerRuntime: Send + Sync {
    fn images(&self) -> Result<Vec<String>>;
    fn pull(&self, image: &str) -> Result<()>;
    fn create_container(
        &self,
        image: &str,
        command: &str,
        binds: &[String],
        user: Option<&str>,
        environment: &[(String, String)],
    ) -> Result<String>;
    fn start(&self, container_id: &str) -> Result<()>;
    fn inspect_ip(&self, container_id: &str) -> Result<String>;
    fn wait(&self, container_id: &str) -> Result<i32>;
    fn logs(&self, container_id: &str) -> Result<(Vec<u8>, Vec<u8>)>;
    fn remove_container(&self, container_id: &str) -> Result<()>;
}

/// Blocks until a peer container application publishes its `containerIp`
/// attribute, or a timeout elapses. Mirrors `ContainerIpWaiter` in the
/// original: a condvar guarding a remembered, once-set address.
pub struct IpWaiter {
    address: Mutex<Option<String>>,
    condvar: Condvar,
}

impl IpWaiter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            address: Mutex::new(None),
            condvar: Condvar::new(),
        })
    }

    pub fn notify(&self, address: String) {
        let mut guard = self.address.lock();
        *guard = Some(address);
        self.condvar.notify_all();
    }

    pub fn wait(&self, timeout: Option<Duration>) -> Result<String> {
        let mut guard = self.address.lock();
        if let Some(address) = guard.as_ref() {
            return Ok(address.clone());
        }
        match timeout {
            Some(duration) => {
                let result = self.condvar.wait_for(&mut guard, duration);
                if result.timed_out() && guard.is_none() {
                    return Err(FlowError::timeout("timed out waiting for peer containerIp"));
                }
            }
            None => self.condvar.wait(&mut guard),
        }
        guard
            .as_ref()
            .cloned()
            .ok_or_else(|| FlowError::timeout("timed out waiting for peer containerIp"))
    }
}

#[derive(Clone, Debug)]
pub struct ContainerProcessOptions {
    pub image: String,
    pub command: String,
    pub user: Option<String>,
    pub ensure_user_and_switch: bool,
    pub remove_container: bool,
    /// `HOST[:CONTAINER]` pairs, beyond the input/output bindings computed
    /// automatically.
    pub additional_bindings: Vec<String>,
    pub ip_wait_timeout: Option<Duration>,
}

impl ContainerProcessOptions {
    pub fn new(image: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            command: command.into(),
            user: None,
            ensure_user_and_switch: true,
            remove_container: true,
            additional_bindings: Vec::new(),
            ip_wait_timeout: None,
        }
    }
}

/// `run()` + interest-registration logic for a container-process
/// application (spec §4.7), plugged into a [`crate::node::barrier::BarrierBehavior`].
pub struct ContainerProcessRunner {
    runtime: Arc<dyn ContainerRuntime>,
    options: ContainerProcessOptions,
    required_ips: Vec<Oid>,
    waiters: Mutex<HashMap<Oid, Arc<IpWaiter>>>,
}

impl ContainerProcessRunner {
    /// Validates configuration, warns on an untagged image, checks
    /// additional host bindings exist, and pulls the image if the local
    /// cache doesn't already have it (spec §4.7 Configuration).
    pub fn new(runtime: Arc<dyn ContainerRuntime>, options: ContainerProcessOptions) -> Result<Arc<Self>> {
        if options.image.is_empty() {
            return Err(FlowError::invalid_config("image is required"));
        }
        if options.command.is_empty() {
            return Err(FlowError::invalid_config("command is required"));
        }
        if !options.image.contains(':') {
            tracing::warn!(image = %options.image, "container image has no version tag");
        }
        for binding in &options.additional_bindings {
            let host_part = binding.split(':').next().unwrap_or(binding);
            if !Path::new(host_part).exists() {
                return Err(FlowError::invalid_config(format!(
                    "additional binding host path does not exist: {host_part}"
                )));
            }
        }

        let cached = runtime.images()?;
        if !cached.iter().any(|img| img == &options.image) {
            runtime.pull(&options.image)?;
        }

        let required_ips = util::extract_container_ip_oids(&options.command);
        Ok(Arc::new(Self {
            runtime,
            options,
            required_ips,
            waiters: Mutex::new(HashMap::new()),
        }))
    }

    fn binding_for(path: &Path) -> String {
        format!("{}:{}{}", path.display(), SANDBOX_ROOT, path.display())
    }

    fn sandbox_path(path: &Path) -> String {
        format!("{SANDBOX_ROOT}{}", path.display())
    }

    /// Builds the shell prologue that creates a matching host-UID user,
    /// chowns the distinct output parent directories, and re-execs the
    /// original command as that user (spec §4.7 User containment).
    fn wrap_with_user_containment(&self, command: &str, output_dirs: &[PathBuf]) -> String {
        // SAFETY: `getuid` takes no arguments and cannot fail.
        let uid = unsafe { libc::getuid() };
        let mut chown_dirs: Vec<String> = output_dirs
            .iter()
            .map(|p| Self::sandbox_path(p))
            .collect();
        chown_dirs.sort();
        chown_dirs.dedup();

        let mut prologue = format!(
            "id -u sandboxuser >/dev/null 2>&1 || useradd -u {uid} -M sandboxuser; "
        );
        for dir in &chown_dirs {
            prologue.push_str(&format!("chown -R {uid} {}; ", util::shell_quote(dir)));
        }
        prologue.push_str(&format!(
            "exec su -l sandboxuser -c {}",
            util::shell_quote(command)
        ));
        format!("sh -c {}", util::shell_quote(&prologue))
    }
}

impl AppRunner for ContainerProcessRunner {
    fn handle_interest(&self, _app: &Arc<ApplicationNode>, other: &NodeHandle) {
        let oid = other.oid();
        if !self.required_ips.contains(&oid) {
            return;
        }
        let waiter = IpWaiter::new();
        self.waiters.lock().insert(oid, waiter.clone());
        other
            .events()
            .subscribe(Some(EventKind::Attribute("containerIp")), move |event| {
                if let EventPayload::Attribute(AttributeValue::Text(address)) = &event.payload {
                    waiter.notify(address.clone());
                }
            });
    }

    fn run(&self, app: &Arc<ApplicationNode>) -> Result<()> {
        let mut fs_inputs = Vec::new();
        let mut fs_input_uids = Vec::new();
        let mut url_inputs = Vec::new();
        let mut url_input_uids = Vec::new();
        let mut binds = Vec::new();

        for input in app.inputs() {
            if let Some(path) = input.file_path() {
                binds.push(Self::binding_for(&path));
                fs_inputs.push(Self::sandbox_path(&path));
                fs_input_uids.push(input.uid().to_string());
            } else {
                url_inputs.push(input.data_url());
                url_input_uids.push(input.uid().to_string());
            }
        }

        let mut fs_outputs = Vec::new();
        let mut fs_output_uids = Vec::new();
        let mut url_outputs = Vec::new();
        let mut url_output_uids = Vec::new();
        let mut output_dirs = Vec::new();

        for output in app.outputs() {
            if let Some(path) = output.file_path() {
                let dir = path.parent().unwrap_or_else(|| Path::new("/")).to_path_buf();
                binds.push(Self::binding_for(&dir));
                fs_outputs.push(Self::sandbox_path(&path));
                fs_output_uids.push(output.uid().to_string());
                output_dirs.push(dir);
            } else {
                url_outputs.push(output.data_url());
                url_output_uids.push(output.uid().to_string());
            }
        }
        binds.extend(self.options.additional_bindings.iter().cloned());

        let mut container_ips = HashMap::new();
        for oid in &self.required_ips {
            let waiter = self
                .waiters
                .lock()
                .get(oid)
                .cloned()
                .ok_or_else(|| FlowError::invalid_state(format!("no interest registered for {oid}")))?;
            let address = waiter.wait(self.options.ip_wait_timeout)?;
            container_ips.insert(oid.clone(), address);
        }

        let context = PlaceholderContext {
            fs_inputs: &fs_inputs,
            fs_outputs: &fs_outputs,
            fs_input_uids: &fs_input_uids,
            fs_output_uids: &fs_output_uids,
            url_inputs: &url_inputs,
            url_outputs: &url_outputs,
            url_input_uids: &url_input_uids,
            url_output_uids: &url_output_uids,
            container_ips: &container_ips,
        };
        let substituted = util::substitute_placeholders(&self.options.command, &context)?;

        let (final_command, user) = if let Some(user) = &self.options.user {
            (substituted, Some(user.clone()))
        } else if self.options.ensure_user_and_switch {
            (self.wrap_with_user_containment(&substituted, &output_dirs), None)
        } else {
            (substituted, None)
        };

        let environment: Vec<(String, String)> = user
            .as_ref()
            .map(|u| vec![("USER".to_string(), u.clone())])
            .unwrap_or_default();

        let container_id = self.runtime.create_container(
            &self.options.image,
            &final_command,
            &binds,
            user.as_deref(),
            &environment,
        )?;
        self.runtime.start(&container_id)?;

        let ip = self.runtime.inspect_ip(&container_id)?;
        app.fire_attribute("containerIp", AttributeValue::Text(ip));

        let exit_code = self.runtime.wait(&container_id)?;
        if exit_code != 0 {
            let (stdout, stderr) = self.runtime.logs(&container_id)?;
            if self.options.remove_container {
                self.runtime.remove_container(&container_id)?;
            }
            let logs = format!(
                "stdout:\n{}\nstderr:\n{}",
                String::from_utf8_lossy(&stdout),
                String::from_utf8_lossy(&stderr)
            );
            return Err(FlowError::container_failed(exit_code, logs));
        }
        if self.options.remove_container {
            self.runtime.remove_container(&container_id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{FileBackend, IoHandle};
    use crate::node::barrier::BarrierBehavior;
    use crate::node::core::NodeOptions;
    use crate::node::data_node::DataNode;
    use crate::runtime::InlineExecutor;
    use std::sync::Mutex as StdMutex;

    struct FakeRuntime {
        assigned_ip: String,
        exit_code: i32,
        containers: StdMutex<Vec<String>>,
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
            _command: &str,
            _binds: &[String],
            _user: Option<&str>,
            _environment: &[(String, String)],
        ) -> Result<String> {
            let id = format!("container-{}", self.containers.lock().unwrap().len());
            self.containers.lock().unwrap().push(id.clone());
            Ok(id)
        }
        fn start(&self, _container_id: &str) -> Result<()> {
            Ok(())
        }
        fn inspect_ip(&self, _container_id: &str) -> Result<String> {
            Ok(self.assigned_ip.clone())
        }
        fn wait(&self, _container_id: &str) -> Result<i32> {
            Ok(self.exit_code)
        }
        fn logs(&self, _container_id: &str) -> Result<(Vec<u8>, Vec<u8>)> {
            Ok((b"out".to_vec(), b"err".to_vec()))
        }
        fn remove_container(&self, _container_id: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn publishes_ip_and_unblocks_waiting_peer() {
        let runtime_p = Arc::new(FakeRuntime {
            assigned_ip: "10.0.0.7".to_string(),
            exit_code: 0,
            containers: StdMutex::new(Vec::new()),
        });
        let runner_p = ContainerProcessRunner::new(
            runtime_p,
            ContainerProcessOptions::new("image:1.0", "serve"),
        )
        .unwrap();
        let behavior_p = BarrierBehavior::new(runner_p, Arc::new(InlineExecutor));
        let p = ApplicationNode::new("p-oid", "p-uid1", NodeOptions::default(), behavior_p);

        let runtime_q = Arc::new(FakeRuntime {
            assigned_ip: "10.0.0.8".to_string(),
            exit_code: 0,
            containers: StdMutex::new(Vec::new()),
        });
        let runner_q = ContainerProcessRunner::new(
            runtime_q,
            ContainerProcessOptions::new("image:1.0", "connect %containerIp[p-oid]%"),
        )
        .unwrap();
        let behavior_q = BarrierBehavior::new(runner_q.clone(), Arc::new(InlineExecutor));
        let q = ApplicationNode::new("q-oid", "q-uid1", NodeOptions::default(), behavior_q);
        runner_q.handle_interest(&q, &NodeHandle::Application(p.clone()));

        let tmp = std::env::temp_dir().join(format!("flowdrop-cp-{}", uuid::Uuid::new_v4()));
        let trigger = DataNode::new(
            "oid-trigger",
            "uid-trigger1",
            IoHandle::File(FileBackend::new(&tmp, "oid-trigger", "uid-trigger1")),
            NodeOptions::default(),
        );
        trigger.add_consumer(NodeHandle::Application(p.clone())).unwrap();
        trigger.set_completed().unwrap();

        assert_eq!(p.exec_status(), crate::status::ExecStatus::Finished);

        let waiter = runner_q.waiters.lock().get(&Oid::new("p-oid")).unwrap().clone();
        assert_eq!(waiter.wait(Some(Duration::from_millis(100))).unwrap(), "10.0.0.7");

        let _ = std::fs::remove_dir_all(&tmp);
    }
}

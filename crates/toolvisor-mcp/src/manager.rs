//! Tool-server process lifecycle management.
//!
//! The manager owns every process this instance launched. It is the only
//! source of truth for "is this server running right now"; the store only
//! mirrors transitions. Operations on one id are serialized by a per-id
//! lock, operations on different ids run concurrently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use toolvisor_core::{
    AppEvent, AppEventEmitter, McpErrorInfo, RuntimeRecord, ServerDefinition, ServerPatch,
    ServerRepository, ServerStatus, ServiceError, SupervisorSettings,
};
use toolvisor_runtime::{
    LaunchSpec, ProcessHealth, ProcessHealthMonitor, SupervisedProcess, describe_exit, spawn,
};

use crate::path::{resolve_working_dir, validate_command_path, validate_working_dir};
use crate::provision::materialize_files;

/// How long a fast-exiting process gets to flush its standard error.
const STDERR_COLLECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Runtime state of a supervised server as seen by this instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeState {
    pub status: ServerStatus,
    pub process_id: Option<u32>,
}

/// Process-local record of one supervised server.
struct RuntimeEntry {
    server_id: String,
    server_name: String,
    process: Arc<SupervisedProcess>,
    state: StdMutex<RuntimeState>,
    /// Fired by stop before the process is touched.
    cancel: CancellationToken,
    monitor_task: StdMutex<Option<JoinHandle<()>>>,
}

impl RuntimeEntry {
    fn state(&self) -> RuntimeState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, status: ServerStatus, process_id: Option<u32>) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) =
            RuntimeState { status, process_id };
    }

    fn take_monitor_task(&self) -> Option<JoinHandle<()>> {
        self.monitor_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// An entry removed from the runtime table whose process has been reaped.
struct Terminated {
    entry: Arc<RuntimeEntry>,
    monitor: Option<JoinHandle<()>>,
}

type LockMap = StdMutex<HashMap<String, Arc<Mutex<()>>>>;

/// Holds the operation lock for one id.
///
/// On release the map entry is removed when no other caller holds or
/// waits on the same lock, so the map only contains ids in use.
struct OpGuard<'a> {
    locks: &'a LockMap,
    id: String,
    lock: Arc<Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for OpGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Clones are only handed out under the map lock: the map's own
        // reference plus ours means nobody else is queued.
        if Arc::strong_count(&self.lock) == 2
            && locks
                .get(&self.id)
                .is_some_and(|current| Arc::ptr_eq(current, &self.lock))
        {
            locks.remove(&self.id);
        }
    }
}

struct ManagerInner {
    repository: Arc<dyn ServerRepository>,
    emitter: Arc<dyn AppEventEmitter>,
    settings: SupervisorSettings,
    /// Running servers indexed by server id
    runtime: RwLock<HashMap<String, Arc<RuntimeEntry>>>,
    op_locks: LockMap,
}

/// Manager for tool-server process lifecycle.
///
/// Handles starting, stopping and monitoring server processes and writes
/// every status transition through to the configuration store.
/// Dropping the manager cancels all monitors, which drops the children.
pub struct McpManager {
    inner: Arc<ManagerInner>,
}

impl McpManager {
    /// Create a new manager.
    pub fn new(
        repository: Arc<dyn ServerRepository>,
        emitter: Arc<dyn AppEventEmitter>,
        settings: SupervisorSettings,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                repository,
                emitter,
                settings,
                runtime: RwLock::new(HashMap::new()),
                op_locks: StdMutex::new(HashMap::new()),
            }),
        }
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.inner.settings
    }

    /// Launch a server and return its pid once it survived the start grace delay.
    pub async fn start(&self, id: &str) -> Result<u32, ServiceError> {
        let _guard = self.inner.lock_id(id).await;
        self.inner.start_locked(id).await
    }

    /// Stop a server supervised by this instance.
    ///
    /// Returns `AlreadyStopped` when this instance has no process for the id,
    /// even if the store still shows it running.
    pub async fn stop(&self, id: &str) -> Result<(), ServiceError> {
        let guard = self.inner.lock_id(id).await;
        let monitor = self.inner.stop_locked(id).await?;
        drop(guard);
        await_monitor(monitor).await;
        Ok(())
    }

    /// Stop (if running), wait the restart delay, then start again.
    ///
    /// The id's lock is held across the whole sequence. A stop failure other
    /// than `AlreadyStopped` is returned without attempting the start.
    pub async fn restart(&self, id: &str) -> Result<u32, ServiceError> {
        let guard = self.inner.lock_id(id).await;

        let previous = match self.inner.stop_locked(id).await {
            Ok(monitor) => monitor,
            Err(ServiceError::AlreadyStopped(_)) => None,
            Err(e) => {
                warn!(server_id = %id, error = %e, "Restart aborted: stop failed");
                return Err(e);
            }
        };

        tokio::time::sleep(self.inner.settings.restart_delay).await;
        let started = self.inner.start_locked(id).await;
        drop(guard);

        await_monitor(previous).await;
        started
    }

    /// Apply a configuration patch. Disabling a supervised server stops it first.
    pub async fn update(&self, id: &str, patch: &ServerPatch) -> Result<ServerDefinition, ServiceError> {
        let guard = self.inner.lock_id(id).await;

        let mut monitor = None;
        if patch.enabled == Some(false) {
            if let Some(terminated) = self.inner.terminate_locked(id).await {
                monitor = self.inner.finish_stop(id, terminated).await?;
            }
        }

        let updated = self.inner.repository.update(id, patch).await?;
        drop(guard);

        await_monitor(monitor).await;
        Ok(updated)
    }

    /// Force-stop (if running) and delete a server.
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let guard = self.inner.lock_id(id).await;

        // Unknown ids leave the store untouched
        self.inner.repository.get(id).await?;

        let mut monitor = None;
        if let Some(terminated) = self.inner.terminate_locked(id).await {
            self.inner.emit_stopped(&terminated.entry);
            monitor = terminated.monitor;
        }

        let deleted = self.inner.repository.delete(id).await?;
        drop(guard);

        await_monitor(monitor).await;
        if !deleted {
            return Err(ServiceError::NotFound(id.to_string()));
        }
        info!(server_id = %id, "Server removed");
        Ok(())
    }

    /// Whether this instance currently supervises a process for `id`.
    pub async fn is_supervised(&self, id: &str) -> bool {
        self.inner.runtime.read().await.contains_key(id)
    }

    /// Local runtime state, if this instance supervises `id`.
    pub async fn runtime_state(&self, id: &str) -> Option<RuntimeState> {
        self.inner.runtime.read().await.get(id).map(|e| e.state())
    }

    /// Local runtime state of every supervised server.
    pub async fn runtime_snapshot(&self) -> HashMap<String, RuntimeState> {
        self.inner
            .runtime
            .read()
            .await
            .iter()
            .map(|(id, entry)| (id.clone(), entry.state()))
            .collect()
    }

    /// Ids of every server this instance supervises.
    pub async fn supervised_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.runtime.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Drop for McpManager {
    fn drop(&mut self) {
        if let Ok(mut runtime) = self.inner.runtime.try_write() {
            for (_, entry) in runtime.drain() {
                entry.cancel.cancel();
            }
        }
    }
}

async fn await_monitor(monitor: Option<JoinHandle<()>>) {
    if let Some(task) = monitor {
        if let Err(e) = task.await {
            warn!(error = %e, "Health monitor task failed");
        }
    }
}

impl ManagerInner {
    async fn lock_id(&self, id: &str) -> OpGuard<'_> {
        let lock = {
            let mut locks = self.op_locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(id.to_string()).or_default())
        };
        let guard = Arc::clone(&lock).lock_owned().await;
        OpGuard {
            locks: &self.op_locks,
            id: id.to_string(),
            lock,
            guard: Some(guard),
        }
    }

    async fn start_locked(self: &Arc<Self>, id: &str) -> Result<u32, ServiceError> {
        let server = self.repository.get(id).await?;

        if !server.enabled {
            return Err(ServiceError::Disabled(id.to_string()));
        }
        if self.runtime.read().await.contains_key(id) {
            return Err(ServiceError::AlreadyRunning(id.to_string()));
        }

        let working_dir = match resolve_working_dir(&server) {
            Ok(dir) => dir,
            Err(message) => return Err(self.launch_failed(&server, message, String::new()).await),
        };

        // Provisioning failures leave the status untouched
        materialize_files(&working_dir, &server.files).await?;

        if let Err(message) = validate_working_dir(&working_dir)
            .and_then(|()| validate_command_path(&server.command, &working_dir))
        {
            return Err(self.launch_failed(&server, message, String::new()).await);
        }

        self.repository
            .update_status(id, &RuntimeRecord::starting())
            .await?;
        info!(server_id = %id, server_name = %server.name, command = %server.command, "Starting server");

        let spec = LaunchSpec::for_server(&server, working_dir);
        let process = match spawn(&spec) {
            Ok(process) => Arc::new(process),
            Err(e) => return Err(self.launch_failed(&server, e.to_string(), String::new()).await),
        };

        tokio::time::sleep(self.settings.start_grace).await;

        match process.try_wait().await {
            Ok(None) => {}
            Ok(Some(status)) => {
                let stderr = process.collect_stderr(STDERR_COLLECT_TIMEOUT).await;
                let message = format!("Process {} during startup", describe_exit(&status));
                return Err(self.launch_failed(&server, message, stderr).await);
            }
            Err(e) => {
                self.shutdown_unclaimed(id, &process).await;
                let message = format!("Failed to check process state: {e}");
                let stderr = process.stderr_snapshot();
                return Err(self.launch_failed(&server, message, stderr).await);
            }
        }

        let pid = process.pid();
        let entry = Arc::new(RuntimeEntry {
            server_id: server.id.clone(),
            server_name: server.name.clone(),
            process,
            state: StdMutex::new(RuntimeState {
                status: ServerStatus::Running,
                process_id: Some(pid),
            }),
            cancel: CancellationToken::new(),
            monitor_task: StdMutex::new(None),
        });
        self.claim_slot(&entry).await?;

        if let Err(e) = self
            .repository
            .update_status(id, &RuntimeRecord::running(pid))
            .await
        {
            warn!(server_id = %id, pid, error = %e, "Failed to record running status, stopping process");
            self.release_slot(&entry).await;
            self.shutdown_unclaimed(id, &entry.process).await;
            if let Err(record_err) = self
                .repository
                .update_status(id, &RuntimeRecord::failed(e.to_string()))
                .await
            {
                warn!(server_id = %id, error = %record_err, "Failed to record launch failure");
            }
            return Err(ServiceError::Store(e.to_string()));
        }

        let interval = self.check_interval(&server);
        let task = tokio::spawn(Self::watch(Arc::clone(self), Arc::clone(&entry), interval));
        *entry
            .monitor_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(task);

        info!(server_id = %id, server_name = %server.name, pid, "Server started");
        self.emitter
            .emit(AppEvent::server_started(&server.id, &server.name, pid));
        Ok(pid)
    }

    /// Insert `entry` unless the id already has one.
    ///
    /// On a collision the fresh process is shut down, the store is pointed
    /// back at the tracked process, and `AlreadyRunning` is returned.
    async fn claim_slot(&self, entry: &Arc<RuntimeEntry>) -> Result<(), ServiceError> {
        let id = entry.server_id.as_str();
        let existing = {
            let mut runtime = self.runtime.write().await;
            match runtime.get(id) {
                Some(current) => Arc::clone(current),
                None => {
                    runtime.insert(id.to_string(), Arc::clone(entry));
                    return Ok(());
                }
            }
        };

        warn!(server_id = %id, pid = entry.process.pid(), "Server already tracked, discarding new process");
        self.shutdown_unclaimed(id, &entry.process).await;
        if let Some(pid) = existing.state().process_id {
            if let Err(e) = self
                .repository
                .update_status(id, &RuntimeRecord::running(pid))
                .await
            {
                warn!(server_id = %id, pid, error = %e, "Failed to restore running status");
            }
        }
        Err(ServiceError::AlreadyRunning(id.to_string()))
    }

    async fn release_slot(&self, entry: &Arc<RuntimeEntry>) {
        let mut runtime = self.runtime.write().await;
        if runtime
            .get(&entry.server_id)
            .is_some_and(|current| Arc::ptr_eq(current, entry))
        {
            runtime.remove(&entry.server_id);
        }
    }

    /// Stop a process that never made it into the runtime table.
    async fn shutdown_unclaimed(&self, id: &str, process: &SupervisedProcess) {
        if let Err(e) = process.shutdown(self.settings.stop_grace).await {
            warn!(server_id = %id, pid = process.pid(), error = %e, "Failed to stop process");
        }
    }

    fn check_interval(&self, server: &ServerDefinition) -> Duration {
        let secs = if server.health_check_interval_secs == 0 {
            self.settings.default_health_check_interval_secs
        } else {
            server.health_check_interval_secs
        };
        Duration::from_secs(secs.max(1))
    }

    /// Persist a launch failure, emit it, and build the error to return.
    async fn launch_failed(
        &self,
        server: &ServerDefinition,
        message: String,
        stderr: String,
    ) -> ServiceError {
        warn!(
            server_id = %server.id,
            server_name = %server.name,
            error = %message,
            stderr_bytes = stderr.len(),
            "Server failed to start"
        );

        if let Err(e) = self
            .repository
            .update_status(&server.id, &RuntimeRecord::failed(message.clone()))
            .await
        {
            warn!(server_id = %server.id, error = %e, "Failed to record launch failure");
        }

        let error = ServiceError::LaunchFailed {
            server_id: server.id.clone(),
            message,
            stderr,
        };
        self.emitter.emit(AppEvent::server_error(McpErrorInfo::from_error(
            Some(server.id.clone()),
            &server.name,
            &error,
        )));
        error
    }

    /// Remove the entry for `id`, cancel its monitor and reap the process.
    ///
    /// `None` when this instance does not supervise `id`.
    async fn terminate_locked(&self, id: &str) -> Option<Terminated> {
        let entry = self.runtime.write().await.remove(id)?;

        entry.cancel.cancel();
        let monitor = entry.take_monitor_task();

        let pid = entry.process.pid();
        match entry.process.shutdown(self.settings.stop_grace).await {
            Ok(status) => {
                debug!(server_id = %id, pid, status = %describe_exit(&status), "Server process reaped");
            }
            Err(e) => warn!(server_id = %id, pid, error = %e, "Error while stopping server process"),
        }
        entry.set_state(ServerStatus::Stopped, None);

        Some(Terminated { entry, monitor })
    }

    async fn stop_locked(&self, id: &str) -> Result<Option<JoinHandle<()>>, ServiceError> {
        let Some(terminated) = self.terminate_locked(id).await else {
            // Distinguish unknown ids from servers this instance is not running
            self.repository.get(id).await?;
            return Err(ServiceError::AlreadyStopped(id.to_string()));
        };
        self.finish_stop(id, terminated).await
    }

    /// Persist `stopped` for a terminated entry and emit the event.
    async fn finish_stop(
        &self,
        id: &str,
        terminated: Terminated,
    ) -> Result<Option<JoinHandle<()>>, ServiceError> {
        let persisted = self
            .repository
            .update_status(id, &RuntimeRecord::stopped())
            .await;
        self.emit_stopped(&terminated.entry);

        if let Err(e) = persisted {
            warn!(server_id = %id, error = %e, "Failed to record stopped status");
            return Err(ServiceError::Store(e.to_string()));
        }
        Ok(terminated.monitor)
    }

    fn emit_stopped(&self, entry: &RuntimeEntry) {
        info!(server_id = %entry.server_id, server_name = %entry.server_name, "Server stopped");
        self.emitter
            .emit(AppEvent::server_stopped(&entry.server_id, &entry.server_name));
    }

    /// Background task consuming one server's health stream.
    async fn watch(self: Arc<Self>, entry: Arc<RuntimeEntry>, interval: Duration) {
        let monitor =
            ProcessHealthMonitor::new(Arc::clone(&entry.process), interval, entry.cancel.clone());
        let mut health = Box::pin(monitor.monitor());

        while let Some(status) = health.next().await {
            if let ProcessHealth::Exited { code } = status {
                self.record_death(&entry, code).await;
                break;
            }
        }
        debug!(server_id = %entry.server_id, "Health monitor task exiting");
    }

    async fn record_death(&self, entry: &Arc<RuntimeEntry>, exit_code: Option<i32>) {
        let id = entry.server_id.as_str();
        let _guard = self.lock_id(id).await;

        // A concurrent stop got here first and owns the bookkeeping
        if entry.cancel.is_cancelled() {
            return;
        }

        let pid = entry.state().process_id;
        entry.set_state(ServerStatus::Error, None);
        self.release_slot(entry).await;

        let cause = match entry.process.try_wait().await {
            Ok(Some(status)) => describe_exit(&status),
            _ => exit_code.map_or_else(
                || "terminated".to_string(),
                |code| format!("exited with status {code}"),
            ),
        };
        let message = format!("Process {cause} unexpectedly");

        warn!(
            server_id = %id,
            server_name = %entry.server_name,
            pid = ?pid,
            exit_code = ?exit_code,
            "Server process died"
        );

        if let Err(e) = self
            .repository
            .update_status(id, &RuntimeRecord::failed(message))
            .await
        {
            warn!(server_id = %id, error = %e, "Failed to record server death");
        }

        self.emitter.emit(AppEvent::server_died(
            &entry.server_id,
            &entry.server_name,
            exit_code,
        ));
    }
}

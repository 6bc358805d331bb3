use crate::category::Category;
use crate::discovery::{EntryPoint, PluginCandidate};
use crate::error::ActivationError;
use crate::plugin::PluginCatalog;
use crate::serve::serve;
use nuoca_protocol::{HostLink, PluginChannel};
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::{Child, Command};
use tracing::{debug, error, warn};

/// Environment variable carrying the log filter into plugin processes.
pub const LOG_LEVEL_ENV: &str = "NUOCA_LOG";

const IN_PROCESS_PIPE_BUFFER: usize = 64 * 1024;

/// Handle to the isolated execution unit hosting one plugin.
pub enum ProcessHandle {
    /// A child OS process
    Child(Child),
    /// An in-process worker thread; cannot be killed, only detached
    Thread(std::thread::JoinHandle<()>),
    /// Already terminated or detached
    Released,
}

impl ProcessHandle {
    pub fn id(&self) -> Option<u32> {
        match self {
            ProcessHandle::Child(child) => child.id(),
            _ => None,
        }
    }

    pub fn is_alive(&mut self) -> bool {
        match self {
            ProcessHandle::Child(child) => match child.try_wait() {
                Ok(None) => true,
                Ok(Some(_)) => false,
                Err(e) => {
                    warn!(error = %e, "cannot query plugin process status");
                    false
                }
            },
            ProcessHandle::Thread(handle) => !handle.is_finished(),
            ProcessHandle::Released => false,
        }
    }

    /// Forcibly stop the process. Idempotent once it has exited.
    pub async fn terminate(&mut self) -> std::io::Result<()> {
        match self {
            ProcessHandle::Child(child) => {
                if child.try_wait()?.is_none() {
                    child.kill().await?;
                }
            }
            ProcessHandle::Thread(handle) => {
                if !handle.is_finished() {
                    warn!("in-process plugin worker still running; detaching");
                }
                *self = ProcessHandle::Released;
            }
            ProcessHandle::Released => {}
        }
        Ok(())
    }
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessHandle::Child(child) => f.debug_tuple("Child").field(&child.id()).finish(),
            ProcessHandle::Thread(handle) => f
                .debug_tuple("Thread")
                .field(&handle.thread().name())
                .finish(),
            ProcessHandle::Released => f.write_str("Released"),
        }
    }
}

/// Creates the isolated unit and duplex channel for one plugin.
pub trait PluginSpawner: Send + Sync {
    fn spawn(
        &self,
        candidate: &PluginCandidate,
    ) -> Result<(ProcessHandle, PluginChannel), ActivationError>;
}

/// Spawns every plugin as a child process talking over stdin/stdout.
///
/// Built-in plugins are started as `<program> plugin --category <c> --name <n>`;
/// external executables are started directly.
#[derive(Debug, Clone)]
pub struct ProcessSpawner {
    program: PathBuf,
    log_level: Option<String>,
}

impl ProcessSpawner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            log_level: None,
        }
    }

    /// Use the running executable as the built-in plugin host.
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    fn command(&self, candidate: &PluginCandidate) -> Command {
        let mut cmd = match &candidate.entry {
            EntryPoint::Builtin => {
                let mut cmd = Command::new(&self.program);
                cmd.arg("plugin")
                    .arg("--category")
                    .arg(candidate.category.as_str())
                    .arg("--name")
                    .arg(&candidate.name);
                cmd
            }
            EntryPoint::Executable(path) => Command::new(path),
        };
        // stdout carries the protocol; plugin logs go to the inherited stderr
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(level) = &self.log_level {
            cmd.env(LOG_LEVEL_ENV, level);
        }
        cmd
    }
}

impl PluginSpawner for ProcessSpawner {
    fn spawn(
        &self,
        candidate: &PluginCandidate,
    ) -> Result<(ProcessHandle, PluginChannel), ActivationError> {
        let mut child = self
            .command(candidate)
            .spawn()
            .map_err(|source| ActivationError::Spawn {
                name: candidate.name.clone(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| ActivationError::MissingPipe {
            name: candidate.name.clone(),
            pipe: "stdin",
        })?;
        let stdout = child.stdout.take().ok_or_else(|| ActivationError::MissingPipe {
            name: candidate.name.clone(),
            pipe: "stdout",
        })?;

        debug!(
            plugin = %candidate.name,
            category = %candidate.category,
            pid = ?child.id(),
            "spawned plugin process"
        );
        Ok((ProcessHandle::Child(child), PluginChannel::new(stdout, stdin)))
    }
}

/// Runs catalog plugins on dedicated threads over in-memory pipes.
///
/// Same protocol and failure containment as [`ProcessSpawner`] except that a
/// stuck worker cannot be killed.
#[derive(Debug, Clone)]
pub struct InProcessSpawner {
    catalog: Arc<PluginCatalog>,
}

impl InProcessSpawner {
    pub fn new(catalog: Arc<PluginCatalog>) -> Self {
        Self { catalog }
    }
}

impl PluginSpawner for InProcessSpawner {
    fn spawn(
        &self,
        candidate: &PluginCandidate,
    ) -> Result<(ProcessHandle, PluginChannel), ActivationError> {
        let plugin = self
            .catalog
            .create(&candidate.name, candidate.category)
            .ok_or_else(|| ActivationError::NotDiscovered {
                name: candidate.name.clone(),
                category: candidate.category,
            })?;

        let (host_io, plugin_io) = tokio::io::duplex(IN_PROCESS_PIPE_BUFFER);
        let (host_r, host_w) = tokio::io::split(host_io);
        let (plugin_r, plugin_w) = tokio::io::split(plugin_io);

        let name = candidate.name.clone();
        let category: Category = candidate.category;
        let handle = std::thread::Builder::new()
            .name(format!("plugin-{name}"))
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        error!(plugin = %name, error = %e, "cannot build plugin runtime");
                        return;
                    }
                };
                let link = HostLink::new(plugin_r, plugin_w);
                if let Err(e) = runtime.block_on(serve(plugin, &name, category, link)) {
                    warn!(plugin = %name, error = %e, "plugin worker stopped");
                }
            })
            .map_err(|source| ActivationError::Spawn {
                name: candidate.name.clone(),
                source,
            })?;

        Ok((ProcessHandle::Thread(handle), PluginChannel::new(host_r, host_w)))
    }
}

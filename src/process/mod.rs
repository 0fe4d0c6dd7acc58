//! Launching the GWT tools as child JVM processes.

pub mod booter;
mod drain;
mod result;

pub use result::{classify, Outcome, ProcessResult};
pub(crate) use result::junit_summary;

use crate::classpath::Classpath;
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

/// How long output drains may keep running once a timed-out child is killed
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// How the classpath reaches the child JVM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClasspathStrategy {
    /// `-cp a:b:c` on the command line
    #[default]
    Inline,
    /// `-classpath` inside a JVM `@argfile`
    ArgFile,
    /// A manifest-only jar whose `Class-Path` names every entry
    ManifestBooter,
}

/// Removes a generated scratch file when dropped
struct ScratchFile(Option<PathBuf>);

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            if let Err(e) = fs::remove_file(&path) {
                debug!(path = %path.display(), error = %e, "Could not remove scratch file");
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct JavaCommand {
    java: PathBuf,
    main_class: String,
    classpath: Classpath,
    jvm_args: Vec<String>,
    system_properties: BTreeMap<String, String>,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
    strategy: ClasspathStrategy,
    scratch_dir: PathBuf,
}

impl JavaCommand {
    pub fn new(java: impl Into<PathBuf>, main_class: &str) -> Self {
        Self {
            java: java.into(),
            main_class: main_class.to_string(),
            classpath: Classpath::new(),
            jvm_args: Vec::new(),
            system_properties: BTreeMap::new(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: None,
            timeout: None,
            strategy: ClasspathStrategy::Inline,
            scratch_dir: std::env::temp_dir(),
        }
    }

    pub fn classpath(mut self, classpath: Classpath) -> Self {
        self.classpath = classpath;
        self
    }

    pub fn jvm_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.jvm_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn system_property(mut self, key: &str, value: impl Into<String>) -> Self {
        self.system_properties.insert(key.to_string(), value.into());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.env.insert(key.to_string(), value.into());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn strategy(mut self, strategy: ClasspathStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Arguments passed to the `java` executable. Strategies other than
    /// `Inline` write their scratch file here; the returned path is that file.
    fn prepare(&self) -> Result<(Vec<String>, Option<PathBuf>)> {
        let mut argv = self.jvm_args.clone();
        argv.extend(
            self.system_properties
                .iter()
                .map(|(k, v)| format!("-D{}={}", k, v)),
        );

        let scratch = match self.strategy {
            ClasspathStrategy::Inline => {
                if !self.classpath.is_empty() {
                    argv.push("-cp".to_string());
                    argv.push(self.classpath.join());
                }
                None
            }
            ClasspathStrategy::ArgFile => {
                let file = booter::write_argfile(&self.scratch_dir, &self.classpath)?;
                argv.push(format!("@{}", file.display()));
                Some(file)
            }
            ClasspathStrategy::ManifestBooter => {
                let jar =
                    booter::write_manifest_jar(&self.scratch_dir, &self.classpath, &self.main_class)?;
                argv.push("-cp".to_string());
                argv.push(jar.display().to_string());
                Some(jar)
            }
        };

        argv.push(self.main_class.clone());
        argv.extend(self.args.iter().cloned());
        Ok((argv, scratch))
    }

    /// The full command line, for display. Scratch files are not written.
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.java.display().to_string()];
        parts.extend(self.jvm_args.iter().cloned());
        parts.extend(
            self.system_properties
                .iter()
                .map(|(k, v)| format!("-D{}={}", k, v)),
        );
        match self.strategy {
            ClasspathStrategy::Inline => {
                parts.push("-cp".to_string());
                parts.push(self.classpath.join());
            }
            ClasspathStrategy::ArgFile => parts.push("@<classpath argfile>".to_string()),
            ClasspathStrategy::ManifestBooter => {
                parts.push("-cp".to_string());
                parts.push("<booter jar>".to_string());
            }
        }
        parts.push(self.main_class.clone());
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    /// Run to completion and classify the output.
    ///
    /// A non-zero exit is not an error here; see [`JavaCommand::execute`].
    pub fn run(&self) -> Result<ProcessResult> {
        let tool = self.main_class.clone();
        let (argv, scratch) = self.prepare()?;
        let _scratch = ScratchFile(scratch);

        info!(
            tool = %tool,
            strategy = ?self.strategy,
            classpath_entries = self.classpath.len(),
            "Launching"
        );
        debug!(command = %self.command_line(), "Command line");

        let mut command = Command::new(&self.java);
        command
            .args(&argv)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        // A deadline kills the child's whole group, so it must lead one
        #[cfg(unix)]
        if self.timeout.is_some() {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command.spawn().map_err(|source| PipelineError::Spawn {
            tool: tool.clone(),
            source,
        })?;

        let stdout = child
            .stdout
            .take()
            .map(|s| drain::spawn(s, drain::Stream::Stdout, tool.clone()));
        let stderr = child
            .stderr
            .take()
            .map(|s| drain::spawn(s, drain::Stream::Stderr, tool.clone()));

        let status = match self.timeout {
            Some(timeout) => match child.wait_timeout(timeout)? {
                Some(status) => status,
                None => {
                    warn!(tool = %tool, seconds = timeout.as_secs(), "Timed out, killing child process");
                    kill_process_tree(&mut child);
                    match child.wait() {
                        Ok(status) => debug!(tool = %tool, ?status, "Killed child reaped"),
                        Err(e) => warn!(tool = %tool, error = %e, "Could not reap killed child"),
                    }
                    drain::join_within(stdout, DRAIN_GRACE);
                    drain::join_within(stderr, DRAIN_GRACE);
                    return Err(PipelineError::Timeout {
                        tool,
                        seconds: timeout.as_secs(),
                    });
                }
            },
            None => child.wait()?,
        };

        let result = ProcessResult::new(status.code(), drain::join(stdout), drain::join(stderr));
        debug!(
            tool = %tool,
            exit_code = ?result.exit_code,
            outcome = %result.outcome,
            "Child process finished"
        );
        Ok(result)
    }

    /// Run, treating any non-zero exit status as a failed invocation.
    pub fn execute(&self) -> Result<ProcessResult> {
        let result = self.run()?;
        match result.exit_code {
            Some(0) => Ok(result),
            Some(status) => Err(PipelineError::ToolInvocation {
                tool: self.main_class.clone(),
                status,
            }),
            None => Err(PipelineError::ToolInvocation {
                tool: self.main_class.clone(),
                status: -1,
            }),
        }
    }
}

/// Kill the child and, on unix, every process in the group it leads.
fn kill_process_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let group = Pid::from_raw(child.id() as i32);
        if let Err(e) = killpg(group, Signal::SIGKILL) {
            warn!(pid = child.id(), error = %e, "Could not kill process group");
        }
    }
    if let Err(e) = child.kill() {
        // Already gone once the group was killed
        debug!(pid = child.id(), error = %e, "Kill after group kill failed");
    }
}

/// `$JAVA_HOME/bin/java`, or plain `java` from `PATH`
pub fn default_java(java_home: Option<&Path>) -> PathBuf {
    match java_home {
        Some(home) => home
            .join("bin")
            .join(if cfg!(windows) { "java.exe" } else { "java" }),
        None => PathBuf::from("java"),
    }
}

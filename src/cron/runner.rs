use crate::command::CuratorCommand;
use crate::error::JobError;
use std::future::Future;
use std::pin::Pin;
use tokio::process::Command;

/// What the tool reported back. Logged verbatim, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub success: bool,
    pub status: Option<i32>,
    pub output: String,
}

/// Execution boundary: hands a command to something that runs it.
pub trait JobRunner: Send + Sync {
    fn run<'a>(
        &'a self,
        command: &'a CuratorCommand,
    ) -> Pin<Box<dyn Future<Output = Result<JobOutcome, JobError>> + Send + 'a>>;
}

/// Spawns the tool as a child process, without a shell, and waits for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl JobRunner for ProcessRunner {
    fn run<'a>(
        &'a self,
        command: &'a CuratorCommand,
    ) -> Pin<Box<dyn Future<Output = Result<JobOutcome, JobError>> + Send + 'a>> {
        Box::pin(async move {
            let output = Command::new(&command.program)
                .args(&command.args)
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|source| JobError::Spawn {
                    command: command.to_string(),
                    source,
                })?;

            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let combined = match (stdout.trim(), stderr.trim()) {
                ("", err) => err.to_string(),
                (out, "") => out.to_string(),
                (out, err) => format!("{out}\n{err}"),
            };

            Ok(JobOutcome {
                success: output.status.success(),
                status: output.status.code(),
                output: combined,
            })
        })
    }
}

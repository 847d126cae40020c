//! Formatting of compacted jobs into curator command lines.
//!
//! Flag names and their order are the curator CLI contract:
//! `<tool> --loglevel <lvl> <connection> <operation> indices --timestring %Y.%m.%d
//! --older-than <value> --time-unit <unit> [--exclude <glob> ...] [--prefix <entity>. ...]`.

use crate::policy::{CompactionPlan, DefaultJob, Job, Operation, TimeUnit};
use serde::Serialize;
use std::fmt;

pub const DEFAULT_CURATOR_BIN: &str = "/usr/bin/curator";
pub const DEFAULT_TOOL_LOGLEVEL: &str = "ERROR";
/// Index-name timestamp format; day granularity.
pub const TIMESTRING: &str = "%Y.%m.%d";

/// Cluster connection parameters, passed through to the tool untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub host: String,
    pub port: String,
    pub ca_cert: String,
    pub client_cert: String,
    pub client_key: String,
}

impl ConnectionInfo {
    fn push_args(&self, args: &mut Vec<String>) {
        args.extend([
            "--host".into(),
            self.host.clone(),
            "--port".into(),
            self.port.clone(),
            "--use_ssl".into(),
            "--certificate".into(),
            self.ca_cert.clone(),
            "--client-cert".into(),
            self.client_cert.clone(),
            "--client-key".into(),
            self.client_key.clone(),
        ]);
    }
}

/// A fully formatted tool invocation. Spawned without a shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CuratorCommand {
    /// Short name for logs: `default` or `<operation>-<value>-<unit>`.
    pub label: String,
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for CuratorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CommandBuilder {
    program: String,
    loglevel: String,
    connection: ConnectionInfo,
}

impl CommandBuilder {
    pub fn new(
        program: impl Into<String>,
        loglevel: impl Into<String>,
        connection: ConnectionInfo,
    ) -> Self {
        Self {
            program: program.into(),
            loglevel: loglevel.into(),
            connection,
        }
    }

    fn base(
        &self,
        label: String,
        operation: Operation,
        value: u32,
        unit: TimeUnit,
    ) -> CuratorCommand {
        let mut args = vec!["--loglevel".to_string(), self.loglevel.clone()];
        self.connection.push_args(&mut args);
        args.extend([
            operation.as_str().to_string(),
            "indices".into(),
            "--timestring".into(),
            TIMESTRING.into(),
            "--older-than".into(),
            value.to_string(),
            "--time-unit".into(),
            unit.as_str().to_string(),
        ]);
        CuratorCommand {
            label,
            program: self.program.clone(),
            args,
        }
    }

    pub fn default_job(&self, job: &DefaultJob) -> CuratorCommand {
        let mut cmd = self.base("default".into(), job.operation, job.value, job.unit);
        for exclusion in &job.excludes {
            cmd.args.push("--exclude".into());
            cmd.args.push(exclusion.to_string());
        }
        cmd
    }

    pub fn job(&self, job: &Job) -> CuratorCommand {
        let label = format!("{}-{}-{}", job.operation, job.value, job.unit);
        let mut cmd = self.base(label, job.operation, job.value, job.unit);
        for prefix in &job.prefixes {
            cmd.args.push("--prefix".into());
            cmd.args.push(format!("{prefix}."));
        }
        cmd
    }

    /// All commands of a plan, default job first.
    pub fn build_all(&self, plan: &CompactionPlan) -> Vec<CuratorCommand> {
        std::iter::once(self.default_job(&plan.default_job))
            .chain(plan.jobs.iter().map(|job| self.job(job)))
            .collect()
    }
}

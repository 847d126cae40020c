use crate::cli::{Cli, Commands};
use crate::command::{CommandBuilder, CuratorCommand};
use crate::config::{
    PolicyFile, Settings, connection_from_env, process_env, resolve_config_path,
};
use crate::cron::{ProcessRunner, Scheduler, SystemClock, run_batch};
use crate::error::CuratorResult;
use crate::policy::{self, CompactionPlan, compact_with_defaults};
use anyhow::{Context, Result};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Compact the file's rules using the resolved default window.
pub fn build_plan(file: &PolicyFile, settings: &Settings) -> CompactionPlan {
    compact_with_defaults(&file.entities, file.default_delete(), settings.default_days)
}

#[derive(Serialize)]
struct PlanReport<'a> {
    #[serde(flatten)]
    plan: &'a CompactionPlan,
    commands: Vec<String>,
    diagnostics: Vec<String>,
}

fn print_plan(plan: &CompactionPlan, commands: &[CuratorCommand], json: bool) -> Result<()> {
    if json {
        let report = PlanReport {
            plan,
            commands: commands.iter().map(ToString::to_string).collect(),
            diagnostics: plan.diagnostics.iter().map(ToString::to_string).collect(),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize plan")?
        );
        return Ok(());
    }

    for diagnostic in &plan.diagnostics {
        println!("! {diagnostic}");
    }
    for command in commands {
        println!("{command}");
    }
    Ok(())
}

/// Resolve once `signal` fires. A handler that cannot be installed logs a
/// warning and never resolves, so the scheduler is not cancelled.
async fn signal_or_pending<F>(name: &str, signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!("Failed to install {name} handler: {e}");
        std::future::pending::<()>().await;
    }
}

async fn shutdown_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let terminate = signal_or_pending("SIGTERM", async {
            let mut term = signal(SignalKind::terminate())?;
            term.recv().await;
            Ok::<(), std::io::Error>(())
        });
        tokio::select! {
            () = signal_or_pending("SIGINT", tokio::signal::ctrl_c()) => {}
            () = terminate => {}
        }
    }
    #[cfg(not(unix))]
    signal_or_pending("Ctrl-C", tokio::signal::ctrl_c()).await;

    info!("curator shutdown requested");
    cancel.cancel();
}

/// Everything a subcommand needs, resolved before anything runs.
#[derive(Debug)]
pub struct Prepared {
    pub settings: Settings,
    pub plan: CompactionPlan,
    pub commands: Vec<CuratorCommand>,
}

/// Load the policy file, resolve settings and the connection, and build the
/// command list. Every failure here is fatal.
pub fn prepare(cli: &Cli, env: &dyn Fn(&str) -> Option<String>) -> CuratorResult<Prepared> {
    let path = resolve_config_path(cli.config.clone(), env);
    let file = PolicyFile::load(&path)?;
    let settings = Settings::resolve(&file, env)?;

    let plan = build_plan(&file, &settings);
    policy::log_diagnostics(&plan);

    let connection = connection_from_env(env)?;
    let builder = CommandBuilder::new(
        settings.curator_bin.clone(),
        settings.tool_loglevel.clone(),
        connection,
    );
    let commands = builder.build_all(&plan);

    Ok(Prepared {
        settings,
        plan,
        commands,
    })
}

pub async fn dispatch(cli: Cli) -> Result<()> {
    let Prepared {
        settings,
        plan,
        commands,
    } = prepare(&cli, &process_env)?;

    match cli.subcommand() {
        Commands::Plan { json } => print_plan(&plan, &commands, json),
        Commands::Once => {
            run_batch(&ProcessRunner, &commands).await;
            Ok(())
        }
        Commands::Run => {
            info!(
                jobs = commands.len(),
                timezone = %settings.timezone,
                at = %settings.run_at.time().format("%H:%M"),
                "curator scheduler starting"
            );
            let cancel = CancellationToken::new();
            tokio::spawn(shutdown_signal(cancel.clone()));

            let mut scheduler = Scheduler::new(
                commands,
                settings.run_at,
                settings.timezone,
                Arc::new(SystemClock),
                Arc::new(ProcessRunner),
            );
            scheduler.run(cancel).await;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileFormat;
    use crate::error::{ConfigError, CuratorError};
    use crate::policy::TimeUnit;
    use clap::Parser;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    fn cluster_env(key: &str) -> Option<String> {
        let value = match key {
            "ES_HOST" => "logging-es",
            "ES_PORT" => "9200",
            "ES_CA" => "/etc/curator/keys/ca",
            "ES_CLIENT_CERT" => "/etc/curator/keys/cert",
            "ES_CLIENT_KEY" => "/etc/curator/keys/key",
            _ => return None,
        };
        Some(value.to_string())
    }

    fn cli_for(dir: &TempDir, policy: &str) -> Cli {
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, policy).unwrap();
        Cli::parse_from(["curator-cron", "--config", path.to_str().unwrap(), "once"])
    }

    #[test]
    fn prepare_builds_default_and_explicit_commands() {
        let dir = TempDir::new().unwrap();
        let cli = cli_for(&dir, "logs:\n  delete:\n    weeks: 2\n");

        let prepared = prepare(&cli, &cluster_env).unwrap();
        assert_eq!(prepared.commands.len(), 2);
        assert_eq!(prepared.commands[0].label, "default");
        assert_eq!(prepared.commands[1].label, "delete-14-days");
        assert_eq!(prepared.plan.jobs.len(), 1);
        assert_eq!(prepared.settings.curator_bin, "/usr/bin/curator");
    }

    #[test]
    fn prepare_surfaces_config_errors() {
        let dir = TempDir::new().unwrap();
        let cli = cli_for(&dir, "logs:\n  delete:\n    days: 3\n");
        let err = prepare(&cli, &|_: &str| -> Option<String> { None }).unwrap_err();
        assert!(matches!(
            err,
            CuratorError::Config(ConfigError::MissingEnv("ES_HOST"))
        ));

        let missing = Cli::parse_from(["curator-cron", "--config", "/nonexistent/c.yaml"]);
        let err = prepare(&missing, &cluster_env).unwrap_err();
        assert!(matches!(err, CuratorError::Config(ConfigError::Read { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_signal_handler_never_resolves() {
        let install = async { Err::<(), _>(std::io::Error::other("no signal driver")) };
        let waited =
            tokio::time::timeout(Duration::from_secs(3600), signal_or_pending("SIGINT", install))
                .await;
        assert!(waited.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn delivered_signal_resolves() {
        let delivered = async { Ok::<(), std::io::Error>(()) };
        let waited =
            tokio::time::timeout(Duration::from_secs(1), signal_or_pending("SIGINT", delivered))
                .await;
        assert!(waited.is_ok());
    }
}

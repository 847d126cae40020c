use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `curator-cron` - compacts index retention policies into curator jobs and
/// runs them daily.
#[derive(Parser, Debug)]
#[command(name = "curator-cron")]
#[command(version)]
#[command(about = "Daily index retention runner for curator.", long_about = None)]
pub struct Cli {
    /// Policy file (defaults to $CURATOR_CONF_LOCATION, then /etc/curator/settings/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run every job now, then daily at the configured time (default)
    Run,

    /// Run every job once and exit
    Once,

    /// Print the generated command lines without running them
    Plan {
        /// Emit the compacted plan as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub fn subcommand(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }
}

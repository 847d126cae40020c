use std::path::PathBuf;
use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `curator-cron`.
///
/// Configuration errors are fatal at startup. Job errors are reported per job
/// and never stop a batch. Internal glue code uses `anyhow::Result` for
/// context chains and folds into [`CuratorError::Other`].
#[derive(Debug, Error)]
pub enum CuratorError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("job: {0}")]
    Job(#[from] JobError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read policy file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse policy file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error(
        "invalid timezone {timezone:?}: the timezone must be specified in the tzselect(8) or \
         timedatectl(1) \"Region/Locality\" format e.g. \"America/New_York\" or \"UTC\""
    )]
    InvalidTimezone { timezone: String },

    #[error("invalid {field} {value:?}: expected an integer in 0..={max}")]
    InvalidRunTime {
        field: &'static str,
        value: String,
        max: u32,
    },

    #[error("invalid CURATOR_DEFAULT_DAYS {value:?}: expected a positive integer")]
    InvalidDefaultDays { value: String },

    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),
}

// ─── Job execution errors ────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

pub type CuratorResult<T> = std::result::Result<T, CuratorError>;

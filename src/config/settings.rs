use super::schema::PolicyFile;
use crate::command::{ConnectionInfo, DEFAULT_CURATOR_BIN, DEFAULT_TOOL_LOGLEVEL};
use crate::cron::RunTime;
use crate::error::ConfigError;
use crate::policy::RawValue;
use chrono_tz::Tz;

pub const RUN_TIMEZONE_ENV: &str = "CURATOR_RUN_TIMEZONE";
pub const RUN_HOUR_ENV: &str = "CURATOR_RUN_HOUR";
pub const RUN_MINUTE_ENV: &str = "CURATOR_RUN_MINUTE";
pub const DEFAULT_DAYS_ENV: &str = "CURATOR_DEFAULT_DAYS";
pub const CURATOR_BIN_ENV: &str = "CURATOR_BIN";
pub const CURATOR_LOGLEVEL_ENV: &str = "CURATOR_LOGLEVEL";

pub const ES_HOST_ENV: &str = "ES_HOST";
pub const ES_PORT_ENV: &str = "ES_PORT";
pub const ES_CA_ENV: &str = "ES_CA";
pub const ES_CLIENT_CERT_ENV: &str = "ES_CLIENT_CERT";
pub const ES_CLIENT_KEY_ENV: &str = "ES_CLIENT_KEY";

/// Process environment lookup; empty values count as unset.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Runtime settings resolved from the policy file and the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub timezone: Tz,
    pub run_at: RunTime,
    /// `CURATOR_DEFAULT_DAYS`, used when `.defaults.delete` is absent.
    pub default_days: Option<u32>,
    pub curator_bin: String,
    pub tool_loglevel: String,
}

impl Settings {
    /// Each value comes from `.defaults` first, then the environment, then a
    /// built-in default. Invalid values are fatal.
    pub fn resolve(
        file: &PolicyFile,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let defaults = file.defaults();

        let timezone = resolve_timezone(
            defaults
                .and_then(|d| d.timezone.clone())
                .filter(|tz| !tz.trim().is_empty())
                .or_else(|| env(RUN_TIMEZONE_ENV)),
        )?;

        let hour = resolve_run_field(
            "runhour",
            23,
            defaults.and_then(|d| d.runhour.as_ref()),
            env(RUN_HOUR_ENV),
        )?;
        let minute = resolve_run_field(
            "runminute",
            59,
            defaults.and_then(|d| d.runminute.as_ref()),
            env(RUN_MINUTE_ENV),
        )?;
        let run_at = RunTime::new(hour, minute).ok_or_else(|| ConfigError::InvalidRunTime {
            field: "runhour",
            value: hour.to_string(),
            max: 23,
        })?;

        let default_days = env(DEFAULT_DAYS_ENV)
            .map(|raw| match raw.trim().parse::<u32>() {
                Ok(days) if days > 0 => Ok(days),
                _ => Err(ConfigError::InvalidDefaultDays { value: raw }),
            })
            .transpose()?;

        Ok(Self {
            timezone,
            run_at,
            default_days,
            curator_bin: env(CURATOR_BIN_ENV).unwrap_or_else(|| DEFAULT_CURATOR_BIN.into()),
            tool_loglevel: env(CURATOR_LOGLEVEL_ENV)
                .unwrap_or_else(|| DEFAULT_TOOL_LOGLEVEL.into()),
        })
    }
}

fn resolve_timezone(raw: Option<String>) -> Result<Tz, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Tz::UTC);
    };
    raw.trim()
        .parse::<Tz>()
        .map_err(|_| ConfigError::InvalidTimezone { timezone: raw })
}

fn resolve_run_field(
    field: &'static str,
    max: u32,
    from_file: Option<&RawValue>,
    from_env: Option<String>,
) -> Result<u32, ConfigError> {
    let raw = match (from_file, from_env) {
        (Some(value), _) => value.to_string(),
        (None, Some(value)) => value,
        (None, None) => return Ok(0),
    };
    match raw.trim().parse::<u32>() {
        Ok(value) if value <= max => Ok(value),
        _ => Err(ConfigError::InvalidRunTime {
            field,
            value: raw,
            max,
        }),
    }
}

/// Cluster connection parameters from `ES_*`. All five are required.
pub fn connection_from_env(
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<ConnectionInfo, ConfigError> {
    let require = |key: &'static str| env(key).ok_or(ConfigError::MissingEnv(key));
    Ok(ConnectionInfo {
        host: require(ES_HOST_ENV)?,
        port: require(ES_PORT_ENV)?,
        ca_cert: require(ES_CA_ENV)?,
        client_cert: require(ES_CLIENT_CERT_ENV)?,
        client_key: require(ES_CLIENT_KEY_ENV)?,
    })
}

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Index prefixes that the default sweep must never touch.
///
/// Rendered as `<prefix>*` globs (no separator dot) so that every index the
/// security plugin and the dashboard create stays out of the catch-all job.
pub const RESERVED_PREFIXES: [&str; 2] = [".searchguard", ".kibana"];

/// Fallback retention window when neither `.defaults` nor the environment
/// provides one.
pub const FALLBACK_DEFAULT_DAYS: u32 = 30;

/// Cleanup action understood by the external tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "delete",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retention time unit accepted in configuration.
///
/// `Weeks` never reaches a job: it is folded into `Days` during
/// normalization because index names carry day-level timestamps only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Days,
    Weeks,
    Months,
}

impl TimeUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Days => "days",
            Self::Weeks => "weeks",
            Self::Months => "months",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A retention value as written in the policy file: `14` or `"14"`.
///
/// Anything else (floats, booleans, lists) lands in `Other` so one bad value
/// is reported against its rule instead of failing the whole file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Int(i64),
    Text(String),
    Other(serde_yaml::Value),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Other(value) => match serde_yaml::to_string(value) {
                Ok(rendered) => f.write_str(rendered.trim_end()),
                Err(_) => write!(f, "{value:?}"),
            },
        }
    }
}

/// Body of one `entity.operation` entry: normally `{unit: value}`.
///
/// Kept lenient so an unknown operation with an arbitrary body still yields a
/// diagnostic rather than a parse error.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OperationBody {
    Units(BTreeMap<String, RawValue>),
    Other(serde_yaml::Value),
}

impl OperationBody {
    pub fn units(&self) -> Option<&BTreeMap<String, RawValue>> {
        match self {
            Self::Units(units) => Some(units),
            Self::Other(_) => None,
        }
    }
}

/// One `(entity, operation, unit, value)` tuple read from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionRule {
    pub entity: String,
    pub operation: Operation,
    pub unit: TimeUnit,
    pub value: u32,
}

/// A rule after weeks→days folding. `unit` is never `Weeks`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRule {
    pub entity: String,
    pub operation: Operation,
    pub unit: TimeUnit,
    pub value: u32,
}

impl NormalizedRule {
    pub fn key(&self) -> JobKey {
        JobKey {
            operation: self.operation,
            unit: self.unit,
            value: self.value,
        }
    }
}

/// Compaction key: every prefix in a [`Job`] shares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct JobKey {
    pub operation: Operation,
    pub unit: TimeUnit,
    pub value: u32,
}

/// An explicit cleanup job covering one or more entity prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    pub operation: Operation,
    pub unit: TimeUnit,
    pub value: u32,
    pub prefixes: BTreeSet<String>,
}

/// One `--exclude` clause of the default job.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "prefix", rename_all = "lowercase")]
pub enum Exclusion {
    Reserved(&'static str),
    Entity(String),
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reserved(p) => write!(f, "{p}*"),
            Self::Entity(e) => write!(f, "{e}.*"),
        }
    }
}

/// Resolved retention window for the catch-all job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DefaultRetention {
    pub unit: TimeUnit,
    pub value: u32,
}

impl Default for DefaultRetention {
    fn default() -> Self {
        Self {
            unit: TimeUnit::Days,
            value: FALLBACK_DEFAULT_DAYS,
        }
    }
}

/// The catch-all delete job: everything not claimed by an explicit job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefaultJob {
    pub operation: Operation,
    pub unit: TimeUnit,
    pub value: u32,
    pub excludes: BTreeSet<Exclusion>,
}

impl DefaultJob {
    pub fn excludes_entity(&self, entity: &str) -> bool {
        self.excludes
            .iter()
            .any(|e| matches!(e, Exclusion::Entity(name) if name == entity))
    }
}

/// Non-fatal policy problem. The offending rule is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDiagnostic {
    UnsupportedOperation { entity: String, operation: String },
    HoursUnsupported { entity: String },
    UnknownUnit { entity: String, unit: String },
    MalformedOperation {
        entity: String,
        operation: String,
        body: String,
    },
    InvalidValue {
        entity: String,
        unit: String,
        value: String,
    },
    UnknownDefaultUnit { unit: String },
}

impl PolicyDiagnostic {
    /// Entity the diagnostic refers to; `None` for `.defaults` problems.
    pub fn entity(&self) -> Option<&str> {
        match self {
            Self::UnsupportedOperation { entity, .. }
            | Self::HoursUnsupported { entity }
            | Self::UnknownUnit { entity, .. }
            | Self::MalformedOperation { entity, .. }
            | Self::InvalidValue { entity, .. } => Some(entity),
            Self::UnknownDefaultUnit { .. } => None,
        }
    }
}

impl fmt::Display for PolicyDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedOperation { entity, operation } => write!(
                f,
                "{entity}: an unsupported or unknown operation {operation} was provided... record skipped"
            ),
            Self::HoursUnsupported { entity } => write!(
                f,
                "{entity}: time unit \"hours\" is not supported, index granularity is in days... record skipped"
            ),
            Self::UnknownUnit { entity, unit } => write!(
                f,
                "{entity}: an unknown time unit of {unit} was provided... record skipped"
            ),
            Self::MalformedOperation {
                entity,
                operation,
                body,
            } => write!(
                f,
                "{entity}: operation {operation} expects a mapping of time unit to value, got {body}... record skipped"
            ),
            Self::InvalidValue {
                entity,
                unit,
                value,
            } => write!(
                f,
                "{entity}: retention value {value:?} for {unit} is not a positive integer... record skipped"
            ),
            Self::UnknownDefaultUnit { unit } => write!(
                f,
                ".defaults: an unknown time unit of {unit} was provided... using days"
            ),
        }
    }
}

/// Output of the compactor: one default job, the explicit jobs, and every
/// diagnostic raised along the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompactionPlan {
    pub default_job: DefaultJob,
    pub jobs: Vec<Job>,
    #[serde(skip)]
    pub diagnostics: Vec<PolicyDiagnostic>,
}

impl CompactionPlan {
    /// Number of commands the plan expands to.
    pub fn job_count(&self) -> usize {
        self.jobs.len() + 1
    }
}

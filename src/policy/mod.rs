//! Retention policy model and the compactor that turns per-entity rules into
//! the smallest set of cleanup jobs.

pub mod compactor;
pub mod normalize;
pub mod types;

pub use compactor::{DEFAULTS_KEY, EntityPolicies, compact, compact_with_defaults};
pub use types::{
    CompactionPlan, DefaultJob, DefaultRetention, Exclusion, Job, JobKey, NormalizedRule,
    Operation, OperationBody, PolicyDiagnostic, RESERVED_PREFIXES, RawValue, RetentionRule,
    TimeUnit,
};

/// Report every diagnostic at error level. Processing is never aborted.
pub fn log_diagnostics(plan: &CompactionPlan) {
    for diagnostic in &plan.diagnostics {
        tracing::error!(entity = diagnostic.entity().unwrap_or(DEFAULTS_KEY), "{diagnostic}");
    }
}

use super::types::{
    DefaultRetention, FALLBACK_DEFAULT_DAYS, NormalizedRule, PolicyDiagnostic, RawValue,
    RetentionRule, TimeUnit,
};
use std::collections::BTreeMap;

const DAYS_PER_WEEK: u32 = 7;

/// Result of classifying a unit string from the policy file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitClass {
    Allowed(TimeUnit),
    // Known to the tool but finer than our day-stamped index names.
    Hours,
    Unknown,
}

pub fn classify_unit(raw: &str) -> UnitClass {
    match raw.trim().to_ascii_lowercase().as_str() {
        "days" => UnitClass::Allowed(TimeUnit::Days),
        "weeks" => UnitClass::Allowed(TimeUnit::Weeks),
        "months" => UnitClass::Allowed(TimeUnit::Months),
        "hours" => UnitClass::Hours,
        _ => UnitClass::Unknown,
    }
}

/// Parse a retention value; only positive integers are accepted.
pub fn parse_value(raw: &RawValue) -> Option<u32> {
    let value = match raw {
        RawValue::Int(v) => u32::try_from(*v).ok()?,
        RawValue::Text(s) => s.trim().parse::<u32>().ok()?,
        RawValue::Other(_) => return None,
    };
    (value > 0).then_some(value)
}

/// Fold weeks into days. Returns `None` if `value * 7` overflows.
pub fn normalize_unit(unit: TimeUnit, value: u32) -> Option<(TimeUnit, u32)> {
    match unit {
        TimeUnit::Weeks => value
            .checked_mul(DAYS_PER_WEEK)
            .map(|days| (TimeUnit::Days, days)),
        TimeUnit::Days | TimeUnit::Months => Some((unit, value)),
    }
}

pub fn normalize_rule(rule: RetentionRule) -> Option<NormalizedRule> {
    let (unit, value) = normalize_unit(rule.unit, rule.value)?;
    Some(NormalizedRule {
        entity: rule.entity,
        operation: rule.operation,
        unit,
        value,
    })
}

/// Resolve the catch-all retention window.
///
/// Order: first entry of `.defaults.delete`, then `env_days` as days, then
/// [`FALLBACK_DEFAULT_DAYS`]. An unusable default unit degrades to days
/// instead of failing.
pub fn resolve_default_retention(
    section: Option<&BTreeMap<String, RawValue>>,
    env_days: Option<u32>,
) -> (DefaultRetention, Vec<PolicyDiagnostic>) {
    let mut diagnostics = Vec::new();
    let env_default = DefaultRetention {
        unit: TimeUnit::Days,
        value: env_days.unwrap_or(FALLBACK_DEFAULT_DAYS),
    };

    let Some((raw_unit, raw_value)) = section.and_then(|s| s.iter().next()) else {
        return (env_default, diagnostics);
    };

    let unit = match classify_unit(raw_unit) {
        UnitClass::Allowed(unit) => unit,
        UnitClass::Hours | UnitClass::Unknown => {
            diagnostics.push(PolicyDiagnostic::UnknownDefaultUnit {
                unit: raw_unit.clone(),
            });
            TimeUnit::Days
        }
    };

    let normalized = parse_value(raw_value).and_then(|value| normalize_unit(unit, value));
    match normalized {
        Some((unit, value)) => (DefaultRetention { unit, value }, diagnostics),
        None => {
            diagnostics.push(PolicyDiagnostic::InvalidValue {
                entity: ".defaults".into(),
                unit: raw_unit.clone(),
                value: raw_value.to_string(),
            });
            (env_default, diagnostics)
        }
    }
}

use super::normalize::{
    UnitClass, classify_unit, normalize_rule, parse_value, resolve_default_retention,
};
use super::types::{
    CompactionPlan, DefaultJob, DefaultRetention, Exclusion, Job, JobKey, Operation,
    OperationBody, PolicyDiagnostic, RESERVED_PREFIXES, RawValue, RetentionRule,
};
use std::collections::{BTreeMap, BTreeSet};

/// `entity -> operation -> unit -> value`, as read from the policy file.
pub type EntityPolicies = BTreeMap<String, BTreeMap<String, OperationBody>>;

pub const DEFAULTS_KEY: &str = ".defaults";

/// Merge per-entity retention rules into the smallest set of jobs.
///
/// Rules sharing `(operation, unit, value)` after weeks→days folding end up
/// in the same [`Job`]. Every entity with at least one accepted rule is
/// excluded from the returned [`DefaultJob`], together with
/// [`RESERVED_PREFIXES`]. Rejected rules produce a [`PolicyDiagnostic`] and
/// leave the entity under the default sweep.
pub fn compact(policies: &EntityPolicies, defaults: DefaultRetention) -> CompactionPlan {
    let mut diagnostics = Vec::new();
    let mut groups: BTreeMap<JobKey, BTreeSet<String>> = BTreeMap::new();
    let mut excludes: BTreeSet<Exclusion> =
        RESERVED_PREFIXES.into_iter().map(Exclusion::Reserved).collect();

    for (entity, operations) in policies {
        if entity == DEFAULTS_KEY {
            continue;
        }
        for (raw_operation, body) in operations {
            let Some(operation) = Operation::parse(raw_operation) else {
                diagnostics.push(PolicyDiagnostic::UnsupportedOperation {
                    entity: entity.clone(),
                    operation: raw_operation.clone(),
                });
                continue;
            };
            let units = match body {
                OperationBody::Units(units) => units,
                OperationBody::Other(value) => {
                    diagnostics.push(PolicyDiagnostic::MalformedOperation {
                        entity: entity.clone(),
                        operation: raw_operation.clone(),
                        body: RawValue::Other(value.clone()).to_string(),
                    });
                    continue;
                }
            };

            for (raw_unit, raw_value) in units {
                let unit = match classify_unit(raw_unit) {
                    UnitClass::Allowed(unit) => unit,
                    UnitClass::Hours => {
                        diagnostics.push(PolicyDiagnostic::HoursUnsupported {
                            entity: entity.clone(),
                        });
                        continue;
                    }
                    UnitClass::Unknown => {
                        diagnostics.push(PolicyDiagnostic::UnknownUnit {
                            entity: entity.clone(),
                            unit: raw_unit.clone(),
                        });
                        continue;
                    }
                };

                let rule = parse_value(raw_value).and_then(|value| {
                    normalize_rule(RetentionRule {
                        entity: entity.clone(),
                        operation,
                        unit,
                        value,
                    })
                });
                let Some(rule) = rule else {
                    diagnostics.push(PolicyDiagnostic::InvalidValue {
                        entity: entity.clone(),
                        unit: raw_unit.clone(),
                        value: raw_value.to_string(),
                    });
                    continue;
                };

                excludes.insert(Exclusion::Entity(entity.clone()));
                groups.entry(rule.key()).or_default().insert(rule.entity);
            }
        }
    }

    let jobs = groups
        .into_iter()
        .map(|(key, prefixes)| Job {
            operation: key.operation,
            unit: key.unit,
            value: key.value,
            prefixes,
        })
        .collect();

    CompactionPlan {
        default_job: DefaultJob {
            operation: Operation::Delete,
            unit: defaults.unit,
            value: defaults.value,
            excludes,
        },
        jobs,
        diagnostics,
    }
}

/// Resolve the default window from the `.defaults.delete` section and the
/// environment fallback, then compact. Default-section diagnostics come first.
pub fn compact_with_defaults(
    policies: &EntityPolicies,
    default_section: Option<&BTreeMap<String, RawValue>>,
    env_default_days: Option<u32>,
) -> CompactionPlan {
    let (defaults, mut diagnostics) =
        resolve_default_retention(default_section, env_default_days);
    let mut plan = compact(policies, defaults);
    diagnostics.append(&mut plan.diagnostics);
    plan.diagnostics = diagnostics;
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::types::TimeUnit;

    fn policies(entries: &[(&str, &str, &str, RawValue)]) -> EntityPolicies {
        let mut out = EntityPolicies::new();
        for (entity, op, unit, value) in entries {
            let body = out
                .entry((*entity).to_string())
                .or_default()
                .entry((*op).to_string())
                .or_insert_with(|| OperationBody::Units(BTreeMap::new()));
            if let OperationBody::Units(units) = body {
                units.insert((*unit).to_string(), value.clone());
            }
        }
        out
    }

    fn entity_excludes(plan: &CompactionPlan) -> BTreeSet<String> {
        plan.default_job
            .excludes
            .iter()
            .filter_map(|e| match e {
                Exclusion::Entity(name) => Some(name.clone()),
                Exclusion::Reserved(_) => None,
            })
            .collect()
    }

    #[test]
    fn identical_keys_compact_into_one_job() {
        let input = policies(&[
            ("logs", "delete", "days", RawValue::Int(14)),
            ("audit", "delete", "weeks", RawValue::Int(2)),
            ("metrics", "delete", "days", RawValue::Int(3)),
        ]);
        let plan = compact(&input, DefaultRetention::default());

        assert_eq!(plan.jobs.len(), 2);
        let fourteen = plan
            .jobs
            .iter()
            .find(|j| j.value == 14)
            .expect("14-day job should exist");
        assert_eq!(fourteen.unit, TimeUnit::Days);
        assert_eq!(
            fourteen.prefixes,
            BTreeSet::from(["audit".to_string(), "logs".to_string()])
        );
        assert!(plan.diagnostics.is_empty());
    }

    #[test]
    fn hours_rule_produces_no_job_and_no_exclusion() {
        let input = policies(&[("audit", "delete", "hours", RawValue::Int(5))]);
        let plan = compact(&input, DefaultRetention::default());

        assert!(plan.jobs.is_empty());
        assert_eq!(
            plan.diagnostics,
            vec![PolicyDiagnostic::HoursUnsupported {
                entity: "audit".into()
            }]
        );
        assert!(!plan.default_job.excludes_entity("audit"));
    }

    #[test]
    fn unknown_unit_and_unsupported_operation_fall_through_to_default() {
        let input = policies(&[
            ("app", "delete", "fortnights", RawValue::Int(1)),
            ("ops", "close", "days", RawValue::Int(7)),
        ]);
        let plan = compact(&input, DefaultRetention::default());

        assert!(plan.jobs.is_empty());
        assert_eq!(plan.diagnostics.len(), 2);
        assert!(entity_excludes(&plan).is_empty());
        assert!(plan.diagnostics.iter().any(|d| matches!(
            d,
            PolicyDiagnostic::UnsupportedOperation { operation, .. } if operation == "close"
        )));
    }

    #[test]
    fn entity_with_mixed_rules_is_excluded_once() {
        let input = policies(&[
            ("app", "delete", "hours", RawValue::Int(6)),
            ("app", "delete", "months", RawValue::Int(2)),
        ]);
        let plan = compact(&input, DefaultRetention::default());

        assert_eq!(plan.jobs.len(), 1);
        assert_eq!(plan.jobs[0].unit, TimeUnit::Months);
        assert_eq!(entity_excludes(&plan), BTreeSet::from(["app".to_string()]));
        assert_eq!(plan.diagnostics.len(), 1);
    }

    #[test]
    fn default_job_always_carries_reserved_prefixes() {
        let plan = compact(&EntityPolicies::new(), DefaultRetention::default());
        let reserved: Vec<String> = plan
            .default_job
            .excludes
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(reserved, vec![".kibana*", ".searchguard*"]);
        assert_eq!(plan.job_count(), 1);
    }

    #[test]
    fn invalid_value_is_skipped_without_exclusion() {
        let input = policies(&[("logs", "delete", "days", RawValue::Text("lots".into()))]);
        let plan = compact(&input, DefaultRetention::default());
        assert!(plan.jobs.is_empty());
        assert!(!plan.default_job.excludes_entity("logs"));
        assert!(matches!(
            plan.diagnostics[0],
            PolicyDiagnostic::InvalidValue { .. }
        ));
    }

    #[test]
    fn non_integer_values_are_skipped_per_rule() {
        let input = policies(&[
            ("logs", "delete", "days", RawValue::Int(14)),
            ("float", "delete", "days", RawValue::Other(serde_yaml::Value::Number(1.5.into()))),
            ("flag", "delete", "days", RawValue::Other(serde_yaml::Value::Bool(true))),
        ]);
        let plan = compact(&input, DefaultRetention::default());

        assert_eq!(plan.jobs.len(), 1);
        assert_eq!(entity_excludes(&plan), BTreeSet::from(["logs".to_string()]));
        assert_eq!(
            plan.diagnostics,
            vec![
                PolicyDiagnostic::InvalidValue {
                    entity: "flag".into(),
                    unit: "days".into(),
                    value: "true".into(),
                },
                PolicyDiagnostic::InvalidValue {
                    entity: "float".into(),
                    unit: "days".into(),
                    value: "1.5".into(),
                },
            ]
        );
    }

    #[test]
    fn supported_operation_without_unit_map_is_skipped() {
        let mut input = policies(&[("logs", "delete", "days", RawValue::Int(14))]);
        input.entry("ops".into()).or_default().insert(
            "delete".into(),
            OperationBody::Other(serde_yaml::Value::Number(7.into())),
        );
        let plan = compact(&input, DefaultRetention::default());

        assert_eq!(plan.jobs.len(), 1);
        assert!(!plan.default_job.excludes_entity("ops"));
        assert_eq!(
            plan.diagnostics,
            vec![PolicyDiagnostic::MalformedOperation {
                entity: "ops".into(),
                operation: "delete".into(),
                body: "7".into(),
            }]
        );
    }

    #[test]
    fn compaction_is_idempotent() {
        let input = policies(&[
            ("b", "delete", "days", RawValue::Int(7)),
            ("a", "delete", "weeks", RawValue::Int(1)),
            ("c", "delete", "months", RawValue::Text("1".into())),
        ]);
        let first = compact(&input, DefaultRetention::default());
        let second = compact(&input, DefaultRetention::default());
        assert_eq!(first, second);
    }

    #[test]
    fn defaults_key_is_never_treated_as_entity() {
        let input = policies(&[(DEFAULTS_KEY, "delete", "days", RawValue::Int(3))]);
        let plan = compact(&input, DefaultRetention::default());
        assert!(plan.jobs.is_empty());
        assert!(entity_excludes(&plan).is_empty());
    }

    #[test]
    fn compact_with_defaults_orders_default_diagnostics_first() {
        let input = policies(&[("audit", "delete", "hours", RawValue::Int(5))]);
        let section = BTreeMap::from([("minutes".to_string(), RawValue::Int(10))]);
        let plan = compact_with_defaults(&input, Some(&section), None);

        assert_eq!(plan.default_job.unit, TimeUnit::Days);
        assert_eq!(plan.default_job.value, 10);
        assert!(matches!(
            plan.diagnostics[0],
            PolicyDiagnostic::UnknownDefaultUnit { .. }
        ));
        assert!(matches!(
            plan.diagnostics[1],
            PolicyDiagnostic::HoursUnsupported { .. }
        ));
    }
}

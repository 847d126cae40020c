use crate::policy::{EntityPolicies, RawValue};
use serde::Deserialize;
use std::collections::BTreeMap;

/// The policy file: a `.defaults` section plus one entry per entity.
///
/// ```yaml
/// .defaults:
///   timezone: Europe/Berlin
///   runhour: 3
///   runminute: 30
///   delete:
///     days: 30
/// logs:
///   delete:
///     weeks: 2
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyFile {
    #[serde(rename = ".defaults", default)]
    pub defaults: Option<DefaultsSection>,

    #[serde(flatten)]
    pub entities: EntityPolicies,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefaultsSection {
    pub timezone: Option<String>,
    pub runhour: Option<RawValue>,
    pub runminute: Option<RawValue>,
    /// `{unit: value}`; only the first entry is used.
    pub delete: Option<BTreeMap<String, RawValue>>,
}

impl PolicyFile {
    pub fn defaults(&self) -> Option<&DefaultsSection> {
        self.defaults.as_ref()
    }

    pub fn default_delete(&self) -> Option<&BTreeMap<String, RawValue>> {
        self.defaults().and_then(|d| d.delete.as_ref())
    }
}

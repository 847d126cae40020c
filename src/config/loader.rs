use super::schema::PolicyFile;
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONF_LOCATION: &str = "/etc/curator/settings/config.yaml";
pub const CONF_LOCATION_ENV: &str = "CURATOR_CONF_LOCATION";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Toml,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }
}

/// `--config` flag, then `CURATOR_CONF_LOCATION`, then the packaged path.
pub fn resolve_config_path(
    cli_path: Option<PathBuf>,
    env: &dyn Fn(&str) -> Option<String>,
) -> PathBuf {
    cli_path
        .or_else(|| env(CONF_LOCATION_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONF_LOCATION))
}

impl PolicyFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, FileFormat::from_path(path), path)
    }

    /// Parse file contents. A blank or comment-only file means "no rules".
    pub fn parse(contents: &str, format: FileFormat, path: &Path) -> Result<Self, ConfigError> {
        let blank = contents.lines().all(|line| {
            let line = line.trim();
            line.is_empty() || line.starts_with('#')
        });
        if blank {
            return Ok(Self::default());
        }

        let parse_error = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };

        match format {
            FileFormat::Yaml => serde_yaml::from_str::<Option<Self>>(contents)
                .map(Option::unwrap_or_default)
                .map_err(|e| parse_error(e.to_string())),
            FileFormat::Toml => toml::from_str(contents).map_err(|e| parse_error(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RawValue;
    use tempfile::TempDir;

    fn yaml(contents: &str) -> PolicyFile {
        PolicyFile::parse(contents, FileFormat::Yaml, Path::new("config.yaml")).unwrap()
    }

    #[test]
    fn parses_defaults_and_entities() {
        let file = yaml(
            r#"
.defaults:
  timezone: Europe/Berlin
  runhour: 3
  runminute: "30"
  delete:
    days: 21
logs:
  delete:
    weeks: 2
audit:
  delete:
    hours: 5
"#,
        );
        let defaults = file.defaults().unwrap();
        assert_eq!(defaults.timezone.as_deref(), Some("Europe/Berlin"));
        assert_eq!(defaults.runhour, Some(RawValue::Int(3)));
        assert_eq!(defaults.runminute, Some(RawValue::Text("30".into())));
        assert_eq!(
            file.default_delete().unwrap().get("days"),
            Some(&RawValue::Int(21))
        );
        assert_eq!(file.entities.len(), 2);
        assert_eq!(
            file.entities["logs"]["delete"].units().unwrap()["weeks"],
            RawValue::Int(2)
        );
        assert!(!file.entities.contains_key(".defaults"));
    }

    #[test]
    fn empty_or_comment_only_file_has_no_rules() {
        assert!(yaml("").entities.is_empty());
        assert!(yaml("# nothing configured yet\n").entities.is_empty());
    }

    #[test]
    fn toml_files_are_selected_by_extension() {
        let contents = r#"
[".defaults"]
timezone = "UTC"

[".defaults".delete]
months = 1

[metrics.delete]
days = 7
"#;
        let path = Path::new("policy.toml");
        assert_eq!(FileFormat::from_path(path), FileFormat::Toml);
        let file = PolicyFile::parse(contents, FileFormat::Toml, path).unwrap();
        assert_eq!(
            file.default_delete().unwrap().get("months"),
            Some(&RawValue::Int(1))
        );
        assert_eq!(
            file.entities["metrics"]["delete"].units().unwrap()["days"],
            RawValue::Int(7)
        );
    }

    #[test]
    fn odd_values_and_operation_bodies_still_parse() {
        let file = yaml(
            r#"
logs:
  delete:
    days: 14
float:
  delete:
    days: 1.5
ops:
  close: 7
"#,
        );
        let float = file.entities["float"]["delete"].units().unwrap();
        assert!(matches!(float["days"], RawValue::Other(_)));
        assert!(file.entities["ops"]["close"].units().is_none());
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = PolicyFile::parse("logs: [unclosed", FileFormat::Yaml, Path::new("c.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_reads_from_disk_and_reports_missing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        std::fs::write(&path, "logs:\n  delete:\n    days: 3\n").unwrap();
        let file = PolicyFile::load(&path).unwrap();
        assert_eq!(
            file.entities["logs"]["delete"].units().unwrap()["days"],
            RawValue::Int(3)
        );

        let missing = PolicyFile::load(&tmp.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }

    #[test]
    fn config_path_precedence() {
        let env = |key: &str| (key == CONF_LOCATION_ENV).then(|| "/from/env.yaml".to_string());
        let none = |_: &str| -> Option<String> { None };

        assert_eq!(
            resolve_config_path(Some(PathBuf::from("/cli.yaml")), &env),
            PathBuf::from("/cli.yaml")
        );
        assert_eq!(resolve_config_path(None, &env), PathBuf::from("/from/env.yaml"));
        assert_eq!(
            resolve_config_path(None, &none),
            PathBuf::from(DEFAULT_CONF_LOCATION)
        );
    }
}

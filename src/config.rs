//! Configuration loader and validator for the directory → backend sync.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extension substituted for the program's own extension to find its config.
pub const CONFIG_EXTENSION: &str = "yml";

/// Required fields of every section, in the order they are reported.
const SCHEMA: &[(&str, &[&str])] = &[
    ("directory", &["url", "username", "password", "dn"]),
    ("backend", &["url", "db", "username", "password"]),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("{} schema error(s) in {}", .issues.len(), .path.display())]
    Schema {
        path: PathBuf,
        issues: Vec<SchemaIssue>,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// One offending item found while checking the document against the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaIssue {
    MissingSection {
        section: &'static str,
    },
    NotAMapping {
        section: &'static str,
    },
    MissingField {
        section: &'static str,
        field: &'static str,
    },
    UnknownField {
        section: &'static str,
        field: String,
    },
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaIssue::MissingSection { section } => write!(f, "missing section «{section}:»"),
            SchemaIssue::NotAMapping { section } => {
                write!(f, "section «{section}:» must be a mapping")
            }
            SchemaIssue::MissingField { section, field } => {
                write!(f, "missing field «{field}:» in section «{section}:»")
            }
            SchemaIssue::UnknownField { section, field } => {
                write!(f, "unknown field «{field}:» in section «{section}:»")
            }
        }
    }
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub directory: Directory,
    pub backend: Backend,
}

/// Directory (LDAP) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Directory {
    pub url: String,
    pub username: String,
    pub password: String,
    /// Base DN searched for persons.
    pub dn: String,
}

/// Backend (Odoo) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Backend {
    pub url: String,
    /// Database name.
    pub db: String,
    pub username: String,
    pub password: String,
}

/// Config file for `program`: same directory and base name, `.yml` extension.
pub fn default_path(program: &Path) -> PathBuf {
    program.with_extension(CONFIG_EXTENSION)
}

/// Load configuration from a YAML file, check it against the schema and
/// validate the values.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse(&content, path)
}

/// Parse configuration text; `origin` is only used in diagnostics.
pub fn parse(content: &str, origin: &Path) -> Result<Config, ConfigError> {
    let doc: serde_yaml::Value = if content.trim().is_empty() {
        serde_yaml::Value::Null
    } else {
        serde_yaml::from_str(content)?
    };
    let issues = check_schema(&doc);
    if !issues.is_empty() {
        return Err(ConfigError::Schema {
            path: origin.to_path_buf(),
            issues,
        });
    }
    let cfg: Config = serde_yaml::from_value(doc)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Collect every missing section, missing field and unknown field.
/// Top-level keys other than the known sections are ignored.
fn check_schema(doc: &serde_yaml::Value) -> Vec<SchemaIssue> {
    let mut issues = Vec::new();
    for &(section, fields) in SCHEMA {
        let Some(value) = doc.get(section) else {
            issues.push(SchemaIssue::MissingSection { section });
            continue;
        };
        let Some(map) = value.as_mapping() else {
            issues.push(SchemaIssue::NotAMapping { section });
            continue;
        };
        for &field in fields {
            if !map.contains_key(field) {
                issues.push(SchemaIssue::MissingField { section, field });
            }
        }
        for key in map.keys() {
            let name = match key.as_str() {
                Some(s) => s.to_string(),
                None => serde_yaml::to_string(key)
                    .map(|s| s.trim_end().to_string())
                    .unwrap_or_else(|_| format!("{key:?}")),
            };
            if !fields.contains(&name.as_str()) {
                issues.push(SchemaIssue::UnknownField {
                    section,
                    field: name,
                });
            }
        }
    }
    issues
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let dir_url = cfg.directory.url.trim();
    if !["ldap://", "ldaps://", "ldapi://"]
        .iter()
        .any(|scheme| dir_url.starts_with(scheme))
    {
        return Err(ConfigError::Invalid(
            "directory.url must start with ldap://, ldaps:// or ldapi://",
        ));
    }

    match Url::parse(cfg.backend.url.trim()) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        _ => {
            return Err(ConfigError::Invalid(
                "backend.url must be an http(s) URL",
            ))
        }
    }
    if cfg.backend.db.trim().is_empty() {
        return Err(ConfigError::Invalid("backend.db must be non-empty"));
    }
    if cfg.backend.username.trim().is_empty() {
        return Err(ConfigError::Invalid("backend.username must be non-empty"));
    }

    Ok(())
}

/// Returns an example configuration document.
pub fn example() -> &'static str {
    r#"directory:
  url: ldap://ldap.example.com:389
  username: cn=login,dc=example,dc=com
  password: password
  dn: dc=example,dc=com

backend:
  url: https://odoo.example.com
  db: dbname
  username: login
  password: password
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn issues_of(content: &str) -> Vec<SchemaIssue> {
        match parse(content, Path::new("sync.yml")).unwrap_err() {
            ConfigError::Schema { issues, .. } => issues,
            other => panic!("wrong error: {other:?}"),
        }
    }

    #[test]
    fn parse_example_ok() {
        let cfg = parse(example(), Path::new("example.yml")).unwrap();
        assert_eq!(cfg.directory.dn, "dc=example,dc=com");
        assert_eq!(cfg.backend.db, "dbname");
    }

    #[test]
    fn default_path_swaps_extension() {
        assert_eq!(
            default_path(Path::new("/opt/tools/customers_sync")),
            PathBuf::from("/opt/tools/customers_sync.yml")
        );
        assert_eq!(
            default_path(Path::new("/opt/tools/customers_sync.exe")),
            PathBuf::from("/opt/tools/customers_sync.yml")
        );
    }

    #[test]
    fn missing_section_is_reported() {
        let content = "directory:\n  url: ldap://h\n  username: u\n  password: p\n  dn: dc=x\n";
        assert_eq!(
            issues_of(content),
            vec![SchemaIssue::MissingSection { section: "backend" }]
        );
    }

    #[test]
    fn empty_document_misses_both_sections() {
        assert_eq!(
            issues_of(""),
            vec![
                SchemaIssue::MissingSection { section: "directory" },
                SchemaIssue::MissingSection { section: "backend" },
            ]
        );
    }

    #[test]
    fn every_missing_and_unknown_field_is_reported() {
        let content = r#"directory:
  url: ldap://h
  username: u
  password: p
  base: dc=x
backend:
  url: https://odoo
  username: u
  password: p
  port: 8069
"#;
        let issues = issues_of(content);
        assert_eq!(
            issues,
            vec![
                SchemaIssue::MissingField {
                    section: "directory",
                    field: "dn"
                },
                SchemaIssue::UnknownField {
                    section: "directory",
                    field: "base".into()
                },
                SchemaIssue::MissingField {
                    section: "backend",
                    field: "db"
                },
                SchemaIssue::UnknownField {
                    section: "backend",
                    field: "port".into()
                },
            ]
        );
        assert_eq!(
            issues[0].to_string(),
            "missing field «dn:» in section «directory:»"
        );
        assert_eq!(
            issues[3].to_string(),
            "unknown field «port:» in section «backend:»"
        );
    }

    #[test]
    fn section_must_be_mapping() {
        let content = "directory: ldap://h\nbackend:\n  url: https://o\n  db: d\n  username: u\n  password: p\n";
        assert_eq!(
            issues_of(content),
            vec![SchemaIssue::NotAMapping { section: "directory" }]
        );
    }

    #[test]
    fn unrelated_top_level_keys_are_ignored() {
        let content = format!("{}\nnotes: keep me\n", example());
        assert!(parse(&content, Path::new("x.yml")).is_ok());
    }

    #[test]
    fn invalid_directory_url() {
        let content = example().replace("ldap://ldap.example.com:389", "http://ldap");
        let err = parse(&content, Path::new("x.yml")).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("directory.url")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn invalid_backend_values() {
        let content = example().replace("https://odoo.example.com", "not a url");
        let err = parse(&content, Path::new("x.yml")).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("backend.url")),
            _ => panic!("wrong error"),
        }

        let content = example().replace("db: dbname", "db: \"\"");
        let err = parse(&content, Path::new("x.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("backend.db")));
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("sync.yml");
        fs::write(&p, example()).unwrap();
        let cfg = load(&p).unwrap();
        assert_eq!(cfg.backend.url, "https://odoo.example.com");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let td = tempdir().unwrap();
        let err = load(&td.path().join("absent.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}

//! Catalog snapshot loading
//!
//! Reads the `skills.yaml` layout (`skills: [...]`, or a bare list) into a
//! [`CatalogSnapshot`]. Elements that do not even deserialize as a record are
//! kept as rejections so one malformed entry never fails the whole document.

use std::path::Path;

use serde_yaml::Value;
use tracing::debug;

use super::{RawSkillRecord, Rejection};
use crate::error::{Result, SkillioError};

/// An already-materialized catalog, ready for `ingest`
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub records: Vec<RawSkillRecord>,
    /// Entries that failed to deserialize
    pub malformed: Vec<Rejection>,
}

impl From<Vec<RawSkillRecord>> for CatalogSnapshot {
    fn from(records: Vec<RawSkillRecord>) -> Self {
        Self {
            records,
            malformed: Vec::new(),
        }
    }
}

impl CatalogSnapshot {
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len() + self.malformed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.malformed.is_empty()
    }
}

/// Load a catalog file (YAML or JSON)
pub fn load_catalog(path: &Path) -> Result<CatalogSnapshot> {
    let raw = std::fs::read_to_string(path).map_err(|err| {
        SkillioError::Config(format!("read catalog {}: {err}", path.display()))
    })?;
    let snapshot = parse_catalog(&raw).map_err(|err| match err {
        SkillioError::Serialization(msg) => {
            SkillioError::Serialization(format!("parse catalog {}: {msg}", path.display()))
        }
        other => other,
    })?;
    debug!(
        target: "skillio::catalog",
        path = %path.display(),
        records = snapshot.records.len(),
        malformed = snapshot.malformed.len(),
        "catalog loaded"
    );
    Ok(snapshot)
}

/// Parse catalog text. JSON documents parse too, since YAML is a superset.
pub fn parse_catalog(raw: &str) -> Result<CatalogSnapshot> {
    if raw.trim().is_empty() {
        return Ok(CatalogSnapshot::default());
    }
    let document: Value = serde_yaml::from_str(raw)?;
    let entries = match document {
        Value::Null => Vec::new(),
        Value::Sequence(entries) => entries,
        Value::Mapping(mut map) => match map.remove("skills") {
            Some(Value::Sequence(entries)) => entries,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => {
                return Err(SkillioError::Serialization(
                    "`skills` must be a list".to_string(),
                ));
            }
        },
        _ => {
            return Err(SkillioError::Serialization(
                "catalog must be a list or a mapping with a `skills` list".to_string(),
            ));
        }
    };

    let mut snapshot = CatalogSnapshot::default();
    for (position, entry) in entries.into_iter().enumerate() {
        let id = entry
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{position}"));
        match serde_yaml::from_value::<RawSkillRecord>(entry) {
            Ok(record) => snapshot.records.push(record),
            Err(err) => snapshot.malformed.push(Rejection {
                id,
                reason: format!("malformed record: {err}"),
            }),
        }
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skills_mapping() {
        let snapshot = parse_catalog(
            r#"
skills:
  - name: video-downloader
    version: 1.0.0
    capabilities: ["video download", "YouTube"]
  - name: pdf-tools
    version: 0.3.1
    capabilities: ["pdf"]
"#,
        )
        .unwrap();
        assert_eq!(snapshot.records.len(), 2);
        assert!(snapshot.malformed.is_empty());
        assert_eq!(snapshot.records[0].name.as_deref(), Some("video-downloader"));
    }

    #[test]
    fn test_parse_bare_list_and_json() {
        let snapshot =
            parse_catalog(r#"[{"name": "a", "version": "1.0.0", "capabilities": ["x"]}]"#).unwrap();
        assert_eq!(snapshot.records.len(), 1);
    }

    #[test]
    fn test_malformed_entry_is_isolated() {
        let snapshot = parse_catalog(
            r#"
skills:
  - name: broken
    capabilities: 12
  - name: fine
    version: 1.0.0
    capabilities: [x]
"#,
        )
        .unwrap();
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.malformed.len(), 1);
        assert_eq!(snapshot.malformed[0].id, "broken");
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_empty_documents() {
        assert!(parse_catalog("").unwrap().is_empty());
        assert!(parse_catalog("skills:\n").unwrap().is_empty());
        assert!(parse_catalog("skills: 3").is_err());
        assert!(parse_catalog("42").is_err());
    }

    #[test]
    fn test_load_catalog_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skills.yaml");
        std::fs::write(&path, "skills:\n  - name: a\n    version: 1.0.0\n    capabilities: [x]\n")
            .unwrap();
        let snapshot = load_catalog(&path).unwrap();
        assert_eq!(snapshot.records.len(), 1);

        let missing = load_catalog(&dir.path().join("nope.yaml"));
        assert!(missing.is_err());
    }
}

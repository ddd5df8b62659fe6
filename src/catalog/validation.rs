//! Catalog record validation

use std::collections::{BTreeMap, HashSet};

use super::{RawSkillRecord, SkillRecord, SkillSource, SourceKind, canonicalize};
use crate::error::{Result, SkillioError};

/// Default quality when the catalog does not score a skill
const DEFAULT_QUALITY: f64 = 0.5;

/// Quality values above 1 are read on the catalog's 0-10 scale
const LEGACY_QUALITY_SCALE: f64 = 10.0;

/// A validation warning (not an error)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

/// Outcome of validating one wire record
#[derive(Debug, Clone)]
pub struct Validated {
    pub record: SkillRecord,
    pub warnings: Vec<ValidationWarning>,
}

/// Validate a wire record into a [`SkillRecord`].
///
/// `position` is the record's index in the snapshot and is only used to name
/// records that have no usable `name`.
pub fn validate(raw: &RawSkillRecord, position: usize) -> Result<Validated> {
    let id = raw.display_id(position);
    let fail = |reason: &str| SkillioError::SchemaValidation {
        id: id.clone(),
        reason: reason.to_string(),
    };

    let name = raw
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| fail("skill name is required"))?;

    let version_raw = raw
        .version
        .as_deref()
        .map(str::trim)
        .filter(|version| !version.is_empty())
        .ok_or_else(|| fail("version is required"))?;
    let version = semver::Version::parse(version_raw.trim_start_matches('v'))
        .map_err(|err| fail(&format!("invalid semantic version {version_raw}: {err}")))?;

    let capabilities = canonical_list(&raw.capabilities);
    if capabilities.is_empty() {
        return Err(fail("at least one capability is required"));
    }

    let mut warnings = Vec::new();

    let description = raw.description.as_deref().unwrap_or("").trim().to_string();
    if description.is_empty() {
        warnings.push(warning("description", "skill should have a description"));
    }
    if raw.scenarios.is_empty() {
        warnings.push(warning(
            "scenarios",
            "skill should list at least one example scenario",
        ));
    }

    let source = match &raw.source {
        Some(source) => {
            let kind = match source.kind.as_deref() {
                Some(kind) => SourceKind::parse(kind).unwrap_or_else(|| {
                    warnings.push(warning(
                        "source.type",
                        &format!("unknown source type {kind}, treating as manual"),
                    ));
                    SourceKind::Manual
                }),
                None => SourceKind::Manual,
            };
            SkillSource {
                kind,
                locator: source.repo.clone().or_else(|| source.url.clone()),
            }
        }
        None => SkillSource {
            kind: SourceKind::Manual,
            locator: None,
        },
    };

    let mut localized_descriptions = BTreeMap::new();
    if let Some(zh) = raw.description_zh.as_deref().map(str::trim) {
        if !zh.is_empty() {
            localized_descriptions.insert("zh".to_string(), zh.to_string());
        }
    }

    let quality = match raw.quality_score {
        Some(value) if value.is_finite() => {
            let scaled = if value > 1.0 {
                value / LEGACY_QUALITY_SCALE
            } else {
                value
            };
            if !(0.0..=1.0).contains(&scaled) {
                warnings.push(warning("quality_score", "quality score clamped to [0, 1]"));
            }
            scaled.clamp(0.0, 1.0)
        }
        Some(_) => {
            warnings.push(warning("quality_score", "quality score is not a number"));
            DEFAULT_QUALITY
        }
        None => DEFAULT_QUALITY,
    };

    let popularity = match raw.popularity {
        Some(value) if value.is_finite() => value.clamp(0.0, 1.0),
        _ => 0.0,
    };

    Ok(Validated {
        record: SkillRecord {
            id: name.to_string(),
            name: name.to_string(),
            version,
            source,
            description,
            localized_descriptions,
            capabilities,
            scenarios: trimmed_list(&raw.scenarios),
            dependencies: trimmed_list(&raw.dependencies),
            categories: canonical_list(&raw.tags),
            quality,
            popularity,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        },
        warnings,
    })
}

fn warning(field: &str, message: &str) -> ValidationWarning {
    ValidationWarning {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Canonicalize, drop empties, dedupe keeping first occurrence
fn canonical_list(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .map(|value| canonicalize(value))
        .filter(|value| !value.is_empty())
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

fn trimmed_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RawSource;

    fn raw(name: &str, version: &str, caps: &[&str]) -> RawSkillRecord {
        RawSkillRecord {
            name: Some(name.to_string()),
            version: Some(version.to_string()),
            description: Some("Downloads things".to_string()),
            capabilities: caps.iter().map(|c| (*c).to_string()).collect(),
            scenarios: vec!["download video".to_string()],
            ..RawSkillRecord::default()
        }
    }

    #[test]
    fn test_valid_record() {
        let validated = validate(&raw("video-downloader", "1.2.0", &["Video Download"]), 0).unwrap();
        assert_eq!(validated.record.id, "video-downloader");
        assert_eq!(validated.record.capabilities, vec!["video download"]);
        assert_eq!(validated.record.version, semver::Version::new(1, 2, 0));
        assert!(validated.warnings.is_empty());
    }

    #[test]
    fn test_capabilities_canonicalized_and_deduped() {
        let validated =
            validate(&raw("a", "1.0.0", &["YouTube", " youtube ", "", "Batch  Download"]), 0).unwrap();
        assert_eq!(validated.record.capabilities, vec!["youtube", "batch download"]);
    }

    #[test]
    fn test_missing_name_rejected() {
        let mut record = raw("", "1.0.0", &["x"]);
        record.name = None;
        let err = validate(&record, 4).unwrap_err();
        match err {
            SkillioError::SchemaValidation { id, .. } => assert_eq!(id, "#4"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_invalid_version_rejected() {
        let err = validate(&raw("a", "one", &["x"]), 0).unwrap_err();
        assert!(err.to_string().contains("invalid semantic version"));
    }

    #[test]
    fn test_leading_v_version_accepted() {
        let validated = validate(&raw("a", "v2.0.1", &["x"]), 0).unwrap();
        assert_eq!(validated.record.version, semver::Version::new(2, 0, 1));
    }

    #[test]
    fn test_empty_capabilities_rejected() {
        let err = validate(&raw("a", "1.0.0", &["  "]), 0).unwrap_err();
        assert!(err.to_string().contains("capability"));
    }

    #[test]
    fn test_legacy_quality_scale() {
        let mut record = raw("a", "1.0.0", &["x"]);
        record.quality_score = Some(8.0);
        let validated = validate(&record, 0).unwrap();
        assert!((validated.record.quality - 0.8).abs() < 1e-9);

        record.quality_score = Some(0.3);
        let validated = validate(&record, 0).unwrap();
        assert!((validated.record.quality - 0.3).abs() < 1e-9);

        record.quality_score = Some(42.0);
        let validated = validate(&record, 0).unwrap();
        assert!((validated.record.quality - 1.0).abs() < 1e-9);
        assert_eq!(validated.warnings.len(), 1);
    }

    #[test]
    fn test_source_descriptor() {
        let mut record = raw("a", "1.0.0", &["x"]);
        record.source = Some(RawSource {
            kind: Some("github".into()),
            repo: Some("yt-dlp/yt-dlp".into()),
            url: None,
        });
        let validated = validate(&record, 0).unwrap();
        assert_eq!(validated.record.source.kind, SourceKind::Github);
        assert_eq!(validated.record.source.locator.as_deref(), Some("yt-dlp/yt-dlp"));

        record.source = Some(RawSource {
            kind: Some("carrier-pigeon".into()),
            repo: None,
            url: Some("https://example.com".into()),
        });
        let validated = validate(&record, 0).unwrap();
        assert_eq!(validated.record.source.kind, SourceKind::Manual);
        assert_eq!(validated.warnings[0].field, "source.type");
    }

    #[test]
    fn test_localized_description() {
        let mut record = raw("a", "1.0.0", &["x"]);
        record.description_zh = Some("下载视频".into());
        let validated = validate(&record, 0).unwrap();
        assert_eq!(
            validated.record.localized_descriptions.get("zh").map(String::as_str),
            Some("下载视频")
        );
    }
}

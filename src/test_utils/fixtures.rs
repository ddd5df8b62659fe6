use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::catalog::{CatalogSnapshot, parse_catalog};
use crate::error::Result;

const SAMPLE_CATALOG: &str = include_str!("../../tests/fixtures/catalog/skills.yaml");

/// The sample catalog used across unit, integration and CLI tests
#[must_use]
pub const fn sample_catalog_yaml() -> &'static str {
    SAMPLE_CATALOG
}

pub fn sample_catalog() -> Result<CatalogSnapshot> {
    parse_catalog(SAMPLE_CATALOG)
}

/// Isolated `.skillio` data directory with a catalog and optional config.
pub struct CatalogFixture {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl CatalogFixture {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join(".skillio");
        std::fs::create_dir_all(root.join("index"))?;
        println!("[FIXTURE] Created data root: {}", root.display());
        Ok(Self { temp_dir, root })
    }

    /// Fixture pre-populated with the sample catalog
    pub fn with_sample_catalog() -> Result<Self> {
        let fixture = Self::new()?;
        fixture.write_catalog(SAMPLE_CATALOG)?;
        Ok(fixture)
    }

    #[must_use]
    pub fn catalog_path(&self) -> PathBuf {
        self.root.join("index").join("skills.yaml")
    }

    pub fn write_catalog(&self, content: &str) -> Result<PathBuf> {
        let path = self.catalog_path();
        std::fs::write(&path, content)?;
        println!("[FIXTURE] Wrote catalog: {} ({} bytes)", path.display(), content.len());
        Ok(path)
    }

    pub fn write_config(&self, content: &str) -> Result<PathBuf> {
        self.write_file("config.toml", content)
    }

    pub fn write_file(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_catalog_parses() {
        let snapshot = sample_catalog().unwrap();
        assert_eq!(snapshot.records.len(), 8);
        assert!(snapshot.malformed.is_empty());
    }

    #[test]
    fn test_fixture_layout() {
        let fixture = CatalogFixture::with_sample_catalog().unwrap();
        assert!(fixture.catalog_path().is_file());
        assert!(fixture.root.ends_with(".skillio"));
        let config = fixture.write_config("[search]\ndefault_limit = 3\n").unwrap();
        assert!(config.is_file());
    }
}

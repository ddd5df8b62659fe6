use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::catalog::load_catalog;
use crate::cli::Cli;
use crate::cli::output::{OutputFormat, RobotStyle};
use crate::config::Config;
use crate::error::{Result, SkillioError};
use crate::search::{IngestReport, MatchEngine, ReverseIndex};

const ROOT_DIR: &str = ".skillio";

pub struct AppContext {
    /// Data directory (`.skillio` of the enclosing project, or the user data dir)
    pub root: PathBuf,
    pub config: Config,
    pub engine: MatchEngine,
    pub index: Arc<ReverseIndex>,
    pub catalog_path: PathBuf,
    /// Report of the ingest performed at startup
    pub ingest: IngestReport,
    pub output_format: OutputFormat,
    pub verbosity: u8,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let root = Self::find_root()?;
        let project_root = root
            .parent()
            .filter(|_| root.ends_with(ROOT_DIR))
            .map_or_else(|| root.clone(), Path::to_path_buf);
        let config = Config::load(cli.config.as_deref(), &project_root)?;

        let catalog_path = cli
            .catalog
            .clone()
            .or_else(|| config.catalog.path.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| default_catalog_path(&root));
        debug!(
            root = %root.display(),
            catalog = %catalog_path.display(),
            "resolved paths"
        );

        let snapshot = load_catalog(&catalog_path)?;
        let engine = MatchEngine::from_config(&config)?;
        let index = Arc::new(ReverseIndex::new());
        let ingest = engine.ingest(&index, snapshot);

        let robot = cli.robot || config.robot.enabled;
        Ok(Self {
            root,
            config,
            engine,
            index,
            catalog_path,
            ingest,
            output_format: if robot {
                OutputFormat::Json
            } else {
                OutputFormat::Human
            },
            verbosity: cli.verbose,
        })
    }

    #[must_use]
    pub const fn robot_mode(&self) -> bool {
        self.output_format.is_robot()
    }

    #[must_use]
    pub const fn robot_style(&self) -> RobotStyle {
        RobotStyle {
            pretty: self.config.robot.pretty,
            include_metadata: self.config.robot.include_metadata,
        }
    }

    fn find_root() -> Result<PathBuf> {
        if let Ok(root) = std::env::var("SKILLIO_ROOT") {
            return Ok(PathBuf::from(root));
        }
        let cwd = std::env::current_dir()?;
        if let Some(found) = find_upwards(&cwd, ROOT_DIR) {
            return Ok(found);
        }

        let data_dir = dirs::data_dir()
            .ok_or_else(|| SkillioError::MissingConfig("data directory not found".to_string()))?;
        Ok(data_dir.join("skillio"))
    }
}

fn default_catalog_path(root: &Path) -> PathBuf {
    root.join("index").join("skills.yaml")
}

fn find_upwards(start: &Path, name: &str) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(name);
        if candidate.is_dir() {
            return Some(candidate);
        }
        current = dir.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_upwards_walks_parents() {
        let temp = tempfile::tempdir().unwrap();
        let marker = temp.path().join(ROOT_DIR);
        let nested = temp.path().join("a/b/c");
        std::fs::create_dir_all(&marker).unwrap();
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_upwards(&nested, ROOT_DIR), Some(marker));
        assert_eq!(find_upwards(&nested, ".absent-marker"), None);
    }

    #[test]
    fn test_default_catalog_path() {
        assert_eq!(
            default_catalog_path(Path::new("/data/skillio")),
            PathBuf::from("/data/skillio/index/skills.yaml")
        );
    }
}

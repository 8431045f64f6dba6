//! Config loading and service wiring shared by every subcommand.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use studymate_config::{config_dir, config_file_path, load_and_prepare, StudyMateConfig};
use studymate_gateway::Services;

/// A loaded, validated config and where it came from.
pub struct AppContext {
    pub config: StudyMateConfig,
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
}

impl AppContext {
    /// Load `explicit` or the default config file. Validation errors are fatal.
    pub async fn load(explicit: Option<PathBuf>) -> Result<Self> {
        let (config_dir, config_path) = locate(explicit);
        debug!(path = %config_path.display(), "Loading config");
        let config = load_and_prepare(&config_path)
            .await
            .with_context(|| format!("Failed to load {}", config_path.display()))?;
        Ok(Self {
            config,
            config_dir,
            config_path,
        })
    }

    pub fn services(&self) -> Result<Services> {
        Services::from_config(&self.config, &self.config_dir)
    }

    pub fn log_level(&self) -> String {
        self.config
            .logging()
            .level
            .unwrap_or_else(|| studymate_config::defaults::DEFAULT_LOG_LEVEL.to_string())
    }
}

/// Config directory and file for an optional explicit path.
pub fn locate(explicit: Option<PathBuf>) -> (PathBuf, PathBuf) {
    match explicit {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            (dir, path)
        }
        None => {
            let dir = config_dir();
            let path = config_file_path(&dir);
            (dir, path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_anchors_data_dir() {
        let (dir, path) = locate(Some(PathBuf::from("/srv/study/config.yaml")));
        assert_eq!(dir, PathBuf::from("/srv/study"));
        assert_eq!(path, PathBuf::from("/srv/study/config.yaml"));
    }

    #[test]
    fn bare_file_name_uses_current_dir() {
        let (dir, _) = locate(Some(PathBuf::from("config.yaml")));
        assert_eq!(dir, PathBuf::from("."));
    }
}

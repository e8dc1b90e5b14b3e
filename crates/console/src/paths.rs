//! Cross-platform application paths

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConsoleError;

#[derive(Debug, Clone)]
pub struct AppPaths {
    data_dir: PathBuf,
    config_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> Result<Self, ConsoleError> {
        let data_dir = Self::get_data_dir()?;
        let config_dir = Self::get_config_dir()?;

        // Ensure the output directory exists
        fs::create_dir_all(&data_dir).map_err(|e| {
            ConsoleError::Paths(format!(
                "Failed to create data directory {:?}: {}",
                data_dir, e
            ))
        })?;

        Ok(Self {
            data_dir,
            config_dir,
        })
    }

    #[cfg(test)]
    pub fn rooted(dir: &Path) -> Self {
        Self {
            data_dir: dir.to_path_buf(),
            config_dir: dir.to_path_buf(),
        }
    }

    fn get_data_dir() -> Result<PathBuf, ConsoleError> {
        let base = dirs::data_dir()
            .ok_or_else(|| ConsoleError::Paths("Could not determine data directory".into()))?;
        Ok(base.join("dynaview"))
    }

    fn get_config_dir() -> Result<PathBuf, ConsoleError> {
        let base = dirs::config_dir()
            .ok_or_else(|| ConsoleError::Paths("Could not determine config directory".into()))?;
        Ok(base.join("dynaview"))
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("console.json")
    }

    pub fn scene_file(out_dir: &Path) -> PathBuf {
        out_dir.join("scene.svg")
    }

    pub fn chart_file(out_dir: &Path) -> PathBuf {
        out_dir.join("chart.svg")
    }
}

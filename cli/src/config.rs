use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the platform data directory.
pub const DATA_DIR_ENV: &str = "NUTRITRACK_DATA_DIR";

pub struct Config {
    pub db_path: PathBuf,
    pub session_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let data_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => ProjectDirs::from("", "", "nutritrack")
                .context("Could not determine home directory")?
                .data_dir()
                .to_path_buf(),
        };
        Self::in_dir(&data_dir)
    }

    pub fn in_dir(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Ok(Config {
            db_path: data_dir.join("nutritrack.db"),
            session_path: data_dir.join("session.json"),
        })
    }
}

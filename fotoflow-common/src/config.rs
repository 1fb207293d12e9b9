//! Data-root resolution and on-disk storage layout

use crate::{Error, Result};
use std::path::PathBuf;

/// Resolve the fotoflow data root, in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file (`root_folder` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_root(cli_arg: Option<&str>, env_var_name: &str) -> Result<PathBuf> {
    if let Some(path) = cli_arg {
        tracing::debug!("Data root from command line: {path}");
        return Ok(PathBuf::from(path));
    }

    if let Ok(path) = std::env::var(env_var_name) {
        tracing::debug!("Data root from {env_var_name}: {path}");
        return Ok(PathBuf::from(path));
    }

    if let Ok(config_path) = find_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return Ok(PathBuf::from(root));
                }
            }
        }
    }

    Ok(default_data_root())
}

/// Locate the platform config file, if one exists
fn find_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("fotoflow").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/fotoflow/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// OS-dependent default data root
fn default_data_root() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("fotoflow"))
        .unwrap_or_else(|| PathBuf::from("./fotoflow_data"))
}

/// On-disk layout of the fotoflow data root.
///
/// ```text
/// <root>/fotoflow.db            SQLite database
/// <root>/batches/<batch_id>/    uploaded source photos for one batch
/// <root>/processed/<reg_id>/    materialized per-person copies
/// ```
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Path of the shared SQLite database
    pub fn database_path(&self) -> PathBuf {
        self.root.join("fotoflow.db")
    }

    /// Directory holding one batch's uploaded source photos
    pub fn batch_dir(&self, batch_id: i64) -> PathBuf {
        self.root.join("batches").join(batch_id.to_string())
    }

    /// Directory holding one person's materialized photo copies
    pub fn person_dir(&self, registration_id: i64) -> PathBuf {
        self.root.join("processed").join(registration_id.to_string())
    }

    /// Create the base directories if missing
    pub fn ensure_base_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(self.root.join("batches"))?;
        std::fs::create_dir_all(self.root.join("processed"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths_are_batch_and_person_scoped() {
        let layout = StorageLayout::new("/data/fotoflow");
        assert_eq!(
            layout.batch_dir(12),
            PathBuf::from("/data/fotoflow/batches/12")
        );
        assert_eq!(
            layout.person_dir(34),
            PathBuf::from("/data/fotoflow/processed/34")
        );
        assert_eq!(
            layout.database_path(),
            PathBuf::from("/data/fotoflow/fotoflow.db")
        );
    }

    #[test]
    fn ensure_base_dirs_creates_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(tmp.path().join("data"));
        layout.ensure_base_dirs().unwrap();
        assert!(tmp.path().join("data/batches").is_dir());
        assert!(tmp.path().join("data/processed").is_dir());
    }

    #[test]
    fn cli_argument_wins_resolution() {
        let root = resolve_data_root(Some("/tmp/explicit"), "FOTOFLOW_TEST_UNSET").unwrap();
        assert_eq!(root, PathBuf::from("/tmp/explicit"));
    }
}

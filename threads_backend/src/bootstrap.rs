use crate::config::ThreadsConfig;
use crate::database::Database;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub struct BootstrapResources {
    pub directories_created: Vec<String>,
    pub database_initialized: bool,
    pub database: Database,
}

/// Prepares the on-disk layout and an up-to-date database.
pub fn initialize(config: &ThreadsConfig) -> Result<BootstrapResources> {
    let mut directories_created = Vec::new();
    create_dir_if_missing(&config.paths.base, &mut directories_created)?;
    create_dir_if_missing(&config.paths.data_dir, &mut directories_created)?;
    create_dir_if_missing(&config.paths.logs_dir, &mut directories_created)?;

    let database = Database::connect(&config.paths)?;
    let database_initialized = database.ensure_migrations()?;

    tracing::info!(
        directories_created = ?directories_created,
        database_initialized,
        db_path = %config.paths.db_path.display(),
        "bootstrap complete"
    );

    Ok(BootstrapResources {
        directories_created,
        database_initialized,
        database,
    })
}

fn create_dir_if_missing(path: &Path, created: &mut Vec<String>) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory {}", path.display()))?;
        created.push(path.display().to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThreadsPaths;

    #[test]
    fn second_run_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ThreadsPaths::from_base_dir(dir.path().join("home")).unwrap();
        let config = ThreadsConfig::new(0, paths);

        let first = initialize(&config).unwrap();
        assert!(first.database_initialized);
        assert_eq!(first.directories_created.len(), 3);
        assert!(config.paths.db_path.exists());
        drop(first);

        let second = initialize(&config).unwrap();
        assert!(!second.database_initialized);
        assert!(second.directories_created.is_empty());
    }
}

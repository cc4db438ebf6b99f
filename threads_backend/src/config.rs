use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ThreadsConfig {
    pub api_port: u16,
    pub paths: ThreadsPaths,
    pub feed: FeedConfig,
}

impl ThreadsConfig {
    pub fn from_env() -> Result<Self> {
        let paths = match env::var("THREADS_HOME") {
            Ok(raw) if !raw.trim().is_empty() => ThreadsPaths::from_base_dir(raw.trim())?,
            _ => ThreadsPaths::discover()?,
        };
        let api_port = env::var("THREADS_API_PORT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(8080);
        let feed = FeedConfig::from_env();
        Ok(Self {
            api_port,
            paths,
            feed,
        })
    }

    pub fn new(api_port: u16, paths: ThreadsPaths) -> Self {
        Self {
            api_port,
            paths,
            feed: FeedConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Author lookups allowed in flight during one hydration.
    pub hydration_concurrency: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            hydration_concurrency: 1,
        }
    }
}

impl FeedConfig {
    pub fn from_env() -> Self {
        let hydration_concurrency = env::var("THREADS_HYDRATION_CONCURRENCY")
            .ok()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(1);
        Self {
            hydration_concurrency,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ThreadsPaths {
    pub base: PathBuf,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub logs_dir: PathBuf,
}

impl ThreadsPaths {
    pub fn discover() -> Result<Self> {
        let exe_path = std::env::current_exe()
            .map_err(|err| anyhow!("failed to resolve current executable: {err}"))?;
        let base = exe_path
            .parent()
            .ok_or_else(|| anyhow!("executable path missing parent"))?
            .to_path_buf();
        Self::from_base_dir(base)
    }

    pub fn from_base_dir<P: AsRef<Path>>(base: P) -> Result<Self> {
        let base = base.as_ref().to_path_buf();
        let data_dir = base.join("data");
        let db_path = data_dir.join("threads.db");
        let logs_dir = base.join("logs");

        Ok(Self {
            base,
            data_dir,
            db_path,
            logs_dir,
        })
    }
}

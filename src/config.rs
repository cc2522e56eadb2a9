//! Run configuration, optionally read from a TOML file.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{GeoError, Result};

pub const NOMINATIM_API_URL: &str = "https://nominatim.openstreetmap.org";
pub const USER_AGENT: &str = "MOOD Geocoder";
const APP_DIR_NAME: &str = "epigeo";
const CACHE_FILE_NAME: &str = "cache.db";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub geocoder: GeocoderConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
    /// Pause before every outbound request, in milliseconds
    pub request_delay_ms: u64,
    pub timeout_secs: u64,
    pub search_limit: u32,
    pub reverse_zoom: u8,
    /// Largest token bag still searched by permutation
    pub max_permutation_tokens: usize,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: NOMINATIM_API_URL.to_string(),
            user_agent: USER_AGENT.to_string(),
            request_delay_ms: 2000,
            timeout_secs: 60,
            search_limit: 1,
            reverse_zoom: 10,
            max_permutation_tokens: 5,
        }
    }
}

impl GeocoderConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the feature cache; defaults to the XDG data dir
    pub work_dir: Option<PathBuf>,
    /// Directory holding the static reference tables
    pub reference_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            work_dir: None,
            reference_dir: PathBuf::from("data"),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| GeoError::io(path, e))?;
        toml::from_str(&content).map_err(|source| GeoError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Directory for run state, created on first use.
    ///
    /// Resolution order: `paths.work_dir`, `$XDG_DATA_HOME/epigeo`,
    /// `~/.local/share/epigeo`. The parent data directory must already exist.
    pub fn work_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.paths.work_dir {
            ensure_dir(dir)?;
            return Ok(dir.clone());
        }

        let data_dir = match std::env::var_os("XDG_DATA_HOME") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => {
                let home = std::env::var_os("HOME")
                    .ok_or_else(|| GeoError::Config("HOME is not set".to_string()))?;
                PathBuf::from(home).join(".local").join("share")
            }
        };

        if !data_dir.is_dir() {
            return Err(GeoError::Config(format!(
                "data directory '{}' does not exist",
                data_dir.display()
            )));
        }

        let work_dir = data_dir.join(APP_DIR_NAME);
        ensure_dir(&work_dir)?;
        Ok(work_dir)
    }

    pub fn cache_path(&self) -> Result<PathBuf> {
        Ok(self.work_dir()?.join(CACHE_FILE_NAME))
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|_| {
        GeoError::Config(format!(
            "directory '{}' appears to be non-writable",
            dir.display()
        ))
    })
}

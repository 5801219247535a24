use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::model::{ContactDate, DEFAULT_TAG_COLOR};

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "Dunbar";
const APP_NAME: &str = "dunbar";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover(config_override: Option<PathBuf>) -> Result<Self> {
        let paths = ConfigPaths::discover(config_override)?;
        Ok(Self { paths })
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// Reads the config file if there is one. Nothing is written back: all
    /// state lives on the server.
    pub fn load(&self) -> Result<AppConfig> {
        if !self.paths.config_file.exists() {
            tracing::debug!(
                path = %self.paths.config_file.display(),
                "no config file, using defaults"
            );
            let mut cfg = AppConfig::default();
            cfg.post_load()?;
            return Ok(cfg);
        }
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load()?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
}

impl ConfigPaths {
    pub fn discover(config_override: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = config_override {
            let config_dir = if path.is_dir() {
                path.clone()
            } else {
                path.parent().map(Path::to_path_buf).unwrap_or_default()
            };
            let config_file = if path.is_dir() {
                path.join("config.toml")
            } else {
                path
            };
            return Ok(Self {
                config_dir,
                config_file,
            });
        }

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;
        let config_dir = project_dirs.config_dir().to_path_buf();
        Ok(Self {
            config_file: config_dir.join("config.toml"),
            config_dir,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub limits: Limits,
    pub defaults: Defaults,
    pub rename: RenameConfig,
}

impl AppConfig {
    fn post_load(&mut self) -> Result<()> {
        Url::parse(self.server.base_url.trim())
            .with_context(|| format!("invalid server.base_url {:?}", self.server.base_url))?;
        let fallback = Limits::default();
        if self.limits.max_contacts == 0 {
            tracing::warn!(
                fallback = fallback.max_contacts,
                "limits.max_contacts is zero, falling back"
            );
            self.limits.max_contacts = fallback.max_contacts;
        }
        if self.limits.max_tags == 0 {
            tracing::warn!(
                fallback = fallback.max_tags,
                "limits.max_tags is zero, falling back"
            );
            self.limits.max_tags = fallback.max_tags;
        }
        if self.defaults.tag_color.trim().is_empty() {
            self.defaults.tag_color = DEFAULT_TAG_COLOR.to_owned();
        }
        Ok(())
    }

    pub fn override_server(&mut self, base_url: &str) -> Result<()> {
        Url::parse(base_url).with_context(|| format!("invalid server url {base_url:?}"))?;
        self.server.base_url = base_url.to_owned();
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    /// No timeout unless set: a hung call stays pending.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_owned(),
            request_timeout_secs: None,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Client-side mirror of the server's ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_contacts: usize,
    pub max_tags: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_contacts: 150,
            max_tags: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Used when a contact form leaves the date blank.
    pub contact_date: ContactDate,
    pub tag_color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            contact_date: ContactDate::from(time::macros::date!(1947 - 06 - 28)),
            tag_color: DEFAULT_TAG_COLOR.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenameConfig {
    pub compensation: RenameCompensation,
}

/// What a rename does when the create step fails after the delete step
/// succeeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenameCompensation {
    /// Report the loss and leave the dataset one contact short.
    #[default]
    #[serde(rename = "none")]
    NoRollback,
    /// Re-create the original contact from the captured edit.
    RestoreOriginal,
}

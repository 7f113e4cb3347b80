//! TOML configuration for the actor.
//!
//! Every section is optional; missing values fall back to compiled defaults.
//!
//! ```toml
//! [hub]
//! host = "tron"
//! port = 6093
//!
//! [commands]
//! host = "0.0.0.0"
//! port = 9876
//!
//! [viewer]
//! host = "localhost"
//! port = 9000
//!
//! [cameras]
//! ids = ["b1", "r1", "n1"]
//!
//! [site]
//! location = "S"
//! required = "S"
//!
//! [routing]
//! raw_subdir = "sps"
//!
//! [attach]
//! delay_secs = 3
//!
//! [identity.hosts]
//! "pfsa-usr01" = "ginga_usr01"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ActorError, Result};
use crate::models::CameraId;

/// Environment variable consulted when `[site] location` is not set.
pub const SITE_ENV_VAR: &str = "PFS_SITE";

// ── Sections ──────────────────────────────────────────────────────────────────

/// Where the hub publishes keyword traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub host: String,
    pub port: u16,
    /// Seconds to wait before reconnecting after the hub drops us.
    pub reconnect_secs: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6093,
            reconnect_secs: 5,
        }
    }
}

/// Listener for commands forwarded by the hub. Port 0 lets the OS choose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub host: String,
    pub port: u16,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
        }
    }
}

/// Remote viewer RPC endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CamerasConfig {
    pub ids: Vec<CameraId>,
}

impl Default for CamerasConfig {
    fn default() -> Self {
        Self {
            ids: CameraId::all(),
        }
    }
}

/// Deployment site and the site raw/SAC events are restricted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub location: Option<String>,
    /// `None` disables the filter entirely.
    pub required: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            location: None,
            required: Some("S".to_string()),
        }
    }
}

impl SiteConfig {
    /// Configured location, else the `PFS_SITE` environment variable.
    pub fn resolve_location(&self) -> Option<String> {
        self.location
            .clone()
            .or_else(|| std::env::var(SITE_ENV_VAR).ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Literal directory inserted between the night directory and file name
    /// of raw exposures.
    pub raw_subdir: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            raw_subdir: "sps".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachConfig {
    /// 0 attaches callbacks immediately at construction.
    pub delay_secs: u64,
}

impl AttachConfig {
    /// `None` means attach immediately.
    pub fn delay(&self) -> Option<Duration> {
        (self.delay_secs > 0).then(|| Duration::from_secs(self.delay_secs))
    }
}

/// Names of the upstream actors and keywords we subscribe to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Camera actors are named `<camera_prefix><camera>`, e.g. `ccd_r1`.
    pub camera_prefix: String,
    pub camera_keyword: String,
    pub sac_model: String,
    pub sac_keyword: String,
    pub detrend_model: String,
    pub detrend_keyword: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            camera_prefix: "ccd_".to_string(),
            camera_keyword: "filepath".to_string(),
            sac_model: "sac".to_string(),
            sac_keyword: "filepath".to_string(),
            detrend_model: "drp".to_string(),
            detrend_keyword: "detrend".to_string(),
        }
    }
}

impl ModelsConfig {
    pub fn camera_model(&self, camera: &CameraId) -> String {
        format!("{}{}", self.camera_prefix, camera)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub default_name: String,
    /// Extra hostname → actor name entries; these win over the built-ins.
    pub hosts: BTreeMap<String, String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            default_name: crate::identity::DEFAULT_ACTOR_NAME.to_string(),
            hosts: BTreeMap::new(),
        }
    }
}

// ── ActorConfig ───────────────────────────────────────────────────────────────

/// Complete actor configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    pub hub: HubConfig,
    pub commands: CommandsConfig,
    pub viewer: ViewerConfig,
    pub cameras: CamerasConfig,
    pub site: SiteConfig,
    pub routing: RoutingConfig,
    pub attach: AttachConfig,
    pub models: ModelsConfig,
    pub identity: IdentityConfig,
}

impl ActorConfig {
    /// Default user config location: `<config_dir>/ginga-actor/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ginga-actor").join("config.toml"))
    }

    /// Load from an explicit path, or from [`default_path`](Self::default_path)
    /// when it exists, or fall back to compiled defaults.
    ///
    /// An explicit path that cannot be read is an error; a missing default
    /// file is not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                tracing::debug!("no config file found; using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load and parse a specific file. Missing sections take their defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ActorError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content).map_err(|message| ActorError::ConfigParse {
            path: path.to_path_buf(),
            message,
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    fn parse(content: &str) -> std::result::Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

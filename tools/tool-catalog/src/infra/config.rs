use crate::domain::registration::ReregistrationPolicy;
use crate::infra::metrics::MetricsServerConfig;
use crate::shared::types::DEFAULT_MAX_FRAME_BYTES;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CONFIG_DIR_ENV: &str = "APP_CONFIG_DIR";
const CONFIG_PROFILE_ENV: &str = "APP_CONFIG_PROFILE";
const DEFAULT_CONFIG_DIR: &str = "config";
const DEFAULT_PROFILE: &str = "default";
const DEFAULT_SERVER_NAME: &str = "tool-catalog";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub server_name: Option<String>,
    pub metrics_addr: Option<String>,
    pub metrics_auth_token: Option<String>,
    #[serde(default)]
    pub reregistration_policy: ReregistrationPolicy,
    pub max_frame_bytes: Option<usize>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let base_dir = env::var(CONFIG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_DIR));
        Self::load_from_dir(&base_dir)
    }

    /// Layers `default.toml`, the active profile, `local.toml`, then the
    /// environment. Later layers win; missing files are skipped.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut config = AppConfig::default();
        let mut overlays = Vec::new();

        if dir.exists() {
            let mut profiles = vec![DEFAULT_PROFILE.to_string()];
            if let Ok(active_profile) = env::var(CONFIG_PROFILE_ENV) {
                if !active_profile.trim().is_empty() && active_profile != DEFAULT_PROFILE {
                    profiles.push(active_profile);
                }
            }
            profiles.push("local".to_string());

            for profile in profiles {
                let candidate = dir.join(format!("{profile}.toml"));
                if let Some(overlay) = ConfigOverlay::from_file(&candidate)? {
                    overlays.push(overlay);
                }
            }
        }

        overlays.push(ConfigOverlay::from_env());

        for overlay in overlays {
            config.apply_overlay(overlay);
        }

        Ok(config)
    }

    pub fn server_name(&self) -> &str {
        self.server_name.as_deref().unwrap_or(DEFAULT_SERVER_NAME)
    }

    /// Longest accepted input line, in bytes.
    pub fn max_frame_bytes(&self) -> usize {
        self.max_frame_bytes
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_MAX_FRAME_BYTES)
    }

    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        if let Some(value) = overlay.server_name {
            self.server_name = Some(value);
        }
        if let Some(value) = overlay.metrics_addr {
            self.metrics_addr = Some(value);
        }
        if let Some(value) = overlay.metrics_auth_token {
            self.metrics_auth_token = Some(value);
        }
        if let Some(policy) = overlay.reregistration_policy {
            self.reregistration_policy = policy;
        }
        if let Some(limit) = overlay.max_frame_bytes {
            self.max_frame_bytes = Some(limit);
        }
    }

    pub fn metrics_server_config(&self) -> Result<Option<MetricsServerConfig>> {
        let addr = match self.metrics_addr.as_ref() {
            Some(addr) => addr
                .parse::<SocketAddr>()
                .with_context(|| format!("parse METRICS_ADDR '{}'", addr))?,
            None => return Ok(None),
        };
        Ok(Some(MetricsServerConfig {
            addr,
            auth_token: self.metrics_auth_token.clone(),
        }))
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverlay {
    server_name: Option<String>,
    metrics_addr: Option<String>,
    metrics_auth_token: Option<String>,
    reregistration_policy: Option<ReregistrationPolicy>,
    max_frame_bytes: Option<usize>,
}

impl ConfigOverlay {
    fn from_file(path: &Path) -> Result<Option<Self>> {
        if !path.is_file() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let overlay: Self = toml::from_str(&contents)
            .with_context(|| format!("parse config file {}", path.display()))?;
        Ok(Some(overlay))
    }

    fn from_env() -> Self {
        let reregistration_policy = env::var("REREGISTRATION_POLICY").ok().and_then(|raw| {
            ReregistrationPolicy::from_str(&raw)
                .inspect_err(|err| tracing::warn!(%err, "ignoring REREGISTRATION_POLICY"))
                .ok()
        });
        let max_frame_bytes = env::var("MAX_FRAME_BYTES").ok().and_then(|raw| {
            raw.trim()
                .parse::<usize>()
                .inspect_err(|err| tracing::warn!(%err, raw = %raw, "ignoring MAX_FRAME_BYTES"))
                .ok()
        });
        Self {
            server_name: env::var("CATALOG_SERVER_NAME").ok(),
            metrics_addr: env::var("METRICS_ADDR").ok(),
            metrics_auth_token: env::var("METRICS_AUTH_TOKEN").ok(),
            reregistration_policy,
            max_frame_bytes,
        }
    }
}

use crate::PermissionCatalog;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_CATALOG: &str = "TRELLIS_AUTHZ_CATALOG";
pub const ENV_MEMBERSHIP_CACHE_TTL_MS: &str = "TRELLIS_AUTHZ_MEMBERSHIP_CACHE_TTL_MS";
pub const ENV_CONFIG: &str = "TRELLIS_AUTHZ_CONFIG";

// Authorization engine configuration sourced from environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthzConfig {
    // YAML catalog replacing the built-in one.
    pub catalog_path: Option<PathBuf>,
    // Membership cache TTL; `None` disables the cache.
    pub membership_cache_ttl: Option<Duration>,
}

#[derive(Debug, Deserialize)]
struct AuthzConfigOverride {
    catalog_path: Option<String>,
    membership_cache_ttl_ms: Option<u64>,
}

impl AuthzConfig {
    pub fn from_env() -> Result<Self> {
        let catalog_path = std::env::var(ENV_CATALOG)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let membership_cache_ttl = match std::env::var(ENV_MEMBERSHIP_CACHE_TTL_MS) {
            Ok(value) => ttl_from_ms(
                value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| {
                        trellis_common::Error::Config(format!(
                            "{ENV_MEMBERSHIP_CACHE_TTL_MS} must be an integer, got {value:?}"
                        ))
                    })
                    .with_context(|| format!("parse {ENV_MEMBERSHIP_CACHE_TTL_MS}"))?,
            ),
            Err(_) => None,
        };
        Ok(Self {
            catalog_path,
            membership_cache_ttl,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var(ENV_CONFIG) {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read {ENV_CONFIG}: {path}"))?;
            config.apply_yaml(&contents)?;
        }
        Ok(config)
    }

    fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        let override_cfg: AuthzConfigOverride =
            serde_yaml::from_str(contents).with_context(|| "parse authz config yaml")?;
        if let Some(value) = override_cfg.catalog_path {
            self.catalog_path = Some(PathBuf::from(value));
        }
        if let Some(value) = override_cfg.membership_cache_ttl_ms {
            self.membership_cache_ttl = ttl_from_ms(value);
        }
        Ok(())
    }

    /// The configured catalog, or the built-in one when no path is set.
    pub fn load_catalog(&self) -> Result<PermissionCatalog> {
        let Some(path) = &self.catalog_path else {
            return Ok(PermissionCatalog::builtin());
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("read permission catalog: {}", path.display()))?;
        let catalog = PermissionCatalog::from_yaml_str(&contents)
            .with_context(|| format!("parse permission catalog: {}", path.display()))?;
        tracing::info!(path = %path.display(), "loaded permission catalog");
        Ok(catalog)
    }
}

fn ttl_from_ms(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_millis(value))
}

//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use rota_core::types::{MinistryId, OrganizationId, Role};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// The ministry this installation schedules for.
    pub ministry: String,

    /// The organization the ministry belongs to. Ministries sharing an
    /// organization share a member pool for conflict detection.
    pub organization: String,

    /// Role specs, in roster column order. Either a bare name ("Camera") or
    /// "Base:N" to expand into N numbered slots ("Vocal:3" gives Vocal_1,
    /// Vocal_2, Vocal_3).
    pub roles: Vec<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("ministry", &self.ministry)
            .field("organization", &self.organization)
            .field("roles", &self.roles)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("rota.db"),
            ministry: String::new(),
            organization: String::new(),
            roles: Vec::new(),
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (ROTA_*)
        figment = figment.merge(Env::prefixed("ROTA_"));

        figment.extract()
    }

    /// The configured ministry as a validated id.
    pub fn ministry_id(&self) -> Result<MinistryId> {
        MinistryId::new(self.ministry.clone())
            .context("no ministry configured (set `ministry` in config.toml or ROTA_MINISTRY)")
    }

    /// The configured organization as a validated id.
    pub fn organization_id(&self) -> Result<OrganizationId> {
        OrganizationId::new(self.organization.clone()).context(
            "no organization configured (set `organization` in config.toml or ROTA_ORGANIZATION)",
        )
    }

    /// The configured roles, expanded into roster columns.
    pub fn role_list(&self) -> Result<Vec<Role>> {
        let mut roles = Vec::new();
        for spec in &self.roles {
            match spec.split_once(':') {
                Some((base, count)) => {
                    let count: u32 = count
                        .parse()
                        .with_context(|| format!("bad slot count in role spec {spec:?}"))?;
                    if count == 0 {
                        bail!("role spec {spec:?} expands to zero slots");
                    }
                    roles.extend(Role::expand(base, count)?);
                }
                None => roles.push(Role::new(spec.clone())?),
            }
        }
        Ok(roles)
    }
}

/// Returns the platform-specific config directory for rota.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("rota"))
}

/// Returns the platform-specific data directory for rota.
///
/// On Linux: `~/.local/share/rota`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("rota"))
}

//! Configuration loading and management.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use rb_core::{Calendar, ProjectId, SchedulingConfig, UserId, Visibility};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Acting user; owns the chart preferences.
    pub user_id: Option<i64>,

    /// Daily work-hours for users without an override.
    pub workday_length: f64,

    /// Per-user daily work-hours, keyed by user id.
    pub workday_lengths: HashMap<String, f64>,

    /// 1 = Monday … 7 = Sunday.
    pub first_weekday: u8,

    /// ISO weekday numbers that are never work days.
    pub non_working_weekdays: Vec<u8>,

    /// Projects the acting user may see. Unset means all of them.
    pub visible_projects: Option<Vec<i64>>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let scheduling = SchedulingConfig::default();
        Self {
            database_path: data_dir.join("rb.db"),
            user_id: None,
            workday_length: scheduling.default_workday_length,
            workday_lengths: HashMap::new(),
            first_weekday: scheduling.first_weekday,
            non_working_weekdays: scheduling.non_working_weekdays,
            visible_projects: None,
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

        // Load from environment variables (RB_*)
        figment = figment.merge(Env::prefixed("RB_"));

        figment.extract()
    }

    /// The engine's view of the scheduling keys.
    pub fn scheduling(&self) -> Result<SchedulingConfig> {
        let mut workday_lengths = HashMap::with_capacity(self.workday_lengths.len());
        for (user, hours) in &self.workday_lengths {
            let user: UserId = user
                .parse()
                .with_context(|| format!("invalid user id in workday_lengths: {user}"))?;
            workday_lengths.insert(user, *hours);
        }
        Ok(SchedulingConfig {
            default_workday_length: self.workday_length,
            workday_lengths,
            first_weekday: self.first_weekday,
            non_working_weekdays: self.non_working_weekdays.clone(),
        })
    }

    pub fn calendar(&self) -> Result<Calendar> {
        Calendar::from_config(&self.scheduling()?).context("invalid scheduling configuration")
    }

    pub fn visibility(&self) -> Result<Visibility> {
        let Some(projects) = &self.visible_projects else {
            return Ok(Visibility::All);
        };
        projects
            .iter()
            .map(|&id| ProjectId::new(id).context("invalid project id in visible_projects"))
            .collect()
    }

    pub fn user(&self) -> Result<Option<UserId>> {
        self.user_id
            .map(|id| UserId::new(id).context("invalid user_id"))
            .transpose()
    }
}

/// Returns the platform-specific config directory for rb.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("rb"))
}

/// Returns the platform-specific data directory for rb.
///
/// On Linux: `~/.local/share/rb`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("rb"))
}

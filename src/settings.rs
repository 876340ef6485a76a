use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

const CONFIG_FILE: &str = "harvest";
const ENV_PREFIX: &str = "HARVEST";

pub const HOME_URL: &str = "https://www.linkedin.com";
pub const LOGIN_URL: &str = "https://www.linkedin.com/login";
pub const CONNECTIONS_URL: &str = "https://www.linkedin.com/mynetwork/invite-connect/connections/";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub db_path: PathBuf,
    pub cookie_path: PathBuf,
    pub unknown_locations_path: PathBuf,
    pub linkedin_email: Option<String>,
    pub linkedin_password: Option<String>,
    pub headless: bool,
    pub scroll_pause_ms: u64,
    pub max_idle_loops: usize,
    pub page_settle_ms: u64,
    pub render_pause_ms: u64,
    pub contact_pause_ms: u64,
    pub login_pause_ms: u64,
    pub submit_pause_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            db_path: PathBuf::from("data/connections.sqlite"),
            cookie_path: PathBuf::from("linkedin_cookies.json"),
            unknown_locations_path: PathBuf::from("unknown_locations.txt"),
            linkedin_email: None,
            linkedin_password: None,
            headless: false,
            scroll_pause_ms: 1700,
            max_idle_loops: 6,
            page_settle_ms: 3000,
            render_pause_ms: 3000,
            contact_pause_ms: 2000,
            login_pause_ms: 2000,
            submit_pause_ms: 5000,
        }
    }
}

impl Settings {
    /// `harvest.toml` (optional) overridden by `HARVEST_*` environment variables.
    pub fn load() -> Result<Self> {
        Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn pauses(&self) -> Pauses {
        Pauses {
            scroll: Duration::from_millis(self.scroll_pause_ms),
            settle: Duration::from_millis(self.page_settle_ms),
            render: Duration::from_millis(self.render_pause_ms),
            contact: Duration::from_millis(self.contact_pause_ms),
            login: Duration::from_millis(self.login_pause_ms),
            submit: Duration::from_millis(self.submit_pause_ms),
        }
    }
}

/// Fixed waits after actions that kick off asynchronous rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pauses {
    pub scroll: Duration,
    pub settle: Duration,
    pub render: Duration,
    pub contact: Duration,
    pub login: Duration,
    pub submit: Duration,
}

impl Pauses {
    #[cfg(test)]
    pub fn none() -> Self {
        Pauses {
            scroll: Duration::ZERO,
            settle: Duration::ZERO,
            render: Duration::ZERO,
            contact: Duration::ZERO,
            login: Duration::ZERO,
            submit: Duration::ZERO,
        }
    }
}

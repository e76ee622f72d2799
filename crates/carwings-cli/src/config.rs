//! Configuration file handling for leaf-info
//!
//! ```toml
//! [account]
//! username = "user@example.com"
//! password = "secret"
//! region = "US"
//!
//! [refresh]
//! interval_secs = 30
//! max_attempts = 3
//! ```

use anyhow::{Context, Result};
use carwings_client::{Credentials, PollPolicy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Region used when neither flags nor the config file name one
const DEFAULT_REGION: &str = "US";

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    /// Disable colored output
    pub no_color: Option<bool>,
}

/// `[account]` table
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct AccountConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub region: Option<String>,
    pub base_url: Option<String>,
}

impl fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("region", &self.region)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// `[refresh]` table
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RefreshConfig {
    pub interval_secs: Option<u64>,
    pub max_attempts: Option<u32>,
}

impl RefreshConfig {
    /// Poll policy with command-line overrides applied over file values
    pub fn policy(&self, interval_secs: Option<u64>, max_attempts: Option<u32>) -> PollPolicy {
        let default = PollPolicy::default();
        PollPolicy::new(
            interval_secs
                .or(self.interval_secs)
                .map(Duration::from_secs)
                .unwrap_or(default.interval),
            max_attempts
                .or(self.max_attempts)
                .unwrap_or(default.max_attempts),
        )
    }
}

/// Account settings given on the command line or through the environment
#[derive(Debug, Default)]
pub struct AccountArgs<'a> {
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
    pub region: Option<&'a str>,
    pub base_url: Option<&'a str>,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        Self::load_if_exists(&Self::config_path()?)
    }

    /// Load `path` when it exists; a missing file yields the defaults
    pub fn load_if_exists(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("carwings-cli");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(&self, args: &AccountArgs<'_>, no_color: bool) -> Result<MergedConfig> {
        let account = &self.account;

        let username = args
            .username
            .map(String::from)
            .or_else(|| account.username.clone())
            .context("No username given (use --username, CARWINGS_USERNAME or [account] username)")?;
        let password = args
            .password
            .map(String::from)
            .or_else(|| account.password.clone())
            .context("No password given (use --password, CARWINGS_PASSWORD or [account] password)")?;
        let region = args
            .region
            .map(String::from)
            .or_else(|| account.region.clone())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let mut credentials = Credentials::new(username, password, region);
        if let Some(base_url) = args.base_url.map(String::from).or_else(|| account.base_url.clone()) {
            credentials = credentials.with_base_url(base_url);
        }

        Ok(MergedConfig {
            credentials,
            no_color: no_color || self.no_color.unwrap_or(false),
        })
    }
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub credentials: Credentials,
    pub no_color: bool,
}

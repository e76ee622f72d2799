//! Account credentials and region selection

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CarwingsError;

/// Gateway used by every supported region unless overridden
pub const DEFAULT_BASE_URL: &str = "https://gdcportalgw.its-mo.com/api_v230317_NE/gdc/";

/// Vendor region an account is registered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Region {
    NorthAmerica,
    Europe,
    Canada,
    Australia,
    Japan,
}

impl Region {
    /// Vendor `RegionCode` sent with every request
    pub fn code(&self) -> &'static str {
        match self {
            Region::NorthAmerica => "NNA",
            Region::Europe => "NE",
            Region::Canada => "NCI",
            Region::Australia => "NMA",
            Region::Japan => "NML",
        }
    }

    /// Base URL of the gateway serving this region
    pub fn base_url(&self) -> &'static str {
        // All regions are served by one gateway; RegionCode routes the account.
        DEFAULT_BASE_URL
    }
}

impl FromStr for Region {
    type Err = CarwingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NNA" | "US" | "USA" => Ok(Region::NorthAmerica),
            "NE" | "EU" | "UK" => Ok(Region::Europe),
            "NCI" | "CA" => Ok(Region::Canada),
            "NMA" | "AU" => Ok(Region::Australia),
            "NML" | "JP" => Ok(Region::Japan),
            other => Err(CarwingsError::Authentication(format!(
                "unsupported region: {}",
                other
            ))),
        }
    }
}

impl TryFrom<String> for Region {
    type Error = CarwingsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Region> for String {
    fn from(region: Region) -> Self {
        region.code().to_string()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Login credentials for one Carwings account
///
/// The region is kept as supplied and only validated when a session is
/// opened, so an unsupported region surfaces as an authentication failure.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
    region: String,
    base_url: Option<String>,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            region: region.into(),
            base_url: None,
        }
    }

    /// Replace the region-derived gateway with an explicit base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn base_url_override(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Resolve the region and the gateway URL to talk to
    pub fn resolve(&self) -> Result<(Region, String), CarwingsError> {
        let region: Region = self.region.parse()?;
        let base_url = match &self.base_url {
            Some(url) => url.clone(),
            None => region.base_url().to_string(),
        };
        Ok((region, base_url))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("region", &self.region)
            .field("base_url", &self.base_url)
            .finish()
    }
}

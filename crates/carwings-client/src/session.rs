//! Session manager
//!
//! A [`Session`] is an authenticated gateway context. It is released exactly
//! once: by [`Session::logout`], at the end of [`Session::scope`], or by `Drop`
//! when neither ran (early return, `?`, panic).

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, info, instrument};
use url::Url;

use crate::client::{check_envelope, Action, CarwingsClient, ClientConfig, INITIAL_APP_STR};
use crate::credentials::{Credentials, Region};
use crate::error::{CarwingsError, Result};
use crate::password::encrypt_password;
use crate::raw::{RawLogin, RawVehicleInfo};
use crate::vehicle::Vehicle;

/// Observer for a session's release
///
/// Stays valid after the session itself is gone.
#[derive(Debug, Clone)]
pub struct SessionWatch {
    releases: Arc<AtomicUsize>,
}

impl SessionWatch {
    pub fn is_released(&self) -> bool {
        self.release_count() > 0
    }

    /// Number of times the release step ran (0 or 1)
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

/// Authenticated Carwings session
pub struct Session {
    client: CarwingsClient,
    region: Region,
    language: String,
    timezone: Option<String>,
    session_id: Option<String>,
    vehicles: Vec<RawVehicleInfo>,
    released: bool,
    releases: Arc<AtomicUsize>,
}

impl Session {
    /// Log in with default HTTP settings
    pub async fn open(credentials: &Credentials) -> Result<Self> {
        Self::open_with_config(credentials, ClientConfig::default()).await
    }

    /// Log in with custom HTTP settings
    ///
    /// Fails with [`CarwingsError::Authentication`] when the region is not
    /// supported or the gateway rejects the credentials, and with
    /// [`CarwingsError::Network`] when the gateway cannot be reached.
    #[instrument(skip(credentials, config), fields(region = %credentials.region()))]
    pub async fn open_with_config(credentials: &Credentials, config: ClientConfig) -> Result<Self> {
        let (region, base_url) = credentials.resolve()?;
        let client = CarwingsClient::with_config(&base_url, &config)?;

        let key = password_key(&client, region, &config.language).await?;
        let password = encrypt_password(&key, credentials.password())?;

        let params = [
            ("RegionCode", region.code()),
            ("UserId", credentials.username()),
            ("Password", password.as_str()),
            ("initial_app_str", INITIAL_APP_STR),
            ("lg", config.language.as_str()),
        ];
        let reply = client
            .fetch(Action::UserLogin, &params)
            .await
            .map_err(refused_by_http)?;
        check_envelope(&reply).map_err(refused_by_gateway)?;

        let login: RawLogin = serde_json::from_value(reply)
            .map_err(|e| CarwingsError::remote(None, format!("unreadable login reply: {}", e)))?;
        let vehicles = login.vehicles();
        let session_id = login.session_id();
        let (timezone, language) = match login.customer_info {
            Some(customer) => (customer.timezone, customer.language),
            None => (None, None),
        };
        let language = language.unwrap_or(config.language);

        info!(
            "Logged in to {} ({} vehicle(s))",
            client.base_url(),
            vehicles.len()
        );

        Ok(Self {
            client,
            region,
            language,
            timezone,
            session_id,
            vehicles,
            released: false,
            releases: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Log in, run `f`, and log out again whatever `f` returns
    ///
    /// ```rust,ignore
    /// let battery = Session::scope(&credentials, |session| {
    ///     Box::pin(async move {
    ///         let leaf = session.get_vehicle()?;
    ///         leaf.get_latest_battery_status().await
    ///     })
    /// })
    /// .await?;
    /// ```
    pub async fn scope<T, F>(credentials: &Credentials, f: F) -> Result<T>
    where
        F: for<'s> FnOnce(&'s Session) -> BoxFuture<'s, Result<T>>,
    {
        Self::scope_with_config(credentials, ClientConfig::default(), f).await
    }

    /// [`scope`](Self::scope) with custom HTTP settings
    pub async fn scope_with_config<T, F>(
        credentials: &Credentials,
        config: ClientConfig,
        f: F,
    ) -> Result<T>
    where
        F: for<'s> FnOnce(&'s Session) -> BoxFuture<'s, Result<T>>,
    {
        let session = Self::open_with_config(credentials, config).await?;
        let result = f(&session).await;
        session.logout();
        result
    }

    /// Handle for the account's vehicle
    pub fn get_vehicle(&self) -> Result<Vehicle<'_>> {
        let info = self.vehicles.first().ok_or(CarwingsError::NoVehicle)?;
        let vin = info.vin.clone().ok_or(CarwingsError::NoVehicle)?;
        Ok(Vehicle::new(self, vin, info.nickname.clone()))
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn base_url(&self) -> &Url {
        self.client.base_url()
    }

    /// Language tag sent with vehicle requests
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Customer time zone reported at login
    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref()
    }

    pub fn watch(&self) -> SessionWatch {
        SessionWatch {
            releases: self.releases.clone(),
        }
    }

    /// End the session and release the HTTP client
    ///
    /// The gateway has no logout call; the session token is discarded locally.
    pub fn logout(mut self) {
        self.release();
    }

    /// Send a vehicle-scoped action with the session's common parameters
    pub(crate) async fn vehicle_request(
        &self,
        action: Action,
        vin: &str,
        extra: &[(&str, &str)],
    ) -> Result<Value> {
        let mut params: Vec<(&str, &str)> = vec![
            ("RegionCode", self.region.code()),
            ("VIN", vin),
            ("custom_sessionid", self.session_id.as_deref().unwrap_or_default()),
            ("initial_app_str", INITIAL_APP_STR),
            ("lg", self.language.as_str()),
            ("tz", self.timezone.as_deref().unwrap_or_default()),
            ("DCMID", ""),
        ];
        params.extend_from_slice(extra);

        self.client.post(action, &params).await
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.session_id = None;
        self.releases.fetch_add(1, Ordering::SeqCst);
        debug!("Released session for {}", self.client.base_url());
        info!("Logged out");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.client.base_url().as_str())
            .field("region", &self.region)
            .field("vehicles", &self.vehicles.len())
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

/// Ask the gateway for the key the login password is encrypted with
async fn password_key(client: &CarwingsClient, region: Region, language: &str) -> Result<String> {
    let params = [
        ("RegionCode", region.code()),
        ("initial_app_str", INITIAL_APP_STR),
        ("lg", language),
    ];
    let reply = client.post(Action::InitialApp, &params).await?;

    reply
        .get("baseprm")
        .and_then(Value::as_str)
        .filter(|key| !key.is_empty())
        .map(String::from)
        .ok_or_else(|| CarwingsError::remote(None, "reply has no password key"))
}

/// HTTP 401 and 403 on login mean the credentials were refused
fn refused_by_http(err: CarwingsError) -> CarwingsError {
    match err {
        CarwingsError::RemoteService {
            status: Some(401 | 403),
            message,
        } => CarwingsError::Authentication(message),
        other => other,
    }
}

/// Any vendor status other than 200 in a login reply is a refusal
fn refused_by_gateway(err: CarwingsError) -> CarwingsError {
    match err {
        CarwingsError::RemoteService {
            status: Some(_),
            message,
        } => CarwingsError::Authentication(message),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_http_status_mapping() {
        let err = refused_by_http(CarwingsError::remote(Some(401), "Unauthorized"));
        assert!(matches!(err, CarwingsError::Authentication(ref m) if m == "Unauthorized"));
        let err = refused_by_http(CarwingsError::remote(Some(403), "Forbidden"));
        assert!(matches!(err, CarwingsError::Authentication(_)));

        // A missing endpoint or a gateway fault is not a credentials problem
        let err = refused_by_http(CarwingsError::remote(Some(404), "HTTP 404 Not Found"));
        assert!(err.is_remote());
        let err = refused_by_http(CarwingsError::remote(Some(503), "maintenance"));
        assert!(err.is_remote());
    }

    #[test]
    fn test_login_envelope_status_mapping() {
        let err = refused_by_gateway(CarwingsError::remote(Some(404), "INVALID USER"));
        assert!(matches!(err, CarwingsError::Authentication(ref m) if m == "INVALID USER"));

        let err = refused_by_gateway(CarwingsError::remote(None, "reply has no status field"));
        assert!(err.is_remote());
    }

    #[tokio::test]
    async fn test_unsupported_region_fails_before_network() {
        let creds = Credentials::new("user", "pw", "ZZ").with_base_url("http://127.0.0.1:1/");
        let err = Session::open(&creds).await.unwrap_err();
        assert!(matches!(err, CarwingsError::Authentication(_)));
    }
}

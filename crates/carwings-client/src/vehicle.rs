//! Vehicle handle: latest-status fetches and refresh requests

use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::client::Action;
use crate::error::{CarwingsError, Result};
use crate::normalize::{
    has_record, normalize_battery, normalize_hvac, normalize_refresh, BATTERY_RECORDS_KEY,
    HVAC_RECORDS_KEY,
};
use crate::refresh::{PollPolicy, RefreshCycle, UpdateOutcome, UpdateRequestToken};
use crate::session::Session;
use crate::types::{BatteryStatus, HvacStatus, RefreshSnapshot};

/// One vehicle of an authenticated [`Session`]
///
/// Borrows the session, so it cannot outlive it.
#[derive(Debug, Clone)]
pub struct Vehicle<'s> {
    session: &'s Session,
    vin: String,
    nickname: Option<String>,
}

impl<'s> Vehicle<'s> {
    pub(crate) fn new(session: &'s Session, vin: String, nickname: Option<String>) -> Self {
        Self {
            session,
            vin,
            nickname,
        }
    }

    pub fn vin(&self) -> &str {
        &self.vin
    }

    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    // =========================================================================
    // Latest known status
    // =========================================================================

    /// Latest battery record stored by the gateway, `None` if there is none yet
    ///
    /// The record may be stale; use [`request_update`](Self::request_update)
    /// to make the vehicle report fresh data.
    #[instrument(skip(self), fields(vin = %self.vin))]
    pub async fn get_latest_battery_status(&self) -> Result<Option<BatteryStatus>> {
        let reply = self.request(Action::BatteryStatusRecords, &[]).await?;
        if !has_record(&reply, BATTERY_RECORDS_KEY) {
            debug!("No battery record yet");
            return Ok(None);
        }
        normalize_battery(&reply).map(Some)
    }

    /// Latest climate-control record, `None` if there is none yet
    #[instrument(skip(self), fields(vin = %self.vin))]
    pub async fn get_latest_hvac_status(&self) -> Result<Option<HvacStatus>> {
        let reply = self.request(Action::RemoteAcRecords, &[]).await?;
        if !has_record(&reply, HVAC_RECORDS_KEY) {
            debug!("No climate-control record yet");
            return Ok(None);
        }
        normalize_hvac(&reply).map(Some)
    }

    // =========================================================================
    // Refresh
    // =========================================================================

    /// Ask the vehicle to report fresh status
    ///
    /// The returned token correlates the request with its completion checks.
    #[instrument(skip(self), fields(vin = %self.vin))]
    pub async fn request_update(&self) -> Result<UpdateRequestToken> {
        let reply = self.request(Action::BatteryStatusCheck, &[]).await?;
        let result_key = match reply.get("resultKey") {
            Some(Value::String(key)) if !key.trim().is_empty() => key.clone(),
            Some(Value::Number(key)) => key.to_string(),
            _ => return Err(CarwingsError::remote(None, "reply has no resultKey")),
        };

        info!("Refresh requested");
        Ok(UpdateRequestToken::new(result_key, self.vin.clone()))
    }

    /// Check once whether the refresh behind `token` has finished
    ///
    /// `Some` carries the status the vehicle reported; `None` means the
    /// vehicle has not answered yet.
    #[instrument(skip(self, token), fields(vin = %self.vin))]
    pub async fn get_status_from_update(
        &self,
        token: &UpdateRequestToken,
    ) -> Result<Option<RefreshSnapshot>> {
        self.check_token(token)?;

        let reply = self
            .request(
                Action::BatteryStatusCheckResult,
                &[("resultKey", token.result_key())],
            )
            .await?;

        match response_flag(&reply).as_deref() {
            Some("1") => normalize_refresh(&reply).map(Some),
            Some("0") => Ok(None),
            Some(other) => Err(CarwingsError::remote(
                None,
                format!("unexpected responseFlag `{}`", other),
            )),
            None => Err(CarwingsError::remote(None, "reply has no responseFlag")),
        }
    }

    /// Start a stepwise refresh cycle for `token`
    pub fn refresh_cycle(
        &self,
        token: UpdateRequestToken,
        policy: PollPolicy,
    ) -> Result<RefreshCycle<'s>> {
        self.check_token(&token)?;
        Ok(RefreshCycle::new(self.clone(), token, policy))
    }

    /// Poll until the vehicle reports back or `policy.max_attempts` run out
    ///
    /// Running out of attempts is [`UpdateOutcome::TimedOut`], not an error.
    /// A malformed or error-flagged reply ends the cycle with an error.
    pub async fn poll_until_complete(
        &self,
        token: UpdateRequestToken,
        policy: PollPolicy,
    ) -> Result<UpdateOutcome> {
        self.refresh_cycle(token, policy)?.run().await
    }

    // -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

    async fn request(&self, action: Action, extra: &[(&str, &str)]) -> Result<Value> {
        self.session.vehicle_request(action, &self.vin, extra).await
    }

    fn check_token(&self, token: &UpdateRequestToken) -> Result<()> {
        if token.vin() != self.vin {
            return Err(CarwingsError::TokenMismatch {
                expected: token.vin().to_string(),
                actual: self.vin.clone(),
            });
        }
        Ok(())
    }
}

fn response_flag(reply: &Value) -> Option<String> {
    match reply.get("responseFlag")? {
        Value::String(flag) => Some(flag.trim().to_string()),
        Value::Number(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_flag_forms() {
        assert_eq!(response_flag(&json!({"responseFlag": "1"})).as_deref(), Some("1"));
        assert_eq!(response_flag(&json!({"responseFlag": 0})).as_deref(), Some("0"));
        assert_eq!(response_flag(&json!({"responseFlag": null})), None);
        assert_eq!(response_flag(&json!({})), None);
    }
}

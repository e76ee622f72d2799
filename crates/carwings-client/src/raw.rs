//! Narrow views over the gateway's raw JSON replies
//!
//! Only the keys the normalizer reads are modelled. Every field decodes
//! leniently: numbers may arrive as numeric strings, empty strings count as
//! absent, and a value of the wrong shape becomes `None` instead of an error.
//! Unknown keys are ignored.

use serde::Deserialize;

pub(crate) mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) if !s.trim().is_empty() => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    /// A nested record; anything but a JSON object is absent
    ///
    /// Derived struct decoding would also fill fields from an array in order,
    /// which turns garbage lists into plausible values.
    pub fn parsed<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Value::deserialize(deserializer)? {
            value @ Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        })
    }

    /// A list of records; entries that are not objects are skipped
    pub fn list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => Some(
                items
                    .into_iter()
                    .filter(Value::is_object)
                    .filter_map(|item| serde_json::from_value(item).ok())
                    .collect(),
            ),
            _ => None,
        })
    }
}

// =============================================================================
// Latest battery record
// =============================================================================

/// `BatteryStatusRecords` container
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RawBatteryRecords {
    #[serde(default, deserialize_with = "lenient::string")]
    pub operation_result: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub operation_date_and_time: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub notification_date_and_time: Option<String>,
    #[serde(default, deserialize_with = "lenient::parsed")]
    pub battery_status: Option<RawBatteryStatus>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub plugin_state: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub cruising_range_ac_on: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub cruising_range_ac_off: Option<f64>,
    #[serde(default, deserialize_with = "lenient::parsed")]
    pub time_required_to_full: Option<RawTimeRequired>,
    #[serde(default, deserialize_with = "lenient::parsed")]
    pub time_required_to_full200: Option<RawTimeRequired>,
    #[serde(
        default,
        rename = "TimeRequiredToFull200_6kW",
        deserialize_with = "lenient::parsed"
    )]
    pub time_required_to_full200_6kw: Option<RawTimeRequired>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RawBatteryStatus {
    #[serde(default, deserialize_with = "lenient::string")]
    pub battery_charging_status: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub battery_capacity: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub battery_remaining_amount: Option<f64>,
    #[serde(
        default,
        rename = "BatteryRemainingAmountWH",
        deserialize_with = "lenient::number"
    )]
    pub battery_remaining_amount_wh: Option<f64>,
    #[serde(default, rename = "SOC", deserialize_with = "lenient::parsed")]
    pub soc: Option<RawSoc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawSoc {
    #[serde(default, rename = "Value", deserialize_with = "lenient::number")]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RawTimeRequired {
    #[serde(default, deserialize_with = "lenient::number")]
    pub hour_required_to_full: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub minutes_required_to_full: Option<f64>,
}

// =============================================================================
// Latest climate-control record
// =============================================================================

/// `RemoteACRecords` container
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RawHvacRecords {
    #[serde(default, deserialize_with = "lenient::string")]
    pub operation_result: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub operation_date_and_time: Option<String>,
    #[serde(
        default,
        rename = "RemoteACOperation",
        deserialize_with = "lenient::string"
    )]
    pub remote_ac_operation: Option<String>,
    #[serde(
        default,
        rename = "ACStartStopDateAndTime",
        deserialize_with = "lenient::string"
    )]
    pub ac_start_stop_date_and_time: Option<String>,
    #[serde(
        default,
        rename = "ACDurationBatterySec",
        deserialize_with = "lenient::number"
    )]
    pub ac_duration_battery_sec: Option<f64>,
    #[serde(
        default,
        rename = "ACDurationPluggedSec",
        deserialize_with = "lenient::number"
    )]
    pub ac_duration_plugged_sec: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub plugin_state: Option<String>,
}

// =============================================================================
// Refresh completion reply
// =============================================================================

/// Body of `BatteryStatusCheckResultRequest`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawUpdateResult {
    #[serde(default, deserialize_with = "lenient::string")]
    pub operation_result: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub time_stamp: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub plugin_state: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub charging: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub battery_capacity: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub battery_degradation: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub cruising_range_ac_on: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub cruising_range_ac_off: Option<f64>,
    #[serde(default, deserialize_with = "lenient::parsed")]
    pub time_required_to_full: Option<RawHoursMinutes>,
    #[serde(default, deserialize_with = "lenient::parsed")]
    pub time_required_to_full200: Option<RawHoursMinutes>,
    #[serde(
        default,
        rename = "timeRequiredToFull200_6kW",
        deserialize_with = "lenient::parsed"
    )]
    pub time_required_to_full200_6kw: Option<RawHoursMinutes>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawHoursMinutes {
    #[serde(default, deserialize_with = "lenient::number")]
    pub hours: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub minutes: Option<f64>,
}

// =============================================================================
// Login reply
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawLogin {
    #[serde(default, rename = "VehicleInfoList", deserialize_with = "lenient::parsed")]
    pub vehicle_info_list: Option<RawVehicleInfoList>,
    #[serde(default, rename = "vehicleInfo", deserialize_with = "lenient::list")]
    pub vehicle_info: Option<Vec<RawVehicleInfo>>,
    #[serde(default, deserialize_with = "lenient::parsed")]
    pub vehicle: Option<RawVehicle>,
    #[serde(default, rename = "CustomerInfo", deserialize_with = "lenient::parsed")]
    pub customer_info: Option<RawCustomerInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawVehicleInfoList {
    #[serde(default, rename = "vehicleInfo", deserialize_with = "lenient::list")]
    pub vehicle_info: Option<Vec<RawVehicleInfo>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawVehicleInfo {
    #[serde(default, deserialize_with = "lenient::string")]
    pub vin: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub nickname: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub custom_sessionid: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawVehicle {
    #[serde(default, deserialize_with = "lenient::parsed")]
    pub profile: Option<RawVehicleInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RawCustomerInfo {
    #[serde(default, deserialize_with = "lenient::string")]
    pub timezone: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub language: Option<String>,
}

impl RawLogin {
    /// Vehicles listed in the reply, whichever shape the gateway used
    pub fn vehicles(&self) -> Vec<RawVehicleInfo> {
        let listed = self
            .vehicle_info_list
            .as_ref()
            .and_then(|l| l.vehicle_info.clone())
            .or_else(|| self.vehicle_info.clone())
            .unwrap_or_default();

        let mut vehicles: Vec<RawVehicleInfo> =
            listed.into_iter().filter(|v| v.vin.is_some()).collect();

        if vehicles.is_empty() {
            if let Some(profile) = self.vehicle.as_ref().and_then(|v| v.profile.clone()) {
                if profile.vin.is_some() {
                    vehicles.push(profile);
                }
            }
        }
        vehicles
    }

    /// Session token; the gateway attaches it to the vehicle entries
    pub fn session_id(&self) -> Option<String> {
        self.vehicle_info_list
            .as_ref()
            .and_then(|l| l.vehicle_info.as_ref())
            .or(self.vehicle_info.as_ref())
            .and_then(|list| list.iter().find_map(|v| v.custom_sessionid.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_as_strings() {
        let raw: RawBatteryStatus = serde_json::from_value(json!({
            "BatteryCapacity": "240",
            "BatteryRemainingAmount": 180,
            "BatteryRemainingAmountWH": "",
            "SOC": {"Value": "75"}
        }))
        .unwrap();
        assert_eq!(raw.battery_capacity, Some(240.0));
        assert_eq!(raw.battery_remaining_amount, Some(180.0));
        assert_eq!(raw.battery_remaining_amount_wh, None);
        assert_eq!(raw.soc.and_then(|s| s.value), Some(75.0));
    }

    #[test]
    fn test_wrong_shapes_become_absent() {
        let raw: RawBatteryRecords = serde_json::from_value(json!({
            "BatteryStatus": "garbage",
            "PluginState": {"nested": true},
            "TimeRequiredToFull": [1, 2],
            "CruisingRangeAcOn": "n/a",
            "SomethingNew": 42
        }))
        .unwrap();
        assert!(raw.battery_status.is_none());
        assert!(raw.plugin_state.is_none());
        assert!(raw.time_required_to_full.is_none());
        assert!(raw.cruising_range_ac_on.is_none());
    }

    #[test]
    fn test_arrays_do_not_fill_records() {
        let raw: RawBatteryRecords = serde_json::from_value(json!({
            "BatteryStatus": ["RAPIDLY_CHARGING", "12", "6"],
            "TimeRequiredToFull200": [[4, 30]]
        }))
        .unwrap();
        assert!(raw.battery_status.is_none());
        assert!(raw.time_required_to_full200.is_none());

        let login: RawLogin = serde_json::from_value(json!({
            "vehicleInfo": [["VIN9", "leaf", "sid-9"], {"vin": "VIN1"}],
            "CustomerInfo": ["Europe/Paris", "fr-FR"]
        }))
        .unwrap();
        let vehicles = login.vehicles();
        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].vin.as_deref(), Some("VIN1"));
        assert!(login.customer_info.is_none());
    }

    #[test]
    fn test_login_vehicle_shapes() {
        let nested: RawLogin = serde_json::from_value(json!({
            "VehicleInfoList": {"vehicleInfo": [
                {"vin": "VIN1", "nickname": "leaf", "custom_sessionid": "sid-1"}
            ]}
        }))
        .unwrap();
        assert_eq!(nested.vehicles().len(), 1);
        assert_eq!(nested.session_id().as_deref(), Some("sid-1"));

        let flat: RawLogin = serde_json::from_value(json!({
            "vehicleInfo": [{"vin": "VIN2", "custom_sessionid": "sid-2"}]
        }))
        .unwrap();
        assert_eq!(flat.vehicles()[0].vin.as_deref(), Some("VIN2"));
        assert_eq!(flat.session_id().as_deref(), Some("sid-2"));

        let profile: RawLogin = serde_json::from_value(json!({
            "vehicle": {"profile": {"vin": "VIN3", "nickname": "blue"}}
        }))
        .unwrap();
        assert_eq!(profile.vehicles()[0].nickname.as_deref(), Some("blue"));
        assert!(profile.session_id().is_none());

        let empty: RawLogin = serde_json::from_value(json!({"status": 200})).unwrap();
        assert!(empty.vehicles().is_empty());
    }
}

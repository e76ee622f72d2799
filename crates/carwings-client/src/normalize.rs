//! Telemetry normalizer
//!
//! Turns raw gateway replies into [`BatteryStatus`], [`HvacStatus`] and
//! [`RefreshSnapshot`]. Only the record container is required; every other
//! field falls back to an absent value, so these functions never fail once the
//! container is there.

use std::time::Duration;

use serde_json::Value;

use crate::error::{CarwingsError, Result};
use crate::raw::{
    RawBatteryRecords, RawHoursMinutes, RawHvacRecords, RawTimeRequired, RawUpdateResult,
};
use crate::types::{
    BatteryStatus, ChargingStatus, HvacStatus, PluginState, RefreshSnapshot, Timestamp,
};

pub(crate) const BATTERY_RECORDS_KEY: &str = "BatteryStatusRecords";
pub(crate) const HVAC_RECORDS_KEY: &str = "RemoteACRecords";

/// Build a [`BatteryStatus`] from a `BatteryStatusRecordsRequest` reply
pub fn normalize_battery(raw: &Value) -> Result<BatteryStatus> {
    let container = required_object(raw, BATTERY_RECORDS_KEY)?;
    let records: RawBatteryRecords = serde_json::from_value(container.clone())
        .map_err(|e| CarwingsError::Schema(format!("{}: {}", BATTERY_RECORDS_KEY, e)))?;

    let status = records.battery_status.unwrap_or_default();
    let state_of_charge = status.soc.and_then(|soc| soc.value);
    let battery_percent = battery_percent(
        state_of_charge,
        status.battery_remaining_amount,
        status.battery_capacity,
    );

    Ok(BatteryStatus {
        operation_result: records.operation_result,
        operation_timestamp: records.operation_date_and_time.map(Timestamp::parse),
        notification_timestamp: records.notification_date_and_time.map(Timestamp::parse),
        capacity: status.battery_capacity,
        remaining_amount: status.battery_remaining_amount,
        remaining_wh: status.battery_remaining_amount_wh,
        charging_status: ChargingStatus::from_vendor(status.battery_charging_status.as_deref()),
        plugin_state: PluginState::from_vendor(records.plugin_state.as_deref()),
        time_to_full_trickle: records.time_required_to_full.as_ref().and_then(time_required),
        time_to_full_l2: records.time_required_to_full200.as_ref().and_then(time_required),
        time_to_full_l2_6kw: records
            .time_required_to_full200_6kw
            .as_ref()
            .and_then(time_required),
        battery_percent,
        state_of_charge,
        cruising_range_ac_on_km: records.cruising_range_ac_on.map(metres_to_km),
        cruising_range_ac_off_km: records.cruising_range_ac_off.map(metres_to_km),
    })
}

/// Build a [`HvacStatus`] from a `RemoteACRecordsRequest` reply
pub fn normalize_hvac(raw: &Value) -> Result<HvacStatus> {
    let container = required_object(raw, HVAC_RECORDS_KEY)?;
    let records: RawHvacRecords = serde_json::from_value(container.clone())
        .map_err(|e| CarwingsError::Schema(format!("{}: {}", HVAC_RECORDS_KEY, e)))?;

    // A start the vehicle never confirmed carries a failure result
    let start_requested = records.remote_ac_operation.as_deref().map(str::trim) == Some("START");
    let start_confirmed = records
        .operation_result
        .as_deref()
        .map_or(true, |result| result.trim().starts_with("START"));
    let is_hvac_running = start_requested && start_confirmed;

    Ok(HvacStatus {
        operation_result: records.operation_result,
        operation_timestamp: records.operation_date_and_time.map(Timestamp::parse),
        is_hvac_running,
        ac_duration: records.ac_duration_battery_sec.and_then(seconds),
        ac_duration_plugged: records.ac_duration_plugged_sec.and_then(seconds),
        ac_start_stop_timestamp: records.ac_start_stop_date_and_time.map(Timestamp::parse),
        plugin_state: PluginState::from_vendor(records.plugin_state.as_deref()),
    })
}

/// Build a [`RefreshSnapshot`] from a completed `BatteryStatusCheckResultRequest` reply
pub fn normalize_refresh(raw: &Value) -> Result<RefreshSnapshot> {
    if !raw.is_object() {
        return Err(CarwingsError::Schema("refresh reply is not an object".into()));
    }
    let result: RawUpdateResult = serde_json::from_value(raw.clone())
        .map_err(|e| CarwingsError::Schema(format!("refresh reply: {}", e)))?;

    let charging = result
        .charging
        .as_deref()
        .map(|c| c.trim().eq_ignore_ascii_case("YES"));

    Ok(RefreshSnapshot {
        operation_result: result.operation_result,
        timestamp: result.time_stamp.map(Timestamp::parse),
        plugin_state: PluginState::from_vendor(result.plugin_state.as_deref()),
        charging,
        battery_capacity: result.battery_capacity,
        battery_degradation: result.battery_degradation,
        cruising_range_ac_on_km: result.cruising_range_ac_on.map(metres_to_km),
        cruising_range_ac_off_km: result.cruising_range_ac_off.map(metres_to_km),
        time_to_full_trickle: result.time_required_to_full.as_ref().and_then(hours_minutes),
        time_to_full_l2: result.time_required_to_full200.as_ref().and_then(hours_minutes),
        time_to_full_l2_6kw: result
            .time_required_to_full200_6kw
            .as_ref()
            .and_then(hours_minutes),
    })
}

/// Whether a reply carries a usable record under `key`
///
/// The gateway signals "nothing recorded yet" by leaving the key out, sending
/// `null`, or sending an empty list.
pub(crate) fn has_record(raw: &Value, key: &str) -> bool {
    match raw.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

fn required_object<'a>(raw: &'a Value, key: &str) -> Result<&'a Value> {
    match raw.get(key) {
        Some(value @ Value::Object(_)) => Ok(value),
        // Some accounts get the record wrapped in a single-element list
        Some(Value::Array(items)) if items.first().is_some_and(Value::is_object) => {
            Ok(&items[0])
        }
        Some(_) => Err(CarwingsError::Schema(format!(
            "`{}` is not a record object",
            key
        ))),
        None => Err(CarwingsError::missing_key(key)),
    }
}

/// Vendor SOC wins over remaining/capacity; result clamped to `0..=100`
fn battery_percent(
    state_of_charge: Option<f64>,
    remaining: Option<f64>,
    capacity: Option<f64>,
) -> Option<f64> {
    let percent = match (state_of_charge, remaining, capacity) {
        (Some(soc), _, _) => soc,
        (None, Some(remaining), Some(capacity)) if capacity > 0.0 => {
            100.0 * remaining / capacity
        }
        _ => return None,
    };
    percent.is_finite().then(|| percent.clamp(0.0, 100.0))
}

fn duration_from(hours: Option<f64>, minutes: Option<f64>) -> Option<Duration> {
    if hours.is_none() && minutes.is_none() {
        return None;
    }
    let total_minutes = hours.unwrap_or(0.0) * 60.0 + minutes.unwrap_or(0.0);
    seconds(total_minutes * 60.0)
}

fn time_required(raw: &RawTimeRequired) -> Option<Duration> {
    duration_from(raw.hour_required_to_full, raw.minutes_required_to_full)
}

fn hours_minutes(raw: &RawHoursMinutes) -> Option<Duration> {
    duration_from(raw.hours, raw.minutes)
}

fn seconds(secs: f64) -> Option<Duration> {
    (secs.is_finite() && secs >= 0.0).then(|| Duration::from_secs(secs.round() as u64))
}

fn metres_to_km(metres: f64) -> f64 {
    metres / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn battery_payload() -> Value {
        json!({
            "status": 200,
            "BatteryStatusRecords": {
                "OperationResult": "START",
                "OperationDateAndTime": "Feb  9, 2016 11:09 PM",
                "BatteryStatus": {
                    "BatteryChargingStatus": "NORMAL_CHARGING",
                    "BatteryCapacity": "240",
                    "BatteryRemainingAmount": "180",
                    "BatteryRemainingAmountWH": "18000",
                    "BatteryRemainingAmountkWH": ""
                },
                "PluginState": "CONNECTED",
                "CruisingRangeAcOn": "107136.0",
                "CruisingRangeAcOff": "115776.0",
                "TimeRequiredToFull": {"HourRequiredToFull": "18", "MinutesRequiredToFull": "30"},
                "TimeRequiredToFull200": {"HourRequiredToFull": "6", "MinutesRequiredToFull": "0"},
                "TimeRequiredToFull200_6kW": {"HourRequiredToFull": "4", "MinutesRequiredToFull": "0"},
                "NotificationDateAndTime": "2016/02/09 23:09",
                "TargetDate": "2016/02/09 23:09"
            }
        })
    }

    #[test]
    fn test_battery_full_record() {
        let status = normalize_battery(&battery_payload()).unwrap();

        assert_eq!(status.capacity(), Some(240.0));
        assert_eq!(status.remaining_amount(), Some(180.0));
        assert_eq!(status.remaining_wh(), Some(18000.0));
        assert_eq!(status.charging_status(), ChargingStatus::Normal);
        assert!(status.is_charging());
        assert!(!status.is_quick_charging());
        assert_eq!(status.plugin_state(), PluginState::Connected);
        assert!(status.is_connected());
        assert!(!status.is_connected_to_quick_charger());
        assert_eq!(
            status.time_to_full_trickle(),
            Some(Duration::from_secs((18 * 60 + 30) * 60))
        );
        assert_eq!(status.time_to_full_l2(), Some(Duration::from_secs(6 * 3600)));
        assert_eq!(status.time_to_full_l2_6kw(), Some(Duration::from_secs(4 * 3600)));
        assert_eq!(status.battery_percent(), Some(75.0));
        assert_eq!(status.state_of_charge(), None);
        assert_eq!(status.cruising_range_ac_on_km(), Some(107.136));
        assert_eq!(
            status.notification_timestamp().map(|t| t.raw()),
            Some("2016/02/09 23:09")
        );
        assert!(status.operation_timestamp().unwrap().datetime().is_some());
    }

    #[test]
    fn test_battery_is_deterministic() {
        let payload = battery_payload();
        assert_eq!(
            normalize_battery(&payload).unwrap(),
            normalize_battery(&payload).unwrap()
        );
    }

    #[test]
    fn test_battery_missing_container_is_schema_error() {
        let err = normalize_battery(&json!({"status": 200})).unwrap_err();
        assert!(matches!(err, CarwingsError::Schema(_)));

        let err = normalize_battery(&json!({"BatteryStatusRecords": "nope"})).unwrap_err();
        assert!(matches!(err, CarwingsError::Schema(_)));
    }

    #[test]
    fn test_battery_empty_container_is_total() {
        let status = normalize_battery(&json!({"BatteryStatusRecords": {}})).unwrap();
        assert_eq!(status.charging_status(), ChargingStatus::Unknown);
        assert_eq!(status.plugin_state(), PluginState::Unknown);
        assert!(!status.is_charging());
        assert!(!status.is_connected());
        assert_eq!(status.battery_percent(), None);
        assert_eq!(status.time_to_full_trickle(), None);
        assert!(status.operation_timestamp().is_none());
    }

    #[test]
    fn test_array_subtrees_are_absent() {
        let payload = json!({
            "BatteryStatusRecords": {
                "BatteryStatus": ["RAPIDLY_CHARGING", "12", "6"],
                "TimeRequiredToFull": [18, 30],
                "PluginState": "QC_CONNECTED"
            }
        });
        let status = normalize_battery(&payload).unwrap();
        assert_eq!(status.charging_status(), ChargingStatus::Unknown);
        assert!(!status.is_quick_charging());
        assert_eq!(status.battery_percent(), None);
        assert_eq!(status.capacity(), None);
        assert_eq!(status.time_to_full_trickle(), None);
        assert!(status.is_connected_to_quick_charger());
    }

    #[test]
    fn test_vendor_soc_takes_precedence() {
        let mut payload = battery_payload();
        payload["BatteryStatusRecords"]["BatteryStatus"]["SOC"] = json!({"Value": "62"});
        let status = normalize_battery(&payload).unwrap();
        assert_eq!(status.state_of_charge(), Some(62.0));
        assert_eq!(status.battery_percent(), Some(62.0));
    }

    #[test]
    fn test_percent_is_clamped() {
        assert_eq!(battery_percent(None, Some(13.0), Some(12.0)), Some(100.0));
        assert_eq!(battery_percent(Some(-4.0), None, None), Some(0.0));
        assert_eq!(battery_percent(None, Some(3.0), Some(0.0)), None);
        assert_eq!(battery_percent(None, Some(3.0), Some(12.0)), Some(25.0));
    }

    #[test]
    fn test_flags_ignore_unrelated_fields() {
        let base = normalize_battery(&battery_payload()).unwrap();

        let mut payload = battery_payload();
        let records = &mut payload["BatteryStatusRecords"];
        records["BatteryStatus"]["BatteryRemainingAmount"] = json!("3");
        records["CruisingRangeAcOn"] = json!("0");
        records["OperationDateAndTime"] = json!("garbage");
        records["NewVendorField"] = json!({"x": 1});
        let changed = normalize_battery(&payload).unwrap();

        assert_eq!(changed.charging_status(), base.charging_status());
        assert_eq!(changed.is_charging(), base.is_charging());
        assert_eq!(changed.is_quick_charging(), base.is_quick_charging());
        assert_eq!(changed.plugin_state(), base.plugin_state());
        assert_eq!(changed.is_connected(), base.is_connected());
        assert_eq!(
            changed.is_connected_to_quick_charger(),
            base.is_connected_to_quick_charger()
        );
    }

    #[test]
    fn test_quick_charging_record() {
        let mut payload = battery_payload();
        payload["BatteryStatusRecords"]["BatteryStatus"]["BatteryChargingStatus"] =
            json!("RAPIDLY_CHARGING");
        payload["BatteryStatusRecords"]["PluginState"] = json!("QC_CONNECTED");
        let status = normalize_battery(&payload).unwrap();
        assert!(status.is_charging());
        assert!(status.is_quick_charging());
        assert!(status.is_connected());
        assert!(status.is_connected_to_quick_charger());
    }

    #[test]
    fn test_hvac_record() {
        let payload = json!({
            "status": 200,
            "RemoteACRecords": {
                "OperationResult": "START_BATTERY",
                "OperationDateAndTime": "Feb 10, 2016 10:22 PM",
                "RemoteACOperation": "START",
                "ACStartStopDateAndTime": "Feb 10, 2016 10:23 PM",
                "ACDurationBatterySec": "900",
                "ACDurationPluggedSec": "7200",
                "PluginState": "NOT_CONNECTED"
            }
        });
        let hvac = normalize_hvac(&payload).unwrap();
        assert!(hvac.is_hvac_running());
        assert_eq!(hvac.ac_duration(), Some(Duration::from_secs(900)));
        assert_eq!(hvac.ac_duration_plugged(), Some(Duration::from_secs(7200)));
        assert_eq!(
            hvac.ac_start_stop_timestamp().map(|t| t.raw()),
            Some("Feb 10, 2016 10:23 PM")
        );
        assert_eq!(hvac.plugin_state(), PluginState::NotConnected);
    }

    #[test]
    fn test_hvac_unconfirmed_start_is_not_running() {
        let payload = json!({
            "RemoteACRecords": {
                "OperationResult": "ELECTRIC_WAVE_ABNORMAL",
                "RemoteACOperation": "START",
                "ACDurationBatterySec": "900"
            }
        });
        let hvac = normalize_hvac(&payload).unwrap();
        assert!(!hvac.is_hvac_running());
        assert_eq!(hvac.operation_result(), Some("ELECTRIC_WAVE_ABNORMAL"));
    }

    #[test]
    fn test_hvac_stopped_and_list_wrapped() {
        let payload = json!({
            "RemoteACRecords": [{"RemoteACOperation": "STOP", "ACDurationBatterySec": 0}]
        });
        let hvac = normalize_hvac(&payload).unwrap();
        assert!(!hvac.is_hvac_running());
        assert_eq!(hvac.ac_duration(), Some(Duration::ZERO));
    }

    #[test]
    fn test_hvac_missing_container() {
        let err = normalize_hvac(&json!({"status": 200})).unwrap_err();
        assert!(matches!(err, CarwingsError::Schema(_)));
        let err = normalize_hvac(&json!({"RemoteACRecords": []})).unwrap_err();
        assert!(matches!(err, CarwingsError::Schema(_)));
    }

    #[test]
    fn test_refresh_snapshot() {
        let payload = json!({
            "status": 200,
            "responseFlag": "1",
            "operationResult": "START",
            "timeStamp": "2016-01-02 17:17:38",
            "cruisingRangeAcOn": "115328.0",
            "cruisingRangeAcOff": "117024.0",
            "pluginState": "NOT_CONNECTED",
            "charging": "NO",
            "batteryCapacity": "12",
            "batteryDegradation": "10",
            "timeRequiredToFull200": {"hours": "", "minutes": ""}
        });
        let snapshot = normalize_refresh(&payload).unwrap();
        assert!(snapshot.vehicle_reached());
        assert!(!snapshot.is_charging());
        assert!(!snapshot.is_connected());
        assert_eq!(snapshot.battery_degradation(), Some(10.0));
        assert_eq!(snapshot.time_to_full_l2(), None);
        assert!(snapshot.timestamp().unwrap().datetime().is_some());
    }

    #[test]
    fn test_refresh_unreachable_vehicle() {
        let snapshot = normalize_refresh(&json!({
            "responseFlag": "1",
            "operationResult": "ELECTRIC_WAVE_ABNORMAL"
        }))
        .unwrap();
        assert!(!snapshot.vehicle_reached());
    }

    #[test]
    fn test_has_record() {
        assert!(!has_record(&json!({}), HVAC_RECORDS_KEY));
        assert!(!has_record(&json!({"RemoteACRecords": null}), HVAC_RECORDS_KEY));
        assert!(!has_record(&json!({"RemoteACRecords": []}), HVAC_RECORDS_KEY));
        assert!(has_record(&json!({"RemoteACRecords": {}}), HVAC_RECORDS_KEY));
    }
}

//! Typed telemetry records produced by the normalizer

use std::fmt;
use std::time::Duration;

use chrono::NaiveDateTime;

/// Formats the gateway has been seen to use for dates
const TIMESTAMP_FORMATS: &[&str] = &[
    "%b %e, %Y %I:%M %p",
    "%Y/%m/%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

/// A vendor timestamp, kept verbatim alongside its parsed value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    raw: String,
    parsed: Option<NaiveDateTime>,
}

impl Timestamp {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let parsed = TIMESTAMP_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw.trim(), fmt).ok());
        Self { raw, parsed }
    }

    /// The string exactly as the gateway sent it
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Parsed value, `None` when the format was not recognized
    pub fn datetime(&self) -> Option<NaiveDateTime> {
        self.parsed
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parsed {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M")),
            None => f.write_str(&self.raw),
        }
    }
}

// =============================================================================
// Enumerations
// =============================================================================

/// Charging state reported by the battery record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChargingStatus {
    NotCharging,
    Normal,
    Quick,
    Unknown,
}

impl ChargingStatus {
    pub(crate) fn from_vendor(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("NOT_CHARGING") => ChargingStatus::NotCharging,
            Some("NORMAL_CHARGING") => ChargingStatus::Normal,
            Some("RAPIDLY_CHARGING") => ChargingStatus::Quick,
            _ => ChargingStatus::Unknown,
        }
    }

    pub fn is_charging(&self) -> bool {
        matches!(self, ChargingStatus::Normal | ChargingStatus::Quick)
    }

    pub fn is_quick_charging(&self) -> bool {
        matches!(self, ChargingStatus::Quick)
    }
}

impl fmt::Display for ChargingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChargingStatus::NotCharging => "not charging",
            ChargingStatus::Normal => "normal",
            ChargingStatus::Quick => "quick",
            ChargingStatus::Unknown => "unknown",
        })
    }
}

/// Physical connector state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginState {
    NotConnected,
    Connected,
    QuickConnected,
    Unknown,
}

impl PluginState {
    pub(crate) fn from_vendor(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("NOT_CONNECTED") => PluginState::NotConnected,
            Some("CONNECTED") => PluginState::Connected,
            Some("QC_CONNECTED") => PluginState::QuickConnected,
            _ => PluginState::Unknown,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, PluginState::Connected | PluginState::QuickConnected)
    }

    pub fn is_connected_to_quick_charger(&self) -> bool {
        matches!(self, PluginState::QuickConnected)
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PluginState::NotConnected => "unplugged",
            PluginState::Connected => "plugged (normal)",
            PluginState::QuickConnected => "plugged (quick)",
            PluginState::Unknown => "unknown",
        })
    }
}

// =============================================================================
// Battery
// =============================================================================

/// Latest known battery state of a vehicle
///
/// Built from a single `BatteryStatusRecords` payload. The charging and
/// connector flags are computed from the stored enums on every call.
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryStatus {
    pub(crate) operation_result: Option<String>,
    pub(crate) operation_timestamp: Option<Timestamp>,
    pub(crate) notification_timestamp: Option<Timestamp>,
    pub(crate) capacity: Option<f64>,
    pub(crate) remaining_amount: Option<f64>,
    pub(crate) remaining_wh: Option<f64>,
    pub(crate) charging_status: ChargingStatus,
    pub(crate) plugin_state: PluginState,
    pub(crate) time_to_full_trickle: Option<Duration>,
    pub(crate) time_to_full_l2: Option<Duration>,
    pub(crate) time_to_full_l2_6kw: Option<Duration>,
    pub(crate) battery_percent: Option<f64>,
    pub(crate) state_of_charge: Option<f64>,
    pub(crate) cruising_range_ac_on_km: Option<f64>,
    pub(crate) cruising_range_ac_off_km: Option<f64>,
}

impl BatteryStatus {
    pub fn operation_result(&self) -> Option<&str> {
        self.operation_result.as_deref()
    }

    /// When the vehicle last reported
    pub fn operation_timestamp(&self) -> Option<&Timestamp> {
        self.operation_timestamp.as_ref()
    }

    /// When the gateway stored the report
    pub fn notification_timestamp(&self) -> Option<&Timestamp> {
        self.notification_timestamp.as_ref()
    }

    /// Battery capacity in vendor units (bars on early models, 0.1 kWh later)
    pub fn capacity(&self) -> Option<f64> {
        self.capacity
    }

    /// Remaining charge in the same units as [`capacity`](Self::capacity)
    pub fn remaining_amount(&self) -> Option<f64> {
        self.remaining_amount
    }

    pub fn remaining_wh(&self) -> Option<f64> {
        self.remaining_wh
    }

    pub fn charging_status(&self) -> ChargingStatus {
        self.charging_status
    }

    pub fn is_charging(&self) -> bool {
        self.charging_status.is_charging()
    }

    pub fn is_quick_charging(&self) -> bool {
        self.charging_status.is_quick_charging()
    }

    pub fn plugin_state(&self) -> PluginState {
        self.plugin_state
    }

    pub fn is_connected(&self) -> bool {
        self.plugin_state.is_connected()
    }

    pub fn is_connected_to_quick_charger(&self) -> bool {
        self.plugin_state.is_connected_to_quick_charger()
    }

    /// Time to full on a 120 V outlet
    pub fn time_to_full_trickle(&self) -> Option<Duration> {
        self.time_to_full_trickle
    }

    /// Time to full on a 3.3 kW level 2 charger
    pub fn time_to_full_l2(&self) -> Option<Duration> {
        self.time_to_full_l2
    }

    /// Time to full on a 6.6 kW level 2 charger
    pub fn time_to_full_l2_6kw(&self) -> Option<Duration> {
        self.time_to_full_l2_6kw
    }

    /// Charge level in percent, within `0..=100`
    ///
    /// The vendor's own state of charge is used when reported, otherwise the
    /// value is derived from remaining amount and capacity.
    pub fn battery_percent(&self) -> Option<f64> {
        self.battery_percent
    }

    /// State of charge exactly as reported by the vendor
    pub fn state_of_charge(&self) -> Option<f64> {
        self.state_of_charge
    }

    pub fn cruising_range_ac_on_km(&self) -> Option<f64> {
        self.cruising_range_ac_on_km
    }

    pub fn cruising_range_ac_off_km(&self) -> Option<f64> {
        self.cruising_range_ac_off_km
    }
}

// =============================================================================
// Climate control
// =============================================================================

/// Latest known climate-control state of a vehicle
#[derive(Debug, Clone, PartialEq)]
pub struct HvacStatus {
    pub(crate) operation_result: Option<String>,
    pub(crate) operation_timestamp: Option<Timestamp>,
    pub(crate) is_hvac_running: bool,
    pub(crate) ac_duration: Option<Duration>,
    pub(crate) ac_duration_plugged: Option<Duration>,
    pub(crate) ac_start_stop_timestamp: Option<Timestamp>,
    pub(crate) plugin_state: PluginState,
}

impl HvacStatus {
    pub fn operation_result(&self) -> Option<&str> {
        self.operation_result.as_deref()
    }

    pub fn operation_timestamp(&self) -> Option<&Timestamp> {
        self.operation_timestamp.as_ref()
    }

    pub fn is_hvac_running(&self) -> bool {
        self.is_hvac_running
    }

    /// Run time when powered from the battery
    pub fn ac_duration(&self) -> Option<Duration> {
        self.ac_duration
    }

    /// Run time when plugged in
    pub fn ac_duration_plugged(&self) -> Option<Duration> {
        self.ac_duration_plugged
    }

    pub fn ac_start_stop_timestamp(&self) -> Option<&Timestamp> {
        self.ac_start_stop_timestamp.as_ref()
    }

    pub fn plugin_state(&self) -> PluginState {
        self.plugin_state
    }
}

// =============================================================================
// Refresh result
// =============================================================================

/// Operation result the gateway uses when the vehicle could not be reached
const VEHICLE_UNREACHABLE: &str = "ELECTRIC_WAVE_ABNORMAL";

/// Status carried by the reply that completed a refresh cycle
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshSnapshot {
    pub(crate) operation_result: Option<String>,
    pub(crate) timestamp: Option<Timestamp>,
    pub(crate) plugin_state: PluginState,
    pub(crate) charging: Option<bool>,
    pub(crate) battery_capacity: Option<f64>,
    pub(crate) battery_degradation: Option<f64>,
    pub(crate) cruising_range_ac_on_km: Option<f64>,
    pub(crate) cruising_range_ac_off_km: Option<f64>,
    pub(crate) time_to_full_trickle: Option<Duration>,
    pub(crate) time_to_full_l2: Option<Duration>,
    pub(crate) time_to_full_l2_6kw: Option<Duration>,
}

impl RefreshSnapshot {
    pub fn operation_result(&self) -> Option<&str> {
        self.operation_result.as_deref()
    }

    /// False when the gateway reports that the vehicle never answered
    pub fn vehicle_reached(&self) -> bool {
        self.operation_result.as_deref() != Some(VEHICLE_UNREACHABLE)
    }

    pub fn timestamp(&self) -> Option<&Timestamp> {
        self.timestamp.as_ref()
    }

    pub fn plugin_state(&self) -> PluginState {
        self.plugin_state
    }

    pub fn is_connected(&self) -> bool {
        self.plugin_state.is_connected()
    }

    pub fn is_charging(&self) -> bool {
        self.charging.unwrap_or(false)
    }

    pub fn battery_capacity(&self) -> Option<f64> {
        self.battery_capacity
    }

    pub fn battery_degradation(&self) -> Option<f64> {
        self.battery_degradation
    }

    pub fn cruising_range_ac_on_km(&self) -> Option<f64> {
        self.cruising_range_ac_on_km
    }

    pub fn cruising_range_ac_off_km(&self) -> Option<f64> {
        self.cruising_range_ac_off_km
    }

    pub fn time_to_full_trickle(&self) -> Option<Duration> {
        self.time_to_full_trickle
    }

    pub fn time_to_full_l2(&self) -> Option<Duration> {
        self.time_to_full_l2
    }

    pub fn time_to_full_l2_6kw(&self) -> Option<Duration> {
        self.time_to_full_l2_6kw
    }
}

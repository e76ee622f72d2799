//! Status command - latest battery and climate-control records

use anyhow::{Context, Result};
use carwings_client::{BatteryStatus, HvacStatus, Vehicle};

use crate::output::{hours_minutes, km, or_dash, percent, yes_no, OutputContext, Section};

/// Show the latest status the gateway has stored for the vehicle
pub async fn status(vehicle: &Vehicle<'_>, ctx: &OutputContext) -> Result<()> {
    show(vehicle, ctx).await?;
    Ok(())
}

/// Fetch and show battery and climate records, returning the battery record
pub async fn show(vehicle: &Vehicle<'_>, ctx: &OutputContext) -> Result<Option<BatteryStatus>> {
    let battery = vehicle
        .get_latest_battery_status()
        .await
        .context("Failed to read battery status")?;
    let hvac = vehicle
        .get_latest_hvac_status()
        .await
        .context("Failed to read climate-control status")?;

    let mut sections = vec![vehicle_section(vehicle)];
    match &battery {
        Some(battery) => sections.push(battery_section("battery", battery)),
        None => ctx.warn("No battery record yet"),
    }
    match &hvac {
        Some(hvac) => sections.push(hvac_section(hvac)),
        None => ctx.warn("No climate-control record yet"),
    }

    ctx.print_sections(&sections);
    Ok(battery)
}

/// Fetch and show only the battery record under `title`, returning it for comparison
pub async fn battery(
    vehicle: &Vehicle<'_>,
    title: &'static str,
    ctx: &OutputContext,
) -> Result<Option<BatteryStatus>> {
    let battery = vehicle
        .get_latest_battery_status()
        .await
        .context("Failed to read battery status")?;

    match &battery {
        Some(record) => ctx.print_sections(&[battery_section(title, record)]),
        None => ctx.warn("No battery record yet"),
    }
    Ok(battery)
}

fn vehicle_section(vehicle: &Vehicle<'_>) -> Section {
    Section::new(
        "vehicle",
        vec![
            ("VIN", vehicle.vin().to_string()),
            ("Nickname", or_dash(vehicle.nickname())),
        ],
    )
}

pub fn battery_section(title: &'static str, battery: &BatteryStatus) -> Section {
    Section::new(
        title,
        vec![
            ("Reported at", or_dash(battery.operation_timestamp())),
            ("Stored at", or_dash(battery.notification_timestamp())),
            ("Charge", percent(battery.battery_percent())),
            ("State of charge", percent(battery.state_of_charge())),
            (
                "Remaining / capacity",
                format!(
                    "{} / {}",
                    or_dash(battery.remaining_amount()),
                    or_dash(battery.capacity())
                ),
            ),
            ("Charging", battery.charging_status().to_string()),
            ("Quick charging", yes_no(battery.is_quick_charging())),
            ("Plug", battery.plugin_state().to_string()),
            ("Range (A/C on)", km(battery.cruising_range_ac_on_km())),
            ("Range (A/C off)", km(battery.cruising_range_ac_off_km())),
            ("Full in (120 V)", hours_minutes(battery.time_to_full_trickle())),
            ("Full in (3.3 kW)", hours_minutes(battery.time_to_full_l2())),
            ("Full in (6.6 kW)", hours_minutes(battery.time_to_full_l2_6kw())),
        ],
    )
}

fn hvac_section(hvac: &HvacStatus) -> Section {
    Section::new(
        "climate",
        vec![
            ("Running", yes_no(hvac.is_hvac_running())),
            ("Started / stopped", or_dash(hvac.ac_start_stop_timestamp())),
            ("Run time (battery)", hours_minutes(hvac.ac_duration())),
            ("Run time (plugged)", hours_minutes(hvac.ac_duration_plugged())),
            ("Plug", hvac.plugin_state().to_string()),
        ],
    )
}

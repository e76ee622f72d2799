//! Refresh command - make the vehicle report, then read the fresh record

use anyhow::{Context, Result};
use carwings_client::{PollPolicy, RefreshSnapshot, UpdateOutcome, Vehicle};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use super::status;
use crate::output::{hours_minutes, km, or_dash, yes_no, OutputContext, Section};

/// Request an update, wait for it and show the battery record afterwards
pub async fn refresh(vehicle: &Vehicle<'_>, policy: PollPolicy, ctx: &OutputContext) -> Result<()> {
    if wait_for_update(vehicle, policy, ctx).await?.is_none() {
        return Ok(());
    }
    // Fresh data may be stored even when the cycle timed out
    status::battery(vehicle, "battery", ctx).await?;
    Ok(())
}

/// Run one refresh cycle; `None` when the user cancelled it with Ctrl-C
pub async fn wait_for_update(
    vehicle: &Vehicle<'_>,
    policy: PollPolicy,
    ctx: &OutputContext,
) -> Result<Option<UpdateOutcome>> {
    let token = vehicle
        .request_update()
        .await
        .context("Failed to request an update")?;
    let mut cycle = vehicle.refresh_cycle(token, policy)?;

    let pb = spinner(ctx)?;
    pb.set_message(format!(
        "Waiting for the vehicle (up to {} checks, {}s apart)",
        policy.max_attempts,
        policy.interval.as_secs()
    ));

    let outcome = loop {
        tokio::select! {
            step = cycle.poll_once() => match step {
                Ok(Some(outcome)) => break outcome,
                Ok(None) => pb.set_message(format!(
                    "Still waiting ({}/{} checks)",
                    cycle.attempts(),
                    policy.max_attempts
                )),
                Err(e) => {
                    pb.finish_and_clear();
                    return Err(e).context("Refresh failed");
                }
            },
            Ok(()) = tokio::signal::ctrl_c() => {
                pb.finish_and_clear();
                ctx.warn("Refresh cancelled");
                return Ok(None);
            }
        }
    };
    pb.finish_and_clear();

    match &outcome {
        UpdateOutcome::Completed(snapshot) => {
            if snapshot.vehicle_reached() {
                ctx.success(&format!(
                    "Vehicle reported back after {} check(s)",
                    cycle.attempts()
                ));
            } else {
                ctx.warn("The gateway could not reach the vehicle");
            }
            ctx.print_sections(&[snapshot_section(snapshot)]);
        }
        UpdateOutcome::TimedOut { attempts } => {
            ctx.warn(&format!(
                "No confirmation after {} check(s); showing what the gateway has",
                attempts
            ));
        }
    }

    Ok(Some(outcome))
}

fn spinner(ctx: &OutputContext) -> Result<ProgressBar> {
    if !ctx.interactive() {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]")?);
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

fn snapshot_section(snapshot: &RefreshSnapshot) -> Section {
    Section::new(
        "refresh",
        vec![
            ("Result", or_dash(snapshot.operation_result())),
            ("Reported at", or_dash(snapshot.timestamp())),
            ("Charging", yes_no(snapshot.is_charging())),
            ("Plug", snapshot.plugin_state().to_string()),
            ("Capacity", or_dash(snapshot.battery_capacity())),
            ("Degradation", or_dash(snapshot.battery_degradation())),
            ("Range (A/C on)", km(snapshot.cruising_range_ac_on_km())),
            ("Range (A/C off)", km(snapshot.cruising_range_ac_off_km())),
            ("Full in (120 V)", hours_minutes(snapshot.time_to_full_trickle())),
            ("Full in (3.3 kW)", hours_minutes(snapshot.time_to_full_l2())),
            ("Full in (6.6 kW)", hours_minutes(snapshot.time_to_full_l2_6kw())),
        ],
    )
}

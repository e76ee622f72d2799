//! Info command - status, refresh and status again

use anyhow::Result;
use carwings_client::{BatteryStatus, PollPolicy, Vehicle};

use super::{refresh, status};
use crate::output::OutputContext;

/// Whether the battery record changed across a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Freshness {
    Updated,
    Unchanged,
    Unknown,
}

/// Show stored status, ask the vehicle to report, then show the new record
pub async fn info(vehicle: &Vehicle<'_>, policy: PollPolicy, ctx: &OutputContext) -> Result<()> {
    ctx.info("Latest status stored by the gateway:");
    let before = status::show(vehicle, ctx).await?;

    ctx.info("Requesting an update from the vehicle...");
    if refresh::wait_for_update(vehicle, policy, ctx).await?.is_none() {
        return Ok(());
    }

    ctx.info("Status after the update:");
    let after = status::battery(vehicle, "updated battery", ctx).await?;

    match freshness(before.as_ref(), after.as_ref()) {
        Freshness::Updated => ctx.success("Battery record is newer than before"),
        Freshness::Unchanged => ctx.warn("Battery record has not changed"),
        Freshness::Unknown => {}
    }
    Ok(())
}

fn freshness(before: Option<&BatteryStatus>, after: Option<&BatteryStatus>) -> Freshness {
    let stamp = |b: Option<&BatteryStatus>| b.and_then(|s| s.operation_timestamp()).cloned();
    match (stamp(before), stamp(after)) {
        (_, None) => Freshness::Unknown,
        (None, Some(_)) => Freshness::Updated,
        (Some(old), Some(new)) => match (old.datetime(), new.datetime()) {
            (Some(old), Some(new)) if new > old => Freshness::Updated,
            (Some(_), Some(_)) => Freshness::Unchanged,
            _ if old.raw() != new.raw() => Freshness::Updated,
            _ => Freshness::Unchanged,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carwings_client::normalize_battery;
    use serde_json::json;

    fn record(date: &str) -> BatteryStatus {
        normalize_battery(&json!({
            "status": 200,
            "BatteryStatusRecords": {
                "OperationDateAndTime": date,
                "BatteryStatus": {"BatteryCapacity": "12", "BatteryRemainingAmount": "6"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_newer_record_is_updated() {
        let before = record("Feb  9, 2016 11:09 PM");
        let after = record("Feb 10, 2016 07:30 AM");
        assert_eq!(freshness(Some(&before), Some(&after)), Freshness::Updated);
    }

    #[test]
    fn test_same_record_is_unchanged() {
        let before = record("Feb  9, 2016 11:09 PM");
        let after = record("Feb  9, 2016 11:09 PM");
        assert_eq!(freshness(Some(&before), Some(&after)), Freshness::Unchanged);
    }

    #[test]
    fn test_first_record_counts_as_update() {
        let after = record("Feb  9, 2016 11:09 PM");
        assert_eq!(freshness(None, Some(&after)), Freshness::Updated);
        assert_eq!(freshness(Some(&after), None), Freshness::Unknown);
    }

    #[test]
    fn test_unparsed_dates_compare_verbatim() {
        let before = record("sometime");
        let after = record("later");
        assert_eq!(freshness(Some(&before), Some(&after)), Freshness::Updated);
    }
}

//! Update orchestrator
//!
//! A refresh cycle starts when [`Vehicle::request_update`] hands out an
//! [`UpdateRequestToken`] and ends in one of three terminal states:
//!
//! ```text
//! Requested -> Polling -> Completed
//!                      -> TimedOut   (attempts exhausted, not an error)
//!                      -> Failed     (error-flagged or malformed reply)
//! ```
//!
//! Each attempt sleeps first, then checks once, giving the vehicle time to
//! wake up before it is asked. The gateway has been seen to deliver fresh data
//! without ever raising the completion flag, so `TimedOut` is reported as
//! such and callers may re-fetch status anyway.
//!
//! Dropping a cycle (or the future of [`RefreshCycle::run`]) between attempts
//! leaves the session untouched; the token is consumed and never reused.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{CarwingsError, Result};
use crate::types::RefreshSnapshot;
use crate::vehicle::Vehicle;

/// Correlation key for one refresh request
///
/// Not `Clone`: polling consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct UpdateRequestToken {
    result_key: String,
    vin: String,
}

impl UpdateRequestToken {
    pub(crate) fn new(result_key: String, vin: String) -> Self {
        Self { result_key, vin }
    }

    pub fn result_key(&self) -> &str {
        &self.result_key
    }

    /// Vehicle the refresh was requested for
    pub fn vin(&self) -> &str {
        &self.vin
    }
}

/// How long to wait between checks and how many checks to make
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Upper bound on time spent sleeping in one cycle
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), 3)
    }
}

/// State of a refresh cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Requested,
    Polling,
    Completed,
    TimedOut,
    Failed,
}

impl RefreshState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RefreshState::Completed | RefreshState::TimedOut | RefreshState::Failed
        )
    }
}

impl fmt::Display for RefreshState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RefreshState::Requested => "requested",
            RefreshState::Polling => "polling",
            RefreshState::Completed => "completed",
            RefreshState::TimedOut => "timed out",
            RefreshState::Failed => "failed",
        })
    }
}

/// How a refresh cycle ended, when it did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The vehicle reported back
    Completed(RefreshSnapshot),
    /// Every check said "not yet"
    TimedOut { attempts: u32 },
}

impl UpdateOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, UpdateOutcome::Completed(_))
    }

    pub fn snapshot(&self) -> Option<&RefreshSnapshot> {
        match self {
            UpdateOutcome::Completed(snapshot) => Some(snapshot),
            UpdateOutcome::TimedOut { .. } => None,
        }
    }
}

/// A refresh cycle driven one attempt at a time
#[derive(Debug)]
pub struct RefreshCycle<'s> {
    vehicle: Vehicle<'s>,
    token: UpdateRequestToken,
    policy: PollPolicy,
    state: RefreshState,
    attempts: u32,
}

impl<'s> RefreshCycle<'s> {
    pub(crate) fn new(vehicle: Vehicle<'s>, token: UpdateRequestToken, policy: PollPolicy) -> Self {
        Self {
            vehicle,
            token,
            policy,
            state: RefreshState::Requested,
            attempts: 0,
        }
    }

    pub fn state(&self) -> RefreshState {
        self.state
    }

    /// Checks issued so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn remaining_attempts(&self) -> u32 {
        self.policy.max_attempts.saturating_sub(self.attempts)
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Sleep for the poll interval, then check once
    ///
    /// Returns `Ok(None)` while the vehicle has not answered and attempts
    /// remain, `Ok(Some(_))` once the cycle completed or timed out. Calling
    /// again after a terminal state fails with
    /// [`CarwingsError::RefreshFinished`] without contacting the gateway.
    pub async fn poll_once(&mut self) -> Result<Option<UpdateOutcome>> {
        if self.state.is_terminal() {
            return Err(CarwingsError::RefreshFinished);
        }
        if self.remaining_attempts() == 0 {
            return Ok(Some(self.time_out()));
        }

        self.state = RefreshState::Polling;
        tokio::time::sleep(self.policy.interval).await;

        self.attempts += 1;
        debug!(
            "Checking refresh {} (attempt {}/{})",
            self.token.result_key(),
            self.attempts,
            self.policy.max_attempts
        );

        match self.vehicle.get_status_from_update(&self.token).await {
            Ok(Some(snapshot)) => {
                self.state = RefreshState::Completed;
                info!("Refresh completed after {} attempt(s)", self.attempts);
                Ok(Some(UpdateOutcome::Completed(snapshot)))
            }
            Ok(None) if self.remaining_attempts() == 0 => Ok(Some(self.time_out())),
            Ok(None) => Ok(None),
            Err(err) => {
                self.state = RefreshState::Failed;
                Err(err)
            }
        }
    }

    /// Poll until the cycle reaches a terminal state
    pub async fn run(mut self) -> Result<UpdateOutcome> {
        loop {
            if let Some(outcome) = self.poll_once().await? {
                return Ok(outcome);
            }
        }
    }

    fn time_out(&mut self) -> UpdateOutcome {
        self.state = RefreshState::TimedOut;
        warn!(
            "Refresh {} not confirmed after {} attempt(s)",
            self.token.result_key(),
            self.attempts
        );
        UpdateOutcome::TimedOut {
            attempts: self.attempts,
        }
    }
}

//! Carwings Client Library
//!
//! Reads battery and climate-control telemetry of Nissan electric vehicles
//! from the Carwings gateway and asks the vehicle to report fresh data.
//!
//! # Example
//!
//! ```rust,no_run
//! use carwings_client::{Credentials, PollPolicy, Session, UpdateOutcome};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let credentials = Credentials::new("user@example.com", "secret", "US");
//!     let session = Session::open(&credentials).await?;
//!     let leaf = session.get_vehicle()?;
//!
//!     // Whatever the gateway last stored (may be stale)
//!     if let Some(battery) = leaf.get_latest_battery_status().await? {
//!         println!("{:?}%", battery.battery_percent());
//!     }
//!
//!     // Make the car report, then read again
//!     let token = leaf.request_update().await?;
//!     match leaf.poll_until_complete(token, PollPolicy::default()).await? {
//!         UpdateOutcome::Completed(_) => println!("vehicle reported back"),
//!         UpdateOutcome::TimedOut { attempts } => println!("no answer after {attempts} checks"),
//!     }
//!     let _fresh = leaf.get_latest_battery_status().await?;
//!
//!     session.logout();
//!     Ok(())
//! }
//! ```
//!
//! # Scoped sessions
//!
//! [`Session::scope`] logs in, runs a closure and always logs out:
//!
//! ```rust,ignore
//! let hvac = Session::scope(&credentials, |session| {
//!     Box::pin(async move { session.get_vehicle()?.get_latest_hvac_status().await })
//! })
//! .await?;
//! ```
//!
//! # Testing
//!
//! The `testing` module serves an axum router in place of the gateway:
//!
//! ```rust,ignore
//! use carwings_client::testing::TestServer;
//!
//! let server = TestServer::start(mock_gateway()).await?;
//! let session = Session::open(&server.credentials("user", "pw", "US")).await?;
//! ```

mod client;
mod credentials;
mod error;
mod normalize;
mod password;
mod raw;
mod refresh;
mod session;
pub mod testing;
mod types;
mod vehicle;

pub use client::ClientConfig;
pub use credentials::{Credentials, Region, DEFAULT_BASE_URL};
pub use error::{CarwingsError, Result};
pub use normalize::{normalize_battery, normalize_hvac, normalize_refresh};
pub use refresh::{PollPolicy, RefreshCycle, RefreshState, UpdateOutcome, UpdateRequestToken};
pub use session::{Session, SessionWatch};
pub use types::*;
pub use vehicle::Vehicle;

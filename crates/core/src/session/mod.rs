//! The Connection Session Manager.
//!
//! One instance owns one physical device for the life of the process. All
//! state-mutating operations funnel through a single exclusive critical
//! section; status reads come from a snapshot that never waits on it.

mod config;
mod idle;
mod manager;
mod state;

pub use config::SessionConfig;
pub use idle::IdleExpiry;
pub use manager::{ExecuteOutcome, SessionManager};
pub use state::{ConnectionInfo, SessionPhase};

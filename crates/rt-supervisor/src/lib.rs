//! Child-process launch, `SIGCHLD` reaping, and status query for the
//! managed runtime.
//!
//! [`Supervisor`] ties the three pieces together into a single
//! process-lifetime context that installs the `SIGCHLD` handler exactly
//! once (spec §9 "one runtime context instead of scattered globals").

pub mod child;
pub mod error;
pub mod fatal;
pub mod live_list;
pub mod query;
pub mod reaper;
pub mod supervisor;
pub mod types;

#[cfg(unix)]
#[path = "launch_unix.rs"]
mod launch;
#[cfg(windows)]
#[path = "launch_windows.rs"]
mod launch;

pub use child::{ChildRecord, ProcessStatus};
pub use error::SupervisorError;
pub use launch::{LaunchRequest, Process};
pub use supervisor::Supervisor;
pub use types::{is_terminal_status, process_state_from_raw, ProcessRunState, ProcessState, StreamSpec};

//! Non-recoverable environment failures.
//!
//! Heap initialization has no recovery path: a failed reservation or
//! commit leaves the process in a state generated code cannot run in.
//! `fatal` prints the caller's location and the decoded OS error, then
//! exits with code -1, matching the original runtime's error policy.

use std::fmt::Display;

#[track_caller]
pub fn fatal(err: impl Display) -> ! {
    let loc = std::panic::Location::caller();
    eprintln!("[{}:{}] {}", loc.file(), loc.line(), err);
    std::process::exit(-1);
}

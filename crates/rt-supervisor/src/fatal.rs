//! Non-recoverable environment failures.
//!
//! Per spec §7, a `sigprocmask`/`sigsuspend` call failing with an
//! unexpected `errno` is a fatal environment error, not a propagated
//! one — `retrieve_state`'s contract is "if this returns, it
//! succeeded". `fatal` prints the caller's location and the error,
//! then exits with code -1, matching `rt_heap::fatal::fatal`'s policy.

use std::fmt::Display;

#[track_caller]
pub fn fatal(err: impl Display) -> ! {
    let loc = std::panic::Location::caller();
    eprintln!("[{}:{}] {}", loc.file(), loc.line(), err);
    std::process::exit(-1);
}

//! `retrieve_state`: blocking or non-blocking status query (spec §4.3.4).

use crate::child::ProcessStatus;
use crate::fatal::fatal;
use crate::types::{is_terminal_status, process_state_from_raw, ProcessState};
use nix::errno::Errno;
use nix::sys::signal::{sigprocmask, sigsuspend, SigSet, SigmaskHow, Signal};
use std::sync::atomic::Ordering;

/// Blocks `SIGCHLD`, reads `status`, and — if `wait` is true and the
/// status isn't terminal yet — suspends on `sigsuspend` until the
/// reaper delivers one. Per spec §4.3.4 the contract here is "if this
/// returns, it succeeded": a `sigsuspend` wakeup with an unexpected
/// `errno` is a fatal environment failure, not a propagated one.
pub fn retrieve_state(status: &ProcessStatus, wait: bool) -> ProcessState {
    let mut block = SigSet::empty();
    block.add(Signal::SIGCHLD);
    let mut prior = SigSet::empty();
    sigprocmask(SigmaskHow::SIG_BLOCK, Some(&block), Some(&mut prior))
        .unwrap_or_else(|e| fatal(format!("sigprocmask(SIG_BLOCK) failed: {e}")));

    let mut chld_only = SigSet::empty();
    chld_only.add(Signal::SIGCHLD);

    let result = loop {
        let code_set = status.code_set.load(Ordering::SeqCst);
        let raw = status.status_code.load(Ordering::SeqCst);
        if !wait || (code_set && is_terminal_status(raw)) {
            break process_state_from_raw(code_set, raw);
        }

        // SAFETY: `sigsuspend` atomically installs `chld_only` as the
        // process mask and sleeps; only `SIGCHLD` can wake us, and the
        // reaper runs with `SIGCHLD` itself blocked so it cannot recurse.
        match sigsuspend(&chld_only) {
            Ok(()) => continue,
            Err(Errno::EINTR) => continue,
            Err(e) => fatal(format!("sigsuspend woke with unexpected errno: {e}")),
        }
    };

    sigprocmask(SigmaskHow::SIG_SETMASK, Some(&prior), None)
        .unwrap_or_else(|e| fatal(format!("sigprocmask(SIG_SETMASK) failed: {e}")));
    result
}

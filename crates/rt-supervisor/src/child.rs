//! Child process records and their status.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// Status of a single child, shared between the reaper — which writes
/// `code_set`/`status_code` from inside an async signal handler — and
/// managed code, which clears `referenced_from_stanza` when its
/// wrapper is finalized. Both scalar fields are atomics so the reaper
/// never needs a lock to update them (spec §3, §5).
#[derive(Debug)]
pub struct ProcessStatus {
    pub code_set: AtomicBool,
    pub status_code: AtomicI32,
    pub referenced_from_stanza: AtomicBool,
}

impl ProcessStatus {
    pub fn new() -> Self {
        Self {
            code_set: AtomicBool::new(false),
            status_code: AtomicI32::new(-1),
            referenced_from_stanza: AtomicBool::new(true),
        }
    }

    /// True exactly when the reaper has observed a terminal status and
    /// managed code has released its handle (spec §3, §8).
    pub fn is_free_eligible(&self) -> bool {
        self.code_set.load(Ordering::SeqCst)
            && crate::types::is_terminal_status(self.status_code.load(Ordering::SeqCst))
            && !self.referenced_from_stanza.load(Ordering::SeqCst)
    }
}

impl Default for ProcessStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// One entry in the live-child list: just enough for the reaper to
/// find and `waitpid` the process and record its status. The stream
/// handles live on the caller-visible [`crate::launch::Process`]
/// instead — the reaper never touches them, and Rust ownership rules
/// don't allow a `File` to be read from both the list and the handle
/// the caller holds.
pub struct ChildRecord {
    pub pid: nix::unistd::Pid,
    pub user_id: Option<String>,
    pub status: std::sync::Arc<ProcessStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_status_is_not_free_eligible() {
        let status = ProcessStatus::new();
        assert!(!status.is_free_eligible());
    }

    #[test]
    fn free_eligible_requires_all_three_conditions() {
        let status = ProcessStatus::new();
        status.code_set.store(true, Ordering::SeqCst);
        status.status_code.store(0, Ordering::SeqCst); // WIFEXITED, code 0
        assert!(!status.is_free_eligible()); // still referenced

        status.referenced_from_stanza.store(false, Ordering::SeqCst);
        assert!(status.is_free_eligible());
    }
}

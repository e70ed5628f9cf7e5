//! Stream-spec model and process-state result types.

/// Selects how one of a child's three standard streams is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSpec {
    /// Inherit the parent's stdin (fd 0).
    StandardIn,
    /// Inherit the parent's stdout (fd 1).
    StandardOut,
    /// Inherit the parent's stderr (fd 2).
    StandardErr,
    /// Create a pipe; the parent gets the write end as a buffered stream.
    ProcessIn,
    /// Create a pipe; the parent gets the read end as a buffered stream.
    ProcessOut,
    /// Create a pipe; the parent gets the read end as a buffered stream.
    ProcessErr,
}

impl StreamSpec {
    /// True for the three `PROCESS_*` variants, which require a pipe.
    pub fn wants_pipe(self) -> bool {
        matches!(self, StreamSpec::ProcessIn | StreamSpec::ProcessOut | StreamSpec::ProcessErr)
    }
}

/// The observed run state of a child process, as reported by
/// [`crate::query::retrieve_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessRunState {
    Running,
    Done,
    Terminated,
    Stopped,
}

/// A `(state, code)` query result: `code` is 0 while `Running`, the
/// exit status while `Done`, or the signal number while `Terminated`/`Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessState {
    pub state: ProcessRunState,
    pub code: i32,
}

/// True for a raw `waitpid` status that represents normal exit or
/// signal termination — the only statuses after which a record becomes
/// eligible for free.
pub fn is_terminal_status(raw_status: i32) -> bool {
    unsafe { libc::WIFEXITED(raw_status) || libc::WIFSIGNALED(raw_status) }
}

/// Converts a raw `waitpid` status (and whether the reaper has ever
/// observed one) into a [`ProcessState`], per the mapping in spec §4.3.4.
pub fn process_state_from_raw(code_set: bool, raw_status: i32) -> ProcessState {
    if !code_set {
        return ProcessState { state: ProcessRunState::Running, code: 0 };
    }
    unsafe {
        if libc::WIFEXITED(raw_status) {
            ProcessState { state: ProcessRunState::Done, code: libc::WEXITSTATUS(raw_status) }
        } else if libc::WIFSIGNALED(raw_status) {
            ProcessState { state: ProcessRunState::Terminated, code: libc::WTERMSIG(raw_status) }
        } else if libc::WIFSTOPPED(raw_status) {
            ProcessState { state: ProcessRunState::Stopped, code: libc::WSTOPSIG(raw_status) }
        } else {
            ProcessState { state: ProcessRunState::Running, code: 0 }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_yet_observed_is_running() {
        let s = process_state_from_raw(false, 0);
        assert_eq!(s, ProcessState { state: ProcessRunState::Running, code: 0 });
    }

    #[test]
    fn stream_spec_wants_pipe_matches_process_variants() {
        assert!(StreamSpec::ProcessIn.wants_pipe());
        assert!(StreamSpec::ProcessOut.wants_pipe());
        assert!(StreamSpec::ProcessErr.wants_pipe());
        assert!(!StreamSpec::StandardIn.wants_pipe());
        assert!(!StreamSpec::StandardOut.wants_pipe());
        assert!(!StreamSpec::StandardErr.wants_pipe());
    }
}

use thiserror::Error;

/// Recoverable child-launch and query errors.
///
/// Per spec §7, these are the *only* errors this crate ever returns to
/// a caller — fatal environment failures (a `sigprocmask`/`sigsuspend`
/// call failing with an unexpected `errno`) terminate the process
/// instead of propagating, matching the original's "if the function
/// returns it succeeded" contract for `retrieve_state`.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to create pipe: {0}")]
    PipeCreation(#[source] nix::Error),

    #[error("failed to spawn child process: {0}")]
    Spawn(#[source] nix::Error),

    #[error("failed to close process stream")]
    PipeClose,

    #[error("process supervision is not implemented on this platform")]
    Unsupported,
}

impl SupervisorError {
    /// Returns the raw `errno` value a C caller would see in `errno`,
    /// for callers that still need the legacy numeric contract.
    pub fn as_errno(&self) -> i32 {
        match self {
            SupervisorError::PipeCreation(e) | SupervisorError::Spawn(e) => *e as i32,
            SupervisorError::PipeClose => libc::EIO,
            SupervisorError::Unsupported => libc::ENOSYS,
        }
    }
}

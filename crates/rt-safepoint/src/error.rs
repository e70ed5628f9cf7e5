use thiserror::Error;

/// Errors the patcher can report without terminating the process.
///
/// Per spec §4.2 the original's instruction-mutation contract depends
/// on a single-byte x86 opcode swap being atomic with respect to
/// instruction fetch. Rather than silently miscompiling on any other
/// target, this crate makes that assumption an explicit, checked
/// runtime contract (see `DESIGN.md`) instead of the original's
/// implicit one.
#[derive(Debug, Error)]
pub enum SafepointError {
    #[error("safepoint byte patching is only supported on x86_64")]
    UnsupportedArch,
}

use thiserror::Error;

/// Caller-logic errors the Heap Bootstrap component can report without
/// treating them as fatal environment failures. OS-level mmap/mprotect
/// failures are never surfaced through this type — per §4.1 they always
/// terminate the process via [`crate::fatal::fatal`].
#[derive(Debug, Error)]
pub enum HeapError {
    #[error("requested heap size {requested} exceeds maximum reservation {max}")]
    ExceedsMaxSize { requested: usize, max: usize },

    #[error("bitset base {addr:#x} is not aligned to a {required}-byte boundary")]
    BitsetMisaligned { addr: usize, required: usize },
}

//! Heap, nursery, and marking-bitset bootstrap for the managed runtime.
//!
//! Reserves the widest virtual range the collector will ever need,
//! commits the initial working set, and publishes pointers into that
//! range via an [`InitRecord`] for generated code to own from then on.
//! All failures here are fatal (§4.1 of the runtime spec) — there is no
//! recoverable path out of a failed heap bootstrap.

pub mod error;
pub mod fatal;
pub mod init_record;
pub mod layout;
pub mod mapping;
pub mod page;

pub use error::HeapError;
pub use init_record::{ExecStack, InitRecord, StackFrame};
pub use layout::Heap;

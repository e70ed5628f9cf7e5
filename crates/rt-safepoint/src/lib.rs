//! Safepoint catalog and in-place instruction-patching breakpoint
//! mechanism for the managed runtime.
//!
//! The catalog (see [`catalog`]) is built once by the out-of-scope
//! code generator and is immutable thereafter; [`patcher::Patcher`] is
//! the only thing that ever mutates runtime state, and all it mutates
//! is the single opcode byte at each catalogued address.

pub mod catalog;
pub mod error;
pub mod interrupt;
pub mod patcher;

pub use catalog::{AddressList, FileSafepoints, SafepointAddress, SafepointEntry, SafepointTable};
pub use error::SafepointError;
pub use patcher::{Patcher, OPCODE_BREAKPOINT, OPCODE_NOP};

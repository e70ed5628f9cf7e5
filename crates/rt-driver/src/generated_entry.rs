//! Documented extension point for the generated-code entry point.
//!
//! Spec §1 puts the managed-code generator explicitly out of scope;
//! §6 says the driver's only contract with it is "pass a pointer to
//! the `InitRecord`, ignore the return value". This stub stands in for
//! that call so the rest of the driver's wiring has somewhere to hand
//! off to.

use rt_heap::InitRecord;
use rt_safepoint::Patcher;
use rt_supervisor::Supervisor;
use tracing::debug;

/// Stands in for invoking generated code's entry point. A real build
/// would `transmute` a linked symbol to an `extern "C" fn(*mut InitRecord)`
/// and call it here; since code generation is out of scope, this just
/// logs what it was handed and returns immediately.
pub fn run(init_record: &mut InitRecord, _patcher: &Patcher, _supervisor: &Supervisor) {
    debug!(
        heap_start = ?init_record.heap_start,
        heap_top = ?init_record.heap_top,
        heap_limit = ?init_record.heap_limit,
        "handing off to generated code (stub)"
    );
}

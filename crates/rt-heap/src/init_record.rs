//! Data handed from the driver to generated code at startup.
//!
//! These types are deliberately plain-old-data: they describe memory
//! owned by raw, non-Rust-tracked reservations (the managed heap, the
//! marking bitset, the two bootstrap execution stacks) that generated
//! code manipulates directly. `#[repr(C)]` and raw pointers throughout
//! are not an oversight — nothing here should own a destructor, because
//! the OS reclaims these mappings wholesale when the process exits.

use std::ffi::c_void;
use std::ptr;

/// Pointer/size bundle passed from the driver to generated code.
///
/// Field order matches the layout described in spec §3: heap bounds,
/// bitset base and biased base, committed/limit/max sizes, the marking
/// stack triple, the two bootstrap execution stacks, and an opaque,
/// initially-empty tracker list.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InitRecord {
    pub heap_start: *mut u8,
    pub heap_top: *mut u8,
    pub heap_limit: *mut u8,
    pub heap_old_objects_end: *mut u8,

    pub bitset_base: *mut u8,
    pub bitset_base_biased: *mut u8,

    pub heap_size: usize,
    pub heap_size_limit: usize,
    pub heap_max_size: usize,

    pub marking_stack_start: *mut u8,
    pub marking_stack_bottom: *mut u8,
    pub marking_stack_top: *mut u8,

    pub stacks: [*mut ExecStack; 2],

    pub tracker_list: *mut c_void,
}

// SAFETY: an InitRecord is handed off once at startup to single-threaded
// generated code; the runtime itself never touches it concurrently with
// that handoff, so it is safe to move across the one thread boundary.
unsafe impl Send for InitRecord {}

impl InitRecord {
    /// The bootstrap user stack — first element of the two-stack chain.
    pub fn user_stack(&self) -> *mut ExecStack {
        self.stacks[0]
    }

    /// The bootstrap system stack, paired via the user stack's `tail`.
    pub fn system_stack(&self) -> *mut ExecStack {
        self.stacks[1]
    }
}

/// An execution-stack descriptor: committed size, frame/program-counter
/// bookkeeping, and a tail link chaining to the paired stack.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ExecStack {
    pub committed_size: usize,
    pub stack_base: *mut u8,
    pub frame_pointer: *mut u8,
    pub saved_pc: *mut u8,
    pub tail: *mut ExecStack,
}

impl ExecStack {
    pub fn new(stack_base: *mut u8, committed_size: usize) -> Self {
        Self {
            committed_size,
            stack_base,
            frame_pointer: stack_base,
            saved_pc: ptr::null_mut(),
            tail: ptr::null_mut(),
        }
    }
}

/// A stack frame: a return PC, a liveness bitmap over the frame's
/// slots, and a flexible tail of slot words.
///
/// Rust has no sound way to express a true C flexible array member, so
/// the tail is modeled as a base pointer plus an explicit slot count
/// rather than embedded storage — callers index it exactly the way the
/// original's pointer walk would, just without pretending the frame
/// owns memory it doesn't.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct StackFrame {
    pub return_pc: *mut u8,
    pub liveness_bitmap: u64,
    slots_base: *mut u64,
    slot_count: usize,
}

impl StackFrame {
    /// # Safety
    /// `slots_base` must point at `slot_count` contiguous, live `u64` words.
    pub unsafe fn new(return_pc: *mut u8, liveness_bitmap: u64, slots_base: *mut u64, slot_count: usize) -> Self {
        Self {
            return_pc,
            liveness_bitmap,
            slots_base,
            slot_count,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Returns the slot at `index`, or `None` if out of range.
    pub fn slot(&self, index: usize) -> Option<u64> {
        if index >= self.slot_count {
            return None;
        }
        // SAFETY: `new`'s precondition guarantees `slots_base` is valid
        // for `slot_count` words, and `index < slot_count` here.
        Some(unsafe { self.slots_base.add(index).read() })
    }

    /// Reports whether the slot at `index` is live, per the liveness bitmap.
    pub fn slot_is_live(&self, index: usize) -> bool {
        index < 64 && index < self.slot_count && (self.liveness_bitmap & (1 << index)) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_frame_reads_slots_and_liveness() {
        let mut slots = [10u64, 20, 30];
        let frame = unsafe { StackFrame::new(ptr::null_mut(), 0b101, slots.as_mut_ptr(), slots.len()) };

        assert_eq!(frame.slot(0), Some(10));
        assert_eq!(frame.slot(1), Some(20));
        assert_eq!(frame.slot(2), Some(30));
        assert_eq!(frame.slot(3), None);

        assert!(frame.slot_is_live(0));
        assert!(!frame.slot_is_live(1));
        assert!(frame.slot_is_live(2));
    }

    #[test]
    fn exec_stack_new_has_null_tail_and_pc() {
        let mut buf = [0u8; 16];
        let stack = ExecStack::new(buf.as_mut_ptr(), buf.len());
        assert_eq!(stack.frame_pointer, buf.as_mut_ptr());
        assert!(stack.tail.is_null());
        assert!(stack.saved_pc.is_null());
    }
}

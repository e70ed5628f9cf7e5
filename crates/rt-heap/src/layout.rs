//! Heap, nursery, marking-bitset, and marking-stack layout decisions.
//!
//! Constants and derivations mirror spec §4.1 exactly: an 8 MiB initial
//! heap, an 8 GiB maximum reservation, a 1/8 nursery fraction split into
//! two half-spaces, a one-bit-per-heap-word marking bitset biased for
//! the mutator's hot-path indexing, and a fixed 8 MiB marking stack.

use crate::error::HeapError;
use crate::fatal::fatal;
use crate::init_record::{ExecStack, InitRecord};
use crate::mapping::{map, resize, unmap};
use crate::page::{page_size, roundup, roundup_page};
use std::mem::size_of;
use std::ptr;

const MIB: usize = 1024 * 1024;
const GIB: usize = 1024 * MIB;

const INITIAL_HEAP_HINT: usize = 8 * MIB;
const MAX_HEAP_HINT: usize = 8 * GIB;
const NURSERY_FRACTION: usize = 8;
const MARKING_STACK_HINT: usize = 8 * MIB;
const EXEC_STACK_SIZE: usize = 8 * 1024;

/// Bits per bitset byte; the bitset dedicates one bit per heap word.
const BITS_PER_BYTE: usize = 8;
const WORD_SIZE: usize = size_of::<usize>();
const BITSET_ALIGNMENT: usize = 512;

fn bitset_bytes_for_heap(heap_bytes: usize) -> usize {
    // One bit per heap word: heap_bytes / WORD_SIZE words, /8 for bytes.
    roundup_page((heap_bytes / WORD_SIZE) / BITS_PER_BYTE)
}

/// Owns every reservation the bootstrap makes: the heap itself, the
/// marking bitset, the marking stack, and the two bump-allocated
/// bootstrap execution stacks. Dropping a `Heap` releases all of them.
pub struct Heap {
    heap_base: *mut u8,
    heap_committed: usize,
    heap_max: usize,

    bitset_base: *mut u8,
    bitset_max: usize,

    marking_stack_base: *mut u8,
    marking_stack_size: usize,

    bump_cursor: *mut u8,
    bump_limit: *mut u8,

    init_record: InitRecord,
}

// SAFETY: all pointers here are raw reservations owned exclusively by
// this `Heap`; the runtime drives it from a single thread (§5).
unsafe impl Send for Heap {}

impl Heap {
    /// Bootstraps the heap, bitset, and marking stack, and hands back a
    /// `Heap` plus its populated `InitRecord`. Every failure is fatal.
    pub fn bootstrap() -> Heap {
        let initial_heap = roundup_page(INITIAL_HEAP_HINT);
        let max_heap = roundup_page(MAX_HEAP_HINT);

        let heap_base = map(initial_heap, max_heap);

        let nursery_half = roundup(initial_heap / NURSERY_FRACTION / 2, WORD_SIZE);
        let heap_old_objects_end = heap_base;
        // SAFETY: `nursery_half * 2 <= initial_heap`, which is committed.
        let heap_top = unsafe { heap_base.add(nursery_half) };
        let heap_limit = unsafe { heap_top.add(nursery_half) };

        let bitset_committed = bitset_bytes_for_heap(initial_heap);
        let bitset_max = bitset_bytes_for_heap(max_heap);
        let bitset_base = map(bitset_committed, bitset_max);

        if (bitset_base as usize) % BITSET_ALIGNMENT != 0 {
            fatal(HeapError::BitsetMisaligned {
                addr: bitset_base as usize,
                required: BITSET_ALIGNMENT,
            });
        }
        let bitset_base_biased = (bitset_base as usize).wrapping_sub((heap_base as usize) >> 6) as *mut u8;

        let marking_stack_size = roundup_page(MARKING_STACK_HINT);
        let marking_stack_base = map(marking_stack_size, marking_stack_size);

        // Bootstrap execution stacks are bump-allocated out of the
        // committed, post-nursery region of the heap — ahead of where
        // the GC will ever place a real old object at this point.
        let bump_start = heap_limit;
        let bump_limit = unsafe { heap_base.add(initial_heap) };

        let mut bump_cursor = bump_start;
        let user_stack = bump_alloc_exec_stack(&mut bump_cursor, bump_limit);
        let system_stack = bump_alloc_exec_stack(&mut bump_cursor, bump_limit);
        unsafe {
            (*user_stack).tail = system_stack;
        }

        let init_record = InitRecord {
            heap_start: heap_base,
            heap_top,
            heap_limit,
            heap_old_objects_end,
            bitset_base,
            bitset_base_biased,
            heap_size: initial_heap,
            heap_size_limit: initial_heap,
            heap_max_size: max_heap,
            marking_stack_start: marking_stack_base,
            marking_stack_bottom: marking_stack_base,
            marking_stack_top: marking_stack_base,
            stacks: [user_stack, system_stack],
            tracker_list: ptr::null_mut(),
        };

        Heap {
            heap_base,
            heap_committed: initial_heap,
            heap_max: max_heap,
            bitset_base,
            bitset_max,
            marking_stack_base,
            marking_stack_size,
            bump_cursor,
            bump_limit,
            init_record,
        }
    }

    pub fn init_record(&self) -> &InitRecord {
        &self.init_record
    }

    pub fn init_record_mut(&mut self) -> &mut InitRecord {
        &mut self.init_record
    }

    /// Grows the committed heap (and matching bitset region) to
    /// `new_size` bytes. Returns an error instead of growing past the
    /// maximum reservation; any underlying commit failure is fatal.
    pub fn grow(&mut self, new_size: usize) -> Result<(), HeapError> {
        self.resize_to(new_size)
    }

    /// Shrinks the committed heap (and matching bitset region) to
    /// `new_size` bytes.
    pub fn shrink(&mut self, new_size: usize) -> Result<(), HeapError> {
        self.resize_to(new_size)
    }

    fn resize_to(&mut self, new_size: usize) -> Result<(), HeapError> {
        if new_size > self.heap_max {
            return Err(HeapError::ExceedsMaxSize {
                requested: new_size,
                max: self.heap_max,
            });
        }
        let new_size = roundup_page(new_size);
        if new_size == self.heap_committed {
            return Ok(());
        }

        resize(self.heap_base, self.heap_committed, new_size);

        let new_bitset = bitset_bytes_for_heap(new_size);
        let old_bitset = bitset_bytes_for_heap(self.heap_committed);
        if new_bitset != old_bitset {
            resize(self.bitset_base, old_bitset, new_bitset);
        }

        self.heap_committed = new_size;
        self.init_record.heap_size = new_size;
        Ok(())
    }
}

fn bump_alloc_exec_stack(cursor: &mut *mut u8, limit: *mut u8) -> *mut ExecStack {
    let size = roundup(EXEC_STACK_SIZE, WORD_SIZE);
    let struct_size = roundup(size_of::<ExecStack>(), WORD_SIZE);
    let total = size + struct_size;
    // SAFETY: bootstrap reserves far more than two stacks' worth inside
    // the initial committed heap; this is a fatal invariant, not a
    // recoverable runtime condition.
    if unsafe { cursor.add(total) } as usize > limit as usize {
        fatal("bootstrap execution stack allocation exceeds committed heap");
    }

    let stack_base = *cursor;
    let record_ptr = unsafe { cursor.add(size) } as *mut ExecStack;
    unsafe {
        record_ptr.write(ExecStack::new(stack_base, size));
        *cursor = cursor.add(total);
    }
    record_ptr
}

impl Drop for Heap {
    fn drop(&mut self) {
        unmap(self.marking_stack_base, self.marking_stack_size);
        unmap(self.bitset_base, self.bitset_max);
        unmap(self.heap_base, self.heap_max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_brackets_nursery_correctly() {
        let heap = Heap::bootstrap();
        let rec = heap.init_record();

        assert_eq!(rec.heap_old_objects_end, rec.heap_start);
        assert!(rec.heap_top > rec.heap_start);
        assert!(rec.heap_limit > rec.heap_top);

        let nursery_half = (rec.heap_top as usize) - (rec.heap_start as usize);
        let second_half = (rec.heap_limit as usize) - (rec.heap_top as usize);
        assert_eq!(nursery_half, second_half);
    }

    #[test]
    fn bitset_base_is_512_byte_aligned() {
        let heap = Heap::bootstrap();
        assert_eq!(heap.bitset_base as usize % BITSET_ALIGNMENT, 0);
    }

    #[test]
    fn biased_bitset_base_matches_formula() {
        let heap = Heap::bootstrap();
        let rec = heap.init_record();
        let expected = (rec.bitset_base as usize).wrapping_sub((rec.heap_start as usize) >> 6);
        assert_eq!(rec.bitset_base_biased as usize, expected);
    }

    #[test]
    fn bootstrap_stacks_are_linked_user_to_system() {
        let heap = Heap::bootstrap();
        let rec = heap.init_record();
        let user = rec.user_stack();
        let system = rec.system_stack();
        assert!(!user.is_null());
        assert!(!system.is_null());
        unsafe {
            assert_eq!((*user).tail, system);
            assert!((*system).tail.is_null());
        }
    }

    #[test]
    fn grow_then_shrink_roundtrips() {
        let mut heap = Heap::bootstrap();
        let bigger = heap.heap_committed + page_size() * 4;
        heap.grow(bigger).unwrap();
        assert_eq!(heap.init_record().heap_size, roundup_page(bigger));

        heap.shrink(heap.heap_committed - page_size()).unwrap();
    }

    #[test]
    fn grow_past_max_is_rejected() {
        let mut heap = Heap::bootstrap();
        let too_big = heap.heap_max + page_size();
        assert!(matches!(heap.grow(too_big), Err(HeapError::ExceedsMaxSize { .. })));
    }
}

//! Raw virtual-memory reservation and commit/decommit primitives.
//!
//! POSIX implements both directions of `resize` as page-protection
//! changes (`mprotect`); `map` combines a `PROT_NONE` reservation with
//! an immediate commit of the first `min` bytes. Every failure here is
//! fatal per the component's error policy (§4.1): callers are expected
//! to call `map`/`resize`/`unmap` only during bootstrap and shutdown,
//! where there is no sensible recovery from a failed reservation.

use crate::fatal::fatal;
use crate::page::page_size;
use std::ffi::c_void;
use std::ptr;

fn os_error(context: &str) -> String {
    let err = std::io::Error::last_os_error();
    format!("{context}: {err}")
}

/// Reserves `max` bytes of address space with no access, then commits
/// the first `min` bytes as readable/writable/executable. Both sizes
/// must already be whole multiples of the page size (the caller rounds).
/// Returns the base address of the reservation.
#[track_caller]
pub fn map(min: usize, max: usize) -> *mut u8 {
    debug_assert_eq!(min % page_size(), 0);
    debug_assert_eq!(max % page_size(), 0);

    // SAFETY: MAP_ANON|MAP_PRIVATE with a null fd and zero offset is the
    // standard anonymous-mapping incantation; PROT_NONE means the pages
    // are reserved but untouched until the subsequent mprotect commits them.
    let base = unsafe {
        libc::mmap(
            ptr::null_mut(),
            max,
            libc::PROT_NONE,
            libc::MAP_ANON | libc::MAP_PRIVATE,
            -1,
            0,
        )
    };
    if base == libc::MAP_FAILED {
        fatal(os_error("mmap reservation failed"));
    }

    if min > 0 {
        commit(base, min);
    }

    base as *mut u8
}

fn commit(base: *mut c_void, len: usize) {
    // SAFETY: `base..base+len` was reserved by a prior mmap of at least
    // this size; mprotect only changes protection, it does not move or
    // resize the mapping.
    let rc = unsafe { libc::mprotect(base, len, libc::PROT_READ | libc::PROT_WRITE | libc::PROT_EXEC) };
    if rc != 0 {
        fatal(os_error("mprotect commit failed"));
    }
}

fn decommit(base: *mut c_void, len: usize) {
    // SAFETY: same mapping precondition as `commit`; PROT_NONE makes the
    // range inaccessible without releasing the address range itself.
    let rc = unsafe { libc::mprotect(base, len, libc::PROT_NONE) };
    if rc != 0 {
        fatal(os_error("mprotect decommit failed"));
    }
}

/// Grows the committed region from `old` to `new` bytes (committing
/// `[old, new)`) or shrinks it (decommitting `[new, old)`). A no-op
/// when `old == new`.
#[track_caller]
pub fn resize(base: *mut u8, old: usize, new: usize) {
    use std::cmp::Ordering;
    match new.cmp(&old) {
        Ordering::Equal => {}
        Ordering::Greater => {
            // SAFETY: caller guarantees `base` is a live reservation of
            // at least `new` bytes and `[old, new)` lies within it.
            let region = unsafe { base.add(old) as *mut c_void };
            commit(region, new - old);
        }
        Ordering::Less => {
            // SAFETY: see above; `[new, old)` lies within the reservation.
            let region = unsafe { base.add(new) as *mut c_void };
            decommit(region, old - new);
        }
    }
}

/// Releases an entire reservation. A no-op if `base` is null.
#[track_caller]
pub fn unmap(base: *mut u8, size: usize) {
    if base.is_null() {
        return;
    }
    // SAFETY: caller guarantees `base` is the result of a prior `map`
    // call and `size` matches the original `max` passed to it.
    let rc = unsafe { libc::munmap(base as *mut c_void, size) };
    if rc != 0 {
        fatal(os_error("munmap failed"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::page_size;

    #[test]
    fn map_commits_min_and_reserves_max() {
        let page = page_size();
        let min = page;
        let max = page * 4;
        let base = map(min, max);
        assert!(!base.is_null());

        // The committed region is writable.
        unsafe {
            base.write(0xAB);
            assert_eq!(base.read(), 0xAB);
        }

        unmap(base, max);
    }

    #[test]
    fn map_with_zero_min_commits_nothing() {
        let page = page_size();
        let base = map(0, page * 2);
        assert!(!base.is_null());
        unmap(base, page * 2);
    }

    #[test]
    fn resize_grow_then_shrink_is_accessible_then_inaccessible() {
        let page = page_size();
        let max = page * 4;
        let base = map(page, max);

        resize(base, page, page * 2);
        unsafe {
            let p = base.add(page);
            p.write(1);
            assert_eq!(p.read(), 1);
        }

        resize(base, page * 2, page);

        unmap(base, max);
    }

    #[test]
    fn resize_noop_when_equal() {
        let page = page_size();
        let base = map(page, page * 2);
        resize(base, page, page);
        unmap(base, page * 2);
    }

    #[test]
    fn unmap_null_is_noop() {
        unmap(ptr::null_mut(), 4096);
    }
}

//! Signal-handler-readable list of live child records.
//!
//! Insertions and topology mutations happen only while `SIGCHLD` is
//! blocked (spec §5); the reaper — which runs as the handler for that
//! very signal — only ever rewrites per-node status fields, never the
//! list's shape. The list is an intrusive singly linked list of
//! `Box::into_raw` nodes reached through an atomic head pointer, so a
//! signal handler can walk it with nothing but pointer-sized atomic
//! loads: no allocation, no lock, no lock-free algorithm beyond "the
//! head is one atomic pointer" (spec §9).

use crate::child::ChildRecord;
use std::sync::atomic::{AtomicPtr, Ordering};

struct Node {
    record: ChildRecord,
    next: AtomicPtr<Node>,
}

/// Head of the live-child list. Mutating methods (`push`,
/// `reap_free_eligible`) require the caller to hold `SIGCHLD` blocked;
/// `for_each` and `find` only ever load atomics, so they are always
/// safe to call from inside the `SIGCHLD` handler.
pub struct LiveList {
    head: AtomicPtr<Node>,
}

impl LiveList {
    pub fn new() -> Self {
        Self { head: AtomicPtr::new(std::ptr::null_mut()) }
    }

    /// Pushes `record` at the head. Caller must hold `SIGCHLD` blocked.
    pub fn push(&self, record: ChildRecord) {
        let node = Box::into_raw(Box::new(Node { record, next: AtomicPtr::new(std::ptr::null_mut()) }));
        loop {
            let head = self.head.load(Ordering::Acquire);
            // SAFETY: `node` was just created by this call and is not
            // yet reachable from `self.head`, so writing its `next` is
            // exclusive.
            unsafe { (*node).next.store(head, Ordering::Relaxed) };
            if self.head.compare_exchange(head, node, Ordering::AcqRel, Ordering::Acquire).is_ok() {
                return;
            }
        }
    }

    /// Calls `f` for every live record. Safe to call from the
    /// `SIGCHLD` handler.
    pub fn for_each(&self, mut f: impl FnMut(&ChildRecord)) {
        let mut cur = self.head.load(Ordering::Acquire);
        while let Some(node) = unsafe { cur.as_ref() } {
            f(&node.record);
            cur = node.next.load(Ordering::Acquire);
        }
    }

    /// Finds the record for `pid`, or `None` — never dereferences past
    /// the end of the list (spec §9 Open Question (a): the original's
    /// `get_child_process` skips the null check this returns safely).
    pub fn find(&self, pid: nix::unistd::Pid) -> Option<*const ChildRecord> {
        let mut cur = self.head.load(Ordering::Acquire);
        while let Some(node) = unsafe { cur.as_ref() } {
            if node.record.pid == pid {
                return Some(&node.record as *const ChildRecord);
            }
            cur = node.next.load(Ordering::Acquire);
        }
        None
    }

    /// Unlinks and frees every node whose record is free-eligible.
    /// Caller must hold `SIGCHLD` blocked — this mutates topology,
    /// which the reaper itself never does (spec §4.3.3).
    pub fn reap_free_eligible(&self) {
        let mut prev: *mut Node = std::ptr::null_mut();
        let mut cur = self.head.load(Ordering::Acquire);
        while let Some(node) = unsafe { cur.as_ref() } {
            let next = node.next.load(Ordering::Acquire);
            if node.record.status.is_free_eligible() {
                if prev.is_null() {
                    self.head.store(next, Ordering::Release);
                } else {
                    unsafe { (*prev).next.store(next, Ordering::Release) };
                }
                // SAFETY: `cur` was just unlinked from the list above;
                // topology mutations only happen under SIGCHLD-blocked
                // regions and the reaper never frees, so nothing else
                // can be concurrently walking into this node.
                unsafe { drop(Box::from_raw(cur)) };
            } else {
                prev = cur;
            }
            cur = next;
        }
    }
}

impl Default for LiveList {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LiveList {
    fn drop(&mut self) {
        let mut cur = self.head.load(Ordering::Acquire);
        while !cur.is_null() {
            // SAFETY: this only runs once, when the list itself is
            // dropped, so no concurrent reader (signal handler or
            // otherwise) can observe a node after it is freed here.
            let node = unsafe { Box::from_raw(cur) };
            cur = node.next.load(Ordering::Acquire);
        }
    }
}

// SAFETY: the only mutable state is the atomic head pointer and the
// atomics inside each `ProcessStatus`; every topology mutation is
// disciplined by the SIGCHLD-blocked regions described above.
unsafe impl Send for LiveList {}
unsafe impl Sync for LiveList {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::child::ProcessStatus;
    use nix::unistd::Pid;
    use std::sync::Arc;

    fn record(pid: i32) -> ChildRecord {
        ChildRecord { pid: Pid::from_raw(pid), user_id: None, status: Arc::new(ProcessStatus::new()) }
    }

    #[test]
    fn push_and_for_each_sees_every_record() {
        let list = LiveList::new();
        list.push(record(1));
        list.push(record(2));
        list.push(record(3));

        let mut seen = Vec::new();
        list.for_each(|c| seen.push(c.pid.as_raw()));
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn find_returns_none_past_the_end() {
        let list = LiveList::new();
        list.push(record(1));
        assert!(list.find(Pid::from_raw(1)).is_some());
        assert!(list.find(Pid::from_raw(99)).is_none());
    }

    #[test]
    fn reap_free_eligible_unlinks_only_terminal_unreferenced_nodes() {
        let list = LiveList::new();
        list.push(record(1));
        list.push(record(2));

        // Make pid 2's record free-eligible.
        list.for_each(|c| {
            if c.pid.as_raw() == 2 {
                c.status.code_set.store(true, std::sync::atomic::Ordering::SeqCst);
                c.status.status_code.store(0, std::sync::atomic::Ordering::SeqCst);
                c.status.referenced_from_stanza.store(false, std::sync::atomic::Ordering::SeqCst);
            }
        });

        list.reap_free_eligible();

        let mut remaining = Vec::new();
        list.for_each(|c| remaining.push(c.pid.as_raw()));
        assert_eq!(remaining, vec![1]);
    }
}

//! Process-global, build-time-constructed safepoint catalog.
//!
//! The catalog is a four-level tree — table → file → entry → address
//! list — that the (out-of-scope) code generator's link-time pass
//! builds once. It is never mutated again at runtime; only the
//! instruction bytes the addresses point at change, via
//! [`crate::patcher::Patcher`].

use std::collections::HashMap;

/// A single catalogued machine-code address and the safepoint group it
/// belongs to. Multiple addresses at one source line can share a group
/// id, e.g. every exit edge of a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafepointAddress {
    pub address: *mut u8,
    pub group_id: u32,
}

// SAFETY: a catalogued address names a static, read-only-after-link
// instruction byte, not runtime-allocated memory; the catalog itself
// is never mutated once the generator builds it (spec §3 invariant).
unsafe impl Send for SafepointAddress {}
unsafe impl Sync for SafepointAddress {}

/// All addresses generated for a single source-level safepoint.
#[derive(Debug, Clone, Default)]
pub struct AddressList {
    pub addresses: Vec<SafepointAddress>,
}

impl AddressList {
    pub fn new(addresses: Vec<SafepointAddress>) -> Self {
        Self { addresses }
    }
}

/// Binds a source line number to the address list generated for it.
#[derive(Debug, Clone)]
pub struct SafepointEntry {
    pub line: u32,
    pub addresses: AddressList,
}

/// All safepoint entries for one source file, kept in ascending line
/// order so `find_in_file` can return "next entry at or after".
#[derive(Debug, Clone)]
pub struct FileSafepoints {
    pub file: String,
    pub entries: Vec<SafepointEntry>,
}

impl FileSafepoints {
    pub fn new(file: impl Into<String>, mut entries: Vec<SafepointEntry>) -> Self {
        entries.sort_by_key(|e| e.line);
        Self { file: file.into(), entries }
    }
}

/// The complete, process-global catalog: every file's safepoints,
/// keyed by file name.
#[derive(Debug, Clone, Default)]
pub struct SafepointTable {
    files: HashMap<String, FileSafepoints>,
}

impl SafepointTable {
    pub fn new(files: Vec<FileSafepoints>) -> Self {
        Self { files: files.into_iter().map(|f| (f.file.clone(), f)).collect() }
    }

    pub fn file(&self, name: &str) -> Option<&FileSafepoints> {
        self.files.get(name)
    }

    /// Every catalogued address, in no particular order — the only
    /// grouping that matters for `enable_all`/`disable_all`, which
    /// touch every address regardless of which file or entry owns it.
    pub fn all_addresses(&self) -> impl Iterator<Item = &SafepointAddress> {
        self.files.values().flat_map(|f| f.entries.iter()).flat_map(|e| e.addresses.addresses.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_safepoints_sorts_entries_by_line() {
        let file = FileSafepoints::new(
            "f",
            vec![
                SafepointEntry { line: 30, addresses: AddressList::default() },
                SafepointEntry { line: 10, addresses: AddressList::default() },
                SafepointEntry { line: 20, addresses: AddressList::default() },
            ],
        );
        let lines: Vec<u32> = file.entries.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![10, 20, 30]);
    }

    #[test]
    fn table_looks_up_file_by_name() {
        let file = FileSafepoints::new("a.rs", vec![]);
        let table = SafepointTable::new(vec![file]);
        assert!(table.file("a.rs").is_some());
        assert!(table.file("b.rs").is_none());
    }
}

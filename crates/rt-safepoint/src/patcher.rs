//! In-place instruction patching for the safepoint catalog.
//!
//! Every catalogued address always holds either the x86 no-op opcode
//! (`0x90`) or the one-byte breakpoint trap (`0xCC`). The catalog
//! itself is read-only at runtime; only these single bytes are ever
//! mutated, and only on whole-byte boundaries the code generator chose
//! to already be instruction boundaries, so a CPU concurrently
//! fetching that instruction always observes either the old or the new
//! byte, never a torn mix (spec §5, §9).

use crate::catalog::{FileSafepoints, SafepointEntry, SafepointTable};
use crate::error::SafepointError;
use std::sync::atomic::{AtomicBool, Ordering};

pub const OPCODE_NOP: u8 = 0x90;
pub const OPCODE_BREAKPOINT: u8 = 0xCC;

/// Owns the catalog and the `all_enabled` flag that gates per-entry writes.
pub struct Patcher {
    catalog: SafepointTable,
    all_enabled: AtomicBool,
}

impl Patcher {
    pub fn new(catalog: SafepointTable) -> Self {
        Self { catalog, all_enabled: AtomicBool::new(false) }
    }

    pub fn catalog(&self) -> &SafepointTable {
        &self.catalog
    }

    /// True if the global trap is currently installed.
    pub fn is_enabled(&self) -> bool {
        self.all_enabled.load(Ordering::SeqCst)
    }

    /// Installs the breakpoint trap at every catalogued address.
    /// Idempotent: calling it twice in a row has the same effect as once.
    pub fn enable_all(&self) -> Result<(), SafepointError> {
        if self.all_enabled.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        for addr in self.catalog.all_addresses() {
            write_opcode(addr.address, OPCODE_BREAKPOINT)?;
        }
        Ok(())
    }

    /// Restores the no-op byte at every catalogued address. Returns the
    /// previously-enabled state. Idempotent.
    pub fn disable_all(&self) -> Result<bool, SafepointError> {
        let was_enabled = self.all_enabled.swap(false, Ordering::SeqCst);
        if !was_enabled {
            return Ok(false);
        }
        for addr in self.catalog.all_addresses() {
            write_opcode(addr.address, OPCODE_NOP)?;
        }
        Ok(true)
    }

    /// Writes `opcode` to every address in `entry`'s address list,
    /// unless the global trap is enabled — global state always
    /// dominates, so a per-entry write while `all_enabled` is a
    /// deliberate no-op rather than a conflicting partial state.
    pub fn write_breakpoint(&self, entry: &SafepointEntry, opcode: u8) -> Result<(), SafepointError> {
        if self.is_enabled() {
            return Ok(());
        }
        for addr in &entry.addresses.addresses {
            write_opcode(addr.address, opcode)?;
        }
        Ok(())
    }

    /// Returns the first entry in `file` whose line is at or after
    /// `line` — the next safepoint the debugger should land on. `None`
    /// if `file` is `None` or no such entry exists.
    pub fn find_in_file<'a>(file: Option<&'a FileSafepoints>, line: u32) -> Option<&'a SafepointEntry> {
        file?.entries.iter().find(|e| e.line >= line)
    }

    /// Linear scan of `entry`'s address list for `pc`; lets the
    /// debugger confirm which catalogued address a trap landed on.
    pub fn find_address(entry: &SafepointEntry, pc: *mut u8) -> Option<*mut u8> {
        entry.addresses.addresses.iter().find(|a| a.address == pc).map(|a| a.address)
    }
}

#[cfg(target_arch = "x86_64")]
fn write_opcode(address: *mut u8, opcode: u8) -> Result<(), SafepointError> {
    // SAFETY: every catalogued address names exactly one byte the code
    // generator guarantees is safe to overwrite with either opcode
    // (spec §3 catalog invariant); the store is a single aligned byte
    // write, atomic with respect to instruction fetch on x86_64.
    unsafe { std::ptr::write_volatile(address, opcode) };
    Ok(())
}

#[cfg(not(target_arch = "x86_64"))]
fn write_opcode(_address: *mut u8, _opcode: u8) -> Result<(), SafepointError> {
    Err(SafepointError::UnsupportedArch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AddressList, SafepointAddress};

    fn make_catalog(bytes: &mut [u8]) -> (SafepointTable, SafepointEntry) {
        let addr_a = SafepointAddress { address: &mut bytes[0] as *mut u8, group_id: 0 };
        let addr_b = SafepointAddress { address: &mut bytes[1] as *mut u8, group_id: 0 };
        let entry = SafepointEntry { line: 10, addresses: AddressList::new(vec![addr_a, addr_b]) };
        let file = FileSafepoints::new("f", vec![entry.clone()]);
        (SafepointTable::new(vec![file]), entry)
    }

    #[test]
    #[cfg(target_arch = "x86_64")]
    fn enable_disable_roundtrip_and_idempotence() {
        let mut bytes = [OPCODE_NOP, OPCODE_NOP];
        let (catalog, entry) = make_catalog(&mut bytes);
        let patcher = Patcher::new(catalog);

        patcher.enable_all().unwrap();
        assert_eq!(bytes, [OPCODE_BREAKPOINT, OPCODE_BREAKPOINT]);
        patcher.enable_all().unwrap(); // idempotent

        patcher.write_breakpoint(&entry, OPCODE_NOP).unwrap();
        assert_eq!(bytes, [OPCODE_BREAKPOINT, OPCODE_BREAKPOINT]); // global wins

        let was_enabled = patcher.disable_all().unwrap();
        assert!(was_enabled);
        assert_eq!(bytes, [OPCODE_NOP, OPCODE_NOP]);
        assert!(!patcher.disable_all().unwrap()); // idempotent, now false

        patcher.write_breakpoint(&entry, OPCODE_BREAKPOINT).unwrap();
        assert_eq!(bytes, [OPCODE_BREAKPOINT, OPCODE_BREAKPOINT]);
    }

    #[test]
    fn find_in_file_returns_next_at_or_after() {
        let file = FileSafepoints::new(
            "f",
            vec![
                SafepointEntry { line: 10, addresses: AddressList::default() },
                SafepointEntry { line: 20, addresses: AddressList::default() },
                SafepointEntry { line: 30, addresses: AddressList::default() },
            ],
        );

        assert_eq!(Patcher::find_in_file(Some(&file), 1).map(|e| e.line), Some(10));
        assert_eq!(Patcher::find_in_file(Some(&file), 20).map(|e| e.line), Some(20));
        assert_eq!(Patcher::find_in_file(Some(&file), 25).map(|e| e.line), Some(30));
        assert_eq!(Patcher::find_in_file(Some(&file), 31), None);
        assert_eq!(Patcher::find_in_file(None, 10), None);
    }

    #[test]
    fn find_address_scans_entry_list() {
        let mut bytes = [0u8; 2];
        let (_, entry) = make_catalog(&mut bytes);
        let hit = unsafe { bytes.as_mut_ptr().add(1) };
        assert_eq!(Patcher::find_address(&entry, hit), Some(hit));
        let miss = unsafe { bytes.as_mut_ptr().add(5) };
        assert_eq!(Patcher::find_address(&entry, miss), None);
    }
}

//! System page size and the rounding helpers the bootstrap layout depends on.

use nix::unistd::{sysconf, SysconfVar};
use once_cell::sync::OnceCell;

static PAGE_SIZE: OnceCell<usize> = OnceCell::new();

/// Returns the system page size, querying it via `sysconf` exactly once.
pub fn page_size() -> usize {
    *PAGE_SIZE.get_or_init(|| {
        match sysconf(SysconfVar::PAGE_SIZE) {
            Ok(Some(size)) if size > 0 => size as usize,
            _ => 4096,
        }
    })
}

/// Rounds `size` up to the next multiple of `align`. `align` must be a power of two.
pub fn roundup(size: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    (size + align - 1) & !(align - 1)
}

/// Rounds `size` up to the next whole page.
pub fn roundup_page(size: usize) -> usize {
    roundup(size, page_size())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_sane() {
        let sz = page_size();
        assert!(sz >= 4096);
        assert!(sz.is_power_of_two());
    }

    #[test]
    fn roundup_rounds_to_multiple() {
        assert_eq!(roundup(1, 4096), 4096);
        assert_eq!(roundup(4096, 4096), 4096);
        assert_eq!(roundup(4097, 4096), 8192);
        assert_eq!(roundup(0, 4096), 0);
    }

    #[test]
    fn roundup_page_matches_system_page_size() {
        let sz = page_size();
        assert_eq!(roundup_page(1), sz);
    }
}

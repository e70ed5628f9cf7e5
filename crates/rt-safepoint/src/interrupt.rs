//! Optional `SIGINT`-driven "force into the debugger" integration.
//!
//! Mirrors the original's interrupt glue: a `SIGINT` handler installed
//! on an alternate signal stack with automatic restart (`SA_RESTART`)
//! that flips a process-global run mode to `Step` and enables every
//! catalogued safepoint, so the next one managed code reaches traps
//! (spec §4.2).

use crate::patcher::Patcher;
use std::sync::atomic::{AtomicPtr, AtomicU8, Ordering};
use std::sync::Once;

/// Whether the debugger wants managed code to single-step through
/// safepoints (`Step`) or run freely (`Run`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunMode {
    Run = 0,
    Step = 1,
}

static RUN_MODE: AtomicU8 = AtomicU8::new(RunMode::Run as u8);
static INSTALLED_PATCHER: AtomicPtr<Patcher> = AtomicPtr::new(std::ptr::null_mut());
static INSTALL_ONCE: Once = Once::new();

/// The current process-global run mode.
pub fn run_mode() -> RunMode {
    match RUN_MODE.load(Ordering::SeqCst) {
        1 => RunMode::Step,
        _ => RunMode::Run,
    }
}

const ALTSTACK_SIZE: usize = libc::SIGSTKSZ;

/// Installs the `SIGINT` handler described above. Safe to call more
/// than once; only the first call actually installs anything.
///
/// # Safety
/// `patcher` must be `'static` in practice (owned by the process
/// lifetime runtime context) — the handler keeps a raw pointer to it
/// for as long as the process runs.
pub unsafe fn install(patcher: &'static Patcher) {
    INSTALL_ONCE.call_once(|| {
        INSTALLED_PATCHER.store(patcher as *const Patcher as *mut Patcher, Ordering::SeqCst);

        let stack = Box::leak(vec![0u8; ALTSTACK_SIZE].into_boxed_slice());
        let ss = libc::stack_t {
            ss_sp: stack.as_mut_ptr() as *mut libc::c_void,
            ss_flags: 0,
            ss_size: ALTSTACK_SIZE,
        };
        if libc::sigaltstack(&ss, std::ptr::null_mut()) != 0 {
            panic!("sigaltstack failed: {}", std::io::Error::last_os_error());
        }

        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = handle_sigint as usize;
        sa.sa_flags = libc::SA_ONSTACK | libc::SA_RESTART;
        libc::sigemptyset(&mut sa.sa_mask);
        if libc::sigaction(libc::SIGINT, &sa, std::ptr::null_mut()) != 0 {
            panic!("sigaction(SIGINT) failed: {}", std::io::Error::last_os_error());
        }
    });
}

extern "C" fn handle_sigint(_sig: libc::c_int) {
    RUN_MODE.store(RunMode::Step as u8, Ordering::SeqCst);
    let ptr = INSTALLED_PATCHER.load(Ordering::SeqCst);
    // SAFETY: `ptr` is either null (never installed) or was stored from
    // a `&'static Patcher` in `install`, which guarantees it outlives
    // every subsequent signal delivery.
    if let Some(patcher) = unsafe { ptr.as_ref() } {
        let _ = patcher.enable_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_mode_is_run_or_step() {
        // Installing the real handler touches process-global signal
        // state, so this only exercises the accessor; run_mode() must
        // always resolve to one of the two documented states.
        assert!(matches!(run_mode(), RunMode::Run | RunMode::Step));
    }
}

//! `SIGCHLD` installation and the async-signal-safe reaper itself.

use crate::live_list::LiveList;
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Once;

/// The previously installed `SIGCHLD` disposition, captured once at
/// install time (spec §3 "Old-SIGCHLD handler snapshot"). Chained to
/// only when it was installed through the old-school `signal(2)` API
/// (no `SA_SIGINFO`) and is neither `SIG_DFL` nor `SIG_IGN`.
struct PriorHandler {
    sigaction: libc::sigaction,
}

impl PriorHandler {
    fn chainable_handler(&self) -> Option<extern "C" fn(libc::c_int)> {
        if self.sigaction.sa_flags & libc::SA_SIGINFO != 0 {
            return None;
        }
        let handler = self.sigaction.sa_sigaction;
        if handler == libc::SIG_DFL || handler == libc::SIG_IGN {
            return None;
        }
        // SAFETY: just checked this isn't SIG_DFL/SIG_IGN and the prior
        // disposition was installed without SA_SIGINFO, so per
        // sigaction(2) it is a plain `void (*)(int)`.
        Some(unsafe { std::mem::transmute::<usize, extern "C" fn(libc::c_int)>(handler) })
    }
}

static PRIOR_HANDLER: OnceCell<PriorHandler> = OnceCell::new();
static LIVE_LIST: AtomicPtr<LiveList> = AtomicPtr::new(std::ptr::null_mut());
static INSTALL_ONCE: Once = Once::new();

const ALTSTACK_SIZE: usize = libc::SIGSTKSZ;

/// Installs the `SIGCHLD` reaper. Safe to call more than once; only
/// the first call actually installs the handler.
///
/// # Safety
/// `list` must be `'static` in practice — owned by the process-lifetime
/// [`crate::supervisor::Supervisor`] — since the handler keeps a raw
/// pointer to it for as long as the process runs.
pub unsafe fn install(list: &'static LiveList) {
    INSTALL_ONCE.call_once(|| {
        LIVE_LIST.store(list as *const LiveList as *mut LiveList, Ordering::SeqCst);

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
        sa.sa_sigaction = handle_sigchld as usize;
        sa.sa_flags = libc::SA_ONSTACK | libc::SA_RESTART;
        libc::sigemptyset(&mut sa.sa_mask);
        libc::sigaddset(&mut sa.sa_mask, libc::SIGCHLD);

        let mut old: libc::sigaction = std::mem::zeroed();
        if libc::sigaction(libc::SIGCHLD, &sa, &mut old) != 0 {
            panic!("sigaction(SIGCHLD) failed: {}", std::io::Error::last_os_error());
        }
        let _ = PRIOR_HANDLER.set(PriorHandler { sigaction: old });
    });
}

/// The reaper: drains every terminated or stopped child's status. Uses
/// only async-signal-safe primitives — `waitpid`, word-sized atomic
/// writes, list walking — and never allocates or touches `stdio`
/// (spec §4.3.3, §5). `sa_mask` includes `SIGCHLD` itself, so the
/// kernel keeps the signal blocked for the duration of this call —
/// it is not re-entrant.
extern "C" fn handle_sigchld(sig: libc::c_int) {
    let list_ptr = LIVE_LIST.load(Ordering::SeqCst);
    // SAFETY: `list_ptr` is either null (never installed) or was stored
    // from a `&'static LiveList` in `install`, which guarantees it
    // outlives every subsequent signal delivery.
    if let Some(list) = unsafe { list_ptr.as_ref() } {
        list.for_each(|child| {
            let mut raw_status: libc::c_int = 0;
            let flags = libc::WNOHANG | libc::WUNTRACED | libc::WCONTINUED;
            // SAFETY: `waitpid` is async-signal-safe; `child.pid` names
            // a process this supervisor spawned and still tracks.
            let rc = unsafe { libc::waitpid(child.pid.as_raw(), &mut raw_status, flags) };
            if rc > 0 {
                child.status.status_code.store(raw_status, Ordering::SeqCst);
                child.status.code_set.store(true, Ordering::SeqCst);
            }
        });
    }

    if let Some(prior) = PRIOR_HANDLER.get() {
        if let Some(handler) = prior.chainable_handler() {
            handler(sig);
        }
    }
}

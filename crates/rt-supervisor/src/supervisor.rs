//! Ties the live-child list, the installed `SIGCHLD` reaper, and the
//! public launch/query/cleanup operations into a single process-lifetime
//! context (spec §9 "one runtime context instead of scattered globals").

use crate::error::SupervisorError;
use crate::fatal::fatal;
use crate::launch::{self, LaunchRequest, Process};
use crate::live_list::LiveList;
use crate::query;
use crate::reaper;
use crate::types::ProcessState;
use nix::sys::signal::{sigprocmask, SigSet, SigmaskHow, Signal};
use once_cell::sync::OnceCell;
use std::fs::File;
use std::io::{BufReader, BufWriter};

static LIVE_LIST: OnceCell<LiveList> = OnceCell::new();

/// Process-wide child-process supervision context. Constructing it
/// installs the process-global `SIGCHLD` handler; that installation is
/// idempotent (see [`reaper::install`]), so building more than one
/// `Supervisor` is safe — they all share the same live-child list.
pub struct Supervisor {
    live_list: &'static LiveList,
}

impl Supervisor {
    /// Installs the `SIGCHLD` reaper and returns the supervisor handle.
    pub fn install() -> Supervisor {
        let live_list = LIVE_LIST.get_or_init(LiveList::new);
        // SAFETY: `live_list` is `'static` (owned by the `OnceCell`
        // above, which never drops it) and `reaper::install` is itself
        // idempotent.
        unsafe { reaper::install(live_list) };
        Supervisor { live_list }
    }

    /// Launches a child process per spec §4.3.2.
    pub fn launch(&self, request: LaunchRequest) -> Result<Process, SupervisorError> {
        launch::launch(self.live_list, request)
    }

    /// Queries a child's run state, blocking until termination if `wait`.
    pub fn retrieve_state(&self, process: &Process, wait: bool) -> ProcessState {
        query::retrieve_state(process.status(), wait)
    }

    /// Closes any non-null pipe streams, in order, stopping on the
    /// first failure (spec §9 Open Question (b)).
    pub fn delete_process_pipes(
        stdin: Option<BufWriter<File>>,
        stdout: Option<BufReader<File>>,
        stderr: Option<BufReader<File>>,
    ) -> Result<(), SupervisorError> {
        launch::delete_process_pipes(stdin, stdout, stderr)
    }

    /// Unlinks and frees every live-list record that has become
    /// free-eligible. The reaper itself never frees (spec §4.3.3); call
    /// this periodically, or before each new launch as the original does.
    ///
    /// Blocks `SIGCHLD` around the unlink/free, matching
    /// `live_list::reap_free_eligible`'s "caller must hold SIGCHLD
    /// blocked" contract (spec §5: topology mutations only happen under
    /// the SIGCHLD-blocked region) — otherwise the reaper could walk
    /// into a node this call is concurrently freeing.
    pub fn reap_terminal(&self) {
        let mut block = SigSet::empty();
        block.add(Signal::SIGCHLD);
        let mut prior = SigSet::empty();
        sigprocmask(SigmaskHow::SIG_BLOCK, Some(&block), Some(&mut prior))
            .unwrap_or_else(|e| fatal(format!("sigprocmask(SIG_BLOCK) failed: {e}")));

        self.live_list.reap_free_eligible();

        sigprocmask(SigmaskHow::SIG_SETMASK, Some(&prior), None)
            .unwrap_or_else(|e| fatal(format!("sigprocmask(SIG_SETMASK) failed: {e}")));
    }
}

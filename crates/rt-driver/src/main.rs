//! Managed-runtime driver: assembles the three cores at process start
//! and hands off to generated code.
//!
//! Startup order follows spec §2's dependency order leaves-first
//! (Process Supervisor → Safepoint Patcher → Heap Bootstrap → Driver):
//! install the `SIGCHLD` reaper, build the safepoint catalog and
//! optionally the `SIGINT` debug-interrupt handler, bootstrap the heap,
//! then invoke the generated-code entry point with the populated
//! `InitRecord`.

mod config;
mod generated_entry;

use anyhow::Result;
use config::Config;
use once_cell::sync::OnceCell;
use rt_heap::Heap;
use rt_safepoint::{Patcher, SafepointTable};
use rt_supervisor::Supervisor;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static PATCHER: OnceCell<Patcher> = OnceCell::new();

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("starting managed-runtime driver");
    info!(version = env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();

    // Process Supervisor first: installing the SIGCHLD reaper early
    // means any child a later step launches is already covered.
    let supervisor = Supervisor::install();
    info!("process supervisor installed (SIGCHLD reaper active)");

    // Safepoint Patcher: the real catalog is built by the out-of-scope
    // code generator at link time; this driver has none to load, so it
    // installs an empty one. The interrupt handler still works — it
    // just has nothing to enable.
    let patcher = PATCHER.get_or_init(|| Patcher::new(SafepointTable::new(Vec::new())));
    if config.enable_debug_interrupt {
        // SAFETY: `patcher` is `'static` (owned by the `OnceCell` above,
        // which never drops it for the life of the process).
        unsafe { rt_safepoint::interrupt::install(patcher) };
        info!("SIGINT debug-interrupt handler installed");
    }

    // Heap Bootstrap last: its failures are fatal, so everything that
    // can still fail gracefully (supervisor, patcher) is wired up first.
    let mut heap = Heap::bootstrap();
    info!(
        heap_start = ?heap.init_record().heap_start,
        heap_size = heap.init_record().heap_size,
        heap_max_size = heap.init_record().heap_max_size,
        "heap bootstrapped"
    );

    generated_entry::run(heap.init_record_mut(), patcher, &supervisor);

    info!("generated code returned; releasing heap, bitset, and marking-stack mappings");
    drop(heap);
    Ok(())
}

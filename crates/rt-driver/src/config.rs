//! Environment-variable configuration, read once at startup.
//!
//! No config file, no CLI flag parser — matching the `SISCTL_BIND`
//! style this corpus's daemon crate uses: a handful of env vars with
//! `unwrap_or_else`/`unwrap_or` fallback defaults.

#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Whether to install the optional `SIGINT` debug-interrupt handler.
    pub enable_debug_interrupt: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let enable_debug_interrupt = std::env::var("RT_ENABLE_DEBUG_INTERRUPT")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Self { enable_debug_interrupt }
    }
}

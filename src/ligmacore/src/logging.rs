// SPDX-License-Identifier: GPL-3.0-or-later

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives
pub const LOG_ENV: &str = "LIGMA_LOG";

/// Install a formatting subscriber for the `tracing` macros.
///
/// The filter is read from `LIGMA_LOG`, falling back to `info`.
/// Calling this more than once is harmless.
pub fn init_logging() {
    init_with_default("info");
}

/// Like `init_logging`, but debug messages are shown by default
pub fn init_verbose_logging() {
    init_with_default("debug");
}

fn init_with_default(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber. Unknown directives fall back to `info`.
///
/// Calling it twice is harmless; the first subscriber stays installed.
pub fn init_logging(directive: &str) {
    let (filter, rejected) = match EnvFilter::try_new(directive) {
        Ok(filter) => (filter, false),
        Err(_) => (EnvFilter::new("info"), true),
    };
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok();
    if installed && rejected {
        tracing::warn!("invalid log level '{}', using info", directive);
    }
}

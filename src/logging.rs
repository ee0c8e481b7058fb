//! Structured Logging — tracing initialization
//!
//! Level filtering comes from `RUST_LOG` when set, defaulting to `info`.
//! Initialization is idempotent so library consumers, examples and tests can
//! all call it without coordinating.

use bevy::prelude::*;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install the global tracing subscriber once.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}

pub struct LoggingPlugin;

impl Plugin for LoggingPlugin {
    fn build(&self, _app: &mut App) {
        init_tracing();
    }
}

//! Logging setup
//!
//! The host shell calls [`init`] once at startup; the library never
//! installs a global subscriber on its own.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// Respects `RUST_LOG` when set, otherwise defaults to debug output for
/// this crate and info for everything else.
pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "liftlink_core=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

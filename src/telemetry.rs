use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static INIT: Once = Once::new();

/// Installs the global tracing subscriber. Filter directives come from
/// `ALLOWANCE_LOG` (e.g. `ALLOWANCE_LOG=pension_allowance=debug`) and default
/// to `pension_allowance=info`. Safe to call more than once.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("ALLOWANCE_LOG")
            .unwrap_or_else(|_| EnvFilter::new("pension_allowance=info"));

        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    });
}

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Filter directives; falls back to `warn`.
pub(crate) const LOG_ENV: &str = "WODCLOCK_LOG";

/// Install the global subscriber. Logs go to stderr so stdout stays
/// machine-readable.
pub(crate) fn init_tracing(json: bool) {
    let _ = TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false);
        let _ = if json {
            tracing::subscriber::set_global_default(builder.json().finish())
        } else {
            tracing::subscriber::set_global_default(builder.finish())
        };
    });
}

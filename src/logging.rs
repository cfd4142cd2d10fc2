use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes the logging system with JSON output on stdout.
///
/// The Lambda platform captures stdout into CloudWatch, so there is no file
/// appender here. `RUST_LOG` controls the filter, defaulting to `info`.
pub fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .init();
}

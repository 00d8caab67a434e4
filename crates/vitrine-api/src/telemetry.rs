//! Tracing initialization.

use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Install the global tracing subscriber. Compact console format; the
/// filter honors `RUST_LOG` and defaults to debug for our crates.
pub fn init_telemetry() {
    let console_fmt = tracing_subscriber::fmt::layer().event_format(
        Format::default()
            .compact()
            .with_target(false)
            .without_time(),
    );
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "vitrine_api=debug,vitrine_core=debug,vitrine_processing=debug,\
                     vitrine_storage=debug,tower_http=debug"
                        .into()
                }),
        )
        .with(console_fmt)
        .init();
}

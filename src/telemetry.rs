use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::configuration::LogFormat;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `default_level` when set. Call once per process.
pub fn init_telemetry(default_level: &str, format: &LogFormat) {
    let env_filter = build_filter(default_level);
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().with_writer(std::io::stdout).json())
            .init(),
        LogFormat::Compact => registry
            .with(fmt::layer().with_writer(std::io::stdout).compact())
            .init(),
    }
}

fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

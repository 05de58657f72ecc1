use color_eyre::Result;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer,
};

pub fn init_errors() -> Result<()> {
    color_eyre::install()
}

/// `RUST_LOG` wins when set. Otherwise `info`, or `debug` in debug mode.
///
/// Debug mode logs human readable lines, everything else logs JSON.
pub fn init_logging(debug: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));

    let registry = tracing_subscriber::registry().with(tracing_error::ErrorLayer::default());
    if debug {
        registry.with(fmt::layer().with_filter(filter)).try_init()?;
    } else {
        registry
            .with(fmt::layer().json().with_current_span(false).with_filter(filter))
            .try_init()?;
    }

    Ok(())
}

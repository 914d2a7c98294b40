//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use crate::config::LoggingSection;
use crate::error::FaultlineResult;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over the configured level. Calling this twice is harmless;
/// the second installation is ignored.
pub fn init(logging: &LoggingSection) -> FaultlineResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)?,
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();

    Ok(())
}

//! Tracing subscriber setup for embedding applications.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a global subscriber with an `EnvFilter` and a `fmt` layer.
///
/// `RUST_LOG` takes precedence; `default_directive` (e.g. `"tasklane=debug"`)
/// applies when it is unset or unparsable.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(default_directive: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}

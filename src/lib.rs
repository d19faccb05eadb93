pub mod cache;
pub mod clock;
pub mod config;
pub mod duration;
pub mod error;
pub mod live;
pub mod planner;
pub mod player;
pub mod present;
pub mod schedule;
pub mod sim;
pub mod source;
pub mod sync;

pub use error::{Error, Result};

/// Installs the `RUST_LOG`-driven fmt subscriber used by the binaries.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "airtime=info,cli=info,server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

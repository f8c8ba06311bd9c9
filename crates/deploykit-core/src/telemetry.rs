//! Log output for the `deploykit` binary.
//!
//! Every line carries the `[INFO]`/`[OK]`/`[WARN]`/`[ERROR]` marker written by
//! [`crate::obs`] and the `deploykit.run` span with its `run_id`, so the steps of one
//! deploy or destroy can be picked out of a shared log.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Map the CLI verbosity switch onto a default level.
pub fn level_for(verbose: bool) -> Level {
    if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

/// Install the subscriber behind `obs` and the run span.
///
/// Plain mode prints one timeless line per event for a terminal. JSON mode
/// prints one object per event with the `event` and `run_id` fields as
/// keys, for log shipping. `RUST_LOG` overrides `level`. A second
/// call leaves the first subscriber in place.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).without_time())
            .try_init()
            .ok();
    }
}

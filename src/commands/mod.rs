//! CLI command implementations.

pub mod details;
pub mod images;
pub mod input;
pub mod resolve;

pub use details::DetailsCommand;
pub use images::ImagesCommand;
pub use input::{read_pages, read_pairs, ProductPage, ProductPair};
pub use resolve::ResolveCommand;

use crate::config::Config;
use rand::Rng;
use std::time::Duration;
use tracing::debug;

/// Pause between products with human-like jitter.
pub(crate) async fn pause(config: &Config) {
    let delay = delay_duration(config);
    if delay.is_zero() {
        return;
    }
    debug!("Delaying {}ms", delay.as_millis());
    tokio::time::sleep(delay).await;
}

fn delay_duration(config: &Config) -> Duration {
    if config.delay_ms == 0 {
        return Duration::ZERO;
    }

    let jitter = if config.delay_jitter_ms > 0 {
        rand::rng().random_range(0..=config.delay_jitter_ms)
    } else {
        0
    };

    Duration::from_millis(config.delay_ms + jitter)
}

use anyhow::Result;
use dynconf_reader::ConfigurationReader;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::cli::OutputFormat;
use crate::output::render_tick;

/// Prints the reader's status and entries once per refresh interval until
/// `ticks` samples were printed or Ctrl-C is pressed, then stops the refresh.
pub async fn watch(
    reader: &ConfigurationReader,
    ticks: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    let period = reader.refresh_interval();
    // Sample halfway between two refreshes.
    let mut ticker = interval_at(Instant::now() + period + period / 2, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    println!("{}", render_tick(&reader.status(), &reader.get_all(), format));

    let mut printed = 0u64;
    loop {
        if ticks.is_some_and(|limit| printed >= limit) {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
        println!("{}", render_tick(&reader.status(), &reader.get_all(), format));
        printed += 1;
    }

    reader.shutdown().await;
    Ok(())
}

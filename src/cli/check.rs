//! Handler for the `check` command.

use std::path::Path;

use crate::error::Result;
use crate::infrastructure::config::Config;

/// Validate a configuration file without starting the engine.
pub fn execute<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    println!("Checking configuration: {}", path.display());
    println!();

    let config = Config::load(path)?;
    println!("✓ Configuration file is valid");
    println!();
    println!(
        "  Maker: {} ({}, poll {}ms)",
        config.venues.maker.name,
        config.venues.maker.delivery.as_str(),
        config.venues.maker.poll_interval_ms
    );
    println!(
        "  Taker: {} ({}, poll {}ms)",
        config.venues.taker.name,
        config.venues.taker.delivery.as_str(),
        config.venues.taker.poll_interval_ms
    );
    println!();
    println!(
        "  {:<10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "symbol", "long", "short", "qty", "max", "venue_max", "imbalance"
    );
    for entry in &config.symbols {
        println!(
            "  {:<10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
            entry.symbol().as_str(),
            entry.long_threshold,
            entry.short_threshold,
            entry.order_quantity,
            entry.max_position,
            entry.max_venue_position(),
            entry.imbalance_limit()
        );
    }
    Ok(())
}

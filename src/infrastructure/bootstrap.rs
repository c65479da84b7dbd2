//! Composition root: builds the engine and its venues from configuration.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::adapter::{LogEventSink, PaperConfig, PaperVenue};
use crate::application::Engine;
use crate::domain::Symbol;
use crate::error::Result;
use crate::infrastructure::config::venue::VenueConfig;
use crate::infrastructure::config::Config;
use crate::port::{EventSink, EventSinkRegistry, VenueGateway};

/// A built engine plus the paper venues that drive it.
pub struct PaperRuntime {
    pub engine: Engine,
    venues: Vec<Arc<PaperVenue>>,
}

impl PaperRuntime {
    /// Start the venue simulators; they stop when `shutdown` flips.
    pub fn spawn_venues(&self, shutdown: &watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        self.venues
            .iter()
            .map(|venue| tokio::spawn(Arc::clone(venue).run(shutdown.clone())))
            .collect()
    }
}

/// Build the event sink registry.
pub fn build_sink() -> Arc<dyn EventSink> {
    let mut registry = EventSinkRegistry::new();
    registry.register(Arc::new(LogEventSink));
    Arc::new(registry)
}

fn build_paper_venue(config: &VenueConfig, symbols: &[Symbol]) -> Arc<PaperVenue> {
    Arc::new(PaperVenue::new(
        config.name.as_str(),
        config.delivery,
        config.poll_interval(),
        symbols.iter().cloned(),
        PaperConfig::from(&config.paper),
    ))
}

/// Wire an engine over two paper venues.
pub fn build_paper_runtime(config: &Config, only: &[Symbol]) -> Result<PaperRuntime> {
    let engine_config = config.engine_config(only)?;
    let symbols: Vec<Symbol> = engine_config
        .symbols
        .iter()
        .map(|s| s.params.symbol.clone())
        .collect();

    let maker = build_paper_venue(&config.venues.maker, &symbols);
    let taker = build_paper_venue(&config.venues.taker, &symbols);
    info!(
        maker = %config.venues.maker.name,
        maker_delivery = config.venues.maker.delivery.as_str(),
        taker = %config.venues.taker.name,
        taker_delivery = config.venues.taker.delivery.as_str(),
        "Paper venues built"
    );

    let engine = Engine::new(
        Arc::clone(&maker) as Arc<dyn VenueGateway>,
        Arc::clone(&taker) as Arc<dyn VenueGateway>,
        build_sink(),
        engine_config,
    )?;
    Ok(PaperRuntime {
        engine,
        venues: vec![maker, taker],
    })
}

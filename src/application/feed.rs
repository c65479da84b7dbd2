//! Quote ingestion.
//!
//! One feed per venue. Push venues are read from their broadcast stream;
//! poll venues are queried once per poll interval. Both paths end in
//! [`QuoteSynchronizer::observe`].

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use super::quote_sync::{Observation, QuoteSynchronizer};
use crate::domain::{Quote, Symbol};
use crate::port::{Delivery, Event, EventSink, VenueGateway};

/// Feeds one venue's quotes into the synchronizer.
pub struct QuoteFeed {
    gateway: Arc<dyn VenueGateway>,
    quotes: Arc<QuoteSynchronizer>,
    sink: Arc<dyn EventSink>,
    symbols: HashSet<Symbol>,
}

impl QuoteFeed {
    pub fn new(
        gateway: Arc<dyn VenueGateway>,
        quotes: Arc<QuoteSynchronizer>,
        sink: Arc<dyn EventSink>,
        symbols: impl IntoIterator<Item = Symbol>,
    ) -> Self {
        Self {
            gateway,
            quotes,
            sink,
            symbols: symbols.into_iter().collect(),
        }
    }

    /// Run until `shutdown` flips to true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let venue = self.gateway.venue().clone();
        info!(venue = %venue, delivery = self.gateway.delivery().as_str(), "Quote feed started");

        // seed the book so evaluation can start before the first push
        self.poll_once().await;

        let stream = match self.gateway.delivery() {
            Delivery::Push => self.gateway.subscribe_quotes(),
            Delivery::Poll => None,
        };
        match stream {
            Some(rx) => self.run_push(rx, &mut shutdown).await,
            None => self.run_poll(&mut shutdown).await,
        }
        info!(venue = %venue, "Quote feed stopped");
    }

    async fn run_push(&self, mut rx: broadcast::Receiver<Quote>, shutdown: &mut watch::Receiver<bool>) {
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return;
                    }
                }
                received = rx.recv() => match received {
                    Ok(quote) => self.ingest(quote),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(venue = %self.gateway.venue(), skipped, "Quote stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!(venue = %self.gateway.venue(), "Quote stream closed, falling back to polling");
                        break;
                    }
                },
            }
        }
        self.run_poll(shutdown).await;
    }

    async fn run_poll(&self, shutdown: &mut watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.gateway.poll_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return;
                    }
                }
                _ = interval.tick() => self.poll_once().await,
            }
        }
    }

    async fn poll_once(&self) {
        for symbol in &self.symbols {
            match self.gateway.quote(symbol).await {
                Ok(quote) => self.ingest(quote),
                Err(e) => debug!(venue = %self.gateway.venue(), symbol = %symbol, error = %e, "Quote poll failed"),
            }
        }
    }

    /// Hand one quote to the synchronizer and report what happened.
    pub fn ingest(&self, quote: Quote) {
        if !self.symbols.contains(&quote.symbol) {
            return;
        }
        let venue = quote.venue.clone();
        let symbol = quote.symbol.clone();
        let (bid, ask, source) = (quote.bid.price, quote.ask.price, quote.source);

        let reason = match self.quotes.observe(quote) {
            Observation::Accepted => {
                self.sink.emit(Event::QuoteUpdated {
                    venue,
                    symbol,
                    bid,
                    ask,
                    source,
                });
                return;
            }
            Observation::Superseded => "out of order".to_string(),
            Observation::Invalid(defect) => format!("invalid: {defect:?}"),
            Observation::UnknownVenue => "unknown venue".to_string(),
        };
        debug!(venue = %venue, symbol = %symbol, reason = %reason, "Quote discarded");
        self.sink.emit(Event::QuoteDiscarded { venue, symbol, reason });
    }
}

//! Tracing-backed event sink.

use tracing::{info, trace, warn};

use crate::port::{Event, EventSink};

/// Writes every event as one structured log line.
///
/// Quote traffic is logged at `trace`; drift and imbalance at `warn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&self, event: Event) {
        let kind = event.kind();
        let payload = serde_json::to_string(&event).unwrap_or_default();
        match event {
            Event::QuoteUpdated { .. } | Event::QuoteDiscarded { .. } => {
                trace!(event = kind, payload = %payload, "Event");
            }
            Event::PositionDrift { .. } | Event::ImbalanceDetected { .. } => {
                warn!(event = kind, payload = %payload, "Event");
            }
            _ => info!(event = kind, payload = %payload, "Event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Symbol;

    #[test]
    fn emit_does_not_panic_without_subscriber() {
        LogEventSink.emit(Event::SignalIgnored {
            symbol: Symbol::from("BTC"),
        });
    }
}

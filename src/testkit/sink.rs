//! Event sink that keeps everything it receives.

use parking_lot::Mutex;

use crate::port::{CycleSummary, Event, EventSink};

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(Event::kind).collect()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.events.lock().iter().filter(|e| e.kind() == kind).count()
    }

    pub fn cycles(&self) -> Vec<CycleSummary> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::CycleClosed(summary) => Some(summary.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: Event) {
        self.events.lock().push(event);
    }
}

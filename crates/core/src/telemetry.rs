//! Records sync events so fetch and mutation behavior can be inspected while
//! debugging a session.

use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    FetchRequested { key: String, cursor: String },
    FetchCompleted { key: String, count: usize },
    FetchDiscarded(String),
    FetchFailed { key: String, error: String },
    MutationApplied(String),
    MutationFailed { action: String, error: String },
    FallbackEngaged,
}

#[derive(Debug, Default)]
pub struct Handle {
    #[cfg(feature = "telemetry")]
    events: Mutex<Vec<Event>>,
}

impl Handle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: Event) {
        #[cfg(feature = "telemetry")]
        {
            match &event {
                Event::FetchRequested { key, cursor } => tracing::debug!(
                    key = key.as_str(),
                    cursor = cursor.as_str(),
                    "sync telemetry fetch requested"
                ),
                Event::FetchCompleted { key, count } => {
                    tracing::debug!(key = key.as_str(), count, "sync telemetry fetch completed")
                }
                Event::FetchDiscarded(key) => {
                    tracing::debug!(key = key.as_str(), "sync telemetry fetch discarded")
                }
                Event::FetchFailed { key, error } => tracing::debug!(
                    key = key.as_str(),
                    error = %error,
                    "sync telemetry fetch failed"
                ),
                Event::MutationApplied(action) => tracing::debug!(
                    action = action.as_str(),
                    "sync telemetry mutation applied"
                ),
                Event::MutationFailed { action, error } => tracing::debug!(
                    action = action.as_str(),
                    error = %error,
                    "sync telemetry mutation failed"
                ),
                Event::FallbackEngaged => tracing::debug!("sync telemetry fallback engaged"),
            }
            self.events.lock().push(event);
        }
        #[cfg(not(feature = "telemetry"))]
        {
            let _ = event;
        }
    }

    pub fn is_enabled(&self) -> bool {
        cfg!(feature = "telemetry")
    }

    /// Recorded events, oldest first. Always empty without the feature.
    pub fn events(&self) -> Vec<Event> {
        #[cfg(feature = "telemetry")]
        {
            self.events.lock().clone()
        }
        #[cfg(not(feature = "telemetry"))]
        {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_events_when_enabled() {
        let handle = Handle::new();
        handle.record(Event::FetchCompleted {
            key: "completed=all".into(),
            count: 4,
        });
        if handle.is_enabled() {
            assert_eq!(handle.events().len(), 1);
        } else {
            assert!(handle.events().is_empty());
        }
    }
}

use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

/// Recorded store callbacks, keyed by endpoint name in arrival order.
///
/// Cloning shares the underlying map, so the harness and the receiver handler observe
/// the same calls. Each harness owns its own registry.
#[derive(Clone, Debug, Default)]
pub struct CallRegistry {
    calls: Arc<DashMap<String, Vec<Value>>>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a body under `name`; earlier calls are never overwritten.
    pub fn record(&self, name: &str, body: Value) {
        self.calls.entry(name.to_string()).or_default().push(body);
    }

    /// Snapshot of the calls recorded under `name`.
    pub fn calls(&self, name: &str) -> Vec<Value> {
        self.calls
            .get(name)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.get(name).map(|entry| entry.len()).unwrap_or(0)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.calls.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn clear(&self, name: &str) {
        self.calls.remove(name);
    }
}

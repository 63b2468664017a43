use crate::result::ProvisioningResult;
use ahash::AHashMap;
use parking_lot::RwLock;
use std::time::{Duration, Instant};

/// Keyed storage for provisioning results, queried by request id.
pub trait RequestStore: Send + Sync {
    /// Records a result, replacing any previous state for the request.
    fn put(&self, result: ProvisioningResult);

    /// Looks up a result. Expired and unknown ids both return `None`.
    fn get(&self, request_id: &str) -> Option<ProvisioningResult>;
}

/// In-process store with a fixed time-to-live per entry.
///
/// The TTL clock restarts on every `put`, so an in-flight workflow
/// request stays queryable as long as its status keeps moving. Expired
/// entries are swept opportunistically on writes.
pub struct InMemoryStore {
    ttl: Duration,
    entries: RwLock<AHashMap<String, Entry>>,
}

struct Entry {
    result: ProvisioningResult,
    written_at: Instant,
}

// === impl InMemoryStore ===

impl InMemoryStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(AHashMap::new()),
        }
    }

    fn fresh(&self, entry: &Entry) -> bool {
        entry.written_at.elapsed() < self.ttl
    }
}

impl RequestStore for InMemoryStore {
    fn put(&self, result: ProvisioningResult) {
        let mut entries = self.entries.write();
        entries.retain(|_, entry| entry.written_at.elapsed() < self.ttl);
        entries.insert(
            result.request_id.clone(),
            Entry {
                result,
                written_at: Instant::now(),
            },
        );
    }

    fn get(&self, request_id: &str) -> Option<ProvisioningResult> {
        let entries = self.entries.read();
        entries
            .get(request_id)
            .filter(|entry| self.fresh(entry))
            .map(|entry| entry.result.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_replaces_by_request_id() {
        let store = InMemoryStore::new(Duration::from_secs(60));
        store.put(ProvisioningResult::pending("req-1", "ns-a"));
        store.put(ProvisioningResult::pending("req-2", "ns-b"));

        let mut updated = ProvisioningResult::pending("req-1", "ns-a");
        updated.message = "second write".to_string();
        store.put(updated);

        assert_eq!(
            store.get("req-1").map(|r| r.message),
            Some("second write".to_string()),
        );
        assert_eq!(store.get("req-2").map(|r| r.namespace_name), Some("ns-b".to_string()));
        assert!(store.get("req-3").is_none());
    }

    #[test]
    fn expired_entries_are_invisible() {
        let store = InMemoryStore::new(Duration::ZERO);
        store.put(ProvisioningResult::pending("req-1", "ns-a"));
        assert!(store.get("req-1").is_none());
    }

    #[test]
    fn writes_sweep_expired_entries() {
        let store = InMemoryStore::new(Duration::ZERO);
        store.put(ProvisioningResult::pending("req-1", "ns-a"));
        store.put(ProvisioningResult::pending("req-2", "ns-b"));
        assert_eq!(store.entries.read().len(), 1);
    }
}

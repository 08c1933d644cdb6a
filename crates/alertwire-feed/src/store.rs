//! In-memory alert store.
//!
//! Alerts are kept most-recent-first by arrival (not by `timestamp`), ids
//! are unique, and the list never grows past the retention cap. Every
//! mutation completes under one write guard and publishes its
//! `StoreEvent` before the guard is released, so subscribers observe
//! events in mutation order.

use alertwire_core::Alert;
use parking_lot::RwLock;
use std::collections::VecDeque;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Default retention cap.
pub const DEFAULT_MAX_ALERTS: usize = 50;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Change notification published for every store mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// New alert at the front.
    Inserted { id: String },
    /// Existing alert with the same id was replaced in place.
    Replaced { id: String },
    /// Oldest alert dropped by the retention cap.
    Evicted { id: String },
    /// Alert flipped to read.
    Read { id: String },
    /// Every retained alert flipped to read.
    AllRead { count: usize },
    /// Store emptied.
    Cleared { count: usize },
}

/// Result of `AlertStore::insert`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Added at the front; `evicted` is the id dropped from the tail, if any.
    Inserted { evicted: Option<String> },
    /// Replaced an existing alert with the same id.
    Replaced,
}

/// Ordered, deduplicated, capped alert collection.
pub struct AlertStore {
    alerts: RwLock<VecDeque<Alert>>,
    capacity: usize,
    events: broadcast::Sender<StoreEvent>,
}

impl AlertStore {
    /// Create a store retaining at most `capacity` alerts (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (events, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            alerts: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            events,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.alerts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.read().is_empty()
    }

    /// Subscribe to change notifications.
    ///
    /// A receiver that falls more than the channel capacity behind gets
    /// `RecvError::Lagged` and should re-read a snapshot.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Insert at the front, or replace in place on id collision.
    ///
    /// A replacement keeps the read flag of the alert it replaces.
    pub fn insert(&self, mut alert: Alert) -> InsertOutcome {
        let mut alerts = self.alerts.write();

        if let Some(existing) = alerts.iter_mut().find(|a| a.id == alert.id) {
            alert.read |= existing.read;
            let id = alert.id.clone();
            *existing = alert;
            debug!(%id, "Replaced alert in place");
            self.publish(StoreEvent::Replaced { id });
            return InsertOutcome::Replaced;
        }

        let id = alert.id.clone();
        alerts.push_front(alert);
        self.publish(StoreEvent::Inserted { id });

        let mut evicted = None;
        while alerts.len() > self.capacity {
            if let Some(old) = alerts.pop_back() {
                debug!(id = %old.id, "Evicted oldest alert");
                self.publish(StoreEvent::Evicted { id: old.id.clone() });
                evicted = Some(old.id);
            }
        }

        InsertOutcome::Inserted { evicted }
    }

    /// Mark one alert read.
    ///
    /// Returns `true` if an unread alert changed. Unknown ids are ignored;
    /// the alert may already have been evicted.
    pub fn mark_read(&self, id: &str) -> bool {
        let mut alerts = self.alerts.write();
        match alerts.iter_mut().find(|a| a.id == id) {
            Some(alert) if !alert.read => {
                alert.read = true;
                self.publish(StoreEvent::Read { id: id.to_string() });
                true
            }
            Some(_) => false,
            None => {
                trace!(%id, "mark_read on unknown id ignored");
                false
            }
        }
    }

    /// Mark every retained alert read. Returns how many changed.
    pub fn mark_all_read(&self) -> usize {
        let mut alerts = self.alerts.write();
        let mut count = 0;
        for alert in alerts.iter_mut().filter(|a| !a.read) {
            alert.read = true;
            count += 1;
        }
        if count > 0 {
            self.publish(StoreEvent::AllRead { count });
        }
        count
    }

    /// Remove every alert. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut alerts = self.alerts.write();
        let count = alerts.len();
        alerts.clear();
        self.publish(StoreEvent::Cleared { count });
        count
    }

    /// Number of unread alerts, derived from the current entries.
    pub fn unread_count(&self) -> usize {
        self.alerts.read().iter().filter(|a| !a.read).count()
    }

    /// Copy of the alerts, most recent first.
    pub fn snapshot(&self) -> Vec<Alert> {
        self.alerts.read().iter().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<Alert> {
        self.alerts.read().iter().find(|a| a.id == id).cloned()
    }

    fn publish(&self, event: StoreEvent) {
        // No receivers is normal.
        let _ = self.events.send(event);
    }
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ALERTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alertwire_core::{AlertKind, AlertPriority};
    use chrono::{Duration, Utc};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn alert(id: &str) -> Alert {
        Alert::new(id, AlertKind::Generic, format!("message {id}"), Utc::now())
    }

    fn ids(store: &AlertStore) -> Vec<String> {
        store.snapshot().into_iter().map(|a| a.id).collect()
    }

    #[test]
    fn test_insert_is_most_recent_first_by_arrival() {
        let store = AlertStore::new(10);
        let now = Utc::now();
        store.insert(Alert::new("new", AlertKind::Generic, "m", now));
        // Older timestamp, later arrival: still surfaces first.
        store.insert(Alert::new("late", AlertKind::Generic, "m", now - Duration::hours(1)));

        assert_eq!(ids(&store), vec!["late", "new"]);
    }

    #[test]
    fn test_duplicate_id_replaces_in_place() {
        let store = AlertStore::new(10);
        store.insert(alert("a"));
        store.insert(alert("b"));
        store.insert(alert("c"));

        let updated = alert("b").with_priority(AlertPriority::High);
        assert_eq!(store.insert(updated), InsertOutcome::Replaced);

        assert_eq!(ids(&store), vec!["c", "b", "a"]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.get("b").unwrap().priority, Some(AlertPriority::High));
    }

    #[test]
    fn test_replace_keeps_read_flag() {
        let store = AlertStore::new(10);
        store.insert(alert("a"));
        assert!(store.mark_read("a"));

        store.insert(alert("a"));
        assert!(store.get("a").unwrap().read);
        assert_eq!(store.unread_count(), 0);
    }

    #[test]
    fn test_retention_cap_evicts_oldest() {
        let store = AlertStore::new(3);
        for id in ["a", "b", "c"] {
            assert_eq!(
                store.insert(alert(id)),
                InsertOutcome::Inserted { evicted: None }
            );
        }

        assert_eq!(
            store.insert(alert("d")),
            InsertOutcome::Inserted {
                evicted: Some("a".to_string())
            }
        );
        assert_eq!(ids(&store), vec!["d", "c", "b"]);
        assert!(store.get("a").is_none());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let store = AlertStore::new(0);
        assert_eq!(store.capacity(), 1);
        store.insert(alert("a"));
        store.insert(alert("b"));
        assert_eq!(ids(&store), vec!["b"]);
    }

    #[test]
    fn test_mark_read_unknown_id_is_noop() {
        let store = AlertStore::new(3);
        store.insert(alert("a"));
        assert!(!store.mark_read("missing"));
        assert_eq!(store.unread_count(), 1);
    }

    #[test]
    fn test_mark_read_twice() {
        let store = AlertStore::new(3);
        store.insert(alert("a"));
        assert!(store.mark_read("a"));
        assert!(!store.mark_read("a"));
        assert_eq!(store.unread_count(), 0);
    }

    #[test]
    fn test_mark_all_read_and_clear() {
        let store = AlertStore::new(5);
        for id in ["a", "b", "c"] {
            store.insert(alert(id));
        }
        store.mark_read("b");
        assert_eq!(store.mark_all_read(), 2);
        assert_eq!(store.unread_count(), 0);

        store.insert(alert("d"));
        assert_eq!(store.unread_count(), 1);

        assert_eq!(store.clear(), 4);
        assert!(store.is_empty());
        assert_eq!(store.unread_count(), 0);
    }

    #[test]
    fn test_random_operations_keep_invariants() {
        let mut rng = StdRng::seed_from_u64(7);
        let store = AlertStore::new(8);
        let mut inserted = 0usize;

        for _ in 0..2000 {
            match rng.gen_range(0..10) {
                0..=5 => {
                    // Small id space so collisions happen.
                    let id = format!("id-{}", rng.gen_range(0..20));
                    store.insert(alert(&id));
                    inserted += 1;
                }
                6..=8 => {
                    let id = format!("id-{}", rng.gen_range(0..25));
                    store.mark_read(&id);
                }
                _ => {
                    store.clear();
                }
            }

            let snapshot = store.snapshot();
            assert!(snapshot.len() <= store.capacity());
            assert_eq!(
                store.unread_count(),
                snapshot.iter().filter(|a| !a.read).count()
            );

            let mut unique: Vec<&str> = snapshot.iter().map(|a| a.id.as_str()).collect();
            unique.sort_unstable();
            unique.dedup();
            assert_eq!(unique.len(), snapshot.len());
        }

        assert!(inserted > 0);
    }

    #[test]
    fn test_eviction_order_matches_insertion_order() {
        let store = AlertStore::new(4);
        let total = 20;
        for i in 0..total {
            store.insert(alert(&format!("a{i}")));
        }
        let expected: Vec<String> = (total - 4..total).rev().map(|i| format!("a{i}")).collect();
        assert_eq!(ids(&store), expected);
    }

    #[tokio::test]
    async fn test_events_follow_mutation_order() {
        let store = AlertStore::new(1);
        let mut rx = store.subscribe();

        store.insert(alert("a"));
        store.insert(alert("b"));
        store.mark_read("b");
        store.mark_read("missing");
        store.clear();

        assert_eq!(rx.recv().await.unwrap(), StoreEvent::Inserted { id: "a".into() });
        assert_eq!(rx.recv().await.unwrap(), StoreEvent::Inserted { id: "b".into() });
        assert_eq!(rx.recv().await.unwrap(), StoreEvent::Evicted { id: "a".into() });
        assert_eq!(rx.recv().await.unwrap(), StoreEvent::Read { id: "b".into() });
        assert_eq!(rx.recv().await.unwrap(), StoreEvent::Cleared { count: 1 });
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_concurrent_inserts_respect_cap() {
        use std::sync::Arc;

        let store = Arc::new(AlertStore::new(16));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        store.insert(alert(&format!("t{t}-{i}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 16);
        assert_eq!(store.unread_count(), 16);
    }
}

//! Arrival point for runtime filters built at execution time.
//!
//! Build sides publish (or abandon) filters by wire id; scans subscribe and
//! observe the state change through a `watch` channel per filter.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

/// Filter contents as produced by the build side. The encoding of `payload`
/// is owned by the filter kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedFilter {
    pub id: i32,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterState {
    Pending,
    Ready(Arc<PublishedFilter>),
    /// The build side gave up (e.g. too many distinct keys).
    Abandoned,
}

impl FilterState {
    pub fn is_pending(&self) -> bool {
        matches!(self, FilterState::Pending)
    }
}

/// One hub per query. Slots are created on first publish or subscribe and
/// live until released, cleared, or the hub is dropped with the query.
#[derive(Debug, Default)]
pub struct RuntimeFilterHub {
    slots: Mutex<HashMap<i32, watch::Sender<FilterState>>>,
}

impl RuntimeFilterHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a filter. Returns false if it was already published or
    /// abandoned; the first outcome wins.
    pub fn publish(&self, id: i32, payload: Vec<u8>) -> bool {
        let filter = Arc::new(PublishedFilter { id, payload });
        self.settle(id, FilterState::Ready(filter))
    }

    /// Mark a filter as never coming. Waiting scans are released at once.
    pub fn abandon(&self, id: i32) -> bool {
        self.settle(id, FilterState::Abandoned)
    }

    pub fn subscribe(&self, id: i32) -> watch::Receiver<FilterState> {
        self.lock()
            .entry(id)
            .or_insert_with(|| watch::channel(FilterState::Pending).0)
            .subscribe()
    }

    pub fn state(&self, id: i32) -> FilterState {
        self.lock()
            .get(&id)
            .map(|tx| tx.borrow().clone())
            .unwrap_or(FilterState::Pending)
    }

    /// Drop the slot for `id`. Existing subscribers observe a closed channel
    /// and treat the filter as abandoned. Returns false if there was no slot.
    pub fn release(&self, id: i32) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Drop every slot, e.g. when the query finishes but the hub is reused.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn settle(&self, id: i32, next: FilterState) -> bool {
        let mut slots = self.lock();
        let tx = slots
            .entry(id)
            .or_insert_with(|| watch::channel(FilterState::Pending).0);
        tx.send_if_modified(|state| {
            if state.is_pending() {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    // A panic while holding the lock cannot leave a slot half-written.
    fn lock(&self) -> MutexGuard<'_, HashMap<i32, watch::Sender<FilterState>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_outcome_wins() {
        let hub = RuntimeFilterHub::new();
        assert_eq!(hub.state(1), FilterState::Pending);
        assert!(hub.publish(1, vec![1, 2, 3]));
        assert!(!hub.abandon(1));
        assert!(!hub.publish(1, vec![9]));
        match hub.state(1) {
            FilterState::Ready(f) => assert_eq!(f.payload, vec![1, 2, 3]),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn subscribers_see_settled_state() {
        let hub = RuntimeFilterHub::new();
        let rx = hub.subscribe(4);
        assert!(rx.borrow().is_pending());
        hub.abandon(4);
        assert_eq!(*rx.borrow(), FilterState::Abandoned);

        let late = hub.subscribe(4);
        assert_eq!(*late.borrow(), FilterState::Abandoned);
    }

    #[test]
    fn released_slots_are_dropped() {
        let hub = RuntimeFilterHub::new();
        hub.publish(1, vec![]);
        let rx = hub.subscribe(2);
        assert_eq!(hub.len(), 2);

        assert!(hub.release(2));
        assert!(!hub.release(2));
        assert!(rx.has_changed().is_err());
        assert_eq!(hub.len(), 1);

        hub.clear();
        assert!(hub.is_empty());
        assert_eq!(hub.state(1), FilterState::Pending);
    }
}

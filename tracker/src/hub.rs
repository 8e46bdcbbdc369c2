use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use harbor_core::{ChangeEvent, CycleChange, MembershipSet, VesselId, ViewportFilter};
use tokio::sync::Notify;
use tracing::debug;

use crate::{projector, store::PositionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Fans change events out to subscribers, each scoped to its own viewport
/// filter. Delivery is per-subscriber buffered so one slow consumer never
/// blocks ingestion or its peers.
pub struct SubscriptionHub {
    store: Arc<PositionStore>,
    subscribers: Mutex<HashMap<SubscriptionId, SubscriberEntry>>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

struct SubscriberEntry {
    filter: ViewportFilter,
    membership: MembershipSet,
    shared: Arc<SubscriberShared>,
}

#[derive(Default)]
struct SubscriberShared {
    queue: Mutex<VecDeque<ChangeEvent>>,
    notify: Notify,
    closed: AtomicBool,
    shed_updates: AtomicU64,
}

impl SubscriberShared {
    /// Enqueues an event under the overflow policy: `Added`/`Removed` always
    /// enqueue (membership correctness over strict bounding), while an
    /// `Updated` that does not fit first coalesces into a queued update for
    /// the same vessel, then evicts the oldest queued update, and is shed
    /// only when the queue holds nothing but membership events.
    fn enqueue(&self, event: ChangeEvent, capacity: usize) {
        {
            let mut queue = self.queue.lock().unwrap();
            if event.is_updated() && queue.len() >= capacity {
                let vessel_id = event.vessel_id().clone();
                if let Some(queued) = queue
                    .iter_mut()
                    .find(|queued| queued.is_updated() && *queued.vessel_id() == vessel_id)
                {
                    // Coalesce to the latest state, keeping the queued
                    // transition origin the subscriber has not seen yet.
                    if let (
                        ChangeEvent::Updated { current, .. },
                        ChangeEvent::Updated {
                            current: new_current,
                            ..
                        },
                    ) = (queued, &event)
                    {
                        *current = Arc::clone(new_current);
                    }
                    self.shed_updates.fetch_add(1, Ordering::Relaxed);
                    debug!(vessel_id = %vessel_id, "subscriber overloaded, coalescing update");
                } else if let Some(oldest) = queue.iter().position(|queued| queued.is_updated()) {
                    let _ = queue.remove(oldest);
                    queue.push_back(event);
                    self.shed_updates.fetch_add(1, Ordering::Relaxed);
                    debug!(vessel_id = %vessel_id, "subscriber overloaded, evicting oldest update");
                } else {
                    // Only membership events are queued; the update still has
                    // to land or the subscriber would never converge to the
                    // latest state.
                    queue.push_back(event);
                }
            } else {
                queue.push_back(event);
            }
        }
        self.notify.notify_one();
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Handle owned by a subscriber. Dropping it unsubscribes.
pub struct Subscription {
    id: SubscriptionId,
    shared: Arc<SubscriberShared>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next change event, in publish order. Remaining events are still
    /// drained after an unsubscribe; `None` once the queue is exhausted and
    /// the subscription is closed.
    pub async fn recv(&self) -> Option<ChangeEvent> {
        loop {
            let notified = self.shared.notify.notified();
            {
                let mut queue = self.shared.queue.lock().unwrap();
                if let Some(event) = queue.pop_front() {
                    return Some(event);
                }
                if self.shared.is_closed() {
                    return None;
                }
            }
            notified.await;
        }
    }

    pub fn try_recv(&self) -> Option<ChangeEvent> {
        self.shared.queue.lock().unwrap().pop_front()
    }

    /// Number of `Updated` events coalesced or shed due to backpressure.
    pub fn shed_updates(&self) -> u64 {
        self.shared.shed_updates.load(Ordering::Relaxed)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shared.close();
    }
}

impl SubscriptionHub {
    pub fn new(store: Arc<PositionStore>, queue_capacity: usize) -> SubscriptionHub {
        SubscriptionHub {
            store,
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            queue_capacity,
        }
    }

    /// Registers a subscriber. The current members of the filter are queued
    /// as `Added` events (ascending vessel id) before any incremental event,
    /// so a late subscriber never misses state; the membership set is also
    /// returned directly.
    pub fn subscribe(&self, filter: ViewportFilter) -> (Subscription, MembershipSet) {
        // Snapshot under the subscriber table lock: a cycle published while
        // we register would otherwise fall between the snapshot and the
        // first delivered diff.
        let mut subscribers = self.subscribers.lock().unwrap();
        let states = self.store.snapshot_map();

        let membership = projector::evaluate(&filter, states.values());
        let shared = Arc::new(SubscriberShared::default());
        for vessel_id in &membership {
            if let Some(state) = states.get(vessel_id) {
                shared.enqueue(ChangeEvent::Added(Arc::clone(state)), self.queue_capacity);
            }
        }

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        subscribers.insert(
            id,
            SubscriberEntry {
                filter,
                membership: membership.clone(),
                shared: Arc::clone(&shared),
            },
        );

        (Subscription { id, shared }, membership)
    }

    /// Idempotent; unknown or already-removed handles are a no-op.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut subscribers = self.subscribers.lock().unwrap();
        if let Some(entry) = subscribers.remove(&id) {
            entry.shared.close();
        }
    }

    /// Delivers one ingestion cycle to every subscriber: evaluates each
    /// filter against the current snapshot, diffs against the subscriber's
    /// previous membership and queues the events. Cycles are serialized on
    /// the subscriber table, so no subscriber ever observes reordered cycles.
    pub fn publish_cycle(&self, changes: &HashMap<VesselId, CycleChange>) {
        if changes.is_empty() {
            return;
        }
        let mut subscribers = self.subscribers.lock().unwrap();
        let states = self.store.snapshot_map();

        subscribers.retain(|_, entry| {
            if entry.shared.is_closed() {
                return false;
            }
            let membership = projector::evaluate(&entry.filter, states.values());
            let events = projector::diff(&entry.membership, &membership, changes, &states);
            for event in events {
                entry.shared.enqueue(event, self.queue_capacity);
            }
            entry.membership = membership;
            true
        });
    }

    /// Synthetic `Removed` for a decommissioned vessel, delivered only to
    /// subscribers that knew the vessel as a member.
    pub fn publish_decommission(&self, vessel_id: &VesselId) {
        let mut subscribers = self.subscribers.lock().unwrap();

        subscribers.retain(|_, entry| {
            if entry.shared.is_closed() {
                return false;
            }
            if entry.membership.remove(vessel_id) {
                entry
                    .shared
                    .enqueue(ChangeEvent::Removed(vessel_id.clone()), self.queue_capacity);
            }
            true
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}

use std::{
    collections::HashMap,
    hash::{BuildHasher, RandomState},
    sync::{Arc, RwLock},
};

use harbor_core::{PositionReport, UpsertOutcome, VesselId, VesselInfo, VesselState};
use snafu::OptionExt;

use crate::error::{Result, error::UnknownVesselSnafu};

const SHARD_COUNT: usize = 16;

/// Authoritative latest-known state per vessel.
///
/// Vessels are spread over a fixed set of shards; writes serialize on the
/// owning shard while reads and writes for other shards proceed in parallel.
/// States are immutable behind `Arc` and replaced wholesale on every accepted
/// report, so readers holding a snapshot never observe a mutation.
pub struct PositionStore {
    shards: Vec<Shard>,
    hasher: RandomState,
    history_capacity: usize,
}

#[derive(Default)]
struct Shard {
    inner: RwLock<ShardInner>,
}

#[derive(Default)]
struct ShardInner {
    vessels: HashMap<VesselId, Arc<VesselState>>,
    // Static info that arrived before the vessel's first accepted position.
    pending_info: HashMap<VesselId, VesselInfo>,
}

impl PositionStore {
    pub fn new(history_capacity: usize) -> PositionStore {
        PositionStore {
            shards: (0..SHARD_COUNT).map(|_| Shard::default()).collect(),
            hasher: RandomState::new(),
            history_capacity,
        }
    }

    fn shard(&self, vessel_id: &VesselId) -> &Shard {
        let hash = self.hasher.hash_one(vessel_id) as usize;
        &self.shards[hash % SHARD_COUNT]
    }

    /// Applies a report under the staleness/tie-break rule. Out-of-range and
    /// stale reports are reported back, never applied and never an error.
    pub fn upsert(&self, report: PositionReport) -> UpsertOutcome {
        if !report.is_valid() {
            return UpsertOutcome::RejectedInvalid;
        }

        let shard = self.shard(&report.vessel_id);
        let mut inner = shard.inner.write().unwrap();

        match inner.vessels.get(&report.vessel_id) {
            Some(existing) => {
                if !existing.accepts(&report) {
                    return UpsertOutcome::RejectedStale;
                }
                let previous = Arc::clone(existing);
                let mut next = VesselState::clone(existing);
                next.apply(report, self.history_capacity);
                let current = Arc::new(next);
                inner
                    .vessels
                    .insert(current.vessel_id.clone(), Arc::clone(&current));
                UpsertOutcome::Applied {
                    previous: Some(previous),
                    current,
                }
            }
            None => {
                let mut state = VesselState::new(report);
                if let Some(info) = inner.pending_info.remove(&state.vessel_id) {
                    state.info = Some(info);
                }
                let current = Arc::new(state);
                inner
                    .vessels
                    .insert(current.vessel_id.clone(), Arc::clone(&current));
                UpsertOutcome::Applied {
                    previous: None,
                    current,
                }
            }
        }
    }

    /// Merges vessel metadata into the tracked state, returning the
    /// previous/current pair when the visible state changed. Info for vessels
    /// without an accepted position yet is buffered until one arrives.
    pub fn apply_info(
        &self,
        info: VesselInfo,
    ) -> Option<(Arc<VesselState>, Arc<VesselState>)> {
        let shard = self.shard(&info.vessel_id);
        let mut inner = shard.inner.write().unwrap();

        match inner.vessels.get(&info.vessel_id) {
            Some(existing) => {
                let previous = Arc::clone(existing);
                let mut next = VesselState::clone(existing);
                let changed = match next.info.as_mut() {
                    Some(current_info) => current_info.merge(info),
                    None => {
                        next.info = Some(info);
                        true
                    }
                };
                if !changed {
                    return None;
                }
                next.updated_at = chrono::Utc::now();
                let current = Arc::new(next);
                inner
                    .vessels
                    .insert(current.vessel_id.clone(), Arc::clone(&current));
                Some((previous, current))
            }
            None => {
                match inner.pending_info.get_mut(&info.vessel_id) {
                    Some(pending) => {
                        pending.merge(info);
                    }
                    None => {
                        inner.pending_info.insert(info.vessel_id.clone(), info);
                    }
                }
                None
            }
        }
    }

    pub fn get(&self, vessel_id: &VesselId) -> Option<Arc<VesselState>> {
        let shard = self.shard(vessel_id);
        let inner = shard.inner.read().unwrap();
        inner.vessels.get(vessel_id).cloned()
    }

    /// The buffered track of a vessel, oldest report first.
    pub fn history(&self, vessel_id: &VesselId) -> Result<Vec<PositionReport>> {
        self.get(vessel_id)
            .map(|state| state.history().cloned().collect())
            .context(UnknownVesselSnafu {
                vessel_id: vessel_id.clone(),
            })
    }

    /// Full current state. The returned states are immutable; concurrent
    /// ingestion replaces store entries without touching them.
    pub fn snapshot(&self) -> Vec<Arc<VesselState>> {
        let mut states = Vec::with_capacity(self.len());
        for shard in &self.shards {
            let inner = shard.inner.read().unwrap();
            states.extend(inner.vessels.values().cloned());
        }
        states
    }

    pub fn snapshot_map(&self) -> HashMap<VesselId, Arc<VesselState>> {
        let mut states = HashMap::with_capacity(self.len());
        for shard in &self.shards {
            let inner = shard.inner.read().unwrap();
            states.extend(
                inner
                    .vessels
                    .iter()
                    .map(|(id, state)| (id.clone(), Arc::clone(state))),
            );
        }
        states
    }

    /// Removes a vessel permanently. Vessels are never removed implicitly,
    /// no matter how stale their last report is.
    pub fn decommission(&self, vessel_id: &VesselId) -> Result<Arc<VesselState>> {
        let shard = self.shard(vessel_id);
        let mut inner = shard.inner.write().unwrap();
        inner.pending_info.remove(vessel_id);
        inner.vessels.remove(vessel_id).context(UnknownVesselSnafu {
            vessel_id: vessel_id.clone(),
        })
    }

    /// Seeds the store from persisted states at startup. Keeps the newest
    /// state per vessel if the input contains duplicates.
    pub fn rehydrate(&self, states: Vec<VesselState>) {
        for state in states {
            let shard = self.shard(&state.vessel_id);
            let mut inner = shard.inner.write().unwrap();
            match inner.vessels.get(&state.vessel_id) {
                Some(existing) if !existing.accepts(&state.latest) => {}
                _ => {
                    inner
                        .vessels
                        .insert(state.vessel_id.clone(), Arc::new(state));
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.inner.read().unwrap().vessels.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

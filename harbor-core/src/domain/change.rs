use std::sync::Arc;

use crate::{VesselId, VesselState};

/// Incremental change delivered to subscribers. States are shared behind
/// `Arc` and never mutated in place (the store swaps whole states), so
/// fan-out never copies a history buffer.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    Added(Arc<VesselState>),
    Updated {
        previous: Arc<VesselState>,
        current: Arc<VesselState>,
    },
    Removed(VesselId),
}

impl ChangeEvent {
    pub fn vessel_id(&self) -> &VesselId {
        match self {
            ChangeEvent::Added(state) => &state.vessel_id,
            ChangeEvent::Updated { current, .. } => &current.vessel_id,
            ChangeEvent::Removed(vessel_id) => vessel_id,
        }
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, ChangeEvent::Updated { .. })
    }
}

/// What happened to a vessel during one ingestion cycle: the state before the
/// cycle (absent for vessels first seen this cycle) and the state after.
#[derive(Debug, Clone)]
pub struct CycleChange {
    pub previous: Option<Arc<VesselState>>,
    pub current: Arc<VesselState>,
}

use std::{collections::HashMap, sync::Arc};

use harbor_core::{ChangeEvent, CycleChange, MembershipSet, VesselId, VesselState, ViewportFilter};

/// The vessels currently satisfying `filter`. A linear scan over the
/// snapshot; vessel counts are expected in the tens to low thousands.
pub fn evaluate<'a, I>(filter: &ViewportFilter, states: I) -> MembershipSet
where
    I: IntoIterator<Item = &'a Arc<VesselState>>,
{
    states
        .into_iter()
        .filter(|state| filter.contains(state))
        .map(|state| state.vessel_id.clone())
        .collect()
}

/// The minimal change-set turning `old` into `new`: `Removed` for vessels
/// that left, `Added` for vessels that entered, `Updated` for vessels that
/// stayed members and changed this cycle. Each group is ordered ascending by
/// vessel id so event sequences are reproducible.
pub fn diff(
    old: &MembershipSet,
    new: &MembershipSet,
    changes: &HashMap<VesselId, CycleChange>,
    states: &HashMap<VesselId, Arc<VesselState>>,
) -> Vec<ChangeEvent> {
    let mut events = Vec::new();

    for vessel_id in old.difference(new) {
        events.push(ChangeEvent::Removed(vessel_id.clone()));
    }
    for vessel_id in new.difference(old) {
        if let Some(state) = states.get(vessel_id) {
            events.push(ChangeEvent::Added(Arc::clone(state)));
        }
    }
    for vessel_id in new.intersection(old) {
        if let Some(change) = changes.get(vessel_id) {
            let current = states
                .get(vessel_id)
                .cloned()
                .unwrap_or_else(|| Arc::clone(&change.current));
            let previous = change
                .previous
                .clone()
                .unwrap_or_else(|| Arc::clone(&current));
            events.push(ChangeEvent::Updated { previous, current });
        }
    }

    events
}

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{VesselId, VesselState, VesselStatus, VesselType};

/// Vessel identifiers currently satisfying a viewport filter. Recomputed from
/// store snapshots, never persisted.
pub type MembershipSet = BTreeSet<VesselId>;

/// A map viewport plus optional type/status predicates. A box with
/// `west > east` wraps the antimeridian.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportFilter {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub vessel_types: Option<Vec<VesselType>>,
    pub statuses: Option<Vec<VesselStatus>>,
}

impl ViewportFilter {
    pub fn bounds(north: f64, south: f64, east: f64, west: f64) -> ViewportFilter {
        ViewportFilter {
            north,
            south,
            east,
            west,
            vessel_types: None,
            statuses: None,
        }
    }

    pub fn with_vessel_types(mut self, types: impl IntoIterator<Item = VesselType>) -> Self {
        self.vessel_types = Some(types.into_iter().collect());
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = VesselStatus>) -> Self {
        self.statuses = Some(statuses.into_iter().collect());
        self
    }

    pub fn contains(&self, state: &VesselState) -> bool {
        let position = &state.latest;
        if position.latitude > self.north || position.latitude < self.south {
            return false;
        }
        if !self.contains_longitude(position.longitude) {
            return false;
        }
        if let Some(types) = &self.vessel_types {
            match state.info.as_ref().and_then(|i| i.vessel_type) {
                Some(vessel_type) if types.contains(&vessel_type) => {}
                _ => return false,
            }
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&position.status) {
                return false;
            }
        }
        true
    }

    fn contains_longitude(&self, longitude: f64) -> bool {
        if self.west <= self.east {
            (self.west..=self.east).contains(&longitude)
        } else {
            longitude >= self.west || longitude <= self.east
        }
    }
}

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use harbor_core::{
    CoreResult, PositionReport, RepositorySnafu, VesselId, VesselState, VesselStateInbound,
    VesselStateOutbound,
};
use tracker::{IngestionPipeline, PositionStore, SubscriptionHub};

pub struct TestHarness {
    pub store: Arc<PositionStore>,
    pub hub: Arc<SubscriptionHub>,
    pub pipeline: IngestionPipeline,
}

pub fn harness() -> TestHarness {
    harness_with_repository(None)
}

pub fn harness_with_repository(repository: Option<Arc<MemoryRepository>>) -> TestHarness {
    let store = Arc::new(PositionStore::new(harbor_core::DEFAULT_HISTORY_CAPACITY));
    let hub = Arc::new(SubscriptionHub::new(Arc::clone(&store), 64));
    let pipeline = IngestionPipeline::new(
        Arc::clone(&store),
        Arc::clone(&hub),
        repository.map(|r| r as Arc<dyn harbor_core::StateRepository>),
    );
    TestHarness {
        store,
        hub,
        pipeline,
    }
}

pub fn ts(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).unwrap()
}

pub fn report_at(id: &str, seconds: i64, latitude: f64, longitude: f64) -> PositionReport {
    let mut report = PositionReport::test_default(VesselId::test_new(id), ts(seconds));
    report.latitude = latitude;
    report.longitude = longitude;
    report
}

/// Persistence port backed by a map, with a switchable failure mode to
/// exercise the fire-and-forget contract.
#[derive(Default)]
pub struct MemoryRepository {
    states: Mutex<HashMap<VesselId, VesselState>>,
    failing: Mutex<bool>,
}

impl MemoryRepository {
    pub fn persisted(&self, vessel_id: &VesselId) -> Option<VesselState> {
        self.states.lock().unwrap().get(vessel_id).cloned()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn seed(&self, states: Vec<VesselState>) {
        let mut guard = self.states.lock().unwrap();
        for state in states {
            guard.insert(state.vessel_id.clone(), state);
        }
    }
}

#[async_trait]
impl VesselStateInbound for MemoryRepository {
    async fn persist_state(&self, state: &VesselState) -> CoreResult<()> {
        if *self.failing.lock().unwrap() {
            return RepositorySnafu {
                error_stringified: "simulated write failure".to_string(),
            }
            .fail();
        }
        self.states
            .lock()
            .unwrap()
            .insert(state.vessel_id.clone(), state.clone());
        Ok(())
    }
}

#[async_trait]
impl VesselStateOutbound for MemoryRepository {
    async fn load_all(&self) -> CoreResult<Vec<VesselState>> {
        Ok(self.states.lock().unwrap().values().cloned().collect())
    }
}

use std::{collections::VecDeque, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::{VesselId, VesselInfo, VesselStatus};

/// Default bound of the per-vessel history buffer.
pub const DEFAULT_HISTORY_CAPACITY: usize = 200;

/// Where a position report entered the system. Manual corrections outrank the
/// live stream, which outranks bulk imports, on exact-timestamp collisions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, AsRefStr, EnumString,
)]
pub enum ReportSource {
    Stream,
    Manual,
    Import,
}

impl ReportSource {
    pub fn priority(self) -> u8 {
        match self {
            ReportSource::Manual => 2,
            ReportSource::Stream => 1,
            ReportSource::Import => 0,
        }
    }
}

/// A single observation of a vessel. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionReport {
    pub vessel_id: VesselId,
    pub latitude: f64,
    pub longitude: f64,
    /// Knots.
    pub speed_over_ground: f64,
    /// Degrees, [0, 360).
    pub course_over_ground: f64,
    pub status: VesselStatus,
    pub timestamp: DateTime<Utc>,
    pub source: ReportSource,
    /// Metres, if the source provides an estimate.
    pub accuracy: Option<f64>,
}

impl PositionReport {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && self.speed_over_ground.is_finite()
            && self.speed_over_ground >= 0.0
            && self.course_over_ground.is_finite()
            && self.accuracy.is_none_or(|a| a.is_finite() && a >= 0.0)
    }
}

/// Latest known state of a vessel plus a bounded buffer of the reports that
/// led there. Created on the first accepted report, mutated only by the
/// position store, removed only by an explicit decommission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselState {
    pub vessel_id: VesselId,
    pub latest: PositionReport,
    pub info: Option<VesselInfo>,
    history: VecDeque<PositionReport>,
    pub updated_at: DateTime<Utc>,
}

impl VesselState {
    pub fn new(report: PositionReport) -> VesselState {
        let mut history = VecDeque::new();
        history.push_back(report.clone());
        VesselState {
            vessel_id: report.vessel_id.clone(),
            latest: report,
            info: None,
            history,
            updated_at: Utc::now(),
        }
    }

    /// Whether `report` advances this state under the staleness/tie-break
    /// rule: a strictly newer timestamp always wins, an equal timestamp only
    /// wins with a strictly higher source priority.
    pub fn accepts(&self, report: &PositionReport) -> bool {
        report.timestamp > self.latest.timestamp
            || (report.timestamp == self.latest.timestamp
                && report.source.priority() > self.latest.source.priority())
    }

    pub fn apply(&mut self, report: PositionReport, history_capacity: usize) {
        if self.history.len() >= history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(report.clone());
        self.latest = report;
        self.updated_at = Utc::now();
    }

    /// Accepted reports, oldest first.
    pub fn history(&self) -> impl ExactSizeIterator<Item = &PositionReport> {
        self.history.iter()
    }
}

/// Batching envelope handed from the feed consumer to the ingestion pipeline.
#[derive(Debug, Clone, Default)]
pub struct DataMessage {
    pub positions: Vec<PositionReport>,
    pub static_updates: Vec<VesselInfo>,
}

impl DataMessage {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.static_updates.is_empty()
    }
}

/// Store-level result of an upsert. `Applied` carries the swapped states so
/// the caller can assemble change events without re-reading the store.
#[derive(Debug, Clone)]
pub enum UpsertOutcome {
    Applied {
        previous: Option<Arc<VesselState>>,
        current: Arc<VesselState>,
    },
    RejectedStale,
    RejectedInvalid,
}

/// Per-report outcome reported back to feed adapters and manual callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, AsRefStr)]
pub enum ApplyOutcome {
    Accepted,
    RejectedStale,
    RejectedInvalid,
}

impl From<&UpsertOutcome> for ApplyOutcome {
    fn from(value: &UpsertOutcome) -> Self {
        match value {
            UpsertOutcome::Applied { .. } => ApplyOutcome::Accepted,
            UpsertOutcome::RejectedStale => ApplyOutcome::RejectedStale,
            UpsertOutcome::RejectedInvalid => ApplyOutcome::RejectedInvalid,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub accepted: usize,
    pub rejected_stale: usize,
    pub rejected_invalid: usize,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: ApplyOutcome) {
        match outcome {
            ApplyOutcome::Accepted => self.accepted += 1,
            ApplyOutcome::RejectedStale => self.rejected_stale += 1,
            ApplyOutcome::RejectedInvalid => self.rejected_invalid += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.accepted + self.rejected_stale + self.rejected_invalid
    }
}

#[cfg(feature = "test")]
mod test {
    use super::*;

    impl PositionReport {
        pub fn test_default(vessel_id: VesselId, time: DateTime<Utc>) -> PositionReport {
            PositionReport {
                vessel_id,
                latitude: rand::random_range(-90.0..=90.0),
                longitude: rand::random_range(-180.0..=180.0),
                speed_over_ground: rand::random_range(0.0..30.0),
                course_over_ground: rand::random_range(0.0..360.0),
                status: VesselStatus::Underway,
                timestamp: time,
                source: ReportSource::Stream,
                accuracy: Some(5.0),
            }
        }
    }
}

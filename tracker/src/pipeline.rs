use std::{
    collections::{HashMap, hash_map::Entry},
    sync::Arc,
};

use async_channel::Receiver;
use harbor_core::{
    ApplyOutcome, BatchSummary, CycleChange, DataMessage, PositionReport, ReportSource,
    StateRepository, UpsertOutcome, User, VesselId, VesselState,
};
use itertools::Itertools;
use snafu::ensure;
use tracing::{debug, error, instrument, warn};

use crate::{
    error::{Result, error::ForbiddenSnafu},
    hub::SubscriptionHub,
    store::PositionStore,
};

/// Front door for position reports from every source. Normalizes and
/// validates reports, applies them to the store, hands accepted states to
/// the optional persistence collaborator and closes each ingestion cycle by
/// publishing the change-set to the subscription hub.
pub struct IngestionPipeline {
    store: Arc<PositionStore>,
    hub: Arc<SubscriptionHub>,
    repository: Option<Arc<dyn StateRepository>>,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<PositionStore>,
        hub: Arc<SubscriptionHub>,
        repository: Option<Arc<dyn StateRepository>>,
    ) -> IngestionPipeline {
        IngestionPipeline {
            store,
            hub,
            repository,
        }
    }

    /// Applies a single report. The outcome is returned to the caller, which
    /// decides whether to retry or drop; a rejection never affects other
    /// vessels or halts the pipeline.
    pub fn apply(&self, report: PositionReport) -> ApplyOutcome {
        let Some(report) = normalize(report) else {
            return ApplyOutcome::RejectedInvalid;
        };

        let mut changes = HashMap::new();
        let outcome = self.apply_to_store(report, &mut changes);
        self.finish_cycle(changes);
        outcome
    }

    /// Applies a batch, atomically per vessel: reports for the same vessel
    /// are applied in ascending timestamp order (source priority breaking
    /// exact ties), so an out-of-order batch converges to the same state as
    /// one-at-a-time delivery in timestamp order. Cross-vessel ordering is
    /// not guaranteed.
    pub fn apply_batch(&self, reports: Vec<PositionReport>) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let mut changes = HashMap::new();
        self.apply_positions(reports, &mut summary, &mut changes);
        self.finish_cycle(changes);
        summary
    }

    /// Applies a feed envelope: a batch of positions plus any static vessel
    /// metadata, all within one ingestion cycle.
    pub fn apply_message(&self, message: DataMessage) -> BatchSummary {
        let DataMessage {
            positions,
            static_updates,
        } = message;

        let mut summary = BatchSummary::default();
        let mut changes = HashMap::new();

        self.apply_positions(positions, &mut summary, &mut changes);
        for info in static_updates {
            if let Some((previous, current)) = self.store.apply_info(info) {
                self.persist(&current);
                record_change(&mut changes, Some(previous), current);
            }
        }

        self.finish_cycle(changes);
        summary
    }

    /// Manual corrections are reserved for port personnel; the source tag is
    /// forced to `Manual` so the correction wins exact-timestamp collisions
    /// with the stream.
    pub fn apply_manual(&self, user: &User, mut report: PositionReport) -> Result<ApplyOutcome> {
        ensure!(
            user.role.can_submit_manual_reports(),
            ForbiddenSnafu {
                role: user.role,
                action: "submit manual position reports",
            }
        );
        report.source = ReportSource::Manual;
        Ok(self.apply(report))
    }

    /// Permanently removes a vessel and notifies subscribers that knew it.
    pub fn decommission(&self, user: &User, vessel_id: &VesselId) -> Result<()> {
        ensure!(
            user.role.can_decommission_vessels(),
            ForbiddenSnafu {
                role: user.role,
                action: "decommission vessels",
            }
        );
        self.store.decommission(vessel_id)?;
        self.hub.publish_decommission(vessel_id);
        Ok(())
    }

    /// Drains data messages from the feed channel until it closes. The
    /// optional confirmation sender signals each processed message to tests.
    #[instrument(skip_all)]
    pub async fn consume_loop(
        &self,
        receiver: Receiver<DataMessage>,
        process_confirmation: Option<tokio::sync::mpsc::Sender<()>>,
    ) {
        while let Ok(message) = receiver.recv().await {
            let summary = self.apply_message(message);
            debug!(
                accepted = summary.accepted,
                rejected_stale = summary.rejected_stale,
                rejected_invalid = summary.rejected_invalid,
                "applied data message",
            );
            if let Some(confirmation) = &process_confirmation {
                let _ = confirmation.send(()).await;
            }
        }
    }

    fn apply_positions(
        &self,
        reports: Vec<PositionReport>,
        summary: &mut BatchSummary,
        changes: &mut HashMap<VesselId, CycleChange>,
    ) {
        let mut valid = Vec::with_capacity(reports.len());
        for report in reports {
            match normalize(report) {
                Some(report) => valid.push(report),
                None => summary.record(ApplyOutcome::RejectedInvalid),
            }
        }

        let grouped = valid
            .into_iter()
            .map(|report| (report.vessel_id.clone(), report))
            .into_group_map();

        for (_, mut reports) in grouped {
            reports.sort_by(|a, b| {
                a.timestamp
                    .cmp(&b.timestamp)
                    .then_with(|| a.source.priority().cmp(&b.source.priority()))
            });
            for report in reports {
                summary.record(self.apply_to_store(report, changes));
            }
        }
    }

    fn apply_to_store(
        &self,
        report: PositionReport,
        changes: &mut HashMap<VesselId, CycleChange>,
    ) -> ApplyOutcome {
        match self.store.upsert(report) {
            UpsertOutcome::Applied { previous, current } => {
                self.persist(&current);
                record_change(changes, previous, current);
                ApplyOutcome::Accepted
            }
            outcome @ UpsertOutcome::RejectedStale => {
                // Expected under multi-source operation, not an error.
                debug!("rejected stale position report");
                (&outcome).into()
            }
            outcome @ UpsertOutcome::RejectedInvalid => {
                warn!("rejected invalid position report");
                (&outcome).into()
            }
        }
    }

    /// Fire-and-forget persistence: a failure is logged and never rolls back
    /// or blocks the in-memory accept.
    fn persist(&self, state: &Arc<VesselState>) {
        if let Some(repository) = &self.repository {
            let repository = Arc::clone(repository);
            let state = Arc::clone(state);
            tokio::spawn(async move {
                if let Err(e) = repository.persist_state(&state).await {
                    error!("failed to persist vessel state: {e:?}");
                }
            });
        }
    }

    fn finish_cycle(&self, changes: HashMap<VesselId, CycleChange>) {
        if !changes.is_empty() {
            self.hub.publish_cycle(&changes);
        }
    }
}

fn record_change(
    changes: &mut HashMap<VesselId, CycleChange>,
    previous: Option<Arc<VesselState>>,
    current: Arc<VesselState>,
) {
    match changes.entry(current.vessel_id.clone()) {
        Entry::Occupied(mut entry) => entry.get_mut().current = current,
        Entry::Vacant(entry) => {
            entry.insert(CycleChange { previous, current });
        }
    }
}

/// Reduces the course into [0, 360) and rejects reports that fail range
/// validation before they reach the store.
fn normalize(mut report: PositionReport) -> Option<PositionReport> {
    if !report.course_over_ground.is_finite() {
        return None;
    }
    report.course_over_ground = report.course_over_ground.rem_euclid(360.0);
    report.is_valid().then_some(report)
}

use async_trait::async_trait;

use crate::{CoreResult, VesselState};

/// Write side of the optional persistence collaborator. Called
/// fire-and-forget after every accepted update; failures are logged by the
/// caller and never roll back the in-memory state.
#[async_trait]
pub trait VesselStateInbound: Send + Sync {
    async fn persist_state(&self, state: &VesselState) -> CoreResult<()>;
}

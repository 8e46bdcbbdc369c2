use async_trait::async_trait;

use crate::{CoreResult, VesselState};

/// Read side of the optional persistence collaborator, used once at startup
/// to rehydrate the position store.
#[async_trait]
pub trait VesselStateOutbound: Send + Sync {
    async fn load_all(&self) -> CoreResult<Vec<VesselState>>;
}

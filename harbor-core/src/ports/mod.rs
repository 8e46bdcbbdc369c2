mod inbound;
mod outbound;

pub use inbound::*;
pub use outbound::*;

/// Combined persistence port for rehydrating at startup and persisting
/// accepted updates.
pub trait StateRepository: VesselStateInbound + VesselStateOutbound {}

impl<T> StateRepository for T where T: VesselStateInbound + VesselStateOutbound {}

use harbor_core::{Role, VesselId};
use snafu::{Location, Snafu};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(module, visibility(pub))]
pub enum Error {
    #[snafu(display("Vessel '{vessel_id}' does not exist"))]
    UnknownVessel {
        #[snafu(implicit)]
        location: Location,
        vessel_id: VesselId,
    },
    #[snafu(display("Role '{role}' is not permitted to {action}"))]
    Forbidden {
        #[snafu(implicit)]
        location: Location,
        role: Role,
        action: &'static str,
    },
}

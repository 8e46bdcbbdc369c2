use std::{fmt::Display, ops::Deref, str::FromStr};

use chrono::{DateTime, Utc};
use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize, de};
use serde_repr::{Deserialize_repr, Serialize_repr};
use snafu::{Location, Snafu};
use strum::{AsRefStr, EnumString};

/// Registration identifiers (IMO number shaped) are always exactly this long.
pub const VESSEL_ID_LENGTH: usize = 7;

#[derive(Debug, Snafu)]
#[snafu(module, visibility(pub))]
pub enum VesselIdError {
    #[snafu(display("Vessel id had invalid length '{value}'"))]
    Length {
        #[snafu(implicit)]
        location: Location,
        value: String,
    },
    #[snafu(display("Vessel id contained a non-alphanumeric character '{value}'"))]
    InvalidCharacter {
        #[snafu(implicit)]
        location: Location,
        value: String,
    },
}

/// Unique registration identifier of a vessel, 7 ascii-alphanumeric
/// characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VesselId(String);

impl VesselId {
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FromStr for VesselId {
    type Err = VesselIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.len() != VESSEL_ID_LENGTH {
            return vessel_id_error::LengthSnafu { value }.fail();
        }
        if !value.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return vessel_id_error::InvalidCharacterSnafu { value }.fail();
        }
        Ok(Self(value.into()))
    }
}

impl AsRef<str> for VesselId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for VesselId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_ref()
    }
}

impl Display for VesselId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for VesselId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(de::Error::custom)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, AsRefStr, EnumString,
)]
pub enum VesselType {
    Cargo,
    Tanker,
    Passenger,
    Tug,
    Fishing,
    Other,
}

#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    FromPrimitive,
    Eq,
    Hash,
    Serialize_repr,
    Deserialize_repr,
    strum::Display,
    AsRefStr,
    EnumString,
)]
#[repr(i32)]
pub enum VesselStatus {
    Underway = 0,
    AtAnchor = 1,
    NotUnderCommand = 2,
    RestrictedManoeuvrability = 3,
    ConstrainedByDraught = 4,
    Moored = 5,
    Aground = 6,
    EngagedInFishing = 7,
    UnderwaySailing = 8,
    NotDefined = 15,
}

/// Vessel metadata reported out-of-band from positions, typically every few
/// minutes on the feed or once at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselInfo {
    pub vessel_id: VesselId,
    pub reported_at: DateTime<Utc>,
    pub name: Option<String>,
    pub flag_state: Option<String>,
    pub vessel_type: Option<VesselType>,
    pub capacity_teu: Option<f64>,
    pub destination: Option<String>,
}

impl VesselInfo {
    /// Folds a newer info report into this one. Fields absent from the update
    /// never clobber existing values. Returns whether any field changed;
    /// updates with an older-or-equal timestamp are ignored.
    pub fn merge(&mut self, update: VesselInfo) -> bool {
        if update.reported_at <= self.reported_at {
            return false;
        }

        let VesselInfo {
            vessel_id: _,
            reported_at,
            name,
            flag_state,
            vessel_type,
            capacity_teu,
            destination,
        } = update;

        self.reported_at = reported_at;

        let mut changed = false;
        if let Some(name) = name {
            changed |= self.name.as_ref() != Some(&name);
            self.name = Some(name);
        }
        if let Some(flag_state) = flag_state {
            changed |= self.flag_state.as_ref() != Some(&flag_state);
            self.flag_state = Some(flag_state);
        }
        if let Some(vessel_type) = vessel_type {
            changed |= self.vessel_type != Some(vessel_type);
            self.vessel_type = Some(vessel_type);
        }
        if let Some(capacity_teu) = capacity_teu {
            changed |= self.capacity_teu != Some(capacity_teu);
            self.capacity_teu = Some(capacity_teu);
        }
        if let Some(destination) = destination {
            changed |= self.destination.as_ref() != Some(&destination);
            self.destination = Some(destination);
        }
        changed
    }
}

#[cfg(feature = "test")]
mod test {
    use chrono::TimeZone;
    use rand::Rng;

    use super::*;

    impl VesselId {
        pub fn test_new(value: &str) -> Self {
            Self(value.into())
        }

        pub fn test_random() -> Self {
            Self(format!("9{:06}", rand::rng().random_range(0..1_000_000u32)))
        }
    }

    impl VesselInfo {
        pub fn test_default(vessel_id: VesselId) -> VesselInfo {
            VesselInfo {
                vessel_id,
                reported_at: Utc.timestamp_opt(900, 0).unwrap(),
                name: Some("Pacific Explorer".to_string()),
                flag_state: Some("Singapore".to_string()),
                vessel_type: Some(VesselType::Cargo),
                capacity_teu: Some(8000.0),
                destination: Some("SINGAPORE".to_string()),
            }
        }
    }
}

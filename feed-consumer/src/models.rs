use chrono::{DateTime, Utc};
use harbor_core::{
    PositionReport, ReportSource, VesselId, VesselInfo, VesselStatus, VesselType,
};
use serde::{Deserialize, Serialize};

/// Vessel metadata that is emitted every few minutes from vessels.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticMessage {
    #[serde(rename = "type")]
    pub message_type: Option<FeedMessageType>,
    #[serde(rename = "vesselId")]
    pub vessel_id: VesselId,
    pub timestamp: DateTime<Utc>,
    pub name: Option<String>,
    #[serde(rename = "flagState")]
    pub flag_state: Option<String>,
    #[serde(rename = "vesselType")]
    pub vessel_type: Option<VesselType>,
    #[serde(rename = "capacityTeu")]
    pub capacity_teu: Option<f64>,
    pub destination: Option<String>,
}

/// Position data that is emitted every few seconds by vessels.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PositionMessage {
    #[serde(rename = "type")]
    pub message_type: Option<FeedMessageType>,
    #[serde(rename = "vesselId")]
    pub vessel_id: VesselId,
    pub timestamp: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(rename = "speedOverGround")]
    pub speed_over_ground: Option<f64>,
    #[serde(rename = "courseOverGround")]
    pub course_over_ground: Option<f64>,
    pub status: VesselStatus,
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub enum FeedMessageType {
    /// A message containing position data.
    Position,
    /// A message containing vessel related data.
    #[serde(rename = "Staticdata")]
    Static,
}

/// Convenience struct to deserialize the message type prior to attempting to
/// deserialize the full message.
#[derive(Deserialize)]
pub struct MessageType {
    /// What type of message this is.
    #[serde(rename = "type")]
    pub message_type: FeedMessageType,
}

pub enum FeedMessage {
    Static(StaticMessage),
    Position(PositionMessage),
}

/// Feed positions without coordinates carry nothing the tracking core can
/// use, so the conversion is lossy by design.
pub struct PositionReportWrapper(pub Option<PositionReport>);

impl From<PositionMessage> for PositionReportWrapper {
    fn from(message: PositionMessage) -> Self {
        match (message.latitude, message.longitude) {
            (Some(latitude), Some(longitude)) => {
                let PositionMessage {
                    message_type: _,
                    vessel_id,
                    timestamp,
                    latitude: _,
                    longitude: _,
                    speed_over_ground,
                    course_over_ground,
                    status,
                    accuracy,
                } = message;

                PositionReportWrapper(Some(PositionReport {
                    vessel_id,
                    latitude,
                    longitude,
                    speed_over_ground: speed_over_ground.unwrap_or(0.0),
                    course_over_ground: course_over_ground.unwrap_or(0.0),
                    status,
                    timestamp,
                    source: ReportSource::Stream,
                    accuracy,
                }))
            }
            _ => PositionReportWrapper(None),
        }
    }
}

impl From<StaticMessage> for VesselInfo {
    fn from(message: StaticMessage) -> Self {
        let StaticMessage {
            message_type: _,
            vessel_id,
            timestamp,
            name,
            flag_state,
            vessel_type,
            capacity_teu,
            destination,
        } = message;

        VesselInfo {
            vessel_id,
            reported_at: timestamp,
            name,
            flag_state,
            vessel_type,
            capacity_teu,
            destination,
        }
    }
}

#[cfg(feature = "test")]
mod test {
    use chrono::TimeZone;

    use super::*;

    impl PositionMessage {
        pub fn test_default(vessel_id: Option<VesselId>) -> PositionMessage {
            PositionMessage {
                message_type: Some(FeedMessageType::Position),
                vessel_id: vessel_id.unwrap_or_else(VesselId::test_random),
                timestamp: chrono::offset::Utc::now(),
                latitude: Some(1.29027),
                longitude: Some(103.851959),
                speed_over_ground: Some(15.5),
                course_over_ground: Some(87.0),
                status: VesselStatus::Underway,
                accuracy: Some(5.0),
            }
        }
    }

    impl StaticMessage {
        pub fn test_default(vessel_id: Option<VesselId>) -> StaticMessage {
            StaticMessage {
                message_type: Some(FeedMessageType::Static),
                vessel_id: vessel_id.unwrap_or_else(VesselId::test_random),
                timestamp: Utc.timestamp_opt(1000, 0).unwrap(),
                name: Some("Pacific Explorer".to_string()),
                flag_state: Some("Singapore".to_string()),
                vessel_type: Some(VesselType::Cargo),
                capacity_teu: Some(8000.0),
                destination: Some("SINGAPORE".to_string()),
            }
        }
    }
}

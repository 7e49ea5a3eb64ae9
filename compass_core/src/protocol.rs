//! Wire protocol spoken with the direction service.
//!
//! Every frame is a JSON envelope `{"type": ..., "payload": ...}` carried as a
//! WebSocket text message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown target: {0}")]
    UnknownTarget(String),
}

/// What the pointer is tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetId {
    #[default]
    Sun,
    Mars,
    Venus,
    Saturn,
    Jupiter,
    AircraftOverhead,
}

impl TargetId {
    pub const ALL: [TargetId; 6] = [
        TargetId::Sun,
        TargetId::Mars,
        TargetId::Venus,
        TargetId::Saturn,
        TargetId::Jupiter,
        TargetId::AircraftOverhead,
    ];

    /// Name used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            TargetId::Sun => "SUN",
            TargetId::Mars => "MARS",
            TargetId::Venus => "VENUS",
            TargetId::Saturn => "SATURN",
            TargetId::Jupiter => "JUPITER",
            TargetId::AircraftOverhead => "AIRCRAFT_OVERHEAD",
        }
    }

    /// Name shown in the target selector.
    pub fn label(self) -> &'static str {
        match self {
            TargetId::Sun => "Sun",
            TargetId::Mars => "Mars",
            TargetId::Venus => "Venus",
            TargetId::Saturn => "Saturn",
            TargetId::Jupiter => "Jupiter",
            TargetId::AircraftOverhead => "Aircraft Overhead",
        }
    }

    pub fn is_aircraft(self) -> bool {
        self == TargetId::AircraftOverhead
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetId::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownTarget(s.to_owned()))
    }
}

/// One azimuth/altitude solution pushed by the direction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionSample {
    /// Target name, or the callsign when tracking an aircraft
    pub target_id: String,
    #[serde(rename = "azimuth")]
    pub azimuth_deg: f64,
    #[serde(rename = "altitude")]
    pub altitude_deg: f64,
    pub distance_km: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aircraft_altitude_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_speed_kmh: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_speed_mps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_airport: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_airport: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal_distance_km: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AircraftState {
    Searching,
    Tracking,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AircraftStatus {
    pub state: AircraftState,
}

/// Frames sent to the direction service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    UpdateLocation {
        latitude: f64,
        longitude: f64,
        elevation: f64,
    },
    SwitchTarget {
        target: TargetId,
    },
}

impl ClientMessage {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Frames received from the direction service.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    PositionUpdate(DirectionSample),
    AircraftStatus(AircraftStatus),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
}

/// Decode one inbound text frame.
///
/// Unknown message types decode to `Ok(None)` so newer servers can add
/// messages without breaking older clients.
pub fn decode_server_message(text: &str) -> Result<Option<ServerMessage>, ProtocolError> {
    let envelope: Envelope = serde_json::from_str(text)?;
    let message = match envelope.kind.as_str() {
        "POSITION_UPDATE" => ServerMessage::PositionUpdate(serde_json::from_value(envelope.payload)?),
        "AIRCRAFT_STATUS" => ServerMessage::AircraftStatus(serde_json::from_value(envelope.payload)?),
        _ => return Ok(None),
    };
    Ok(Some(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_target_ids_use_wire_names() {
        for target in TargetId::ALL {
            assert_eq!(target.as_str().parse::<TargetId>().unwrap(), target);
            assert_eq!(
                serde_json::to_value(target).unwrap(),
                Value::String(target.as_str().to_owned())
            );
        }
        assert!("PLUTO".parse::<TargetId>().is_err());
    }

    #[test]
    fn test_switch_target_envelope() {
        let text = ClientMessage::SwitchTarget {
            target: TargetId::AircraftOverhead,
        }
        .encode()
        .unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({"type": "SWITCH_TARGET", "payload": {"target": "AIRCRAFT_OVERHEAD"}})
        );
    }

    #[test]
    fn test_update_location_envelope() {
        let text = ClientMessage::UpdateLocation {
            latitude: 45.5,
            longitude: -73.5,
            elevation: 120.0,
        }
        .encode()
        .unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "UPDATE_LOCATION",
                "payload": {"latitude": 45.5, "longitude": -73.5, "elevation": 120.0}
            })
        );
    }

    #[test]
    fn test_decodes_celestial_position_update() {
        let text = json!({
            "type": "POSITION_UPDATE",
            "payload": {
                "target_id": "MARS",
                "azimuth": 123.4,
                "altitude": 12.5,
                "distance_km": 2.25e8,
                "timestamp": "2025-03-01T12:00:00.250000Z"
            }
        })
        .to_string();

        let Some(ServerMessage::PositionUpdate(sample)) = decode_server_message(&text).unwrap()
        else {
            panic!("expected a position update");
        };
        assert_eq!(sample.target_id, "MARS");
        assert_eq!(sample.azimuth_deg, 123.4);
        assert_eq!(sample.altitude_deg, 12.5);
        assert!(sample.aircraft_altitude_m.is_none());
        assert!(sample.origin_airport.is_none());
    }

    #[test]
    fn test_decodes_aircraft_fields_and_nulls() {
        let text = json!({
            "type": "POSITION_UPDATE",
            "payload": {
                "target_id": "ACA123",
                "azimuth": 10.0,
                "altitude": 20.0,
                "distance_km": 8.2,
                "timestamp": "2025-03-01T12:00:00+00:00",
                "aircraft_altitude_m": 3048.0,
                "ground_speed_kmh": 650.0,
                "vertical_speed_mps": null,
                "origin_airport": "YUL",
                "destination_airport": null,
                "horizontal_distance_km": 7.6
            }
        })
        .to_string();

        let Some(ServerMessage::PositionUpdate(sample)) = decode_server_message(&text).unwrap()
        else {
            panic!("expected a position update");
        };
        assert_eq!(sample.aircraft_altitude_m, Some(3048.0));
        assert_eq!(sample.vertical_speed_mps, None);
        assert_eq!(sample.origin_airport.as_deref(), Some("YUL"));
        assert_eq!(sample.destination_airport, None);
        assert_eq!(sample.horizontal_distance_km, Some(7.6));
    }

    #[test]
    fn test_decodes_aircraft_status() {
        let text = r#"{"type":"AIRCRAFT_STATUS","payload":{"state":"SEARCHING"}}"#;
        assert_eq!(
            decode_server_message(text).unwrap(),
            Some(ServerMessage::AircraftStatus(AircraftStatus {
                state: AircraftState::Searching
            }))
        );
    }

    #[test]
    fn test_unknown_types_are_ignored() {
        let text = r#"{"type":"HEARTBEAT","payload":{}}"#;
        assert_eq!(decode_server_message(text).unwrap(), None);
    }

    #[test]
    fn test_malformed_frames_are_errors() {
        assert!(decode_server_message("not json").is_err());
        assert!(decode_server_message(r#"{"payload":{}}"#).is_err());
        assert!(decode_server_message(r#"{"type":"POSITION_UPDATE","payload":{"azimuth":1}}"#)
            .is_err());
        assert!(
            decode_server_message(r#"{"type":"AIRCRAFT_STATUS","payload":{"state":"LOST"}}"#)
                .is_err()
        );
    }
}

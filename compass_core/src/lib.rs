//! Compass Core
//!
//! Direction tracking and orientation arbitration for the omni compass pointer.
//!
//! The crate keeps one streaming session to the direction service, turns the
//! azimuth/altitude solutions it receives (and the device's own orientation)
//! into camera and pointer poses, and decides on every input whether sensor
//! data or the operator's manual overrides drive what gets rendered.

use thiserror::Error;

pub mod angle_math;
pub mod arbiter;
pub mod config;
pub mod controller;
pub mod protocol;
pub mod sensors;
pub mod session;
pub mod status;
pub mod stream;

pub use angle_math::{CameraPose, PointerAim};
pub use arbiter::{Axis, AxisModes, ManualPosition, ManualValues, ModeArbiter, ResolvedState};
pub use config::{Config, ConfigError, SiteLocation};
pub use controller::{Command, DirectionLink, SceneFrame, SceneSink, TrackingController, WatchScene};
pub use protocol::{
    AircraftState, AircraftStatus, ClientMessage, DirectionSample, ProtocolError, ServerMessage,
    TargetId,
};
pub use sensors::{
    ChannelOrientationSource, ChannelPositionSource, FixedPositionSource, GeoSample,
    OrientationFeed, OrientationSample, OrientationSource, PositionFeed, PositionSource,
    SampleSink, SensorError, UnavailablePositionSource, WatchHandle,
};
pub use session::TrackingSession;
pub use stream::{
    ConnectionState, DirectionStream, Frame, Session, SessionPeer, StreamEvent, Transport,
    TransportError, WebSocketTransport,
};

/// Result type alias for compass operations.
pub type CompassResult<T> = Result<T, CompassError>;

/// Error types surfaced by the tracking core.
#[derive(Error, Debug)]
pub enum CompassError {
    #[error("ConfigError: {0}")]
    Config(#[from] ConfigError),
    #[error("ProtocolError: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("TransportError: {0}")]
    Transport(#[from] TransportError),
    #[error("SensorError: {0}")]
    Sensor(#[from] SensorError),
}

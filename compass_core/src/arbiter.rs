//! Manual/automatic arbitration.
//!
//! [`ModeArbiter`] is the only owner of axis modes, manual values and the
//! latest sensor/stream samples. Everything that reacts to an input reads the
//! current state through it at event time, then asks it for a fresh
//! [`ResolvedState`].

use crate::{
    angle_math::{
        camera_bearing_orbit, camera_device_orientation, pointer_orientation, CameraPose,
        PointerAim,
    },
    protocol::DirectionSample,
    sensors::{GeoSample, OrientationSample},
};

/// The three independently arbitrated axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Camera heading
    Bearing,
    /// Where the pointer aims
    Direction,
    /// Observer position reported upstream
    Position,
}

/// Manual override flags, all automatic by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisModes {
    pub bearing_override: bool,
    pub direction_override: bool,
    pub position_override: bool,
}

impl AxisModes {
    pub fn is_manual(&self, axis: Axis) -> bool {
        match axis {
            Axis::Bearing => self.bearing_override,
            Axis::Direction => self.direction_override,
            Axis::Position => self.position_override,
        }
    }

    fn set(&mut self, axis: Axis, manual: bool) {
        match axis {
            Axis::Bearing => self.bearing_override = manual,
            Axis::Direction => self.direction_override = manual,
            Axis::Position => self.position_override = manual,
        }
    }
}

/// Manually entered observer position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManualPosition {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub elevation_m: f64,
    /// Only the elevation is manual; latitude/longitude stay automatic
    pub elevation_only: bool,
}

impl Default for ManualPosition {
    fn default() -> Self {
        Self {
            latitude_deg: 0.0,
            longitude_deg: 0.0,
            elevation_m: 0.0,
            elevation_only: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ManualValues {
    pub bearing_deg: f64,
    pub target_azimuth_deg: f64,
    pub target_altitude_deg: f64,
    pub position: ManualPosition,
}

/// The single authoritative camera/pointer/position triple.
///
/// `None` means "leave as is": no orientation reading yet, no direction
/// sample yet, or no position to report.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResolvedState {
    pub camera: Option<CameraPose>,
    pub pointer: Option<PointerAim>,
    pub position: Option<GeoSample>,
}

/// Resolve every axis from the current modes, manual values and latest samples.
///
/// Manual always wins on its own axis and the axes never influence each other.
pub fn resolve(
    modes: &AxisModes,
    manual: &ManualValues,
    direction: Option<&DirectionSample>,
    orientation: Option<&OrientationSample>,
    geo: Option<&GeoSample>,
) -> ResolvedState {
    let camera = if modes.bearing_override {
        Some(camera_bearing_orbit(manual.bearing_deg))
    } else {
        orientation.and_then(|o| camera_device_orientation(o.alpha, o.beta, o.gamma))
    };

    let pointer = if modes.direction_override {
        Some(pointer_orientation(
            manual.target_azimuth_deg,
            manual.target_altitude_deg,
        ))
    } else {
        direction.map(|d| pointer_orientation(d.azimuth_deg, d.altitude_deg))
    };

    let position = match (modes.position_override, manual.position.elevation_only) {
        (true, false) => Some(GeoSample {
            latitude_deg: manual.position.latitude_deg,
            longitude_deg: manual.position.longitude_deg,
            elevation_m: manual.position.elevation_m,
        }),
        (true, true) => geo.map(|g| GeoSample {
            elevation_m: manual.position.elevation_m,
            ..*g
        }),
        (false, _) => geo.copied(),
    };

    ResolvedState {
        camera,
        pointer,
        position,
    }
}

/// Owner of all arbitration state for one session.
#[derive(Debug, Clone, Default)]
pub struct ModeArbiter {
    modes: AxisModes,
    manual: ManualValues,
    latest_direction: Option<DirectionSample>,
    latest_orientation: Option<OrientationSample>,
    latest_geo: Option<GeoSample>,
}

impl ModeArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn modes(&self) -> AxisModes {
        self.modes
    }

    pub fn manual(&self) -> ManualValues {
        self.manual
    }

    pub fn is_manual(&self, axis: Axis) -> bool {
        self.modes.is_manual(axis)
    }

    pub fn latest_direction(&self) -> Option<&DirectionSample> {
        self.latest_direction.as_ref()
    }

    pub fn latest_geo(&self) -> Option<&GeoSample> {
        self.latest_geo.as_ref()
    }

    pub fn set_mode(&mut self, axis: Axis, manual: bool) {
        self.modes.set(axis, manual);
    }

    pub fn set_manual_bearing(&mut self, bearing_deg: f64) {
        self.manual.bearing_deg = bearing_deg;
    }

    pub fn set_manual_direction(&mut self, azimuth_deg: f64, altitude_deg: f64) {
        self.manual.target_azimuth_deg = azimuth_deg;
        self.manual.target_altitude_deg = altitude_deg;
    }

    pub fn set_manual_position(&mut self, latitude_deg: f64, longitude_deg: f64, elevation_m: f64) {
        self.manual.position.latitude_deg = latitude_deg;
        self.manual.position.longitude_deg = longitude_deg;
        self.manual.position.elevation_m = elevation_m;
    }

    pub fn set_elevation_only(&mut self, elevation_only: bool) {
        self.manual.position.elevation_only = elevation_only;
    }

    pub fn observe_direction(&mut self, sample: DirectionSample) {
        self.latest_direction = Some(sample);
    }

    pub fn observe_orientation(&mut self, sample: OrientationSample) {
        self.latest_orientation = Some(sample);
    }

    pub fn observe_position(&mut self, sample: GeoSample) {
        self.latest_geo = Some(sample);
    }

    pub fn resolve(&self) -> ResolvedState {
        resolve(
            &self.modes,
            &self.manual,
            self.latest_direction.as_ref(),
            self.latest_orientation.as_ref(),
            self.latest_geo.as_ref(),
        )
    }
}

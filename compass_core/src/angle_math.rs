//! Angle conversions between sky coordinates, device orientation and scene poses.
//!
//! The scene is Y-up with north along -Z and east along +X, which is the frame
//! bevy renders in. Everything here is stateless.

use bevy_math::{DVec3, EulerRot, Quat, Vec3};

/// Distance of the pointer's look-at target from the origin.
///
/// Only affects numerical stability of the look-at, never the orientation.
pub const POINTER_TARGET_DISTANCE: f64 = 5.0;

/// Radius of the circle the camera sits on, looking back at the pointer.
pub const CAMERA_ORBIT_RADIUS: f32 = 3.0;

/// Where the camera sits and how it is rotated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl CameraPose {
    /// Camera rotated by `rotation`, pulled back along its own view axis so
    /// the origin stays in the middle of the frame.
    fn framing_origin(rotation: Quat) -> Self {
        Self {
            translation: rotation * Vec3::new(0.0, 0.0, CAMERA_ORBIT_RADIUS),
            rotation,
        }
    }

    /// Unit vector the camera looks along (bevy cameras look down -Z).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }
}

/// Where the pointer should aim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerAim {
    pub azimuth_deg: f64,
    pub altitude_deg: f64,
    /// Unit direction in scene coordinates
    pub direction: DVec3,
    /// Look-at target for the pointer's forward axis
    pub target: Vec3,
}

/// Unit direction vector for an azimuth/altitude pair.
///
/// Azimuth 0° is north (-Z), 90° is east (+X); positive altitude is up (+Y).
/// Out-of-range inputs simply wrap through the trigonometric functions.
pub fn direction_vector(azimuth_deg: f64, altitude_deg: f64) -> DVec3 {
    let az = azimuth_deg.to_radians();
    let alt = altitude_deg.to_radians();
    DVec3::new(az.sin() * alt.cos(), alt.sin(), -az.cos() * alt.cos())
}

/// Pointer aim for an azimuth/altitude pair.
pub fn pointer_orientation(azimuth_deg: f64, altitude_deg: f64) -> PointerAim {
    let direction = direction_vector(azimuth_deg, altitude_deg);
    PointerAim {
        azimuth_deg,
        altitude_deg,
        direction,
        target: (direction.normalize() * POINTER_TARGET_DISTANCE).as_vec3(),
    }
}

/// Camera pose for a manual compass bearing.
///
/// The camera orbits the origin on a level circle and always looks at it, so
/// the horizon never tilts while the pointer target stays fixed in the world.
pub fn camera_bearing_orbit(bearing_deg: f64) -> CameraPose {
    let bearing = bearing_deg.to_radians() as f32;
    let r = CAMERA_ORBIT_RADIUS;
    CameraPose {
        translation: Vec3::new(-r * bearing.sin(), 0.0, r * bearing.cos()),
        rotation: Quat::from_rotation_y(-bearing),
    }
}

/// Camera pose for a raw device orientation reading.
///
/// alpha maps to heading, beta to pitch and gamma to roll, applied in YXZ
/// order. Returns `None` when any of the three angles is missing; callers keep
/// the previous camera pose in that case.
pub fn camera_device_orientation(
    alpha: Option<f64>,
    beta: Option<f64>,
    gamma: Option<f64>,
) -> Option<CameraPose> {
    let (alpha, beta, gamma) = (alpha?, beta?, gamma?);
    let rotation = Quat::from_euler(
        EulerRot::YXZ,
        alpha.to_radians() as f32,
        beta.to_radians() as f32,
        -gamma.to_radians() as f32,
    );
    Some(CameraPose::framing_origin(rotation))
}

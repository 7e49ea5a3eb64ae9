use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll};
use bevy::prelude::*;
use bevy_egui::EguiContext;
use compass_core::angle_math::CAMERA_ORBIT_RADIUS;
use compass_core::OrientationSample;

use crate::events::{CurrentFrame, SessionLink};

/// How far one pixel of drag turns the simulated device, in degrees.
const DRAG_DEGREES_PER_PIXEL: f32 = 0.2;
const MAX_TILT_DEG: f32 = 88.0;

#[derive(Component)]
pub struct CompassCamera;

/// Device orientation simulated with the mouse, in degrees.
#[derive(Resource, Default)]
pub struct SimulatedOrientation {
    pub alpha: f32,
    pub beta: f32,
}

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SimulatedOrientation>()
            .add_systems(Startup, setup_camera)
            .add_systems(
                Update,
                (
                    orientation_drag_system,
                    camera_zoom_system,
                    update_camera_transform_system,
                ),
            );
    }
}

/// Camera starts level, south of the pointer and facing north.
pub fn setup_camera(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, 0.0, CAMERA_ORBIT_RADIUS).looking_at(Vec3::ZERO, Vec3::Y),
        CompassCamera,
    ));
}

/// Left drag stands in for turning (horizontal) and tilting (vertical) the
/// device, once orientation sampling has been enabled.
pub fn orientation_drag_system(
    motion: Res<AccumulatedMouseMotion>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut egui_query: Query<&mut EguiContext, With<Camera3d>>,
    mut orientation: ResMut<SimulatedOrientation>,
    link: Res<SessionLink>,
) {
    if !mouse_button.pressed(MouseButton::Left) || motion.delta == Vec2::ZERO {
        return;
    }
    if let Ok(mut egui_context) = egui_query.single_mut() {
        if egui_context.get_mut().wants_pointer_input() {
            return;
        }
    }
    if !link.orientation.is_active() {
        return;
    }

    // alpha grows counterclockwise, so dragging right turns it down
    orientation.alpha =
        (orientation.alpha - motion.delta.x * DRAG_DEGREES_PER_PIXEL).rem_euclid(360.0);
    orientation.beta = (orientation.beta - motion.delta.y * DRAG_DEGREES_PER_PIXEL)
        .clamp(-MAX_TILT_DEG, MAX_TILT_DEG);

    link.orientation.push(OrientationSample::new(
        orientation.alpha as f64,
        orientation.beta as f64,
        0.0,
    ));
}

/// Scroll to zoom the camera by modifying FOV
pub fn camera_zoom_system(
    scroll: Res<AccumulatedMouseScroll>,
    mut query: Query<&mut Projection, With<CompassCamera>>,
) {
    if scroll.delta.y == 0.0 {
        return;
    }
    for mut projection in query.iter_mut() {
        if let Projection::Perspective(ref mut perspective) = *projection {
            perspective.fov =
                (perspective.fov - scroll.delta.y * 0.05).clamp(0.1, std::f32::consts::PI - 0.01);
        }
    }
}

/// Apply the session's camera pose; keep the current one until there is one.
pub fn update_camera_transform_system(
    frame: Res<CurrentFrame>,
    mut query: Query<&mut Transform, With<CompassCamera>>,
) {
    let Some(pose) = frame.0.camera else {
        return;
    };
    let Ok(mut transform) = query.single_mut() else {
        return;
    };
    transform.translation = pose.translation;
    transform.rotation = pose.rotation;
}

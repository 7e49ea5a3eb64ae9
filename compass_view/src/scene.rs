use bevy::prelude::*;
use compass_core::angle_math::{direction_vector, POINTER_TARGET_DISTANCE};
use compass_core::Command;

use crate::colors;
use crate::events::{CompassEvent, CurrentFrame};

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, (spawn_light, spawn_horizon_markers, spawn_pointer))
            .add_systems(Update, aim_pointer_system);
    }
}

/// The 3D arrow. Its forward axis is -Z.
#[derive(Component)]
pub struct PointerArrow;

fn spawn_light(mut commands: Commands) {
    commands.spawn((
        DirectionalLight {
            illuminance: 10_000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform {
            translation: Vec3::new(0.0, 100.0, 0.0),
            rotation: Quat::from_rotation_x(-std::f32::consts::FRAC_PI_4),
            ..default()
        },
    ));
}

/// Small spheres on the horizon at the four cardinal points; north is red.
fn spawn_horizon_markers(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let marker = meshes.add(Sphere::new(0.06));
    for azimuth in [0.0, 90.0, 180.0, 270.0] {
        let color = if azimuth == 0.0 {
            colors::NORTH_MARKER_COLOR
        } else {
            colors::CARDINAL_MARKER_COLOR
        };
        let position = (direction_vector(azimuth, 0.0) * POINTER_TARGET_DISTANCE).as_vec3();
        commands.spawn((
            Mesh3d(marker.clone()),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: color,
                unlit: true,
                ..default()
            })),
            Transform::from_translation(position),
        ));
    }

    commands.spawn((
        Mesh3d(meshes.add(Torus::new(
            POINTER_TARGET_DISTANCE as f32 - 0.01,
            POINTER_TARGET_DISTANCE as f32 + 0.01,
        ))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: colors::HORIZON_RING_COLOR,
            unlit: true,
            ..default()
        })),
        Transform::default(),
    ));
}

/// Build the arrow from a shaft and a head, hidden until the first aim.
fn spawn_pointer(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut events: MessageWriter<CompassEvent>,
) {
    let material = materials.add(StandardMaterial {
        base_color: colors::ARROW_COLOR,
        perceptual_roughness: 0.6,
        ..default()
    });
    // Primitives are built along +Y; this lays them along -Z.
    let along_forward = Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2);

    commands
        .spawn((Transform::default(), Visibility::Hidden, PointerArrow))
        .with_children(|arrow| {
            arrow.spawn((
                Mesh3d(meshes.add(Cylinder::new(0.05, 1.2))),
                MeshMaterial3d(material.clone()),
                Transform::from_xyz(0.0, 0.0, -0.2).with_rotation(along_forward),
            ));
            arrow.spawn((
                Mesh3d(meshes.add(Cone::new(0.15, 0.4))),
                MeshMaterial3d(material.clone()),
                Transform::from_xyz(0.0, 0.0, -1.0).with_rotation(along_forward),
            ));
        });

    events.write(CompassEvent(Command::SceneLoaded(Ok(()))));
}

fn aim_pointer_system(
    frame: Res<CurrentFrame>,
    mut query: Query<(&mut Transform, &mut Visibility), With<PointerArrow>>,
) {
    let Some(aim) = frame.0.pointer else {
        return;
    };
    let Ok((mut transform, mut visibility)) = query.single_mut() else {
        return;
    };
    transform.look_at(aim.target, Vec3::Y);
    *visibility = Visibility::Visible;
}

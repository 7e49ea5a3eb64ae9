mod widgets;

use bevy::prelude::*;
use bevy_egui::{egui, EguiContext, EguiPrimaryContextPass};
use compass_core::{Axis, Command, SceneFrame, TargetId};
use widgets::{compass_button, section};

use crate::colors;
use crate::events::{CompassEvent, CurrentFrame};

const PANEL_WIDTH: f32 = 270.0;

/// Manual values as typed into the panel; sent to the session on every edit.
#[derive(Resource, Default)]
pub struct PanelInputs {
    pub bearing_deg: f64,
    pub azimuth_deg: f64,
    pub altitude_deg: f64,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub elevation_m: f64,
}

pub struct ControlPanelPlugin;

impl Plugin for ControlPanelPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PanelInputs>()
            .add_systems(EguiPrimaryContextPass, render_control_panel);
    }
}

fn render_control_panel(
    frame: Res<CurrentFrame>,
    mut inputs: ResMut<PanelInputs>,
    mut events: MessageWriter<CompassEvent>,
    mut camera_query: Query<&mut EguiContext, With<Camera3d>>,
) {
    let Ok(mut egui_context) = camera_query.single_mut() else {
        return;
    };
    let ctx = egui_context.get_mut();
    let frame = &frame.0;
    let mut commands = Vec::new();

    let panel_frame = egui::Frame::new()
        .fill(colors::egui::WINDOW_BACKGROUND)
        .inner_margin(egui::Margin::same(8));

    egui::SidePanel::left("control_panel")
        .resizable(false)
        .exact_width(PANEL_WIDTH)
        .frame(panel_frame)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                status_section(ui, frame, &mut commands);
                target_section(ui, frame, &mut commands);
                bearing_section(ui, frame, &mut inputs, &mut commands);
                direction_section(ui, frame, &mut inputs, &mut commands);
                position_section(ui, frame, &mut inputs, &mut commands);
            });
        });

    for command in commands {
        events.write(CompassEvent(command));
    }
}

fn status_section(ui: &mut egui::Ui, frame: &SceneFrame, commands: &mut Vec<Command>) {
    section(ui, "Status", |ui| {
        ui.label(
            egui::RichText::new(&frame.status)
                .size(12.0)
                .color(colors::egui::STATUS_TEXT),
        );
        ui.add_space(4.0);
        match &frame.position_readout {
            Some(readout) => ui.label(egui::RichText::new(readout).size(12.0)),
            None => ui.label(
                egui::RichText::new("Waiting for location...")
                    .size(12.0)
                    .color(colors::egui::WARNING_TEXT),
            ),
        };
        if !frame.orientation_enabled {
            ui.add_space(4.0);
            let width = ui.available_width();
            if compass_button(ui, "Enable Orientation", width).clicked() {
                commands.push(Command::EnableOrientation);
            }
        }
    });
}

fn target_section(ui: &mut egui::Ui, frame: &SceneFrame, commands: &mut Vec<Command>) {
    section(ui, "Target", |ui| {
        let mut selected = frame.target;
        egui::ComboBox::from_id_salt("target_selector")
            .selected_text(selected.label())
            .width(ui.available_width())
            .show_ui(ui, |ui| {
                for target in TargetId::ALL {
                    ui.selectable_value(&mut selected, target, target.label());
                }
            });
        if selected != frame.target {
            commands.push(Command::SelectTarget(selected));
        }
    });
}

/// Checkbox bound to one axis' override flag.
fn axis_toggle(
    ui: &mut egui::Ui,
    frame: &SceneFrame,
    axis: Axis,
    label: &str,
    commands: &mut Vec<Command>,
) -> bool {
    let mut manual = frame.modes.is_manual(axis);
    if ui.checkbox(&mut manual, label).changed() {
        commands.push(Command::SetAxisMode { axis, manual });
    }
    manual
}

fn bearing_section(
    ui: &mut egui::Ui,
    frame: &SceneFrame,
    inputs: &mut PanelInputs,
    commands: &mut Vec<Command>,
) {
    section(ui, "Bearing", |ui| {
        let manual = axis_toggle(ui, frame, Axis::Bearing, "Manual Bearing", commands);
        let slider = egui::Slider::new(&mut inputs.bearing_deg, 0.0..=360.0).suffix("°");
        if ui.add_enabled(manual, slider).changed() {
            commands.push(Command::SetManualBearing(inputs.bearing_deg));
        }
    });
}

fn direction_section(
    ui: &mut egui::Ui,
    frame: &SceneFrame,
    inputs: &mut PanelInputs,
    commands: &mut Vec<Command>,
) {
    section(ui, "Direction", |ui| {
        let manual = axis_toggle(ui, frame, Axis::Direction, "Manual Direction", commands);
        let mut changed = false;
        ui.add_enabled_ui(manual, |ui| {
            ui.horizontal(|ui| {
                ui.label("Az");
                changed |= ui
                    .add(
                        egui::DragValue::new(&mut inputs.azimuth_deg)
                            .range(0.0..=360.0)
                            .speed(0.5)
                            .suffix("°"),
                    )
                    .changed();
                ui.label("Alt");
                changed |= ui
                    .add(
                        egui::DragValue::new(&mut inputs.altitude_deg)
                            .range(-90.0..=90.0)
                            .speed(0.5)
                            .suffix("°"),
                    )
                    .changed();
            });
        });
        if changed {
            commands.push(Command::SetManualDirection {
                azimuth_deg: inputs.azimuth_deg,
                altitude_deg: inputs.altitude_deg,
            });
        }
    });
}

fn position_section(
    ui: &mut egui::Ui,
    frame: &SceneFrame,
    inputs: &mut PanelInputs,
    commands: &mut Vec<Command>,
) {
    section(ui, "Position", |ui| {
        let manual = axis_toggle(ui, frame, Axis::Position, "Manual Position", commands);

        let mut elevation_only = frame.manual.position.elevation_only;
        if ui
            .add_enabled(manual, egui::Checkbox::new(&mut elevation_only, "Elevation Only"))
            .changed()
        {
            commands.push(Command::SetElevationOnly(elevation_only));
        }

        let mut changed = false;
        egui::Grid::new("manual_position")
            .num_columns(2)
            .spacing([8.0, 4.0])
            .show(ui, |ui| {
                ui.label("Lat");
                changed |= ui
                    .add_enabled(
                        manual && !elevation_only,
                        egui::DragValue::new(&mut inputs.latitude_deg)
                            .range(-90.0..=90.0)
                            .speed(0.001)
                            .max_decimals(6),
                    )
                    .changed();
                ui.end_row();

                ui.label("Lon");
                changed |= ui
                    .add_enabled(
                        manual && !elevation_only,
                        egui::DragValue::new(&mut inputs.longitude_deg)
                            .range(-180.0..=180.0)
                            .speed(0.001)
                            .max_decimals(6),
                    )
                    .changed();
                ui.end_row();

                ui.label("Elev");
                changed |= ui
                    .add_enabled(
                        manual,
                        egui::DragValue::new(&mut inputs.elevation_m)
                            .speed(1.0)
                            .suffix(" m"),
                    )
                    .changed();
                ui.end_row();
            });
        if changed {
            commands.push(Command::SetManualPosition {
                latitude_deg: inputs.latitude_deg,
                longitude_deg: inputs.longitude_deg,
                elevation_m: inputs.elevation_m,
            });
        }
    });
}

use bevy::prelude::*;

/// Color palette for the compass scene and control panel

// RGB values for accent yellow (used by both Bevy and egui)
const ACCENT_YELLOW_R: f32 = 0.918;
const ACCENT_YELLOW_G: f32 = 0.878;
const ACCENT_YELLOW_B: f32 = 0.349;

// Scene colors
pub const SKY_BACKGROUND: Color = Color::srgb(0.0, 0.0, 3.0 / 255.0);
pub const ARROW_COLOR: Color = Color::srgb(ACCENT_YELLOW_R, ACCENT_YELLOW_G, ACCENT_YELLOW_B);
pub const HORIZON_RING_COLOR: Color = Color::srgb(0.25, 0.25, 0.30);
pub const NORTH_MARKER_COLOR: Color = Color::srgb(0.969, 0.431, 0.431);
pub const CARDINAL_MARKER_COLOR: Color = Color::srgb(0.78, 0.78, 0.82);

// egui Color32 constants (for use in UI code)
pub mod egui {
    use bevy_egui::egui;

    /// Accent yellow color for egui (matches ACCENT_YELLOW)
    pub const ACCENT_YELLOW: egui::Color32 = egui::Color32::from_rgb(
        (super::ACCENT_YELLOW_R * 255.0) as u8,
        (super::ACCENT_YELLOW_G * 255.0) as u8,
        (super::ACCENT_YELLOW_B * 255.0) as u8,
    );
    pub const WINDOW_BACKGROUND: egui::Color32 = egui::Color32::from_rgb(31, 31, 36);
    pub const WINDOW_TITLE_COLOR: egui::Color32 = egui::Color32::from_rgb(224, 224, 230);
    pub const STATUS_TEXT: egui::Color32 = egui::Color32::from_rgb(110, 247, 110);
    pub const WARNING_TEXT: egui::Color32 = egui::Color32::from_rgb(247, 210, 110);
}

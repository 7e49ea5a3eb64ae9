use bevy_egui::egui;

use crate::colors;

/// Flat panel button: grey fill with a 1pt border that turns accent yellow,
/// together with the label, while hovered.
pub fn compass_button(ui: &mut egui::Ui, text: &str, width: f32) -> egui::Response {
    let (rect, response) = ui.allocate_exact_size(egui::vec2(width, 24.0), egui::Sense::click());

    let accent = if response.hovered() {
        colors::egui::ACCENT_YELLOW
    } else {
        egui::Color32::from_rgb(179, 179, 179)
    };
    let text_color = if response.hovered() {
        colors::egui::ACCENT_YELLOW
    } else {
        colors::egui::WINDOW_TITLE_COLOR
    };

    let painter = ui.painter();
    painter.rect_filled(rect, 4.0, accent);
    painter.rect_filled(rect.shrink(1.0), 3.5, egui::Color32::from_rgb(77, 77, 77));
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        text,
        egui::FontId::proportional(12.0),
        text_color,
    );

    response.on_hover_cursor(egui::CursorIcon::PointingHand)
}

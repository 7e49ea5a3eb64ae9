use bevy_egui::egui;

use crate::colors;

/// A titled panel section: rounded container with a soft drop shadow and
/// 8pt inner padding, stretched to the panel width.
pub fn section<R>(
    ui: &mut egui::Ui,
    title: &str,
    add_contents: impl FnOnce(&mut egui::Ui) -> R,
) -> R {
    let frame = egui::Frame::new()
        .fill(egui::Color32::from_rgb(64, 64, 64))
        .corner_radius(8.0)
        .inner_margin(egui::Margin::same(8))
        // 4pt above and below so stacked sections sit 8pt apart
        .outer_margin(egui::Margin {
            left: 0,
            right: 0,
            top: 4,
            bottom: 4,
        })
        .shadow(egui::Shadow {
            offset: [0i8, 2i8],
            blur: 4u8,
            spread: 0u8,
            color: egui::Color32::from_rgba_unmultiplied(0, 0, 0, 60),
        });

    frame
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.label(
                egui::RichText::new(title)
                    .size(14.0)
                    .color(colors::egui::WINDOW_TITLE_COLOR),
            );
            ui.add_space(4.0);
            add_contents(ui)
        })
        .inner
}

use crate::interaction::popup::PopupContent;
use egui::{Align2, Color32, FontId, Id, Order, Pos2, RichText, Stroke};

#[derive(Debug, Clone)]
pub struct PopupStyle {
    pub background_color: Color32,
    pub border_color: Color32,
    pub border_width: f32,
    pub rounding: f32,
    pub padding: f32,
    pub title_font: FontId,
    pub body_font: FontId,
    pub text_color: Color32,
    pub max_width: f32,
}

impl Default for PopupStyle {
    /// Translucent "glass" card
    fn default() -> Self {
        Self {
            background_color: Color32::from_rgba_unmultiplied(255, 255, 255, 200),
            border_color: Color32::from_rgba_unmultiplied(255, 255, 255, 120),
            border_width: 1.0,
            rounding: 10.0,
            padding: 8.0,
            title_font: FontId::proportional(14.0),
            body_font: FontId::proportional(12.0),
            text_color: Color32::from_gray(20),
            max_width: 260.0,
        }
    }
}

/// Draws the popup card hanging down from `anchor`, its top edge centred on it.
///
/// Returns true when the close control was clicked; the control gives up
/// keyboard focus right away.
pub fn show_popup(
    ctx: &egui::Context,
    id: Id,
    anchor: Pos2,
    content: &PopupContent,
    style: &PopupStyle,
) -> bool {
    let mut closed = false;

    egui::Area::new(id)
        .order(Order::Foreground)
        .fixed_pos(anchor)
        .pivot(Align2::CENTER_TOP)
        .show(ctx, |ui| {
            egui::Frame::none()
                .fill(style.background_color)
                .stroke(Stroke::new(style.border_width, style.border_color))
                .rounding(style.rounding)
                .inner_margin(style.padding)
                .show(ui, |ui| {
                    ui.set_max_width(style.max_width);
                    ui.horizontal(|ui| {
                        ui.label(
                            RichText::new(&content.title)
                                .font(style.title_font.clone())
                                .color(style.text_color)
                                .strong(),
                        );
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::TOP), |ui| {
                            let closer = ui.small_button("✖");
                            if closer.clicked() {
                                closer.surrender_focus();
                                closed = true;
                            }
                        });
                    });
                    for line in &content.lines {
                        let mut text = RichText::new(format!("{} {}", line.prefix, line.text))
                            .font(style.body_font.clone())
                            .color(style.text_color);
                        if line.emphasis {
                            text = text.strong();
                        }
                        ui.label(text);
                    }
                });
        });

    closed
}

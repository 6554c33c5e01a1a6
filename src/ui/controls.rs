use crate::{
    core::map::Map,
    interaction::{InteractionHandler, LayerControl},
};
use egui::Ui;

/// Side panel with one checkbox per toggle and the hover info label
#[derive(Debug, Clone, Default)]
pub struct LayerPanel {
    pub heading: String,
}

impl LayerPanel {
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
        }
    }

    pub fn show(
        &self,
        ui: &mut Ui,
        map: &mut Map,
        control: &mut LayerControl,
        interaction: &mut InteractionHandler,
    ) {
        if !self.heading.is_empty() {
            ui.heading(&self.heading);
            ui.separator();
        }

        let toggles = control.toggles().to_vec();
        for toggle in toggles {
            let mut checked = toggle.checked;
            if ui.checkbox(&mut checked, &toggle.descriptor.label).changed() {
                let control_id = &toggle.descriptor.control;
                if let Err(e) = interaction.toggle_layer(map, control, control_id, checked) {
                    log::warn!("toggle '{}' failed: {}", control_id, e);
                }
            }
        }

        ui.separator();
        ui.horizontal(|ui| {
            ui.label("Info:");
            ui.strong(interaction.info_label());
        });
    }
}

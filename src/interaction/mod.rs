//! Pointer interaction on top of a [`Map`]: hover highlight, click popup and
//! the checkbox toggles bound to layer visibility.

pub mod hover;
pub mod popup;

use crate::{
    core::{config::MapConfig, config::ToggleDescriptor, map::Map},
    input::{InputEvent, MouseButton},
    Result,
};
use hover::{HoverHighlighter, InfoProfile};
use popup::{ClickPopup, PopupProfile};

/// Routes UI input to the hover highlighter, the click popup or navigation
#[derive(Debug, Clone, Default)]
pub struct InteractionHandler {
    pub hover: HoverHighlighter,
    pub popup: ClickPopup,
}

impl InteractionHandler {
    pub fn new(popup: PopupProfile, info: InfoProfile) -> Self {
        Self {
            hover: HoverHighlighter::new(info),
            popup: ClickPopup::new(popup),
        }
    }

    pub fn from_config(config: &MapConfig) -> Self {
        Self::new(config.popup.clone(), config.info.clone())
    }

    pub fn handle(&mut self, map: &mut Map, event: &InputEvent) -> Result<()> {
        match event {
            InputEvent::PointerMove { position, dragging } => {
                let dragging = *dragging || map.is_dragging();
                self.hover.on_pointer_move(map, *position, dragging);
            }
            InputEvent::Click {
                position,
                button: MouseButton::Left,
            } => {
                self.popup.on_click(map, *position);
            }
            _ => {}
        }
        map.handle_input(event)
    }

    /// Applies a checkbox change; a highlight left on a hidden layer is dropped
    pub fn toggle_layer(
        &mut self,
        map: &mut Map,
        control: &mut LayerControl,
        control_id: &str,
        checked: bool,
    ) -> Result<()> {
        control.on_change(map, control_id, checked)?;
        let hidden = self
            .hover
            .highlighted()
            .is_some_and(|r| map.is_layer_visible(&r.layer_id) == Some(false));
        if hidden {
            self.hover.clear(map);
        }
        Ok(())
    }

    pub fn info_label(&self) -> &str {
        self.hover.label()
    }
}

/// One checkbox and its current state
#[derive(Debug, Clone, PartialEq)]
pub struct Toggle {
    pub descriptor: ToggleDescriptor,
    pub checked: bool,
}

/// Checkboxes bound 1:1 to layer visibility
#[derive(Debug, Clone, Default)]
pub struct LayerControl {
    toggles: Vec<Toggle>,
}

impl LayerControl {
    /// Fails if any toggle names a layer the map does not have
    pub fn bind(map: &Map, descriptors: &[ToggleDescriptor]) -> Result<Self> {
        let toggles = descriptors
            .iter()
            .map(|descriptor| {
                let checked = map.is_layer_visible(&descriptor.layer).ok_or_else(|| {
                    crate::Error::Layer(format!(
                        "toggle '{}' is bound to missing layer '{}'",
                        descriptor.control, descriptor.layer
                    ))
                })?;
                Ok(Toggle {
                    descriptor: descriptor.clone(),
                    checked,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { toggles })
    }

    /// Mirrors the checkbox state onto the bound layer
    pub fn on_change(&mut self, map: &mut Map, control_id: &str, checked: bool) -> Result<()> {
        let toggle = self
            .toggles
            .iter_mut()
            .find(|t| t.descriptor.control == control_id)
            .ok_or_else(|| crate::Error::Layer(format!("unknown toggle '{}'", control_id)))?;

        map.set_layer_visible(&toggle.descriptor.layer, checked)?;
        toggle.checked = checked;
        Ok(())
    }

    pub fn toggles(&self) -> &[Toggle] {
        &self.toggles
    }

    pub fn is_checked(&self, control_id: &str) -> Option<bool> {
        self.toggles
            .iter()
            .find(|t| t.descriptor.control == control_id)
            .map(|t| t.checked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::{LatLng, Point};
    use crate::data::feature::{Feature, Geometry};
    use crate::layers::vector::VectorLayer;

    fn map() -> Map {
        let mut map = Map::new(LatLng::new(0.0, 0.0), 8.0, Point::new(800.0, 600.0));
        for id in ["riau", "rth", "banjir"] {
            map.add_layer(Box::new(VectorLayer::new(id.into(), id.into())))
                .unwrap();
        }
        map
    }

    fn toggles() -> Vec<ToggleDescriptor> {
        vec![
            ToggleDescriptor::new("polygon", "riau", "Polygon"),
            ToggleDescriptor::new("rth", "rth", "RTH"),
            ToggleDescriptor::new("point", "banjir", "Banjir"),
        ]
    }

    #[test]
    fn test_toggles_are_independent() {
        let mut map = map();
        let mut control = LayerControl::bind(&map, &toggles()).unwrap();

        control.on_change(&mut map, "rth", false).unwrap();
        assert_eq!(map.is_layer_visible("rth"), Some(false));
        assert_eq!(map.is_layer_visible("riau"), Some(true));
        assert_eq!(map.is_layer_visible("banjir"), Some(true));
        assert_eq!(control.is_checked("rth"), Some(false));

        control.on_change(&mut map, "rth", true).unwrap();
        assert_eq!(map.is_layer_visible("rth"), Some(true));
    }

    #[test]
    fn test_hiding_layer_drops_its_highlight() {
        let mut map = map();
        let center = Feature::new("taman", Geometry::Point(LatLng::new(0.0, 0.0)))
            .with_attribute("nama", "Taman Kota");
        if let Some(layer) = map.vector_layer_mut("rth") {
            layer.add_feature(center);
        }
        let mut control = LayerControl::bind(&map, &toggles()).unwrap();
        let mut interaction = InteractionHandler::default();
        let pixel = Point::new(400.0, 300.0);

        interaction.hover.on_pointer_move(&mut map, pixel, false);
        assert_eq!(interaction.info_label(), "Taman Kota");

        // another layer's toggle leaves the highlight alone
        interaction
            .toggle_layer(&mut map, &mut control, "point", false)
            .unwrap();
        assert!(interaction.hover.highlighted().is_some());

        interaction
            .toggle_layer(&mut map, &mut control, "rth", false)
            .unwrap();
        assert!(interaction.hover.highlighted().is_none());
        assert_eq!(interaction.info_label(), "-");
        assert!(map.highlight_layer().unwrap().is_empty());
        assert_eq!(control.is_checked("rth"), Some(false));
    }

    #[test]
    fn test_bind_to_missing_layer_fails() {
        let map = map();
        let mut descriptors = toggles();
        descriptors.push(ToggleDescriptor::new("kebun", "sawit", "Sawit"));
        assert!(LayerControl::bind(&map, &descriptors).is_err());
    }

    #[test]
    fn test_unknown_control() {
        let mut map = map();
        let mut control = LayerControl::bind(&map, &toggles()).unwrap();
        assert!(control.on_change(&mut map, "kebun", false).is_err());
    }
}

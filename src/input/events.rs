use crate::core::geo::{LatLng, Point};
use crate::data::feature::FeatureRef;
use serde::{Deserialize, Serialize};

/// Input events in map container pixels, as produced by the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    /// Single click/tap
    Click {
        position: Point,
        button: MouseButton,
    },
    DoubleClick { position: Point },
    /// Pointer movement; `dragging` is set while a drag gesture is in progress
    PointerMove { position: Point, dragging: bool },
    DragStart { position: Point },
    /// Drag in progress, `delta` since the previous drag event
    Drag { delta: Point },
    DragEnd,
    /// Scroll wheel, positive `delta` zooms in
    Scroll { delta: f64, position: Point },
    /// Viewport/window resize
    Resize { size: Point },
}

/// Mouse button types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Notifications emitted by the map
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// Map view has changed (center or zoom)
    ViewChanged { center: LatLng, zoom: f64 },
    Click { lat_lng: LatLng, pixel: Point },
    MoveStart { center: LatLng },
    MoveEnd { center: LatLng },
    LayerAdd { layer_id: String },
    LayerRemove { layer_id: String },
    LayerVisibility { layer_id: String, visible: bool },
    /// A GeoJSON source finished loading; failures report zero features
    SourceLoaded {
        layer_id: String,
        feature_count: usize,
        failed: bool,
    },
    /// The highlighted feature changed
    HighlightChanged { feature: Option<FeatureRef> },
}

impl MapEvent {
    /// Name used when registering listeners
    pub fn event_type(&self) -> &'static str {
        match self {
            MapEvent::ViewChanged { .. } => "viewchanged",
            MapEvent::Click { .. } => "click",
            MapEvent::MoveStart { .. } => "movestart",
            MapEvent::MoveEnd { .. } => "moveend",
            MapEvent::LayerAdd { .. } => "layeradd",
            MapEvent::LayerRemove { .. } => "layerremove",
            MapEvent::LayerVisibility { .. } => "layervisibility",
            MapEvent::SourceLoaded { .. } => "sourceloaded",
            MapEvent::HighlightChanged { .. } => "highlightchanged",
        }
    }
}

impl InputEvent {
    /// Gets the primary position associated with this event, if any
    pub fn position(&self) -> Option<Point> {
        match self {
            InputEvent::Click { position, .. }
            | InputEvent::DoubleClick { position }
            | InputEvent::PointerMove { position, .. }
            | InputEvent::DragStart { position }
            | InputEvent::Scroll { position, .. } => Some(*position),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_positions() {
        let p = Point::new(10.0, 20.0);
        assert_eq!(
            InputEvent::PointerMove { position: p, dragging: true }.position(),
            Some(p)
        );
        assert_eq!(InputEvent::DragEnd.position(), None);
        assert_eq!(
            MapEvent::LayerVisibility { layer_id: "rth".into(), visible: false }.event_type(),
            "layervisibility"
        );
    }
}

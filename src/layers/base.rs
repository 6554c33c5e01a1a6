use crate::{
    core::{geo::LatLngBounds, viewport::Viewport},
    rendering::context::RenderContext,
    Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerType {
    Tile,
    Vector,
}

impl std::fmt::Display for LayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerType::Tile => write!(f, "tile"),
            LayerType::Vector => write!(f, "vector"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayerProperties {
    pub id: String,
    pub name: String,
    pub layer_type: LayerType,
    pub z_index: i32,
    pub opacity: f32,
    pub visible: bool,
    /// Whether pointer queries (hover, click) can return this layer's features
    pub interactive: bool,
}

impl LayerProperties {
    pub fn new(id: String, name: String, layer_type: LayerType) -> Self {
        Self {
            id,
            name,
            layer_type,
            z_index: 0,
            opacity: 1.0,
            visible: true,
            interactive: layer_type == LayerType::Vector,
        }
    }
}

/// Common interface of everything the map draws
pub trait LayerTrait: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn layer_type(&self) -> LayerType;

    fn is_visible(&self) -> bool;

    fn set_visible(&mut self, visible: bool);

    /// Get layer opacity (0.0 to 1.0)
    fn opacity(&self) -> f32;

    fn set_opacity(&mut self, opacity: f32);

    /// Layers with a lower z-index are drawn first; equal z-indices keep
    /// insertion order
    fn z_index(&self) -> i32;

    fn set_z_index(&mut self, z_index: i32);

    fn is_interactive(&self) -> bool;

    /// Per-frame housekeeping before rendering, e.g. applying finished downloads
    fn update(&mut self, _viewport: &Viewport) -> Result<()> {
        Ok(())
    }

    fn render(&mut self, context: &mut RenderContext, viewport: &Viewport) -> Result<()>;

    /// Get layer bounds if applicable
    fn bounds(&self) -> Option<LatLngBounds> {
        None
    }

    /// Layers without bounds are assumed to cover the whole world
    fn intersects_bounds(&self, bounds: &LatLngBounds) -> bool {
        self.bounds()
            .map_or(true, |layer_bounds| layer_bounds.intersects(bounds))
    }

    /// Dynamic casting support
    fn as_any(&self) -> &dyn std::any::Any;
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_properties() {
        let props = LayerProperties::new(
            "riau".to_string(),
            "Polygon Riau".to_string(),
            LayerType::Vector,
        );

        assert_eq!(props.id, "riau");
        assert_eq!(props.name, "Polygon Riau");
        assert_eq!(props.z_index, 0);
        assert_eq!(props.opacity, 1.0);
        assert!(props.visible);
        assert!(props.interactive);

        let tiles = LayerProperties::new("osm".to_string(), "OSM".to_string(), LayerType::Tile);
        assert!(!tiles.interactive);
    }

    #[test]
    fn test_layer_type_display() {
        assert_eq!(LayerType::Tile.to_string(), "tile");
        assert_eq!(LayerType::Vector.to_string(), "vector");
    }
}

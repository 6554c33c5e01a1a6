use crate::{core::viewport::Viewport, layers::base::LayerTrait, Result};

use crate::rendering::context::RenderContext;

use crate::prelude::HashMap;

/// Manages layers for the map, handling ordering and rendering
pub struct LayerManager {
    /// All layers indexed by ID
    layers: HashMap<String, Box<dyn LayerTrait>>,
    /// Layer IDs bottom to top: by z-index, then insertion order
    render_order: Vec<String>,
}

impl LayerManager {
    pub fn new() -> Self {
        Self {
            layers: HashMap::default(),
            render_order: Vec::new(),
        }
    }

    /// Adds a layer above every existing layer with the same or lower z-index
    pub fn add_layer(&mut self, layer: Box<dyn LayerTrait>) -> Result<()> {
        let layer_id = layer.id().to_string();
        if self.layers.contains_key(&layer_id) {
            return Err(crate::Error::Layer(format!("duplicate layer id '{}'", layer_id)).into());
        }
        let z_index = layer.z_index();

        // Insert in sorted order by z-index
        let insert_pos = self
            .render_order
            .iter()
            .position(|id| {
                self.layers
                    .get(id)
                    .map(|l| l.z_index() > z_index)
                    .unwrap_or(false)
            })
            .unwrap_or(self.render_order.len());

        self.layers.insert(layer_id.clone(), layer);
        self.render_order.insert(insert_pos, layer_id);
        Ok(())
    }

    pub fn remove_layer(&mut self, layer_id: &str) -> Option<Box<dyn LayerTrait>> {
        self.render_order.retain(|id| id != layer_id);
        self.layers.remove(layer_id)
    }

    pub fn get_layer(&self, layer_id: &str) -> Option<&dyn LayerTrait> {
        self.layers.get(layer_id).map(|l| l.as_ref())
    }

    pub fn get_layer_mut(&mut self, layer_id: &str) -> Option<&mut (dyn LayerTrait + 'static)> {
        self.layers.get_mut(layer_id).map(|l| l.as_mut())
    }

    /// Applies a function to a specific layer mutably
    pub fn with_layer_mut<F, R>(&mut self, layer_id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut dyn LayerTrait) -> R,
    {
        self.layers.get_mut(layer_id).map(|layer| f(layer.as_mut()))
    }

    /// Layer IDs in render order (bottom first)
    pub fn layer_ids(&self) -> &[String] {
        &self.render_order
    }

    /// Gets all layers in render order
    pub fn layers(&self) -> Vec<&dyn LayerTrait> {
        self.render_order
            .iter()
            .filter_map(|id| self.layers.get(id).map(|l| l.as_ref()))
            .collect()
    }

    /// Updates, then renders, every visible layer bottom to top
    pub fn render(&mut self, context: &mut RenderContext, viewport: &Viewport) -> Result<()> {
        let viewport_bounds = viewport.bounds();

        for layer_id in &self.render_order {
            if let Some(layer) = self.layers.get_mut(layer_id) {
                if !layer.is_visible() {
                    continue;
                }
                layer.update(viewport)?;
                if layer.intersects_bounds(&viewport_bounds) {
                    layer.render(context, viewport)?;
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl Default for LayerManager {
    fn default() -> Self {
        Self::new()
    }
}

//! Map builder for fluent API configuration
//!
//! [`MapBuilder`] assembles a [`Map`]: an optional raster base layer at the
//! bottom, vector layers stacked in the order they are added, and the
//! highlight overlay above everything. [`MapBuilder::from_config`] does the
//! same from a [`MapConfig`].

use crate::{
    core::{
        config::{LayerDescriptor, MapConfig},
        constants::{
            DEFAULT_HIT_TOLERANCE_PX, DEFAULT_POINT_HIT_RADIUS_PX, MAX_ZOOM, MIN_ZOOM,
            RIAU_CENTER_LON_LAT, RIAU_ZOOM,
        },
        geo::{LatLng, Point},
        map::Map,
    },
    layers::{
        base::LayerTrait,
        style::{LayerStyle, Style},
        tile::{TileLayer, TileLayerOptions},
        vector::VectorLayer,
    },
    Result,
};
use std::path::PathBuf;

/// Id of the raster base layer
pub const BASE_LAYER_ID: &str = "osm";

/// Builder for creating and configuring Map instances
pub struct MapBuilder {
    center: LatLng,
    zoom: f64,
    size: Point,
    min_zoom: f64,
    max_zoom: f64,
    base_layer: Option<TileLayerOptions>,
    vector_layers: Vec<LayerDescriptor>,
    highlight_style: Style,
    data_root: Option<PathBuf>,
    hit_tolerance: f64,
    point_hit_radius: f64,
    offline: bool,
}

impl MapBuilder {
    /// Riau view, no layers yet
    pub fn new() -> Self {
        Self {
            center: LatLng::from_lon_lat(RIAU_CENTER_LON_LAT),
            zoom: RIAU_ZOOM,
            size: Point::new(800.0, 600.0),
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            base_layer: None,
            vector_layers: Vec::new(),
            highlight_style: LayerStyle::highlight(),
            data_root: None,
            hit_tolerance: DEFAULT_HIT_TOLERANCE_PX,
            point_hit_radius: DEFAULT_POINT_HIT_RADIUS_PX,
            offline: false,
        }
    }

    /// Builder preloaded with everything a [`MapConfig`] describes
    pub fn from_config_builder(config: &MapConfig) -> Self {
        let mut builder = Self::new()
            .with_center_and_zoom(config.view.center_lat_lng(), config.view.zoom)
            .with_zoom_limits(config.view.min_zoom, config.view.max_zoom)
            .with_base_layer(config.base_layer.clone())
            .with_highlight_style(config.highlight_style.clone())
            .with_hit_tolerance(config.hit_tolerance_px, config.point_hit_radius_px);
        if let Some(root) = &config.data_root {
            builder = builder.with_data_root(root.clone());
        }
        for layer in &config.layers {
            builder = builder.with_vector_layer(layer.clone());
        }
        builder
    }

    /// Validates `config` and builds its map
    pub fn from_config(config: &MapConfig) -> Result<Map> {
        config.validate()?;
        Self::from_config_builder(config).build()
    }

    pub fn with_center_and_zoom(mut self, center: LatLng, zoom: f64) -> Self {
        self.center = center;
        self.zoom = zoom;
        self
    }

    pub fn with_size(mut self, size: Point) -> Self {
        self.size = size;
        self
    }

    pub fn with_zoom_limits(mut self, min_zoom: f64, max_zoom: f64) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_base_layer(mut self, options: TileLayerOptions) -> Self {
        self.base_layer = Some(options);
        self
    }

    /// Vector layers stack in call order, later ones on top
    pub fn with_vector_layer(mut self, layer: LayerDescriptor) -> Self {
        self.vector_layers.push(layer);
        self
    }

    pub fn with_highlight_style(mut self, style: Style) -> Self {
        self.highlight_style = style;
        self
    }

    /// Directory relative layer URLs resolve against
    pub fn with_data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.data_root = Some(root.into());
        self
    }

    pub fn with_hit_tolerance(mut self, line_tolerance: f64, point_radius: f64) -> Self {
        self.hit_tolerance = line_tolerance;
        self.point_hit_radius = point_radius;
        self
    }

    /// The base layer never downloads tiles
    pub fn without_network(mut self) -> Self {
        self.offline = true;
        self
    }

    /// Build the map with the configured options
    pub fn build(self) -> Result<Map> {
        if !self.center.is_valid() {
            return Err(crate::Error::InvalidCoordinates(format!(
                "invalid center {:?}",
                self.center
            ))
            .into());
        }

        let mut map =
            Map::with_highlight_style(self.center, self.zoom, self.size, self.highlight_style);
        map.viewport_mut().set_zoom_limits(self.min_zoom, self.max_zoom);
        map.viewport_mut().set_zoom(self.zoom);
        map.set_hit_tolerance(self.hit_tolerance, self.point_hit_radius);
        if let Some(root) = self.data_root {
            map.set_data_root(root);
        }

        if let Some(options) = self.base_layer {
            let mut tiles = TileLayer::with_options(
                BASE_LAYER_ID.to_string(),
                "OpenStreetMap".to_string(),
                options,
            );
            if self.offline {
                tiles = tiles.without_network();
            }
            map.add_layer(Box::new(tiles))?;
        }

        for descriptor in self.vector_layers {
            let mut layer = VectorLayer::new(descriptor.id, descriptor.name)
                .with_url(descriptor.url)
                .with_style(descriptor.style);
            layer.set_visible(descriptor.visible);
            map.add_layer(Box::new(layer))?;
        }

        log::info!("map assembled with layers {:?}", map.list_layers());
        Ok(map)
    }
}

impl Default for MapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

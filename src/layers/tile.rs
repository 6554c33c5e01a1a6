use crate::{
    core::{
        geo::{LatLng, TileCoord},
        viewport::Viewport,
    },
    layers::base::{LayerProperties, LayerTrait, LayerType},
    prelude::HashSet,
    rendering::context::RenderContext,
    tiles::{
        cache::TileCache,
        loader::TileLoader,
        source::{TemplateSource, TileSource},
    },
    Result,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration for a raster tile layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayerOptions {
    /// URL template, e.g. `https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png`
    pub url_template: String,
    #[serde(default)]
    pub subdomains: Vec<String>,
    #[serde(default)]
    pub attribution: String,
    #[serde(default)]
    pub min_zoom: u8,
    #[serde(default = "TileLayerOptions::default_max_zoom")]
    pub max_zoom: u8,
}

impl TileLayerOptions {
    fn default_max_zoom() -> u8 {
        19
    }
}

impl Default for TileLayerOptions {
    fn default() -> Self {
        Self {
            url_template: crate::tiles::source::OSM_TEMPLATE.to_string(),
            subdomains: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            attribution: "© OpenStreetMap contributors".to_string(),
            min_zoom: 0,
            max_zoom: Self::default_max_zoom(),
        }
    }
}

/// A tile-based layer that displays raster tiles from a tile server
pub struct TileLayer {
    properties: LayerProperties,
    options: TileLayerOptions,
    tile_source: Box<dyn TileSource>,
    /// `None` for offline layers that only draw what is inserted by hand
    tile_loader: Option<TileLoader>,
    cache: TileCache,
    /// Requested but not yet delivered
    loading_tiles: HashSet<TileCoord>,
    /// Gave up after the loader's retries; not requested again
    failed_tiles: HashSet<TileCoord>,
}

impl TileLayer {
    /// OpenStreetMap tiles
    pub fn new(id: String, name: String) -> Self {
        Self::with_options(id, name, TileLayerOptions::default())
    }

    pub fn with_options(id: String, name: String, options: TileLayerOptions) -> Self {
        let mut properties = LayerProperties::new(id, name, LayerType::Tile);
        properties.z_index = -100;
        let tile_source: Box<dyn TileSource> = Box::new(TemplateSource::new(
            options.url_template.clone(),
            options.subdomains.clone(),
        ));

        Self {
            properties,
            options,
            tile_source,
            tile_loader: Some(TileLoader::new()),
            cache: TileCache::default(),
            loading_tiles: HashSet::default(),
            failed_tiles: HashSet::default(),
        }
    }

    /// Never touches the network; tiles appear only through [`TileLayer::insert_tile`]
    pub fn without_network(mut self) -> Self {
        self.tile_loader = None;
        self
    }

    pub fn options(&self) -> &TileLayerOptions {
        &self.options
    }

    pub fn tile_source(&self) -> &dyn TileSource {
        self.tile_source.as_ref()
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn insert_tile(&mut self, coord: TileCoord, data: Vec<u8>) {
        self.loading_tiles.remove(&coord);
        self.cache.insert(coord, data);
    }

    /// Number of tiles requested and not yet delivered or given up on
    pub fn pending_tiles(&self) -> usize {
        self.loading_tiles.len()
    }

    fn tile_zoom(&self, viewport: &Viewport) -> u8 {
        (viewport.zoom.floor() as u8).clamp(self.options.min_zoom, self.options.max_zoom)
    }

    /// Tiles covering the viewport plus a one-tile margin
    pub fn visible_tiles(&self, viewport: &Viewport) -> Vec<TileCoord> {
        let zoom = self.tile_zoom(viewport);
        let tiles_per_axis = 1u32 << zoom;

        let bounds = viewport.bounds();

        // lat/lng → fractional tile indices
        let ll_to_tile = |lat: f64, lng: f64| -> (f64, f64) {
            let lat_rad = LatLng::clamp_lat(lat).to_radians();
            let x = (lng + 180.0) / 360.0 * tiles_per_axis as f64;
            let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI)
                / 2.0
                * tiles_per_axis as f64;
            (x, y)
        };

        let (min_x_f, min_y_f) = ll_to_tile(bounds.north_east.lat, bounds.south_west.lng);
        let (max_x_f, max_y_f) = ll_to_tile(bounds.south_west.lat, bounds.north_east.lng);

        let margin: i64 = 1;
        let last = tiles_per_axis as i64 - 1;
        let min_x = (min_x_f.floor() as i64 - margin).clamp(0, last) as u32;
        let max_x = (max_x_f.ceil() as i64 + margin).clamp(0, last) as u32;
        let min_y = (min_y_f.floor() as i64 - margin).clamp(0, last) as u32;
        let max_y = (max_y_f.ceil() as i64 + margin).clamp(0, last) as u32;

        let mut tiles = Vec::new();
        for x in min_x..=max_x {
            for y in min_y..=max_y {
                tiles.push(TileCoord { x, y, z: zoom });
            }
        }
        tiles
    }

    /// Applies finished downloads and requests missing tiles
    pub fn update_tiles(&mut self, viewport: &Viewport) {
        let Some(loader) = &self.tile_loader else {
            return;
        };

        for (coord, data) in loader.drain() {
            self.loading_tiles.remove(&coord);
            match data {
                Some(data) => {
                    log::debug!("tile ready {:?} ({} bytes)", coord, data.len());
                    self.cache.insert(coord, data);
                }
                None => {
                    self.failed_tiles.insert(coord);
                }
            }
        }

        // Bounded per frame to avoid bursts of threads
        const MAX_LOAD_PER_CALL: usize = 8;
        let mut started = 0;
        for coord in self.visible_tiles(viewport) {
            if started >= MAX_LOAD_PER_CALL {
                break;
            }
            if self.cache.contains(&coord)
                || self.loading_tiles.contains(&coord)
                || self.failed_tiles.contains(&coord)
            {
                continue;
            }
            loader.start_download(self.tile_source.as_ref(), coord);
            self.loading_tiles.insert(coord);
            started += 1;
        }
    }

    /// The tile itself, or the nearest cached ancestor covering it
    fn find_best_tile(&self, coord: TileCoord) -> Option<(TileCoord, Arc<Vec<u8>>)> {
        let mut current = coord;
        loop {
            if let Some(data) = self.cache.get(&current) {
                return Some((current, data));
            }
            if current.z == 0 {
                return None;
            }
            current = TileCoord::new(current.x / 2, current.y / 2, current.z - 1);
        }
    }
}

impl LayerTrait for TileLayer {
    crate::impl_layer_trait!(TileLayer, properties);

    fn update(&mut self, viewport: &Viewport) -> Result<()> {
        self.update_tiles(viewport);
        Ok(())
    }

    fn render(&mut self, context: &mut RenderContext, viewport: &Viewport) -> Result<()> {
        let mut drawn = HashSet::default();

        for coord in self.visible_tiles(viewport) {
            let Some((tile_coord, data)) = self.find_best_tile(coord) else {
                continue;
            };
            // several children can fall back to the same parent
            if !drawn.insert(tile_coord) {
                continue;
            }

            let tile_bounds = tile_coord.bounds();
            let mut screen_min = viewport.lat_lng_to_pixel(&tile_bounds.south_west);
            let mut screen_max = viewport.lat_lng_to_pixel(&tile_bounds.north_east);
            if screen_min.x > screen_max.x {
                std::mem::swap(&mut screen_min.x, &mut screen_max.x);
            }
            if screen_min.y > screen_max.y {
                std::mem::swap(&mut screen_min.y, &mut screen_max.y);
            }

            context.render_tile(tile_coord, data, (screen_min, screen_max), self.opacity())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::Point;
    use crate::rendering::context::DrawCommand;

    fn riau_viewport() -> Viewport {
        Viewport::new(LatLng::new(0.5104, 101.4383), 9.0, Point::new(800.0, 600.0))
    }

    #[test]
    fn test_visible_tiles_cover_center() {
        let layer = TileLayer::new("osm".into(), "OpenStreetMap".into()).without_network();
        let viewport = riau_viewport();
        let tiles = layer.visible_tiles(&viewport);

        let center = TileCoord::from_lat_lng(&viewport.center, 9);
        assert!(tiles.contains(&center));
        assert!(tiles.iter().all(|t| t.z == 9 && t.is_valid()));
        // 800x600 at 256px tiles plus margin
        assert!(tiles.len() >= 12 && tiles.len() <= 42);
    }

    #[test]
    fn test_parent_tile_fallback() {
        let mut layer = TileLayer::new("osm".into(), "OpenStreetMap".into()).without_network();
        let viewport = riau_viewport();
        let center = TileCoord::from_lat_lng(&viewport.center, 9);
        let parent = TileCoord::new(center.x / 2, center.y / 2, 8);
        layer.insert_tile(parent, vec![1, 2, 3]);

        let mut ctx = RenderContext::new(800, 600);
        layer.update(&viewport).unwrap();
        layer.render(&mut ctx, &viewport).unwrap();

        let coords: Vec<_> = ctx
            .get_drawing_queue()
            .iter()
            .filter_map(|cmd| match cmd {
                DrawCommand::Tile { coord, .. } => Some(*coord),
                _ => None,
            })
            .collect();
        assert!(coords.contains(&parent));
        assert_eq!(layer.pending_tiles(), 0);
    }

    #[test]
    fn test_failed_downloads_are_not_left_pending() {
        use std::time::{Duration, Instant};

        // nothing listens on port 1
        let options = TileLayerOptions {
            url_template: "http://127.0.0.1:1/{z}/{x}/{y}.png".to_string(),
            subdomains: Vec::new(),
            ..TileLayerOptions::default()
        };
        let mut layer = TileLayer::with_options("osm".into(), "OpenStreetMap".into(), options);
        let viewport = riau_viewport();
        layer.update_tiles(&viewport);
        assert!(layer.pending_tiles() > 0);

        let deadline = Instant::now() + Duration::from_secs(30);
        while layer.pending_tiles() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(50));
            layer.update_tiles(&viewport);
        }
        assert_eq!(layer.pending_tiles(), 0);
        assert!(layer.cache().is_empty());

        // given up tiles are not requested again
        layer.update_tiles(&viewport);
        assert_eq!(layer.pending_tiles(), 0);
    }

    #[test]
    fn test_hidden_layer_defaults() {
        let layer = TileLayer::new("osm".into(), "OpenStreetMap".into());
        assert_eq!(layer.layer_type(), LayerType::Tile);
        assert!(!layer.is_interactive());
        assert_eq!(layer.z_index(), -100);
        assert_eq!(
            layer.tile_source().url(TileCoord::new(0, 0, 0)),
            "https://a.tile.openstreetmap.org/0/0/0.png"
        );
    }
}

use crate::{
    core::{
        constants::{DEFAULT_HIT_TOLERANCE_PX, DEFAULT_POINT_HIT_RADIUS_PX},
        geo::{LatLng, Point},
        viewport::Viewport,
    },
    data::{
        feature::{Feature, FeatureRef},
        loader::{SourceLoader, SourceLocation},
    },
    input::{Action, EventManager, InputEvent, InputHandler, MapEvent},
    layers::{
        base::LayerTrait,
        manager::LayerManager,
        style::{LayerStyle, Style},
        tile::TileLayer,
        vector::VectorLayer,
    },
    rendering::context::RenderContext,
    Result,
};
use std::path::{Path, PathBuf};

/// Id of the overlay layer holding the hovered feature
pub const HIGHLIGHT_LAYER_ID: &str = "highlight";

/// A feature found under the pointer
#[derive(Debug, Clone, Copy)]
pub struct FeatureHit<'a> {
    pub layer_id: &'a str,
    pub feature: &'a Feature,
}

impl FeatureHit<'_> {
    pub fn feature_ref(&self) -> FeatureRef {
        FeatureRef::new(self.layer_id, self.feature.id.clone())
    }
}

/// The assembled map: viewport, stacked layers and the highlight overlay
pub struct Map {
    viewport: Viewport,
    layer_manager: LayerManager,
    input_handler: InputHandler,
    event_manager: EventManager,
    source_loader: SourceLoader,
    data_root: PathBuf,
    hit_tolerance: f64,
    point_hit_radius: f64,
}

impl Map {
    pub fn new(center: LatLng, zoom: f64, size: Point) -> Self {
        Self::with_highlight_style(center, zoom, size, LayerStyle::highlight())
    }

    pub fn with_highlight_style(center: LatLng, zoom: f64, size: Point, style: Style) -> Self {
        let mut layer_manager = LayerManager::new();
        let highlight = highlight_layer(style);
        // empty manager, the id cannot clash
        let _ = layer_manager.add_layer(Box::new(highlight));

        Self {
            viewport: Viewport::new(center, zoom, size),
            layer_manager,
            input_handler: InputHandler::new(),
            event_manager: EventManager::new(),
            source_loader: SourceLoader::new(),
            data_root: PathBuf::from("."),
            hit_tolerance: DEFAULT_HIT_TOLERANCE_PX,
            point_hit_radius: DEFAULT_POINT_HIT_RADIUS_PX,
        }
    }

    pub fn set_data_root(&mut self, root: impl Into<PathBuf>) {
        self.data_root = root.into();
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Pixel tolerances used by [`Map::feature_at_pixel`]
    pub fn set_hit_tolerance(&mut self, line_tolerance: f64, point_radius: f64) {
        self.hit_tolerance = line_tolerance.max(0.0);
        self.point_hit_radius = point_radius.max(0.0);
    }

    pub fn set_view(&mut self, center: LatLng, zoom: f64) {
        let old_center = self.viewport.center;
        let old_zoom = self.viewport.zoom;

        self.viewport.set_center(center);
        self.viewport.set_zoom(zoom);

        if self.viewport.center != old_center || self.viewport.zoom != old_zoom {
            self.event_manager.emit(MapEvent::ViewChanged {
                center: self.viewport.center,
                zoom: self.viewport.zoom,
            });
        }
    }

    pub fn set_size(&mut self, size: Point) {
        self.viewport.set_size(size);
    }

    pub fn add_layer(&mut self, layer: Box<dyn LayerTrait>) -> Result<()> {
        let layer_id = layer.id().to_string();
        self.layer_manager.add_layer(layer)?;
        self.event_manager.emit(MapEvent::LayerAdd { layer_id });
        Ok(())
    }

    pub fn remove_layer(&mut self, layer_id: &str) -> Option<Box<dyn LayerTrait>> {
        let removed = self.layer_manager.remove_layer(layer_id);
        if removed.is_some() {
            self.event_manager.emit(MapEvent::LayerRemove {
                layer_id: layer_id.to_string(),
            });
        }
        removed
    }

    pub fn get_layer(&self, layer_id: &str) -> Option<&dyn LayerTrait> {
        self.layer_manager.get_layer(layer_id)
    }

    pub fn with_layer_mut<F, R>(&mut self, layer_id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut dyn LayerTrait) -> R,
    {
        self.layer_manager.with_layer_mut(layer_id, f)
    }

    pub fn vector_layer(&self, layer_id: &str) -> Option<&VectorLayer> {
        self.get_layer(layer_id)?
            .as_any()
            .downcast_ref::<VectorLayer>()
    }

    pub fn vector_layer_mut(&mut self, layer_id: &str) -> Option<&mut VectorLayer> {
        self.layer_manager
            .get_layer_mut(layer_id)?
            .as_any_mut()
            .downcast_mut::<VectorLayer>()
    }

    pub fn highlight_layer(&self) -> Option<&VectorLayer> {
        self.vector_layer(HIGHLIGHT_LAYER_ID)
    }

    pub fn highlight_layer_mut(&mut self) -> Option<&mut VectorLayer> {
        self.vector_layer_mut(HIGHLIGHT_LAYER_ID)
    }

    /// Layer ids bottom to top, the highlight overlay last
    pub fn list_layers(&self) -> Vec<String> {
        self.layer_manager.layer_ids().to_vec()
    }

    pub fn set_layer_visible(&mut self, layer_id: &str, visible: bool) -> Result<()> {
        let changed = self
            .layer_manager
            .with_layer_mut(layer_id, |layer| {
                let changed = layer.is_visible() != visible;
                layer.set_visible(visible);
                changed
            })
            .ok_or_else(|| crate::Error::Layer(format!("unknown layer '{}'", layer_id)))?;

        if changed {
            log::debug!("layer '{}' visible={}", layer_id, visible);
            self.event_manager.emit(MapEvent::LayerVisibility {
                layer_id: layer_id.to_string(),
                visible,
            });
        }
        Ok(())
    }

    pub fn is_layer_visible(&self, layer_id: &str) -> Option<bool> {
        self.get_layer(layer_id).map(|layer| layer.is_visible())
    }

    /// Starts a background load for every vector layer that has a URL
    pub fn load_sources(&mut self) {
        let requests: Vec<(String, String)> = self
            .layer_manager
            .layers()
            .into_iter()
            .filter_map(|layer| {
                let vector = layer.as_any().downcast_ref::<VectorLayer>()?;
                vector.url().map(|url| (layer.id().to_string(), url.to_string()))
            })
            .collect();

        for (layer_id, url) in requests {
            if let Some(layer) = self.vector_layer_mut(&layer_id) {
                layer.mark_loading();
            }
            let location = SourceLocation::resolve(&url, &self.data_root);
            self.source_loader.spawn(layer_id, location);
        }
    }

    /// Applies finished background loads; returns how many were applied
    pub fn poll_sources(&mut self) -> usize {
        let outcomes = self.source_loader.drain();
        let count = outcomes.len();
        for outcome in outcomes {
            self.apply_outcome(outcome.layer_id, outcome.result);
        }
        count
    }

    /// Starts every load and waits for all of them
    pub fn load_sources_blocking(&mut self) {
        self.load_sources();
        for outcome in self.source_loader.wait_all() {
            self.apply_outcome(outcome.layer_id, outcome.result);
        }
    }

    pub fn sources_pending(&self) -> usize {
        self.source_loader.pending()
    }

    /// Tiles still downloading across every tile layer
    pub fn pending_tiles(&self) -> usize {
        self.layer_manager
            .layers()
            .into_iter()
            .filter_map(|layer| layer.as_any().downcast_ref::<TileLayer>())
            .map(TileLayer::pending_tiles)
            .sum()
    }

    /// Records the decoded pixel size of an icon image so point hits cover
    /// the drawn picture. Returns how many layers use that icon.
    pub fn set_icon_size(&mut self, src: &str, size: [f32; 2]) -> usize {
        let mut updated = 0;
        for layer_id in self.list_layers() {
            if let Some(layer) = self.vector_layer_mut(&layer_id) {
                if layer.set_icon_size(src, size) {
                    updated += 1;
                }
            }
        }
        updated
    }

    fn apply_outcome(&mut self, layer_id: String, result: Result<Vec<Feature>>) {
        let failed = result.is_err();
        let Some(layer) = self.vector_layer_mut(&layer_id) else {
            log::warn!("dropping load result for removed layer '{}'", layer_id);
            return;
        };
        layer.apply_load(result);
        let feature_count = layer.len();
        self.event_manager.emit(MapEvent::SourceLoaded {
            layer_id,
            feature_count,
            failed,
        });
    }

    /// Topmost feature under `pixel` across visible, interactive vector layers
    pub fn feature_at_pixel(&self, pixel: Point) -> Option<FeatureHit<'_>> {
        self.layer_manager
            .layers()
            .into_iter()
            .rev()
            .filter(|layer| layer.is_visible() && layer.is_interactive())
            .find_map(|layer| {
                let vector = layer.as_any().downcast_ref::<VectorLayer>()?;
                let feature = vector
                    .features_at(&self.viewport, &pixel, self.hit_tolerance, self.point_hit_radius)
                    .into_iter()
                    .next()?;
                Some(FeatureHit {
                    layer_id: vector.id(),
                    feature,
                })
            })
    }

    /// Feature referenced by `feature_ref`, if its layer still holds it
    pub fn feature(&self, feature_ref: &FeatureRef) -> Option<&Feature> {
        self.vector_layer(&feature_ref.layer_id)?
            .feature(&feature_ref.feature_id)
    }

    /// Draw commands for every visible layer, bottom to top
    pub fn render(&mut self, context: &mut RenderContext) -> Result<()> {
        context.begin_frame();
        self.layer_manager.render(context, &self.viewport)
    }

    /// Applies navigation input to the viewport
    pub fn handle_input(&mut self, input: &InputEvent) -> Result<()> {
        let actions = self.input_handler.handle_event(input, self.viewport.zoom);

        for action in actions {
            match action {
                Action::Pan { delta } => self.viewport.pan(delta),
                Action::Zoom { level, focus_point } => {
                    let old_zoom = self.viewport.zoom;
                    self.viewport.zoom_to(level, focus_point);
                    if self.viewport.zoom != old_zoom {
                        self.emit_view_changed();
                    }
                }
                Action::Resize { size } => self.viewport.set_size(size),
                Action::StartDrag => self.event_manager.emit(MapEvent::MoveStart {
                    center: self.viewport.center,
                }),
                Action::EndDrag => {
                    self.event_manager.emit(MapEvent::MoveEnd {
                        center: self.viewport.center,
                    });
                    self.emit_view_changed();
                }
            }
        }

        if let InputEvent::Click { position, .. } = input {
            self.event_manager.emit(MapEvent::Click {
                lat_lng: self.viewport.pixel_to_lat_lng(position),
                pixel: *position,
            });
        }
        Ok(())
    }

    fn emit_view_changed(&mut self) {
        self.event_manager.emit(MapEvent::ViewChanged {
            center: self.viewport.center,
            zoom: self.viewport.zoom,
        });
    }

    pub fn is_dragging(&self) -> bool {
        self.input_handler.is_dragging()
    }

    pub fn input_handler_mut(&mut self) -> &mut InputHandler {
        &mut self.input_handler
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn on<F>(&mut self, event_type: &str, callback: F)
    where
        F: Fn(&MapEvent) + Send + Sync + 'static,
    {
        self.event_manager.on(event_type, callback);
    }

    pub fn emit(&mut self, event: MapEvent) {
        self.event_manager.emit(event);
    }

    pub fn process_events(&mut self) -> Vec<MapEvent> {
        self.event_manager.process_events()
    }
}

fn highlight_layer(style: Style) -> VectorLayer {
    let mut layer = VectorLayer::new(HIGHLIGHT_LAYER_ID.to_string(), "Highlight".to_string())
        .with_style(LayerStyle::Static(style))
        .non_interactive();
    layer.set_z_index(100);
    layer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::feature::{FeatureId, Geometry};
    use crate::input::MouseButton;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn test_map() -> Map {
        Map::new(LatLng::new(0.0, 0.0), 6.0, Point::new(800.0, 600.0))
    }

    fn square_layer(id: &str, feature_id: &str) -> VectorLayer {
        let ring = vec![
            LatLng::new(-1.0, -1.0),
            LatLng::new(-1.0, 1.0),
            LatLng::new(1.0, 1.0),
            LatLng::new(1.0, -1.0),
            LatLng::new(-1.0, -1.0),
        ];
        VectorLayer::new(id.to_string(), id.to_string())
            .with_features(vec![Feature::new(feature_id, Geometry::Polygon(vec![ring]))])
    }

    #[test]
    fn test_highlight_layer_is_on_top() {
        let mut map = test_map();
        map.add_layer(Box::new(square_layer("riau", "a"))).unwrap();
        map.add_layer(Box::new(square_layer("rth", "b"))).unwrap();

        assert_eq!(map.list_layers(), vec!["riau", "rth", HIGHLIGHT_LAYER_ID]);
        assert!(!map.get_layer(HIGHLIGHT_LAYER_ID).unwrap().is_interactive());
    }

    #[test]
    fn test_topmost_feature_wins() {
        let mut map = test_map();
        map.add_layer(Box::new(square_layer("riau", "bottom"))).unwrap();
        map.add_layer(Box::new(square_layer("rth", "top"))).unwrap();

        let hit = map.feature_at_pixel(Point::new(400.0, 300.0)).unwrap();
        assert_eq!(hit.layer_id, "rth");
        assert_eq!(hit.feature.id, FeatureId::from("top"));

        map.set_layer_visible("rth", false).unwrap();
        let hit = map.feature_at_pixel(Point::new(400.0, 300.0)).unwrap();
        assert_eq!(hit.feature_ref(), FeatureRef::new("riau", FeatureId::from("bottom")));

        assert!(map.feature_at_pixel(Point::new(5.0, 5.0)).is_none());
    }

    #[test]
    fn test_highlight_layer_never_hit() {
        let mut map = test_map();
        let feature = square_layer("x", "glow").features()[0].clone();
        map.highlight_layer_mut().unwrap().add_feature(feature);
        assert!(map.feature_at_pixel(Point::new(400.0, 300.0)).is_none());
    }

    #[test]
    fn test_set_layer_visible_unknown_layer() {
        let mut map = test_map();
        assert!(map.set_layer_visible("sawit", true).is_err());
        assert_eq!(map.is_layer_visible("sawit"), None);
    }

    #[test]
    fn test_visibility_events() {
        let mut map = test_map();
        map.add_layer(Box::new(square_layer("riau", "a"))).unwrap();
        map.process_events();

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        map.on("layervisibility", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        map.set_layer_visible("riau", false).unwrap();
        // no change, no event
        map.set_layer_visible("riau", false).unwrap();
        map.set_layer_visible("riau", true).unwrap();
        map.process_events();

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(map.is_layer_visible("riau"), Some(true));
    }

    #[test]
    fn test_load_sources_blocking() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("banjir.json"),
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","geometry":{"type":"Point","coordinates":[101.4,0.5]},"properties":{"nama":"Sail"}}
            ]}"#,
        )
        .unwrap();

        let mut map = test_map();
        map.set_data_root(dir.path());
        map.add_layer(Box::new(
            VectorLayer::new("banjir".into(), "Banjir".into()).with_url("banjir.json"),
        ))
        .unwrap();
        map.add_layer(Box::new(
            VectorLayer::new("rth".into(), "RTH".into()).with_url("missing.json"),
        ))
        .unwrap();

        map.load_sources_blocking();

        assert_eq!(map.vector_layer("banjir").unwrap().len(), 1);
        assert!(map.vector_layer("rth").unwrap().is_empty());
        assert_eq!(map.sources_pending(), 0);

        let loaded: Vec<_> = map
            .process_events()
            .into_iter()
            .filter(|e| matches!(e, MapEvent::SourceLoaded { .. }))
            .collect();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_navigation_input() {
        let mut map = test_map();
        let start = map.viewport().center;

        map.handle_input(&InputEvent::DragStart { position: Point::new(400.0, 300.0) })
            .unwrap();
        assert!(map.is_dragging());
        map.handle_input(&InputEvent::Drag { delta: Point::new(50.0, 0.0) })
            .unwrap();
        map.handle_input(&InputEvent::DragEnd).unwrap();
        assert!(!map.is_dragging());
        assert!(map.viewport().center.lng < start.lng);

        map.handle_input(&InputEvent::Scroll {
            delta: 1.0,
            position: Point::new(400.0, 300.0),
        })
        .unwrap();
        assert_eq!(map.viewport().zoom, 7.0);

        map.handle_input(&InputEvent::Click {
            position: Point::new(400.0, 300.0),
            button: MouseButton::Left,
        })
        .unwrap();
        assert!(map
            .process_events()
            .iter()
            .any(|e| matches!(e, MapEvent::Click { .. })));
    }

    #[test]
    fn test_render_skips_hidden_layers() {
        let mut map = test_map();
        map.add_layer(Box::new(square_layer("riau", "a"))).unwrap();

        let mut ctx = RenderContext::new(800, 600);
        map.render(&mut ctx).unwrap();
        assert_eq!(ctx.get_drawing_queue().len(), 1);

        map.set_layer_visible("riau", false).unwrap();
        map.render(&mut ctx).unwrap();
        assert!(ctx.get_drawing_queue().is_empty());
    }
}

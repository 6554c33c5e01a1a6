use crate::{
    core::{
        geo::{LatLng, LatLngBounds, Point},
        viewport::Viewport,
    },
    data::{
        feature::{Feature, FeatureId, Geometry, PointMarker},
        loader::{load_features, SourceLocation},
    },
    layers::{
        base::{LayerProperties, LayerTrait, LayerType},
        style::{LayerStyle, Style},
    },
    rendering::context::{
        LineRenderStyle, PointRenderStyle, PolygonRenderStyle, RenderContext, StyleConversion,
    },
    spatial::index::{SpatialIndex, SpatialItem},
    Result,
};
use std::path::Path;

/// Where a layer's features are in their lifecycle
#[derive(Debug, Clone, PartialEq)]
pub enum SourceState {
    /// Features are added in code (or the URL has not been requested yet)
    Idle,
    Loading,
    Ready,
    /// The fetch or parse failed; the layer stays empty
    Failed(String),
}

/// A layer of GeoJSON features drawn with one [`LayerStyle`]
pub struct VectorLayer {
    properties: LayerProperties,
    url: Option<String>,
    style: LayerStyle,
    /// Draw order: later features are drawn on top
    features: Vec<Feature>,
    /// Feature bounds → position in `features`
    index: SpatialIndex<usize>,
    state: SourceState,
}

impl VectorLayer {
    pub fn new(id: String, name: String) -> Self {
        Self {
            properties: LayerProperties::new(id, name, LayerType::Vector),
            url: None,
            style: LayerStyle::default(),
            features: Vec::new(),
            index: SpatialIndex::new(),
            state: SourceState::Idle,
        }
    }

    /// GeoJSON location: an `http(s)://` URL or a path relative to the data root
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_style(mut self, style: LayerStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.set_features(features);
        self
    }

    /// Layers excluded from pointer queries, such as the highlight overlay
    pub fn non_interactive(mut self) -> Self {
        self.properties.interactive = false;
        self
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn style(&self) -> &LayerStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: LayerStyle) {
        self.style = style;
    }

    /// Sets the image size of the layer's icon when its source is `src`
    pub fn set_icon_size(&mut self, src: &str, size: [f32; 2]) -> bool {
        match self.style.icon_mut() {
            Some(icon) if icon.src == src => {
                icon.size = Some(size);
                true
            }
            _ => false,
        }
    }

    /// Screen area of a point feature: the drawn icon once its size is
    /// known, otherwise a circle of `point_radius`
    pub fn point_marker(&self, point_radius: f64) -> PointMarker {
        self.style
            .icon()
            .and_then(|icon| icon.footprint())
            .map(|(min, max)| PointMarker::Box { min, max })
            .unwrap_or(PointMarker::Circle(point_radius))
    }

    pub fn state(&self) -> &SourceState {
        &self.state
    }

    pub(crate) fn mark_loading(&mut self) {
        self.state = SourceState::Loading;
    }

    /// Replaces every feature and rebuilds the spatial index
    pub fn set_features(&mut self, features: Vec<Feature>) {
        self.features = features;
        self.rebuild_index();
        self.state = SourceState::Ready;
    }

    /// Applies the outcome of a load: features on success, an empty layer on failure
    pub fn apply_load(&mut self, result: Result<Vec<Feature>>) {
        match result {
            Ok(features) => {
                log::info!(
                    "layer '{}' loaded {} features",
                    self.properties.id,
                    features.len()
                );
                self.set_features(features);
            }
            Err(e) => {
                log::warn!("layer '{}' failed to load, left empty: {}", self.properties.id, e);
                self.features.clear();
                self.index.clear();
                self.state = SourceState::Failed(e.to_string());
            }
        }
    }

    /// Fetches and parses the layer's source on the current thread.
    ///
    /// On failure the layer is left empty and the error is returned.
    pub fn load_blocking(&mut self, root: &Path) -> Result<usize> {
        let Some(url) = self.url.as_deref() else {
            return Ok(self.features.len());
        };
        match load_features(&SourceLocation::resolve(url, root)) {
            Ok(features) => {
                let count = features.len();
                self.apply_load(Ok(features));
                Ok(count)
            }
            Err(e) => {
                self.apply_load(Err(e.to_string().into()));
                Err(e)
            }
        }
    }

    /// Appends a feature on top of the others
    pub fn add_feature(&mut self, feature: Feature) {
        if let Some(bounds) = feature.geometry.bounds() {
            self.index.insert(SpatialItem::new(
                feature.id.0.clone(),
                bounds,
                self.features.len(),
            ));
        }
        self.features.push(feature);
    }

    pub fn remove_feature(&mut self, id: &FeatureId) -> Option<Feature> {
        let position = self.features.iter().position(|f| &f.id == id)?;
        let removed = self.features.remove(position);
        if position == self.features.len() {
            // topmost feature: no other index entry shifts
            self.index.remove(&removed.id.0);
        } else {
            self.rebuild_index();
        }
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.features.clear();
        self.index.clear();
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn feature(&self, id: &FeatureId) -> Option<&Feature> {
        self.features.iter().find(|f| &f.id == id)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features under `pixel`, topmost (last drawn) first
    pub fn features_at(
        &self,
        viewport: &Viewport,
        pixel: &Point,
        tolerance: f64,
        point_radius: f64,
    ) -> Vec<&Feature> {
        let marker = self.point_marker(point_radius);
        let search = viewport.pixel_box_bounds(pixel, tolerance.max(marker.reach()));
        let mut candidates: Vec<usize> = self
            .index
            .query(&search)
            .into_iter()
            .map(|item| item.data)
            .collect();
        candidates.sort_unstable_by(|a, b| b.cmp(a));

        candidates
            .into_iter()
            .filter_map(|i| self.features.get(i))
            .filter(|f| f.geometry.hit_test(viewport, pixel, tolerance, marker))
            .collect()
    }

    fn rebuild_index(&mut self) {
        let items = self
            .features
            .iter()
            .enumerate()
            .filter_map(|(i, f)| {
                f.geometry
                    .bounds()
                    .map(|bounds| SpatialItem::new(f.id.0.clone(), bounds, i))
            })
            .collect();
        self.index = SpatialIndex::bulk_load(items);
    }

    fn render_feature(
        &self,
        context: &mut RenderContext,
        viewport: &Viewport,
        feature: &Feature,
    ) {
        let opacity = self.properties.opacity;
        let style = self.style.resolve(feature);
        let to_screen =
            |ring: &[LatLng]| -> Vec<Point> { ring.iter().map(|p| viewport.lat_lng_to_pixel(p)).collect() };

        match &feature.geometry {
            Geometry::Point(position) => {
                render_point(context, viewport, position, &style, opacity);
            }
            Geometry::MultiPoint(points) => {
                for position in points {
                    render_point(context, viewport, position, &style, opacity);
                }
            }
            Geometry::LineString(points) => {
                let line: LineRenderStyle = style.to_render_style(opacity);
                context.render_line(&to_screen(points), &line);
            }
            Geometry::MultiLineString(lines) => {
                let line: LineRenderStyle = style.to_render_style(opacity);
                for points in lines {
                    context.render_line(&to_screen(points), &line);
                }
            }
            Geometry::Polygon(rings) => {
                let polygon: PolygonRenderStyle = style.to_render_style(opacity);
                render_rings(context, rings, &polygon, &to_screen);
            }
            Geometry::MultiPolygon(polygons) => {
                let polygon: PolygonRenderStyle = style.to_render_style(opacity);
                for rings in polygons {
                    render_rings(context, rings, &polygon, &to_screen);
                }
            }
        }
    }
}

fn render_point(
    context: &mut RenderContext,
    viewport: &Viewport,
    position: &LatLng,
    style: &Style,
    opacity: f32,
) {
    let screen_pos = viewport.lat_lng_to_pixel(position);
    let circle: PointRenderStyle = style.to_render_style(opacity);
    match &style.icon {
        Some(icon) => context.render_icon(&screen_pos, icon, opacity, &circle),
        None => context.render_point(&screen_pos, &circle),
    }
}

fn render_rings(
    context: &mut RenderContext,
    rings: &[Vec<LatLng>],
    style: &PolygonRenderStyle,
    to_screen: &dyn Fn(&[LatLng]) -> Vec<Point>,
) {
    if let Some((exterior, holes)) = rings.split_first() {
        let holes: Vec<Vec<Point>> = holes.iter().map(|hole| to_screen(hole)).collect();
        context.render_polygon(&to_screen(exterior), &holes, style);
    }
}

impl LayerTrait for VectorLayer {
    crate::impl_layer_trait!(VectorLayer, properties);

    fn bounds(&self) -> Option<LatLngBounds> {
        self.index.bounds()
    }

    fn render(&mut self, context: &mut RenderContext, viewport: &Viewport) -> Result<()> {
        // Cull with the index, keep draw order
        let mut visible: Vec<usize> = self
            .index
            .query(&viewport.bounds())
            .into_iter()
            .map(|item| item.data)
            .collect();
        visible.sort_unstable();

        for i in visible {
            if let Some(feature) = self.features.get(i) {
                self.render_feature(context, viewport, feature);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::context::DrawCommand;

    fn viewport() -> Viewport {
        Viewport::new(LatLng::new(0.5, 101.5), 9.0, Point::new(800.0, 600.0))
    }

    fn square(id: &str, south: f64, west: f64, size: f64) -> Feature {
        Feature::new(
            id,
            Geometry::Polygon(vec![vec![
                LatLng::new(south, west),
                LatLng::new(south, west + size),
                LatLng::new(south + size, west + size),
                LatLng::new(south + size, west),
            ]]),
        )
    }

    #[test]
    fn test_topmost_feature_first() {
        let layer = VectorLayer::new("riau".into(), "Riau".into()).with_features(vec![
            square("below", 0.0, 101.0, 1.0),
            square("above", 0.3, 101.3, 0.4),
            square("elsewhere", -3.0, 98.0, 0.5),
        ]);
        let vp = viewport();
        let pixel = vp.lat_lng_to_pixel(&LatLng::new(0.5, 101.5));

        let hits: Vec<_> = layer
            .features_at(&vp, &pixel, 4.0, 12.0)
            .iter()
            .map(|f| f.id.0.as_str())
            .collect();
        assert_eq!(hits, vec!["above", "below"]);
    }

    #[test]
    fn test_add_and_remove_feature() {
        let mut layer = VectorLayer::new("highlight".into(), "Highlight".into()).non_interactive();
        assert!(!layer.is_interactive());

        layer.add_feature(square("a", 0.0, 101.0, 1.0));
        layer.add_feature(square("b", 0.0, 101.0, 1.0));
        assert_eq!(layer.len(), 2);

        let removed = layer.remove_feature(&FeatureId::from("a"));
        assert_eq!(removed.map(|f| f.id), Some(FeatureId::from("a")));
        assert!(layer.remove_feature(&FeatureId::from("a")).is_none());

        // indices stay consistent after removal
        let vp = viewport();
        let pixel = vp.lat_lng_to_pixel(&LatLng::new(0.5, 101.5));
        let hits = layer.features_at(&vp, &pixel, 4.0, 12.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, FeatureId::from("b"));

        // topmost removal drops just its index entry
        layer.add_feature(square("c", 0.0, 101.0, 1.0));
        assert!(layer.remove_feature(&FeatureId::from("c")).is_some());
        let hits = layer.features_at(&vp, &pixel, 4.0, 12.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, FeatureId::from("b"));
        assert!(layer.remove_feature(&FeatureId::from("b")).is_some());
        assert!(layer.features_at(&vp, &pixel, 4.0, 12.0).is_empty());
        assert!(layer.bounds().is_none());
    }

    #[test]
    fn test_icon_hits_cover_drawn_image() {
        let vp = viewport();
        let mut layer = VectorLayer::new("rth".into(), "RTH".into())
            .with_style(LayerStyle::rth_icons())
            .with_features(vec![Feature::new("p", Geometry::Point(LatLng::new(0.5, 101.5)))]);
        let point = vp.lat_lng_to_pixel(&LatLng::new(0.5, 101.5));
        let above = |dy: f64| Point::new(point.x, point.y - dy);

        // size unknown: circle around the point
        assert_eq!(layer.features_at(&vp, &point, 4.0, 12.0).len(), 1);
        assert!(layer.features_at(&vp, &above(30.0), 4.0, 12.0).is_empty());

        // 400x400 image at scale 0.13 stands 52 px tall on the point
        assert!(layer.set_icon_size("icon/rth.png", [400.0, 400.0]));
        assert!(!layer.set_icon_size("icon/flood.png", [400.0, 400.0]));
        for dy in [0.0, 10.0, 26.0, 40.0, 51.0] {
            assert_eq!(layer.features_at(&vp, &above(dy), 4.0, 12.0).len(), 1, "dy {}", dy);
        }
        assert!(layer.features_at(&vp, &above(60.0), 4.0, 12.0).is_empty());
        assert!(layer.features_at(&vp, &above(-8.0), 4.0, 12.0).is_empty());
    }

    #[test]
    fn test_render_emits_icons_and_polygons() {
        let point = Feature::new("p", Geometry::Point(LatLng::new(0.5, 101.5)));
        let mut icons = VectorLayer::new("rth".into(), "RTH".into())
            .with_style(LayerStyle::rth_icons())
            .with_features(vec![point]);
        let mut polygons = VectorLayer::new("riau".into(), "Riau".into())
            .with_style(LayerStyle::riau_polygons())
            .with_features(vec![square("s", 0.0, 101.0, 1.0)]);

        let mut ctx = RenderContext::new(800, 600);
        polygons.render(&mut ctx, &viewport()).unwrap();
        icons.render(&mut ctx, &viewport()).unwrap();

        let queue = ctx.get_drawing_queue();
        assert_eq!(queue.len(), 2);
        assert!(matches!(queue[0], DrawCommand::Polygon { .. }));
        match &queue[1] {
            DrawCommand::Icon { icon, position, .. } => {
                assert_eq!(icon.src, "icon/rth.png");
                assert!((position.x - 400.0).abs() < 1e-6);
            }
            other => panic!("expected an icon, got {:?}", other),
        }
    }

    #[test]
    fn test_failed_load_leaves_layer_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not geojson").unwrap();

        let mut layer = VectorLayer::new("banjir".into(), "Banjir".into())
            .with_url("broken.json")
            .with_features(vec![square("stale", 0.0, 101.0, 1.0)]);

        assert!(layer.load_blocking(dir.path()).is_err());
        assert!(layer.is_empty());
        assert!(layer.bounds().is_none());
        assert!(matches!(layer.state(), SourceState::Failed(_)));
    }
}

use crate::core::{
    constants::{EARTH_RADIUS, MAX_ZOOM, MIN_ZOOM, TILE_SIZE},
    geo::{LatLng, LatLngBounds, Point},
};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// The current view of the map: center, zoom, and screen dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// The center of the map view in geographical coordinates
    pub center: LatLng,
    /// The current zoom level
    pub zoom: f64,
    /// The size of the viewport in pixels
    pub size: Point,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Viewport {
    pub fn new(center: LatLng, zoom: f64, size: Point) -> Self {
        Self {
            center: Self::clamp_center(center),
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            size,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
        }
    }

    pub fn set_center(&mut self, center: LatLng) {
        self.center = Self::clamp_center(center);
    }

    /// Sets the zoom level, clamping to the configured limits
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    pub fn set_size(&mut self, size: Point) {
        self.size = size;
    }

    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) {
        self.min_zoom = min_zoom.max(MIN_ZOOM);
        self.max_zoom = max_zoom.min(MAX_ZOOM).max(self.min_zoom);
        self.zoom = self.zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Projects a LatLng to world pixel coordinates (EPSG:3857) at the given zoom
    pub fn project(&self, lat_lng: &LatLng, zoom: Option<f64>) -> Point {
        let scale = TILE_SIZE as f64 * 2_f64.powf(zoom.unwrap_or(self.zoom));
        let lat = LatLng::clamp_lat(lat_lng.lat);

        let x = lat_lng.lng.to_radians() * EARTH_RADIUS;
        let y = (PI / 4.0 + lat.to_radians() / 2.0).tan().ln() * EARTH_RADIUS;

        let world = 2.0 * PI * EARTH_RADIUS;
        Point::new(
            (x + PI * EARTH_RADIUS) / world * scale,
            (PI * EARTH_RADIUS - y) / world * scale,
        )
    }

    /// Inverse of [`Viewport::project`]
    pub fn unproject(&self, pixel: &Point, zoom: Option<f64>) -> LatLng {
        let scale = TILE_SIZE as f64 * 2_f64.powf(zoom.unwrap_or(self.zoom));
        let world = 2.0 * PI * EARTH_RADIUS;

        let x = pixel.x / scale * world - PI * EARTH_RADIUS;
        let y = PI * EARTH_RADIUS - pixel.y / scale * world;

        let lng = (x / EARTH_RADIUS).to_degrees();
        let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
        LatLng::new(lat, lng)
    }

    /// Converts a geographical coordinate to container pixel coordinates
    pub fn lat_lng_to_pixel(&self, lat_lng: &LatLng) -> Point {
        let origin = self.project(&self.center, None);
        let projected = self.project(lat_lng, None);
        projected
            .subtract(&origin)
            .add(&Point::new(self.size.x / 2.0, self.size.y / 2.0))
    }

    /// Converts container pixel coordinates back to a geographical coordinate
    pub fn pixel_to_lat_lng(&self, pixel: &Point) -> LatLng {
        let origin = self.project(&self.center, None);
        let projected = pixel
            .subtract(&Point::new(self.size.x / 2.0, self.size.y / 2.0))
            .add(&origin);
        self.unproject(&projected, None)
    }

    /// Pans the viewport so the content moves by `delta` pixels
    pub fn pan(&mut self, delta: Point) {
        let center_px = self.project(&self.center, None);
        let new_center = self.unproject(&center_px.subtract(&delta), None);
        self.set_center(new_center);
    }

    /// Zooms to `zoom`, keeping the geographic point under `focus_point` fixed
    pub fn zoom_to(&mut self, zoom: f64, focus_point: Option<Point>) {
        let new_zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        if (new_zoom - self.zoom).abs() < 0.001 {
            return;
        }

        match focus_point {
            Some(focus) => {
                let focus_lat_lng = self.pixel_to_lat_lng(&focus);
                self.zoom = new_zoom;
                let drifted = self.lat_lng_to_pixel(&focus_lat_lng);
                self.pan(focus.subtract(&drifted));
            }
            None => self.zoom = new_zoom,
        }
    }

    /// Current viewport bounds in geographical coordinates
    pub fn bounds(&self) -> LatLngBounds {
        let nw = self.pixel_to_lat_lng(&Point::new(0.0, 0.0));
        let se = self.pixel_to_lat_lng(&Point::new(self.size.x, self.size.y));

        LatLngBounds::new(LatLng::new(se.lat, nw.lng), LatLng::new(nw.lat, se.lng))
    }

    /// Geographic bounds of a square of `radius` pixels around `pixel`
    pub fn pixel_box_bounds(&self, pixel: &Point, radius: f64) -> LatLngBounds {
        let nw = self.pixel_to_lat_lng(&Point::new(pixel.x - radius, pixel.y - radius));
        let se = self.pixel_to_lat_lng(&Point::new(pixel.x + radius, pixel.y + radius));

        LatLngBounds::new(LatLng::new(se.lat, nw.lng), LatLng::new(nw.lat, se.lng))
    }

    fn clamp_center(center: LatLng) -> LatLng {
        LatLng::new(LatLng::clamp_lat(center.lat), center.lng.clamp(-180.0, 180.0))
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(LatLng::default(), 1.0, Point::new(800.0, 600.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn riau_viewport() -> Viewport {
        Viewport::new(LatLng::new(0.5104, 101.4383), 9.0, Point::new(800.0, 600.0))
    }

    #[test]
    fn test_center_projects_to_middle() {
        let viewport = riau_viewport();
        let pixel = viewport.lat_lng_to_pixel(&viewport.center);
        assert!((pixel.x - 400.0).abs() < 1e-6);
        assert!((pixel.y - 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_pixel_round_trip() {
        let viewport = riau_viewport();
        let pixel = Point::new(123.0, 456.0);
        let back = viewport.lat_lng_to_pixel(&viewport.pixel_to_lat_lng(&pixel));
        assert!((back.x - pixel.x).abs() < 1e-6);
        assert!((back.y - pixel.y).abs() < 1e-6);
    }

    #[test]
    fn test_pan_moves_content() {
        let mut viewport = riau_viewport();
        let target = LatLng::new(0.6, 101.5);
        let before = viewport.lat_lng_to_pixel(&target);
        viewport.pan(Point::new(25.0, -10.0));
        let after = viewport.lat_lng_to_pixel(&target);
        assert!((after.x - before.x - 25.0).abs() < 1e-6);
        assert!((after.y - before.y + 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_keeps_focus_fixed() {
        let mut viewport = riau_viewport();
        let focus = Point::new(600.0, 100.0);
        let under_cursor = viewport.pixel_to_lat_lng(&focus);
        viewport.zoom_to(11.0, Some(focus));
        assert_eq!(viewport.zoom, 11.0);
        let pixel = viewport.lat_lng_to_pixel(&under_cursor);
        assert!((pixel.x - focus.x).abs() < 1e-6);
        assert!((pixel.y - focus.y).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_limits() {
        let mut viewport = riau_viewport();
        viewport.set_zoom_limits(5.0, 12.0);
        viewport.set_zoom(20.0);
        assert_eq!(viewport.zoom, 12.0);
        viewport.set_zoom(1.0);
        assert_eq!(viewport.zoom, 5.0);
    }

    #[test]
    fn test_bounds_contain_center() {
        let viewport = riau_viewport();
        assert!(viewport.bounds().contains(&viewport.center));
    }
}

//! Engine-wide defaults kept in one place.

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Web Mercator sphere radius in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Zoom range supported by the OpenStreetMap tile servers.
pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 19.0;

/// Initial view of the Riau region (Pekanbaru), `[lon, lat]`.
pub const RIAU_CENTER_LON_LAT: [f64; 2] = [101.4383, 0.5104];
pub const RIAU_ZOOM: f64 = 9.0;

/// How close (in pixels) the pointer must be to a line, polygon edge or point.
pub const DEFAULT_HIT_TOLERANCE_PX: f64 = 4.0;

/// Hit radius for point features drawn as icons or markers.
pub const DEFAULT_POINT_HIT_RADIUS_PX: f64 = 12.0;

/// Popup overlay offset from its anchor, in pixels (x right, y down).
pub const POPUP_OFFSET: [f32; 2] = [0.0, -20.0];

/// Placeholder shown for an absent attribute or an empty info label.
pub const PLACEHOLDER: &str = "-";

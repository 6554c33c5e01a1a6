//! # riau-map
//!
//! An interactive map of the Riau region: administrative polygons, flood points
//! and green-space icons over an OpenStreetMap base layer, with hover
//! highlighting, click popups and per-layer visibility toggles.
//!
//! The crate is split the way a small map engine is: `core` owns the viewport
//! and the assembled [`Map`], `layers` and `tiles` hold what gets drawn, `data`
//! parses GeoJSON into typed features, and `interaction` is the glue that turns
//! pointer input into highlight and popup state. The egui front end lives in
//! `ui` behind the default `egui` feature.

pub mod core;
pub mod data;
pub mod input;
pub mod interaction;
pub mod layers;
pub mod prelude;
pub mod rendering;
pub mod spatial;
pub mod tiles;
#[cfg(feature = "egui")]
pub mod ui;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    builder::MapBuilder,
    config::{MapConfig, Scenario},
    geo::{LatLng, LatLngBounds, Point, TileCoord},
    map::Map,
    viewport::Viewport,
};

pub use data::feature::{AttributeValue, Attributes, Feature, FeatureRef, Geometry};

pub use layers::{base::LayerTrait, tile::TileLayer, vector::VectorLayer};

pub use input::{events::InputEvent, handler::InputHandler};

pub use interaction::{
    hover::HoverHighlighter, popup::ClickPopup, InteractionHandler, LayerControl,
};

pub use rendering::context::RenderContext;

pub use spatial::index::SpatialIndex;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Layer error: {0}")]
    Layer(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Error type alias for convenience
pub type Error = MapError;

//! Prelude module for common riau-map types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use riau_map::prelude::*;`

pub use crate::core::{
    builder::MapBuilder,
    config::{LayerDescriptor, MapConfig, Scenario, ToggleDescriptor},
    geo::{LatLng, LatLngBounds, Point, TileCoord},
    map::{FeatureHit, Map},
    viewport::Viewport,
};

pub use crate::data::{
    feature::{AttributeValue, Attributes, Feature, FeatureId, FeatureRef, Geometry, PointMarker},
    geojson::{parse_features, GeoJson},
};

pub use crate::layers::{
    base::LayerTrait,
    manager::LayerManager,
    style::{Color, LayerStyle, Style},
    tile::TileLayer,
    vector::VectorLayer,
};

pub use crate::input::{
    events::{InputEvent, MapEvent, MouseButton},
    handler::{Action, InputHandler},
};

pub use crate::interaction::{
    hover::{HoverChange, HoverHighlighter},
    popup::{AnchorStrategy, ClickPopup, PopupContent, PopupOverlay, PopupProfile},
    InteractionHandler, LayerControl,
};

pub use crate::spatial::index::{SpatialIndex, SpatialItem};

pub use crate::tiles::{cache::TileCache, loader::TileLoader, source::TileSource};

pub use crate::rendering::context::{DrawCommand, RenderContext};

#[cfg(feature = "egui")]
pub use crate::ui::{controls::LayerPanel, widget::MapView};

pub use crate::{Error as MapError, Result};

pub use std::sync::Arc;

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};

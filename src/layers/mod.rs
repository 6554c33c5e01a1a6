//! Everything the map draws: the OSM base layer, GeoJSON vector layers and
//! their styles, and the manager that stacks them.

#[macro_use]
pub mod macros;
pub mod base;
pub mod manager;
pub mod style;
pub mod tile;
pub mod vector;

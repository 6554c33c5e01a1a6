//! egui front end: the map view, the popup card and the layer panel.

pub mod controls;
pub mod popup;
pub mod widget;

pub use controls::LayerPanel;
pub use popup::{show_popup, PopupStyle};
pub use widget::MapView;

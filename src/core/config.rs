//! Scenario configuration
//!
//! A [`MapConfig`] describes everything one map screen needs: the initial
//! view, the base tile layer, the GeoJSON layers with their styles, the
//! checkbox toggles, and how popups and the info label read feature
//! attributes. Two presets reproduce the green-space and flood maps; any
//! other setup can be loaded from JSON.

use crate::{
    core::{
        builder::BASE_LAYER_ID,
        constants::{
            DEFAULT_HIT_TOLERANCE_PX, DEFAULT_POINT_HIT_RADIUS_PX, MAX_ZOOM, MIN_ZOOM,
            RIAU_CENTER_LON_LAT, RIAU_ZOOM,
        },
        geo::LatLng,
        map::HIGHLIGHT_LAYER_ID,
    },
    interaction::{hover::InfoProfile, popup::PopupProfile},
    layers::{
        style::{LayerStyle, Style},
        tile::TileLayerOptions,
    },
    prelude::HashSet,
    Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The two prepared map screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Districts and green-space (RTH) icons; popups open where the user clicked
    GreenSpace,
    /// Districts colored by id, RTH and flood points; popups open on the feature
    Flood,
}

impl Scenario {
    pub const ALL: [Scenario; 2] = [Scenario::GreenSpace, Scenario::Flood];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::GreenSpace => "green-space",
            Scenario::Flood => "flood",
        }
    }

    pub fn preset(&self) -> MapConfig {
        match self {
            Scenario::GreenSpace => MapConfig {
                title: "Ruang Terbuka Hijau Riau".to_string(),
                layers: vec![
                    LayerDescriptor::new(
                        "riau",
                        "Polygon Riau",
                        "data/polygon_riau.json",
                        LayerStyle::riau_polygons(),
                    ),
                    LayerDescriptor::new(
                        "rth",
                        "Ruang Terbuka Hijau",
                        "data/data_rth.json",
                        LayerStyle::rth_icons(),
                    ),
                ],
                toggles: vec![
                    ToggleDescriptor::new("polygon", "riau", "Polygon Riau"),
                    ToggleDescriptor::new("rth", "rth", "RTH"),
                ],
                popup: PopupProfile::green_space(),
                ..MapConfig::base()
            },
            Scenario::Flood => MapConfig {
                title: "Peta Banjir Riau".to_string(),
                layers: vec![
                    LayerDescriptor::new(
                        "riau",
                        "Polygon Riau",
                        "data/polygon_riau.json",
                        LayerStyle::riau_polygons_by_id(),
                    ),
                    LayerDescriptor::new(
                        "rth",
                        "Ruang Terbuka Hijau",
                        "data/data_rth.json",
                        LayerStyle::rth_icons(),
                    ),
                    LayerDescriptor::new(
                        "banjir",
                        "Titik Banjir",
                        "data/banjir.json",
                        LayerStyle::flood_icons(),
                    ),
                ],
                toggles: vec![
                    ToggleDescriptor::new("polygon", "riau", "Polygon Riau"),
                    ToggleDescriptor::new("rth", "rth", "RTH"),
                    ToggleDescriptor::new("point", "banjir", "Titik Banjir"),
                ],
                popup: PopupProfile::flood(),
                ..MapConfig::base()
            },
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.name() == s)
            .ok_or_else(|| {
                crate::Error::Config(format!(
                    "unknown scenario '{}', expected one of: green-space, flood",
                    s
                ))
            })
    }
}

/// Initial view; `center` is `[lon, lat]` like GeoJSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    pub center: [f64; 2],
    pub zoom: f64,
    #[serde(default = "ViewConfig::default_min_zoom")]
    pub min_zoom: f64,
    #[serde(default = "ViewConfig::default_max_zoom")]
    pub max_zoom: f64,
}

impl ViewConfig {
    pub fn center_lat_lng(&self) -> LatLng {
        LatLng::from_lon_lat(self.center)
    }

    fn default_min_zoom() -> f64 {
        MIN_ZOOM
    }

    fn default_max_zoom() -> f64 {
        MAX_ZOOM
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            center: RIAU_CENTER_LON_LAT,
            zoom: RIAU_ZOOM,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
        }
    }
}

/// One GeoJSON layer, stacked in declared order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    pub id: String,
    pub name: String,
    /// `http(s)://` URL or a path relative to the data root
    pub url: String,
    #[serde(default)]
    pub style: LayerStyle,
    #[serde(default = "default_true")]
    pub visible: bool,
}

impl LayerDescriptor {
    pub fn new(id: &str, name: &str, url: &str, style: LayerStyle) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            url: url.to_string(),
            style,
            visible: true,
        }
    }
}

/// A checkbox bound to one layer's visibility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToggleDescriptor {
    /// Control id, e.g. `polygon`
    pub control: String,
    /// Id of the layer it shows and hides
    pub layer: String,
    pub label: String,
}

impl ToggleDescriptor {
    pub fn new(control: &str, layer: &str, label: &str) -> Self {
        Self {
            control: control.to_string(),
            layer: layer.to_string(),
            label: label.to_string(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    pub title: String,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub base_layer: TileLayerOptions,
    pub layers: Vec<LayerDescriptor>,
    #[serde(default)]
    pub toggles: Vec<ToggleDescriptor>,
    #[serde(default)]
    pub popup: PopupProfile,
    #[serde(default)]
    pub info: InfoProfile,
    #[serde(default = "LayerStyle::highlight")]
    pub highlight_style: Style,
    #[serde(default = "MapConfig::default_hit_tolerance")]
    pub hit_tolerance_px: f64,
    #[serde(default = "MapConfig::default_point_hit_radius")]
    pub point_hit_radius_px: f64,
    /// Directory relative layer URLs and icon paths resolve against
    #[serde(default)]
    pub data_root: Option<PathBuf>,
}

impl MapConfig {
    fn base() -> Self {
        Self {
            title: String::new(),
            view: ViewConfig::default(),
            base_layer: TileLayerOptions::default(),
            layers: Vec::new(),
            toggles: Vec::new(),
            popup: PopupProfile::default(),
            info: InfoProfile::default(),
            highlight_style: LayerStyle::highlight(),
            hit_tolerance_px: Self::default_hit_tolerance(),
            point_hit_radius_px: Self::default_point_hit_radius(),
            data_root: None,
        }
    }

    fn default_hit_tolerance() -> f64 {
        DEFAULT_HIT_TOLERANCE_PX
    }

    fn default_point_hit_radius() -> f64 {
        DEFAULT_POINT_HIT_RADIUS_PX
    }

    /// Reads and validates a JSON config file. A relative `data_root` is
    /// taken relative to the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_json_str(&text)?;
        if let (Some(root), Some(dir)) = (&config.data_root, path.parent()) {
            if root.is_relative() {
                config.data_root = Some(dir.join(root));
            }
        }
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: MapConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks ids, toggle bindings and numeric ranges
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| -> Result<()> { Err(crate::Error::Config(msg).into()) };

        if !self.view.center_lat_lng().is_valid() {
            return fail(format!("invalid view center {:?}", self.view.center));
        }
        if !(self.view.min_zoom <= self.view.zoom && self.view.zoom <= self.view.max_zoom) {
            return fail(format!(
                "zoom {} outside [{}, {}]",
                self.view.zoom, self.view.min_zoom, self.view.max_zoom
            ));
        }
        if !(self.hit_tolerance_px >= 0.0 && self.point_hit_radius_px >= 0.0) {
            return fail("hit tolerances must be non-negative".to_string());
        }

        let mut layer_ids = HashSet::default();
        for layer in &self.layers {
            let reserved = [HIGHLIGHT_LAYER_ID, BASE_LAYER_ID];
            if layer.id.is_empty() || reserved.contains(&layer.id.as_str()) {
                return fail(format!("reserved or empty layer id '{}'", layer.id));
            }
            if !layer_ids.insert(layer.id.as_str()) {
                return fail(format!("duplicate layer id '{}'", layer.id));
            }
        }

        let mut controls = HashSet::default();
        for toggle in &self.toggles {
            if !controls.insert(toggle.control.as_str()) {
                return fail(format!("duplicate toggle control '{}'", toggle.control));
            }
            if !layer_ids.contains(toggle.layer.as_str()) {
                return fail(format!(
                    "toggle '{}' is bound to unknown layer '{}'",
                    toggle.control, toggle.layer
                ));
            }
        }

        Ok(())
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Scenario::GreenSpace.preset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::popup::AnchorStrategy;

    #[test]
    fn test_presets_validate() {
        for scenario in Scenario::ALL {
            let config = scenario.preset();
            config.validate().unwrap();
            assert_eq!(config.view.center, [101.4383, 0.5104]);
            assert_eq!(config.view.zoom, 9.0);
        }
    }

    #[test]
    fn test_presets_keep_scripts_apart() {
        let green = Scenario::GreenSpace.preset();
        let flood = Scenario::Flood.preset();

        assert_eq!(green.popup.anchor, AnchorStrategy::ClickCoordinate);
        assert_eq!(flood.popup.anchor, AnchorStrategy::FeatureGeometry);

        let controls = |c: &MapConfig| c.toggles.iter().map(|t| t.control.clone()).collect::<Vec<_>>();
        assert_eq!(controls(&green), vec!["polygon", "rth"]);
        assert_eq!(controls(&flood), vec!["polygon", "rth", "point"]);

        let ids = |c: &MapConfig| c.layers.iter().map(|l| l.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&green), vec!["riau", "rth"]);
        assert_eq!(ids(&flood), vec!["riau", "rth", "banjir"]);
    }

    #[test]
    fn test_scenario_names() {
        assert_eq!("flood".parse::<Scenario>().unwrap(), Scenario::Flood);
        assert_eq!(Scenario::GreenSpace.to_string(), "green-space");
        assert!("banjir".parse::<Scenario>().is_err());
    }

    #[test]
    fn test_json_round_trip_of_preset() {
        let config = Scenario::Flood.preset();
        let json = config.to_json_pretty().unwrap();
        assert_eq!(MapConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let config = MapConfig::from_json_str(
            r#"{
                "title": "Banjir",
                "layers": [{"id": "banjir", "name": "Banjir", "url": "data/banjir.json"}],
                "toggles": [{"control": "point", "layer": "banjir", "label": "Titik"}]
            }"#,
        )
        .unwrap();
        assert_eq!(config.view, ViewConfig::default());
        assert_eq!(config.hit_tolerance_px, DEFAULT_HIT_TOLERANCE_PX);
        assert_eq!(config.highlight_style, LayerStyle::highlight());
        assert!(config.layers[0].visible);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Scenario::Flood.preset();
        config.toggles.push(ToggleDescriptor::new("kebun", "sawit", "Sawit"));
        assert!(config.validate().is_err());

        let mut config = Scenario::Flood.preset();
        config.layers.push(config.layers[0].clone());
        assert!(config.validate().is_err());

        let mut config = Scenario::GreenSpace.preset();
        config.view.zoom = 30.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_resolves_data_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Scenario::GreenSpace.preset();
        config.data_root = Some(PathBuf::from("public"));
        let path = dir.path().join("riau.json");
        std::fs::write(&path, config.to_json_pretty().unwrap()).unwrap();

        let loaded = MapConfig::load(&path).unwrap();
        assert_eq!(loaded.data_root, Some(dir.path().join("public")));
    }
}

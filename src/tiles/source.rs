use crate::core::geo::TileCoord;

/// Default OpenStreetMap raster tile template.
pub const OSM_TEMPLATE: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Trait representing anything that can produce tile URLs for a given coordinate.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested `coord`.
    fn url(&self, coord: TileCoord) -> String;
}

/// XYZ tile source driven by a URL template with `{s}`, `{z}`, `{x}`, `{y}`
/// placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSource {
    template: String,
    subdomains: Vec<String>,
}

impl TemplateSource {
    pub fn new(template: impl Into<String>, subdomains: Vec<String>) -> Self {
        Self {
            template: template.into(),
            subdomains,
        }
    }

    /// The standard OpenStreetMap servers `a`, `b`, `c`
    pub fn openstreetmap() -> Self {
        Self::new(
            OSM_TEMPLATE,
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
        )
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

impl Default for TemplateSource {
    fn default() -> Self {
        Self::openstreetmap()
    }
}

impl TileSource for TemplateSource {
    fn url(&self, coord: TileCoord) -> String {
        let url = self
            .template
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string());

        // Spread requests over subdomains deterministically
        if self.subdomains.is_empty() {
            return url.replace("{s}.", "").replace("{s}", "");
        }
        let idx = ((coord.x + coord.y) % self.subdomains.len() as u32) as usize;
        url.replace("{s}", &self.subdomains[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_osm_urls_rotate_subdomains() {
        let source = TemplateSource::openstreetmap();
        assert_eq!(
            source.url(TileCoord::new(404, 254, 9)),
            "https://a.tile.openstreetmap.org/9/404/254.png"
        );
        assert_eq!(
            source.url(TileCoord::new(405, 254, 9)),
            "https://b.tile.openstreetmap.org/9/405/254.png"
        );
    }

    #[test]
    fn test_template_without_subdomains() {
        let source = TemplateSource::new("https://{s}.example.org/{z}/{x}/{y}.png", vec![]);
        assert_eq!(
            source.url(TileCoord::new(1, 2, 3)),
            "https://example.org/3/1/2.png"
        );
    }
}

//! Background GeoJSON fetching.
//!
//! Sources are either `http(s)://` URLs, fetched with the shared blocking
//! client, or paths read from disk relative to a data root. Each load runs on
//! its own detached thread and reports back over a channel; the map applies
//! results on the UI thread.

use crate::{
    data::{feature::Feature, geojson::parse_features},
    tiles::loader::fetch_bytes,
    Result,
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::{Path, PathBuf};
use std::thread;

/// Where a layer's GeoJSON comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Remote(String),
    File(PathBuf),
}

impl SourceLocation {
    /// Remote URLs are kept as-is, relative paths are joined onto `root`
    pub fn resolve(url: &str, root: &Path) -> Self {
        if url.starts_with("http://") || url.starts_with("https://") {
            SourceLocation::Remote(url.to_string())
        } else {
            let path = Path::new(url);
            if path.is_absolute() {
                SourceLocation::File(path.to_path_buf())
            } else {
                SourceLocation::File(root.join(path))
            }
        }
    }

    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        match self {
            SourceLocation::Remote(url) => fetch_bytes(url),
            SourceLocation::File(path) => Ok(std::fs::read(path)?),
        }
    }
}

/// Fetches and parses one source on the current thread
pub fn load_features(location: &SourceLocation) -> Result<Vec<Feature>> {
    let bytes = location.read_bytes()?;
    let text = String::from_utf8(bytes)
        .map_err(|e| crate::Error::ParseError(format!("GeoJSON is not UTF-8: {}", e)))?;
    parse_features(&text)
}

/// A finished background load
#[derive(Debug)]
pub struct LoadOutcome {
    pub layer_id: String,
    pub result: Result<Vec<Feature>>,
}

/// Runs GeoJSON loads on detached threads
pub struct SourceLoader {
    tx: Sender<LoadOutcome>,
    rx: Receiver<LoadOutcome>,
    in_flight: usize,
}

impl SourceLoader {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx, in_flight: 0 }
    }

    pub fn spawn(&mut self, layer_id: impl Into<String>, location: SourceLocation) {
        let layer_id = layer_id.into();
        let tx = self.tx.clone();
        self.in_flight += 1;

        log::debug!("loading layer '{}' from {:?}", layer_id, location);
        thread::spawn(move || {
            let result = load_features(&location);
            let _ = tx.send(LoadOutcome { layer_id, result });
        });
    }

    /// Completed loads since the last call
    pub fn drain(&mut self) -> Vec<LoadOutcome> {
        let done: Vec<_> = self.rx.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(done.len());
        done
    }

    /// Blocks until every spawned load has reported
    pub fn wait_all(&mut self) -> Vec<LoadOutcome> {
        let mut done = Vec::with_capacity(self.in_flight);
        while self.in_flight > 0 {
            match self.rx.recv() {
                Ok(outcome) => {
                    self.in_flight -= 1;
                    done.push(outcome);
                }
                Err(_) => break,
            }
        }
        done
    }

    pub fn pending(&self) -> usize {
        self.in_flight
    }
}

impl Default for SourceLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RTH: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"nama": "Taman Kota"},
         "geometry": {"type": "Point", "coordinates": [101.45, 0.51]}}
    ]}"#;

    #[test]
    fn test_resolve_locations() {
        let root = Path::new("/srv/riau");
        assert_eq!(
            SourceLocation::resolve("data/banjir.json", root),
            SourceLocation::File(PathBuf::from("/srv/riau/data/banjir.json"))
        );
        assert_eq!(
            SourceLocation::resolve("https://example.org/data/banjir.json", root),
            SourceLocation::Remote("https://example.org/data/banjir.json".to_string())
        );
        assert_eq!(
            SourceLocation::resolve("/tmp/x.json", root),
            SourceLocation::File(PathBuf::from("/tmp/x.json"))
        );
    }

    #[test]
    fn test_background_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data/data_rth.json"), RTH).unwrap();

        let mut loader = SourceLoader::new();
        loader.spawn("rth", SourceLocation::resolve("data/data_rth.json", dir.path()));
        loader.spawn("missing", SourceLocation::resolve("data/nope.json", dir.path()));

        let mut outcomes = loader.wait_all();
        outcomes.sort_by(|a, b| a.layer_id.cmp(&b.layer_id));
        assert_eq!(loader.pending(), 0);
        assert_eq!(outcomes.len(), 2);

        assert_eq!(outcomes[0].layer_id, "missing");
        assert!(outcomes[0].result.is_err());

        assert_eq!(outcomes[1].layer_id, "rth");
        let features = outcomes[1].result.as_ref().unwrap();
        assert_eq!(features[0].attributes.text("nama").as_deref(), Some("Taman Kota"));
    }
}

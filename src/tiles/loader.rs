use super::source::TileSource;
use crate::core::geo::TileCoord;
use crate::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use once_cell::sync::Lazy;
use reqwest::blocking::Client;
use std::thread;

/// Shared blocking HTTP client. Public tile servers (OpenStreetMap) reject
/// requests without a User-Agent.
pub(crate) static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent(concat!("riau-map/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            log::error!("failed to configure HTTP client, using defaults: {}", e);
            Client::new()
        })
});

/// Fetches a URL with the shared client and returns the body bytes
pub(crate) fn fetch_bytes(url: &str) -> Result<Vec<u8>> {
    let resp = HTTP_CLIENT.get(url).send()?;
    if !resp.status().is_success() {
        return Err(crate::Error::Layer(format!("HTTP {} for {}", resp.status(), url)).into());
    }
    Ok(resp.bytes()?.to_vec())
}

/// Outcome of one tile download; `None` once every attempt failed
pub type TileResult = (TileCoord, Option<Vec<u8>>);

/// Tile loader that fetches tiles on detached threads and reports each
/// outcome back over a channel.
pub struct TileLoader {
    tx: Sender<TileResult>,
    rx: Receiver<TileResult>,
}

impl TileLoader {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Start downloading the specified tile without blocking the caller.
    /// Failed downloads are retried once, then reported as failed.
    pub fn start_download(&self, source: &dyn TileSource, coord: TileCoord) {
        let url = source.url(coord);
        let tx = self.tx.clone();

        thread::spawn(move || {
            const MAX_ATTEMPTS: usize = 2;
            for attempt in 1..=MAX_ATTEMPTS {
                log::debug!("fetch tile {:?} attempt {}", coord, attempt);
                match fetch_bytes(&url) {
                    Ok(data) => {
                        log::debug!("downloaded tile {:?} ({} bytes)", coord, data.len());
                        let _ = tx.send((coord, Some(data)));
                        return;
                    }
                    Err(e) => {
                        log::warn!(
                            "tile {:?} download failed on attempt {}: {}",
                            coord,
                            attempt,
                            e
                        );
                        if attempt < MAX_ATTEMPTS {
                            thread::sleep(std::time::Duration::from_millis(100));
                        }
                    }
                }
            }
            let _ = tx.send((coord, None));
        });
    }

    /// Finished downloads, successful or not, since the last call
    pub fn drain(&self) -> Vec<TileResult> {
        self.rx.try_iter().collect()
    }
}

impl Default for TileLoader {
    fn default() -> Self {
        Self::new()
    }
}

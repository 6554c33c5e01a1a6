pub mod cache;
pub mod loader;
pub mod source;

// Re-exports for convenience
pub use cache::TileCache;
pub use loader::TileLoader;
pub use source::{TemplateSource, TileSource};

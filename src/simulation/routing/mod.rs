pub mod dijkstra;
pub mod path_cache;

pub use dijkstra::ShortestPathTree;
pub use path_cache::{CacheStats, CachedPath, PathCache};

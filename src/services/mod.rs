pub mod cache;
pub mod geodata;
pub mod poi;
pub mod snapshot;

pub use cache::{CacheKey, CacheManager};
pub use geodata::GeodataClient;
pub use poi::PoiClient;
pub use snapshot::SnapshotStore;

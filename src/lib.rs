pub mod app;
pub mod client;
pub mod domain;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::marketplace::{MarketplaceService, ServiceError};
pub use infra::config::Config;
pub use storage::{MemoryStore, Store, StoreError, SupabaseStore};

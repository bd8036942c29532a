// Infrastructure - storage, caching, messaging and request context

pub mod cache;              // LRU cache wrapper
pub mod database;           // SQLite pool and schema
pub mod events;             // Comment event bus
pub mod middleware;         // ViewerContext middleware and extractor
pub mod viewer;             // Viewer context

pub use cache::Cache;
pub use database::ForumDatabase;
pub use events::{EventBus, EventPublisher};
pub use middleware::{viewer_context_middleware, Vc};
pub use viewer::ViewerContext;

/// Current wall-clock time in epoch milliseconds
pub fn current_time_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// Forum services - comment and user services of a forum platform

// Storage, caching, messaging and request context
pub mod infrastructure;

// Records, payloads and views
pub mod models;

// Comment and user services
pub mod domains;

// Wiring
pub mod app_state;
pub mod config;

// Common utilities
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};

pub mod counters;
pub mod directory;
pub mod repository;
pub mod routes;
pub mod service;

pub use counters::{apply_comment_event, spawn_comment_counter_listener};
pub use directory::LocalUserDirectory;
pub use repository::UserRepository;
pub use routes::create_user_router;
pub use service::UserService;

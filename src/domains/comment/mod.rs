pub mod collaborators;
pub mod repository;
pub mod routes;
pub mod service;
pub mod thread;

pub use collaborators::{PostDirectory, SqlPostDirectory, UserDirectory};
pub use repository::CommentRepository;
pub use routes::create_comment_router;
pub use service::CommentService;
pub use thread::{assemble, ThreadError};

// ViewerContext middleware and extractor
// Keeps header parsing out of the handlers

pub mod viewer_context_extractor;
pub mod viewer_context_middleware;

pub use viewer_context_extractor::Vc;
pub use viewer_context_middleware::*;

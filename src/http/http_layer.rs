// HTTP layer - axum routes and request handlers.

#[path = "handlers.rs"]
pub mod handlers;

#[path = "routes.rs"]
pub mod routes;

// Re-export for convenience
pub use routes::{router, AppContext};

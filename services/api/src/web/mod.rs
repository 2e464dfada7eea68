pub mod protocol;
pub mod rest;
pub mod state;

// Re-export the router so the binary can mount it.
pub use rest::{routes, ApiDoc};
pub use state::AppState;

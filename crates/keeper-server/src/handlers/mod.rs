//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod audit;
pub mod auth;
pub mod categories;
pub mod export;
pub mod income;
pub mod notes;
pub mod savings;
pub mod statistics;
pub mod user;

// Re-export all handlers for use in router
pub use audit::*;
pub use auth::*;
pub use categories::*;
pub use export::*;
pub use income::*;
pub use notes::*;
pub use savings::*;
pub use statistics::*;
pub use user::*;

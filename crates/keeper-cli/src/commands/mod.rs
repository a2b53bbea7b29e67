//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init, seed) and shared utilities (open_db, local_user)
//! - `budget` - Budget period engine commands (check, spend)
//! - `categories` - Category commands (list, history, undo, set-allocation)
//! - `export` - Encrypted export and decryption
//! - `serve` - Web server command
//! - `status` - Status and reset-data commands
//! - `users` - Local user credentials and preferences

pub mod budget;
pub mod categories;
pub mod core;
pub mod export;
pub mod serve;
pub mod status;
pub mod users;

// Re-export command functions for main.rs
pub use budget::*;
pub use categories::*;
pub use core::*;
pub use export::*;
pub use serve::*;
pub use status::*;
pub use users::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Format an amount with two decimals and its currency code
pub fn format_money(amount: f64, currency: &str) -> String {
    format!("{:.2} {}", amount, currency)
}

//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `local_user` - The single user the CLI acts as
//! - `cmd_init` - Initialize the database
//! - `cmd_seed` - Fill in demo data

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use keeper_core::db::Database;
use keeper_core::models::User;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// The local user, created on first use
pub fn local_user(db: &Database) -> Result<User> {
    db.ensure_local_user().context("Failed to load local user")
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;
    init_user(&db)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Try it with demo data: keeper seed");
    println!("  2. Set a login: keeper user set-password --username you");
    println!("  3. Start web UI: keeper serve");

    Ok(())
}

/// Create the local user and anchor its first budget period
pub(crate) fn init_user(db: &Database) -> Result<User> {
    let user = local_user(db)?;
    println!("   Local user: #{}", user.id);

    // Without an anchor a fresh user would never be reset
    if user.last_reset_date.is_none() {
        let period_start = db
            .mark_period_started(user.id, Utc::now())
            .context("Failed to start the first budget period")?;
        println!("   Budget period started: {}", period_start.format("%Y-%m-%d"));
    }

    Ok(user)
}

pub fn cmd_seed(db: &Database) -> Result<()> {
    let user = local_user(db)?;
    let summary = db
        .seed_demo_data(user.id, Utc::now().date_naive())
        .context("Failed to seed demo data")?;

    println!("🌱 Seeded demo data");
    println!("   Categories: {}", summary.categories);
    println!("   Notes: {}", summary.notes);
    println!("   Expenses: {}", summary.expenses);
    println!("   Income sources: {}", summary.income_sources);

    Ok(())
}

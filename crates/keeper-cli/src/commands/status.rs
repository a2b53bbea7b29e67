//! Status-related command implementations (status, reset-data)

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use keeper_core::budget::next_reset_date;

use super::open_db;

pub fn cmd_status(db_path: &Path, no_encrypt: bool) -> Result<()> {
    use keeper_core::db::DB_KEY_ENV;
    use std::fs;

    println!();
    println!("📊 Keeper Status");
    println!("   ─────────────────────────────────────────────────────────────");

    println!("   Database: {}", db_path.display());

    if db_path.exists() {
        if let Ok(metadata) = fs::metadata(db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (database not initialized)");
    }

    let has_key = std::env::var(DB_KEY_ENV).is_ok();
    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if has_key {
        println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV);
    } else {
        println!("   ❌ Encryption: REQUIRED but {} not set", DB_KEY_ENV);
    }

    if db_path.exists() {
        match open_db(db_path, no_encrypt) {
            Ok(db) => {
                if let Ok(counts) = db.table_counts() {
                    println!();
                    for (table, count) in counts {
                        println!("   {:<22} {}", table, count);
                    }
                }
                if let Ok(user) = db.ensure_local_user() {
                    let prefs = &user.preferences;
                    println!();
                    match user.last_reset_date {
                        Some(date) => println!("   Period started: {}", date.format("%Y-%m-%d")),
                        None => println!("   Period started: (never, run 'keeper init')"),
                    }
                    println!(
                        "   Next reset: {} (day {})",
                        next_reset_date(Utc::now(), prefs.reset_day).format("%Y-%m-%d"),
                        prefs.reset_day
                    );
                    println!(
                        "   Auto-adjust: {}",
                        if prefs.auto_adjust_budgets { "on" } else { "off" }
                    );
                }
            }
            Err(e) => {
                println!();
                println!("   ❌ Error opening database: {}", e);
                if !no_encrypt && !has_key {
                    println!("      Set {} or use --no-encrypt", DB_KEY_ENV);
                } else if has_key {
                    println!("      (Check if {} is correct)", DB_KEY_ENV);
                }
            }
        }
    }

    println!();
    Ok(())
}

/// Clear the local user's recorded activity
pub fn cmd_reset_data(db_path: &Path, yes: bool, no_encrypt: bool) -> Result<()> {
    use std::io::{self, Write};

    if !db_path.exists() {
        anyhow::bail!("Database not found: {}", db_path.display());
    }

    if !yes {
        print!("⚠️  This will delete all expenses, notes, income, contributions and history.\n");
        print!("   Categories, allocations and savings goals will be preserved.\n\n");
        print!("Are you sure? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let db = open_db(db_path, no_encrypt)?;
    let user = super::local_user(&db)?;
    db.reset_user_data(user.id)?;
    db.log_audit(Some(user.id), "reset", Some("user_data"), Some(user.id), Some("cli"))?;

    println!("✅ Data reset complete.");
    println!("   Cleared: expenses, notes, income, contributions, history");
    println!("   Preserved: categories, allocations, savings goals");

    Ok(())
}

//! Local user commands (show, set-password, prefs)

use anyhow::{Context, Result};
use keeper_core::auth::{hash_password, normalize_username, MIN_PASSWORD_LEN};
use keeper_core::db::Database;
use keeper_core::models::{PreferencesUpdate, Theme, User};
use keeper_core::ResetDay;

use super::local_user;

fn print_user(user: &User) {
    let prefs = &user.preferences;
    println!();
    println!("👤 User #{}", user.id);
    println!("   ─────────────────────────────");
    if let Some(name) = &user.display_name {
        println!("   Name: {}", name);
    }
    println!(
        "   Login: {}",
        user.username.as_deref().unwrap_or("(not set)")
    );
    println!("   Currency: {}", prefs.currency);
    println!("   Theme: {}", prefs.theme);
    println!(
        "   Auto-adjust budgets: {}",
        if prefs.auto_adjust_budgets { "on" } else { "off" }
    );
    println!("   Reset day: {}", prefs.reset_day);
}

pub fn cmd_user_show(db: &Database) -> Result<()> {
    let user = local_user(db)?;
    print_user(&user);
    Ok(())
}

/// Read a password from stdin
pub fn prompt_password() -> Result<String> {
    use std::io::{self, Write};

    print!("Password: ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

pub fn cmd_user_set_password(db: &Database, username: &str, password: &str) -> Result<()> {
    let username = normalize_username(username);
    if username.is_empty() {
        anyhow::bail!("Username is required");
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        anyhow::bail!("Password must be at least {} characters", MIN_PASSWORD_LEN);
    }

    let user = local_user(db)?;
    let hash = hash_password(password).context("Failed to hash password")?;
    db.set_credentials(user.id, &username, &hash)?;
    db.log_audit(Some(user.id), "set_password", Some("user"), Some(user.id), Some("cli"))?;

    println!("✅ Login set for '{}'", username);
    Ok(())
}

pub fn cmd_user_prefs(
    db: &Database,
    reset_day: Option<&str>,
    auto_adjust: Option<bool>,
    currency: Option<String>,
    theme: Option<&str>,
) -> Result<()> {
    let update = PreferencesUpdate {
        currency,
        theme: theme
            .map(|t| t.parse::<Theme>())
            .transpose()
            .map_err(|e| anyhow::anyhow!(e))?,
        auto_adjust_budgets: auto_adjust,
        reset_day: reset_day.map(|d| d.parse::<ResetDay>()).transpose()?,
    };

    let user = local_user(db)?;
    let user = db.update_preferences(user.id, &update)?;

    println!("✅ Preferences updated");
    print_user(&user);
    Ok(())
}

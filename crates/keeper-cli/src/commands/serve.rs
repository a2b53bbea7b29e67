//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use super::{init_user, open_db};

/// Parse a comma-separated environment variable into trimmed, non-empty values
pub fn env_list(name: &str) -> Vec<String> {
    std::env::var(name)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_auth: bool,
    insecure_cookies: bool,
    no_encrypt: bool,
    static_dir: Option<&Path>,
) -> Result<()> {
    println!("🚀 Starting Keeper web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }

    let api_keys = env_list("KEEPER_API_KEYS");
    let allowed_origins = env_list("KEEPER_ALLOWED_ORIGINS");

    let mut config = keeper_server::ServerConfig {
        require_auth: !no_auth,
        allowed_origins,
        api_keys,
        secure_cookies: !insecure_cookies,
        ..Default::default()
    };

    match std::env::var("KEEPER_SESSION_SECRET")
        .ok()
        .filter(|s| !s.is_empty())
    {
        Some(secret) => config.session_secret = secret.into_bytes(),
        None => {
            warn!("KEEPER_SESSION_SECRET not set, sessions will not survive a restart");
        }
    }

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else {
        println!("   🔒 Authentication: session login");
        if !config.api_keys.is_empty() {
            println!(
                "   🔑 API keys: {} configured (KEEPER_API_KEYS)",
                config.api_keys.len()
            );
        }
        if !config.allowed_origins.is_empty() {
            println!(
                "   🌐 Allowed origins: {} (KEEPER_ALLOWED_ORIGINS)",
                config.allowed_origins.join(", ")
            );
        }
        if insecure_cookies {
            println!("   ⚠️  Session cookie sent without Secure (--insecure-cookies)");
        }
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    // Idempotent: creates the local user and anchors its period on first run
    init_user(&db)?;

    let static_dir_str = static_dir
        .map(|p| p.to_str().context("static_dir path must be valid UTF-8"))
        .transpose()?;
    keeper_server::serve(db, host, port, static_dir_str, config).await?;

    Ok(())
}

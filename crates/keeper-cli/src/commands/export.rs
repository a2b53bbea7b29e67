//! Encrypted export commands

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use keeper_core::db::Database;
use keeper_core::export::{decrypt_export, export_encrypted};
use keeper_core::{DecryptedExport, EncryptedExport, ExportFormat};

use super::local_user;

pub fn cmd_export(
    db: &Database,
    format: ExportFormat,
    output: &Path,
    passphrase: &str,
) -> Result<()> {
    let user = local_user(db)?;
    let export = export_encrypted(db, user.id, format, passphrase)?;

    let json = serde_json::to_string_pretty(&export)?;
    fs::write(output, json)
        .with_context(|| format!("Failed to write export: {}", output.display()))?;

    db.log_audit(
        Some(user.id),
        "export",
        Some("user_data"),
        Some(user.id),
        Some(&format!("format={}, cli", format.as_str())),
    )?;

    println!(
        "🔐 Encrypted {} export written to {}",
        format.as_str(),
        output.display()
    );
    println!("   Keep the passphrase: it is the only way to read this file.");
    Ok(())
}

pub fn cmd_export_decrypt(input: &Path, output: Option<&Path>, passphrase: &str) -> Result<()> {
    let raw = fs::read_to_string(input)
        .with_context(|| format!("Failed to read export: {}", input.display()))?;
    let export: EncryptedExport =
        serde_json::from_str(&raw).context("File is not a Keeper export")?;

    let plaintext = match decrypt_export(&export, passphrase)? {
        DecryptedExport::Json(dataset) => serde_json::to_string_pretty(&dataset)?,
        DecryptedExport::Csv(csv) => csv,
    };

    match output {
        Some(path) => {
            fs::write(path, &plaintext)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("🔓 Decrypted export written to {}", path.display());
        }
        None => println!("{}", plaintext),
    }
    Ok(())
}

//! Keeper Core Library
//!
//! Shared functionality for the Keeper personal finance tracker:
//! - Database access and migrations
//! - Budget period engine (monthly resets, overdraw / auto-adjust rule)
//! - Expense, income and savings bookkeeping
//! - Spending statistics
//! - Passphrase-encrypted data export
//! - Password hashing for local logins

pub mod auth;
pub mod budget;
pub mod crypto;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod money;

pub use budget::{check_and_reset_budgets, check_and_reset_budgets_at, ResetDay};
pub use db::{AuditEntry, Database};
pub use error::{Error, Result};
pub use export::{DecryptedExport, EncryptedExport, ExportDataset, ExportFormat};

//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Keeper - Budget by category, reset every month
#[derive(Parser)]
#[command(name = "keeper")]
#[command(about = "Self-hosted personal finance tracker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "keeper.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set KEEPER_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and the local user
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, every API route except login and health needs a session
        /// or an API key.
        #[arg(long)]
        no_auth: bool,

        /// Send the session cookie without the Secure attribute (plain HTTP)
        #[arg(long)]
        insecure_cookies: bool,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Show database status (encryption, size, row counts)
    Status,

    /// Fill the local user's account with demo categories and expenses
    Seed,

    /// Manage the local user (credentials, preferences)
    User {
        #[command(subcommand)]
        action: Option<UserAction>,
    },

    /// Manage categories (list, history, undo, set-allocation)
    Categories {
        #[command(subcommand)]
        action: Option<CategoriesAction>,
    },

    /// Run the budget period engine by hand
    Budget {
        #[command(subcommand)]
        action: BudgetAction,
    },

    /// Create or decrypt a passphrase-encrypted export
    Export {
        #[command(subcommand)]
        export_type: ExportType,
    },

    /// Clear expenses, notes, income and history (categories are kept)
    ResetData {
        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Show the local user and preferences
    Show,

    /// Set the login name and password for password login
    SetPassword {
        /// Login name (case-insensitive)
        #[arg(short, long)]
        username: String,

        /// Password (prompted on stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Update preferences
    Prefs {
        /// Day of month on which budgets reset (1-29)
        #[arg(long)]
        reset_day: Option<String>,

        /// Raise allocations automatically when spending exceeds them
        #[arg(long)]
        auto_adjust: Option<bool>,

        /// Default currency (3-letter code)
        #[arg(long)]
        currency: Option<String>,

        /// UI theme: light, dark, system
        #[arg(long)]
        theme: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CategoriesAction {
    /// List categories with allocation and spending
    List,

    /// Show allocation history
    History {
        /// Category ID (all categories when omitted)
        id: Option<i64>,

        /// Maximum entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Undo the latest history entry of a category
    Undo {
        /// Category ID
        id: i64,
    },

    /// Manually change a category's allocation
    SetAllocation {
        /// Category ID
        id: i64,

        /// New allocated amount
        amount: f64,
    },
}

#[derive(Subcommand)]
pub enum BudgetAction {
    /// Start a new budget period now if one is due
    Check,

    /// Apply a spending delta to a category (negative to refund)
    Spend {
        /// Category ID
        category: i64,

        /// Signed amount
        #[arg(allow_hyphen_values = true)]
        delta: f64,
    },
}

#[derive(Subcommand)]
pub enum ExportType {
    /// Export all data as encrypted JSON
    Json {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Passphrase (at least 8 characters)
        #[arg(long, env = "KEEPER_EXPORT_PASSPHRASE")]
        passphrase: String,
    },

    /// Export all data as encrypted CSV rows
    Csv {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Passphrase (at least 8 characters)
        #[arg(long, env = "KEEPER_EXPORT_PASSPHRASE")]
        passphrase: String,
    },

    /// Decrypt an export file
    Decrypt {
        /// Encrypted export file
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the plaintext (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Passphrase the export was created with
        #[arg(long, env = "KEEPER_EXPORT_PASSPHRASE")]
        passphrase: String,
    },
}

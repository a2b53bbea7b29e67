//! Keeper CLI - Personal finance tracker
//!
//! Usage:
//!   keeper init                  Initialize database
//!   keeper seed                  Add demo categories and expenses
//!   keeper budget check          Run the monthly reset check
//!   keeper serve --port 3000     Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            no_auth,
            insecure_cookies,
            static_dir,
        } => {
            commands::cmd_serve(
                &cli.db,
                &host,
                port,
                no_auth,
                insecure_cookies,
                cli.no_encrypt,
                static_dir.as_deref(),
            )
            .await
        }
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt),
        Commands::Seed => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_seed(&db)
        }
        Commands::User { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(UserAction::Show) => commands::cmd_user_show(&db),
                Some(UserAction::SetPassword { username, password }) => {
                    let password = match password {
                        Some(p) => p,
                        None => commands::prompt_password()?,
                    };
                    commands::cmd_user_set_password(&db, &username, &password)
                }
                Some(UserAction::Prefs {
                    reset_day,
                    auto_adjust,
                    currency,
                    theme,
                }) => commands::cmd_user_prefs(
                    &db,
                    reset_day.as_deref(),
                    auto_adjust,
                    currency,
                    theme.as_deref(),
                ),
            }
        }
        Commands::Categories { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(CategoriesAction::List) => commands::cmd_categories_list(&db),
                Some(CategoriesAction::History { id, limit }) => {
                    commands::cmd_categories_history(&db, id, limit)
                }
                Some(CategoriesAction::Undo { id }) => commands::cmd_categories_undo(&db, id),
                Some(CategoriesAction::SetAllocation { id, amount }) => {
                    commands::cmd_categories_set_allocation(&db, id, amount)
                }
            }
        }
        Commands::Budget { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                BudgetAction::Check => commands::cmd_budget_check(&db),
                BudgetAction::Spend { category, delta } => {
                    commands::cmd_budget_spend(&db, category, delta)
                }
            }
        }
        Commands::Export { export_type } => match export_type {
            ExportType::Json { output, passphrase } => {
                let db = commands::open_db(&cli.db, cli.no_encrypt)?;
                commands::cmd_export(&db, keeper_core::ExportFormat::Json, &output, &passphrase)
            }
            ExportType::Csv { output, passphrase } => {
                let db = commands::open_db(&cli.db, cli.no_encrypt)?;
                commands::cmd_export(&db, keeper_core::ExportFormat::Csv, &output, &passphrase)
            }
            ExportType::Decrypt {
                input,
                output,
                passphrase,
            } => commands::cmd_export_decrypt(&input, output.as_deref(), &passphrase),
        },
        Commands::ResetData { yes } => commands::cmd_reset_data(&cli.db, yes, cli.no_encrypt),
    }
}

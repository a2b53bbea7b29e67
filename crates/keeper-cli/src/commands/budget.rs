//! Budget period engine commands

use anyhow::{Context, Result};
use chrono::Utc;
use keeper_core::budget::{check_and_reset_budgets, next_reset_date};
use keeper_core::db::Database;
use keeper_core::models::CategoryStatus;

use super::{format_money, local_user};

/// Run the reset check now
///
/// Unlike the server's read path, errors are reported instead of swallowed.
pub fn cmd_budget_check(db: &Database) -> Result<()> {
    let user = local_user(db)?;
    let now = Utc::now();

    match db.reset_budgets_if_due(user.id, now)? {
        Some(summary) => {
            println!(
                "🔄 New budget period started {}",
                summary.period_start.format("%Y-%m-%d")
            );
            println!("   Categories reset: {}", summary.categories_reset);
        }
        None => match user.last_reset_date {
            Some(_) => println!("✅ No reset due"),
            None => println!("💡 No budget period yet. Run 'keeper init' to start one."),
        },
    }

    println!(
        "   Next reset: {}",
        next_reset_date(now, user.preferences.reset_day).format("%Y-%m-%d")
    );
    Ok(())
}

pub fn cmd_budget_spend(db: &Database, category_id: i64, delta: f64) -> Result<()> {
    let user = local_user(db)?;
    if let Some(summary) = check_and_reset_budgets(db, user.id) {
        println!(
            "🔄 New budget period started {}",
            summary.period_start.format("%Y-%m-%d")
        );
    }

    let category = db
        .apply_spend_delta(
            user.id,
            category_id,
            delta,
            user.preferences.auto_adjust_budgets,
        )
        .with_context(|| format!("Failed to apply spend to category {}", category_id))?;

    let currency = &user.preferences.currency;
    println!(
        "💸 {}: spent {} of {}",
        category.name,
        format_money(category.spent_total, currency),
        format_money(category.allocated_amount, currency)
    );
    match category.status {
        CategoryStatus::Adjusted => println!("   📈 Allocation raised to match spending"),
        CategoryStatus::Overdrawn => println!(
            "   🔴 Overdrawn by {}",
            format_money(category.overdrawn_amount, currency)
        ),
        CategoryStatus::Healthy => {}
    }
    Ok(())
}

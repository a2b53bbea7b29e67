//! Category command implementations

use anyhow::{Context, Result};
use keeper_core::db::Database;
use keeper_core::models::{CategoryStatus, CategoryUpdate};

use super::{format_money, local_user, truncate};

pub fn cmd_categories_list(db: &Database) -> Result<()> {
    let user = local_user(db)?;
    let currency = &user.preferences.currency;
    let categories = db.list_categories(user.id)?;

    if categories.is_empty() {
        println!("No categories yet. Add demo data with:");
        println!("  keeper seed");
        return Ok(());
    }

    println!();
    println!("📂 Categories");
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:>4}  {:<20} {:>14} {:>14}  Status",
        "ID", "Name", "Allocated", "Spent"
    );

    for category in categories {
        let status = match category.status {
            CategoryStatus::Healthy => "✅ healthy".to_string(),
            CategoryStatus::Adjusted => "📈 adjusted".to_string(),
            CategoryStatus::Overdrawn => format!(
                "🔴 overdrawn by {}",
                format_money(category.overdrawn_amount, currency)
            ),
        };
        println!(
            "   {:>4}  {:<20} {:>14} {:>14}  {}",
            category.id,
            truncate(&category.name, 20),
            format_money(category.allocated_amount, currency),
            format_money(category.spent_total, currency),
            status
        );
    }

    Ok(())
}

pub fn cmd_categories_history(db: &Database, category_id: Option<i64>, limit: usize) -> Result<()> {
    let user = local_user(db)?;
    let history = db.list_history(user.id, category_id)?;

    if history.is_empty() {
        println!("No history entries.");
        return Ok(());
    }

    println!();
    println!("📜 Allocation history");
    println!("   ─────────────────────────────────────────────────────────────");

    for entry in history.iter().take(limit) {
        println!(
            "   #{:<5} {}  category {:<4} {:<14} {:>10.2} → {:<10.2}",
            entry.id,
            entry.at.format("%Y-%m-%d %H:%M"),
            entry.category_id,
            entry.reason.as_str(),
            entry.old_amount,
            entry.new_amount
        );
    }
    if history.len() > limit {
        println!("   ... {} more", history.len() - limit);
    }

    Ok(())
}

pub fn cmd_categories_undo(db: &Database, category_id: i64) -> Result<()> {
    let user = local_user(db)?;
    let category = db
        .undo_last_history(user.id, category_id)
        .with_context(|| format!("Failed to undo history for category {}", category_id))?;

    println!(
        "↩️  {} restored to {}",
        category.name,
        format_money(category.allocated_amount, &user.preferences.currency)
    );
    Ok(())
}

pub fn cmd_categories_set_allocation(db: &Database, category_id: i64, amount: f64) -> Result<()> {
    let user = local_user(db)?;
    let current = db
        .get_category(user.id, category_id)?
        .with_context(|| format!("Category {} not found", category_id))?;

    let category = db.update_category(
        user.id,
        category_id,
        &CategoryUpdate {
            name: current.name,
            color: current.color,
            icon: current.icon,
            allocated_amount: amount,
        },
    )?;

    let currency = &user.preferences.currency;
    println!(
        "✅ {} allocation set to {}",
        category.name,
        format_money(category.allocated_amount, currency)
    );
    if category.status == CategoryStatus::Overdrawn {
        println!(
            "   🔴 Overdrawn by {}",
            format_money(category.overdrawn_amount, currency)
        );
    }
    Ok(())
}

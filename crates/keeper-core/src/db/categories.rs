//! Category CRUD and allocation history

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use super::{format_datetime, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Category, HistoryEntry, HistoryReason, NewCategory};
use crate::money::round_cents;

pub(crate) const CATEGORY_COLUMNS: &str =
    "id, name, color, icon, allocated_amount, spent_total, status, overdrawn_amount, updated_at";

pub(crate) fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    let status: String = row.get(6)?;
    let updated_at: String = row.get(8)?;

    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        icon: row.get(3)?,
        allocated_amount: row.get(4)?,
        spent_total: row.get(5)?,
        status: status.parse().unwrap_or_default(),
        overdrawn_amount: row.get(7)?,
        updated_at: parse_datetime(&updated_at),
    })
}

fn history_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
    let at: String = row.get(2)?;
    let reason: String = row.get(5)?;

    Ok(HistoryEntry {
        id: row.get(0)?,
        category_id: row.get(1)?,
        at: parse_datetime(&at),
        old_amount: row.get(3)?,
        new_amount: row.get(4)?,
        // Only ever written from the enum
        reason: reason.parse().unwrap_or(HistoryReason::ManualAdjust),
    })
}

/// Load a category owned by `user_id`
pub(crate) fn load_category(
    conn: &Connection,
    user_id: i64,
    category_id: i64,
) -> Result<Option<Category>> {
    let category = conn
        .query_row(
            &format!(
                "SELECT {} FROM categories WHERE id = ? AND user_id = ?",
                CATEGORY_COLUMNS
            ),
            params![category_id, user_id],
            category_from_row,
        )
        .optional()?;
    Ok(category)
}

/// Append a history entry
pub(crate) fn insert_history(
    conn: &Connection,
    user_id: i64,
    category_id: i64,
    at: DateTime<Utc>,
    old_amount: f64,
    new_amount: f64,
    reason: HistoryReason,
) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO category_history (category_id, user_id, at, old_amount, new_amount, reason)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
        params![
            category_id,
            user_id,
            format_datetime(at),
            old_amount,
            new_amount,
            reason.as_str()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Check the user-editable fields of a category
pub(crate) fn validate_category_fields(
    name: &str,
    color: &str,
    icon: &str,
    allocated_amount: f64,
) -> Result<()> {
    for (field, value) in [("name", name), ("color", color), ("icon", icon)] {
        if value.trim().is_empty() {
            return Err(Error::InvalidData(format!("{} is required", field)));
        }
    }
    if !allocated_amount.is_finite() || allocated_amount < 0.0 {
        return Err(Error::InvalidData(
            "allocated_amount must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}

impl Database {
    /// Create a category with zero spending
    pub fn create_category(&self, user_id: i64, new: &NewCategory) -> Result<Category> {
        validate_category_fields(&new.name, &new.color, &new.icon, new.allocated_amount)?;

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO categories (user_id, name, color, icon, allocated_amount)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                new.name.trim(),
                new.color,
                new.icon,
                round_cents(new.allocated_amount)
            ],
        )?;
        let id = conn.last_insert_rowid();

        info!(user_id, category_id = id, name = %new.name, "Created category");
        load_category(&conn, user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("category {}", id)))
    }

    /// List a user's categories
    pub fn list_categories(&self, user_id: i64) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM categories WHERE user_id = ? ORDER BY id",
            CATEGORY_COLUMNS
        ))?;

        let categories = stmt
            .query_map(params![user_id], category_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    /// Get a category by ID
    pub fn get_category(&self, user_id: i64, category_id: i64) -> Result<Option<Category>> {
        let conn = self.conn()?;
        load_category(&conn, user_id, category_id)
    }

    /// Delete a category and its history
    ///
    /// Fails with `Conflict` while expenses still reference the category.
    pub fn delete_category(&self, user_id: i64, category_id: i64) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        if load_category(&tx, user_id, category_id)?.is_none() {
            return Err(Error::NotFound(format!("category {}", category_id)));
        }

        let expenses: i64 = tx.query_row(
            "SELECT COUNT(*) FROM expenses WHERE category_id = ?",
            params![category_id],
            |row| row.get(0),
        )?;
        if expenses > 0 {
            return Err(Error::Conflict(format!(
                "category {} still has {} expense(s)",
                category_id, expenses
            )));
        }

        tx.execute(
            "DELETE FROM category_history WHERE category_id = ?",
            params![category_id],
        )?;
        tx.execute(
            "DELETE FROM categories WHERE id = ? AND user_id = ?",
            params![category_id, user_id],
        )?;
        tx.commit()?;

        info!(user_id, category_id, "Deleted category");
        Ok(())
    }

    /// List allocation history, newest first
    ///
    /// Pass a category ID to restrict the listing to one category.
    pub fn list_history(
        &self,
        user_id: i64,
        category_id: Option<i64>,
    ) -> Result<Vec<HistoryEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, category_id, at, old_amount, new_amount, reason
            FROM category_history
            WHERE user_id = ?1 AND (?2 IS NULL OR category_id = ?2)
            ORDER BY at DESC, id DESC
            "#,
        )?;

        let entries = stmt
            .query_map(params![user_id, category_id], history_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}

/// Most recent history entry for a category
pub(crate) fn latest_history(
    conn: &Connection,
    user_id: i64,
    category_id: i64,
) -> Result<Option<HistoryEntry>> {
    let entry = conn
        .query_row(
            r#"
            SELECT id, category_id, at, old_amount, new_amount, reason
            FROM category_history
            WHERE user_id = ? AND category_id = ?
            ORDER BY id DESC
            LIMIT 1
            "#,
            params![user_id, category_id],
            history_from_row,
        )
        .optional()?;
    Ok(entry)
}

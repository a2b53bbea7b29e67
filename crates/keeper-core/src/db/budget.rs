//! Budget period operations: resets, spend deltas, manual edits and undo
//!
//! Every operation here touches a category row and the history log
//! together, so each runs inside a single transaction.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::{debug, info};

use super::categories::{
    insert_history, latest_history, load_category, validate_category_fields,
};
use super::users::load_user;
use super::{format_datetime, Database};
use crate::budget::{apply_spend, current_period_start, reevaluate, reset_date_for, should_reset};
use crate::error::{Error, Result};
use crate::models::{Category, CategoryUpdate, HistoryReason, ResetSummary};
use crate::money::round_cents;

fn category_not_found(category_id: i64) -> Error {
    Error::NotFound(format!("category {}", category_id))
}

/// Apply a spend delta on an open transaction
///
/// Shared by the expense operations so the expense row, the note total and
/// the category move together.
pub(crate) fn apply_spend_in(
    conn: &Connection,
    user_id: i64,
    category_id: i64,
    delta: f64,
    auto_adjust: bool,
) -> Result<Category> {
    let category =
        load_category(conn, user_id, category_id)?.ok_or_else(|| category_not_found(category_id))?;

    let outcome = apply_spend(
        category.allocated_amount,
        category.spent_total,
        round_cents(delta),
        auto_adjust,
    );

    if let Some(adjustment) = outcome.adjustment {
        insert_history(
            conn,
            user_id,
            category_id,
            Utc::now(),
            adjustment.old_amount,
            adjustment.new_amount,
            HistoryReason::AutoAdjust,
        )?;
        info!(
            user_id,
            category_id,
            old_amount = adjustment.old_amount,
            new_amount = adjustment.new_amount,
            "Allocation auto-adjusted"
        );
    }

    conn.execute(
        r#"
        UPDATE categories
        SET spent_total = ?, allocated_amount = ?, status = ?, overdrawn_amount = ?,
            updated_at = datetime('now')
        WHERE id = ? AND user_id = ?
        "#,
        params![
            outcome.spent_total,
            outcome.allocated_amount,
            outcome.status.as_str(),
            outcome.overdrawn_amount,
            category_id,
            user_id
        ],
    )?;

    debug!(
        user_id,
        category_id,
        delta,
        spent_total = outcome.spent_total,
        status = %outcome.status,
        "Applied spend delta"
    );

    load_category(conn, user_id, category_id)?.ok_or_else(|| category_not_found(category_id))
}

impl Database {
    /// Start a new budget period for a user if one is due
    ///
    /// Writes a `monthly-reset` history entry for every category with
    /// spending, zeroes those categories and advances the user's
    /// `last_reset_date`, all in one transaction. Returns `None` when no reset
    /// was due (including unknown users and users that were never reset).
    pub fn reset_budgets_if_due(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<ResetSummary>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let Some(user) = load_user(&tx, user_id)? else {
            return Ok(None);
        };

        let period_start = reset_date_for(now, user.preferences.reset_day);
        if !should_reset(user.last_reset_date, period_start, now) {
            return Ok(None);
        }

        let spent: Vec<(i64, f64)> = {
            let mut stmt = tx.prepare(
                "SELECT id, spent_total FROM categories WHERE user_id = ? AND spent_total > 0 ORDER BY id",
            )?;
            let rows = stmt
                .query_map(params![user_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        for (category_id, spent_total) in &spent {
            insert_history(
                &tx,
                user_id,
                *category_id,
                period_start,
                *spent_total,
                0.0,
                HistoryReason::MonthlyReset,
            )?;
            tx.execute(
                r#"
                UPDATE categories
                SET spent_total = 0, status = 'healthy', overdrawn_amount = 0,
                    updated_at = datetime('now')
                WHERE id = ?
                "#,
                params![category_id],
            )?;
        }

        tx.execute(
            "UPDATE users SET last_reset_date = ? WHERE id = ?",
            params![format_datetime(period_start), user_id],
        )?;

        tx.commit()?;

        Ok(Some(ResetSummary {
            user_id,
            period_start,
            categories_reset: spent.len(),
            history_entries: spent.len(),
        }))
    }

    /// Record the period containing `now` as already reset
    ///
    /// A user that was never reset is never reset automatically; anchoring
    /// the current period makes resets start with the next reset date.
    pub fn mark_period_started(&self, user_id: i64, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let user = self.require_user(user_id)?;
        let period_start = current_period_start(now, user.preferences.reset_day);

        let conn = self.conn()?;
        conn.execute(
            "UPDATE users SET last_reset_date = ? WHERE id = ?",
            params![format_datetime(period_start), user_id],
        )?;
        Ok(period_start)
    }

    /// Apply a signed spending delta to a category
    ///
    /// Raises the allocation (with an `auto-adjust` history entry) or marks
    /// the category overdrawn when the new spending exceeds the allocation.
    pub fn apply_spend_delta(
        &self,
        user_id: i64,
        category_id: i64,
        delta: f64,
        auto_adjust: bool,
    ) -> Result<Category> {
        if !delta.is_finite() {
            return Err(Error::InvalidData("delta must be a finite number".to_string()));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let category = apply_spend_in(&tx, user_id, category_id, delta, auto_adjust)?;
        tx.commit()?;

        Ok(category)
    }

    /// Manually edit a category
    ///
    /// A changed allocation is recorded as a `manual-adjust` history entry. The
    /// overdraw check re-runs on every edit, so an `adjusted` category settles
    /// back to `healthy`. Auto-adjust is never applied here.
    pub fn update_category(
        &self,
        user_id: i64,
        category_id: i64,
        update: &CategoryUpdate,
    ) -> Result<Category> {
        validate_category_fields(
            &update.name,
            &update.color,
            &update.icon,
            update.allocated_amount,
        )?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let current =
            load_category(&tx, user_id, category_id)?.ok_or_else(|| category_not_found(category_id))?;

        let allocated = round_cents(update.allocated_amount);
        if allocated != current.allocated_amount {
            insert_history(
                &tx,
                user_id,
                category_id,
                Utc::now(),
                current.allocated_amount,
                allocated,
                HistoryReason::ManualAdjust,
            )?;
        }
        let (status, overdrawn) = reevaluate(allocated, current.spent_total);

        tx.execute(
            r#"
            UPDATE categories
            SET name = ?, color = ?, icon = ?, allocated_amount = ?, status = ?,
                overdrawn_amount = ?, updated_at = datetime('now')
            WHERE id = ? AND user_id = ?
            "#,
            params![
                update.name.trim(),
                update.color,
                update.icon,
                allocated,
                status.as_str(),
                overdrawn,
                category_id,
                user_id
            ],
        )?;

        let category =
            load_category(&tx, user_id, category_id)?.ok_or_else(|| category_not_found(category_id))?;
        tx.commit()?;

        info!(user_id, category_id, allocated, status = %status, "Updated category");
        Ok(category)
    }

    /// Undo the most recent history entry of a category
    ///
    /// Removes the entry and restores both the allocation and the spending
    /// to the entry's old amount, leaving the category healthy.
    pub fn undo_last_history(&self, user_id: i64, category_id: i64) -> Result<Category> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        if load_category(&tx, user_id, category_id)?.is_none() {
            return Err(category_not_found(category_id));
        }

        let entry = latest_history(&tx, user_id, category_id)?.ok_or_else(|| {
            Error::NotFound(format!("no history for category {}", category_id))
        })?;

        tx.execute(
            "DELETE FROM category_history WHERE id = ?",
            params![entry.id],
        )?;
        tx.execute(
            r#"
            UPDATE categories
            SET allocated_amount = ?1, spent_total = ?1, status = 'healthy',
                overdrawn_amount = 0, updated_at = datetime('now')
            WHERE id = ?2 AND user_id = ?3
            "#,
            params![entry.old_amount, category_id, user_id],
        )?;

        let category =
            load_category(&tx, user_id, category_id)?.ok_or_else(|| category_not_found(category_id))?;
        tx.commit()?;

        info!(
            user_id,
            category_id,
            reason = %entry.reason,
            restored = entry.old_amount,
            "Undid history entry"
        );
        Ok(category)
    }
}

//! User and preference operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use super::{datetime_column, parse_datetime, Database};
use crate::budget::ResetDay;
use crate::error::{Error, Result};
use crate::models::{PreferencesUpdate, Theme, User, UserPreferences};

const USER_COLUMNS: &str = "id, username, display_name, email, auth_provider, currency, theme, \
     auto_adjust_budgets, reset_day, last_reset_date, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let theme: String = row.get(6)?;
    let reset_day: i64 = row.get(8)?;
    let created_at: String = row.get(10)?;

    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        display_name: row.get(2)?,
        email: row.get(3)?,
        auth_provider: row.get(4)?,
        created_at: parse_datetime(&created_at),
        preferences: UserPreferences {
            currency: row.get(5)?,
            theme: theme.parse().unwrap_or_default(),
            auto_adjust_budgets: row.get(7)?,
            reset_day: ResetDay::try_from(reset_day).unwrap_or_default(),
        },
        last_reset_date: datetime_column(row, 9)?,
    })
}

/// Load a user on an existing connection or transaction
pub(crate) fn load_user(conn: &Connection, user_id: i64) -> Result<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
            params![user_id],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

/// Validate and normalize an ISO 4217 style currency code
pub(crate) fn normalize_currency(code: &str) -> Result<String> {
    let code = code.trim().to_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(Error::InvalidData(format!(
            "currency must be a 3-letter code, got '{}'",
            code
        )));
    }
    Ok(code)
}

impl Database {
    /// Return the local user, creating it on first use
    pub fn ensure_local_user(&self) -> Result<User> {
        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM users WHERE auth_provider = 'local' ORDER BY id LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => id,
            None => {
                conn.execute(
                    "INSERT INTO users (display_name, auth_provider) VALUES ('Local User', 'local')",
                    [],
                )?;
                let id = conn.last_insert_rowid();
                info!(user_id = id, "Created local user");
                id
            }
        };

        load_user(&conn, id)?.ok_or_else(|| Error::NotFound(format!("user {}", id)))
    }

    /// Get a user by ID
    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        load_user(&conn, user_id)
    }

    /// Get a user by ID, failing with `NotFound` when absent
    pub fn require_user(&self, user_id: i64) -> Result<User> {
        self.get_user(user_id)?
            .ok_or_else(|| Error::NotFound(format!("user {}", user_id)))
    }

    /// Apply a partial preferences update
    pub fn update_preferences(&self, user_id: i64, update: &PreferencesUpdate) -> Result<User> {
        let current = self.require_user(user_id)?.preferences;

        let currency = match &update.currency {
            Some(code) => normalize_currency(code)?,
            None => current.currency,
        };
        let theme: Theme = update.theme.unwrap_or(current.theme);
        let auto_adjust = update
            .auto_adjust_budgets
            .unwrap_or(current.auto_adjust_budgets);
        let reset_day = update.reset_day.unwrap_or(current.reset_day);

        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE users
            SET currency = ?, theme = ?, auto_adjust_budgets = ?, reset_day = ?
            WHERE id = ?
            "#,
            params![
                currency,
                theme.as_str(),
                auto_adjust,
                reset_day.get(),
                user_id
            ],
        )?;

        self.require_user(user_id)
    }

    /// Set the login name and password hash for a user
    pub fn set_credentials(&self, user_id: i64, username: &str, password_hash: &str) -> Result<()> {
        let conn = self.conn()?;

        let taken: Option<i64> = conn
            .query_row(
                "SELECT id FROM users WHERE username = ? AND id != ?",
                params![username, user_id],
                |row| row.get(0),
            )
            .optional()?;
        if taken.is_some() {
            return Err(Error::Conflict(format!(
                "username '{}' is already taken",
                username
            )));
        }

        let updated = conn.execute(
            "UPDATE users SET username = ?, password_hash = ? WHERE id = ?",
            params![username, password_hash, user_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("user {}", user_id)));
        }
        Ok(())
    }

    /// Find a user by login name
    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS),
                params![username],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Stored password hash for a user, if credentials were set
    pub fn get_password_hash(&self, user_id: i64) -> Result<Option<String>> {
        let conn = self.conn()?;
        let hash: Option<Option<String>> = conn
            .query_row(
                "SELECT password_hash FROM users WHERE id = ?",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash.flatten())
    }

    /// Soft reset: clear a user's recorded activity but keep the configuration
    ///
    /// Clears: expenses, day notes, savings contributions, income sources,
    ///         category history
    /// Zeroes: category spending and overdraw, savings targets
    /// Preserves: the user, categories and their allocations, savings goals
    pub fn reset_user_data(&self, user_id: i64) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM expenses WHERE user_id = ?", params![user_id])?;
        tx.execute("DELETE FROM day_notes WHERE user_id = ?", params![user_id])?;
        tx.execute(
            "DELETE FROM savings_contributions WHERE user_id = ?",
            params![user_id],
        )?;
        tx.execute(
            "DELETE FROM income_sources WHERE user_id = ?",
            params![user_id],
        )?;
        tx.execute(
            "DELETE FROM category_history WHERE user_id = ?",
            params![user_id],
        )?;
        tx.execute(
            r#"
            UPDATE categories
            SET spent_total = 0, overdrawn_amount = 0, status = 'healthy',
                updated_at = datetime('now')
            WHERE user_id = ?
            "#,
            params![user_id],
        )?;
        tx.execute(
            "UPDATE savings_goals SET target_amount = 0 WHERE user_id = ?",
            params![user_id],
        )?;

        tx.commit()?;

        info!(user_id, "User data reset complete");
        Ok(())
    }
}

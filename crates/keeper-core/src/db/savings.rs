//! Savings goals and contributions

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use super::{format_datetime, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewSavingsGoal, SavingsContribution, SavingsGoal};
use crate::money;

/// Title of the goal created for users without any
pub const DEFAULT_GOAL_TITLE: &str = "Savings Funds";

fn goal_from_row(row: &Row<'_>) -> rusqlite::Result<SavingsGoal> {
    let created_at: String = row.get(3)?;
    Ok(SavingsGoal {
        id: row.get(0)?,
        title: row.get(1)?,
        target_amount: row.get(2)?,
        current_saved: 0.0,
        contributions: Vec::new(),
        created_at: parse_datetime(&created_at),
    })
}

fn contribution_from_row(row: &Row<'_>) -> rusqlite::Result<SavingsContribution> {
    let date: String = row.get(3)?;
    let created_at: String = row.get(4)?;
    Ok(SavingsContribution {
        id: row.get(0)?,
        goal_id: row.get(1)?,
        amount: row.get(2)?,
        date: parse_datetime(&date),
        created_at: parse_datetime(&created_at),
    })
}

/// Attach contributions (newest first) and their rounded sum to a goal
fn fill_contributions(conn: &Connection, goal: &mut SavingsGoal) -> Result<()> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, goal_id, amount, date, created_at
        FROM savings_contributions
        WHERE goal_id = ?
        ORDER BY date DESC, id DESC
        "#,
    )?;
    goal.contributions = stmt
        .query_map(params![goal.id], contribution_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    goal.current_saved = goal
        .contributions
        .iter()
        .fold(0.0, |sum, c| money::add(sum, c.amount));
    Ok(())
}

fn load_goal(conn: &Connection, user_id: i64, goal_id: i64) -> Result<Option<SavingsGoal>> {
    let goal = conn
        .query_row(
            "SELECT id, title, target_amount, created_at FROM savings_goals WHERE id = ? AND user_id = ?",
            params![goal_id, user_id],
            goal_from_row,
        )
        .optional()?;

    match goal {
        Some(mut goal) => {
            fill_contributions(conn, &mut goal)?;
            Ok(Some(goal))
        }
        None => Ok(None),
    }
}

fn require_goal(conn: &Connection, user_id: i64, goal_id: i64) -> Result<SavingsGoal> {
    load_goal(conn, user_id, goal_id)?.ok_or_else(|| Error::NotFound(format!("savings goal {}", goal_id)))
}

fn validate_non_negative(field: &str, amount: f64) -> Result<f64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidData(format!(
            "{} must be a non-negative number",
            field
        )));
    }
    Ok(money::round_cents(amount))
}

impl Database {
    /// List savings goals, newest first
    ///
    /// A user always has at least one goal: the default goal is created on
    /// the first listing.
    pub fn list_savings_goals(&self, user_id: i64) -> Result<Vec<SavingsGoal>> {
        let conn = self.conn()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM savings_goals WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;
        if count == 0 {
            conn.execute(
                "INSERT INTO savings_goals (user_id, title, target_amount) VALUES (?, ?, 0)",
                params![user_id, DEFAULT_GOAL_TITLE],
            )?;
            info!(user_id, "Created default savings goal");
        }

        let mut stmt = conn.prepare(
            r#"
            SELECT id, title, target_amount, created_at
            FROM savings_goals
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )?;
        let mut goals = stmt
            .query_map(params![user_id], goal_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for goal in &mut goals {
            fill_contributions(&conn, goal)?;
        }

        Ok(goals)
    }

    pub fn create_savings_goal(&self, user_id: i64, new: &NewSavingsGoal) -> Result<SavingsGoal> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(Error::InvalidData("title is required".to_string()));
        }
        let target = validate_non_negative("target_amount", new.target_amount)?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO savings_goals (user_id, title, target_amount) VALUES (?, ?, ?)",
            params![user_id, title, target],
        )?;
        let id = conn.last_insert_rowid();

        info!(user_id, goal_id = id, "Created savings goal");
        require_goal(&conn, user_id, id)
    }

    pub fn update_savings_target(
        &self,
        user_id: i64,
        goal_id: i64,
        target_amount: f64,
    ) -> Result<SavingsGoal> {
        let target = validate_non_negative("target_amount", target_amount)?;

        let conn = self.conn()?;
        require_goal(&conn, user_id, goal_id)?;
        conn.execute(
            "UPDATE savings_goals SET target_amount = ? WHERE id = ? AND user_id = ?",
            params![target, goal_id, user_id],
        )?;

        require_goal(&conn, user_id, goal_id)
    }

    pub fn add_contribution(&self, user_id: i64, goal_id: i64, amount: f64) -> Result<SavingsGoal> {
        let amount = validate_non_negative("amount", amount)?;

        let conn = self.conn()?;
        require_goal(&conn, user_id, goal_id)?;

        let now = format_datetime(Utc::now());
        conn.execute(
            r#"
            INSERT INTO savings_contributions (goal_id, user_id, amount, date, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![goal_id, user_id, amount, now, now],
        )?;

        require_goal(&conn, user_id, goal_id)
    }

    /// Cash out a goal: remove all of its contributions
    pub fn cash_out_goal(&self, user_id: i64, goal_id: i64) -> Result<SavingsGoal> {
        let conn = self.conn()?;
        let goal = require_goal(&conn, user_id, goal_id)?;

        conn.execute(
            "DELETE FROM savings_contributions WHERE goal_id = ? AND user_id = ?",
            params![goal_id, user_id],
        )?;

        info!(user_id, goal_id, amount = goal.current_saved, "Cashed out savings goal");
        require_goal(&conn, user_id, goal_id)
    }

    pub fn delete_contribution(
        &self,
        user_id: i64,
        goal_id: i64,
        contribution_id: i64,
    ) -> Result<SavingsGoal> {
        let conn = self.conn()?;
        require_goal(&conn, user_id, goal_id)?;

        let deleted = conn.execute(
            "DELETE FROM savings_contributions WHERE id = ? AND goal_id = ? AND user_id = ?",
            params![contribution_id, goal_id, user_id],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("contribution {}", contribution_id)));
        }

        require_goal(&conn, user_id, goal_id)
    }

    /// Delete a goal together with its contributions
    pub fn delete_savings_goal(&self, user_id: i64, goal_id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM savings_goals WHERE id = ? AND user_id = ?",
            params![goal_id, user_id],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("savings goal {}", goal_id)));
        }
        Ok(())
    }
}

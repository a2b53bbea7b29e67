//! Day notes and expenses
//!
//! Expense mutations keep three things in step inside one transaction: the
//! expense row, the owning note's total and the category's spending.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{info, warn};

use super::budget::apply_spend_in;
use super::users::{load_user, normalize_currency};
use super::{date_column, format_date, parse_datetime, tags_column, Database};
use crate::error::{Error, Result};
use crate::models::{DayNote, DayNoteUpdate, Expense, ExpenseUpdate, NewDayNote, NewExpense, User};
use crate::money;

const EXPENSE_COLUMNS: &str = "id, note_id, category_id, label, amount, currency, tags, created_at";

fn expense_from_row(row: &Row<'_>) -> rusqlite::Result<Expense> {
    let created_at: String = row.get(7)?;
    Ok(Expense {
        id: row.get(0)?,
        note_id: row.get(1)?,
        category_id: row.get(2)?,
        label: row.get(3)?,
        amount: row.get(4)?,
        currency: row.get(5)?,
        tags: tags_column(row, 6)?,
        created_at: parse_datetime(&created_at),
    })
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<DayNote> {
    let created_at: String = row.get(4)?;
    Ok(DayNote {
        id: row.get(0)?,
        date: date_column(row, 1)?,
        total: row.get(2)?,
        pinned: row.get(3)?,
        created_at: parse_datetime(&created_at),
        items: Vec::new(),
    })
}

fn note_not_found(note_id: i64) -> Error {
    Error::NotFound(format!("note {}", note_id))
}

fn expense_not_found(expense_id: i64) -> Error {
    Error::NotFound(format!("expense {}", expense_id))
}

fn require_user_in(conn: &Connection, user_id: i64) -> Result<User> {
    load_user(conn, user_id)?.ok_or_else(|| Error::NotFound(format!("user {}", user_id)))
}

fn load_expenses(conn: &Connection, note_id: i64) -> Result<Vec<Expense>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM expenses WHERE note_id = ? ORDER BY id",
        EXPENSE_COLUMNS
    ))?;
    let expenses = stmt
        .query_map(params![note_id], expense_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(expenses)
}

fn load_note(conn: &Connection, user_id: i64, note_id: i64) -> Result<Option<DayNote>> {
    let note = conn
        .query_row(
            "SELECT id, date, total, pinned, created_at FROM day_notes WHERE id = ? AND user_id = ?",
            params![note_id, user_id],
            note_from_row,
        )
        .optional()?;

    match note {
        Some(mut note) => {
            note.items = load_expenses(conn, note.id)?;
            Ok(Some(note))
        }
        None => Ok(None),
    }
}

fn load_expense(conn: &Connection, user_id: i64, expense_id: i64) -> Result<Option<Expense>> {
    let expense = conn
        .query_row(
            &format!(
                "SELECT {} FROM expenses WHERE id = ? AND user_id = ?",
                EXPENSE_COLUMNS
            ),
            params![expense_id, user_id],
            expense_from_row,
        )
        .optional()?;
    Ok(expense)
}

/// Add `delta` to a note's total, never going below zero
fn adjust_note_total(conn: &Connection, note_id: i64, delta: f64) -> Result<()> {
    let total: f64 = conn.query_row(
        "SELECT total FROM day_notes WHERE id = ?",
        params![note_id],
        |row| row.get(0),
    )?;
    let new_total = money::add(total, delta).max(0.0);
    conn.execute(
        "UPDATE day_notes SET total = ? WHERE id = ?",
        params![new_total, note_id],
    )?;
    Ok(())
}

/// Take an expense's amount back out of its category
///
/// A category that no longer exists has nothing to reverse.
fn reverse_spend(
    conn: &Connection,
    user_id: i64,
    category_id: i64,
    amount: f64,
    auto_adjust: bool,
) -> Result<()> {
    match apply_spend_in(conn, user_id, category_id, -amount, auto_adjust) {
        Ok(_) => Ok(()),
        Err(Error::NotFound(_)) => {
            warn!(user_id, category_id, amount, "Skipping spend reversal for missing category");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn validate_amount(amount: f64) -> Result<f64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidData(
            "amount must be greater than zero".to_string(),
        ));
    }
    Ok(money::round_cents(amount))
}

fn validate_label(label: &str) -> Result<&str> {
    let label = label.trim();
    if label.is_empty() {
        return Err(Error::InvalidData("label is required".to_string()));
    }
    Ok(label)
}

fn encode_tags(tags: &[String]) -> Result<Option<String>> {
    if tags.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(tags)?))
    }
}

impl Database {
    /// Create the note for a date, or update `pinned` when it already exists
    pub fn create_note(&self, user_id: i64, new: &NewDayNote) -> Result<DayNote> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO day_notes (user_id, date, pinned) VALUES (?, ?, ?)
            ON CONFLICT (user_id, date) DO UPDATE SET pinned = excluded.pinned
            "#,
            params![user_id, format_date(new.date), new.pinned],
        )?;

        let id: i64 = conn.query_row(
            "SELECT id FROM day_notes WHERE user_id = ? AND date = ?",
            params![user_id, format_date(new.date)],
            |row| row.get(0),
        )?;

        load_note(&conn, user_id, id)?.ok_or_else(|| note_not_found(id))
    }

    /// Get a note with its expenses
    pub fn get_note(&self, user_id: i64, note_id: i64) -> Result<Option<DayNote>> {
        let conn = self.conn()?;
        load_note(&conn, user_id, note_id)
    }

    /// List notes with their expenses, newest date first
    ///
    /// `from` and `to` are inclusive bounds on the note date.
    pub fn list_notes(
        &self,
        user_id: i64,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<DayNote>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, date, total, pinned, created_at
            FROM day_notes
            WHERE user_id = ?1
              AND (?2 IS NULL OR date >= ?2)
              AND (?3 IS NULL OR date <= ?3)
            ORDER BY date DESC
            "#,
        )?;

        let mut notes = stmt
            .query_map(
                params![user_id, from.map(format_date), to.map(format_date)],
                note_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for note in &mut notes {
            note.items = load_expenses(&conn, note.id)?;
        }

        Ok(notes)
    }

    /// Change a note's date or pinned flag
    pub fn update_note(&self, user_id: i64, note_id: i64, update: &DayNoteUpdate) -> Result<DayNote> {
        let conn = self.conn()?;
        let current = load_note(&conn, user_id, note_id)?.ok_or_else(|| note_not_found(note_id))?;

        let date = update.date.unwrap_or(current.date);
        let pinned = update.pinned.unwrap_or(current.pinned);

        if date != current.date {
            let taken: Option<i64> = conn
                .query_row(
                    "SELECT id FROM day_notes WHERE user_id = ? AND date = ?",
                    params![user_id, format_date(date)],
                    |row| row.get(0),
                )
                .optional()?;
            if taken.is_some() {
                return Err(Error::Conflict(format!("a note for {} already exists", date)));
            }
        }

        conn.execute(
            "UPDATE day_notes SET date = ?, pinned = ? WHERE id = ? AND user_id = ?",
            params![format_date(date), pinned, note_id, user_id],
        )?;

        load_note(&conn, user_id, note_id)?.ok_or_else(|| note_not_found(note_id))
    }

    /// Delete a note, reversing the spending of every expense on it
    pub fn delete_note(&self, user_id: i64, note_id: i64) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let user = require_user_in(&tx, user_id)?;
        let note = load_note(&tx, user_id, note_id)?.ok_or_else(|| note_not_found(note_id))?;

        for expense in &note.items {
            reverse_spend(
                &tx,
                user_id,
                expense.category_id,
                expense.amount,
                user.preferences.auto_adjust_budgets,
            )?;
        }

        tx.execute("DELETE FROM expenses WHERE note_id = ?", params![note_id])?;
        tx.execute(
            "DELETE FROM day_notes WHERE id = ? AND user_id = ?",
            params![note_id, user_id],
        )?;
        tx.commit()?;

        info!(user_id, note_id, expenses = note.items.len(), "Deleted note");
        Ok(())
    }

    /// Get an expense by ID
    pub fn get_expense(&self, user_id: i64, expense_id: i64) -> Result<Option<Expense>> {
        let conn = self.conn()?;
        load_expense(&conn, user_id, expense_id)
    }

    /// Record an expense on a note and charge it to its category
    pub fn add_expense(&self, user_id: i64, note_id: i64, new: &NewExpense) -> Result<Expense> {
        let label = validate_label(&new.label)?;
        let amount = validate_amount(new.amount)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let user = require_user_in(&tx, user_id)?;
        if load_note(&tx, user_id, note_id)?.is_none() {
            return Err(note_not_found(note_id));
        }

        let currency = match &new.currency {
            Some(code) => normalize_currency(code)?,
            None => user.preferences.currency.clone(),
        };

        // Fails with NotFound before anything is written for a bad category
        apply_spend_in(
            &tx,
            user_id,
            new.category_id,
            amount,
            user.preferences.auto_adjust_budgets,
        )?;

        tx.execute(
            r#"
            INSERT INTO expenses (user_id, note_id, category_id, label, amount, currency, tags)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                note_id,
                new.category_id,
                label,
                amount,
                currency,
                encode_tags(&new.tags)?
            ],
        )?;
        let id = tx.last_insert_rowid();
        adjust_note_total(&tx, note_id, amount)?;

        let expense = load_expense(&tx, user_id, id)?.ok_or_else(|| expense_not_found(id))?;
        tx.commit()?;

        info!(user_id, expense_id = id, note_id, category_id = new.category_id, amount, "Added expense");
        Ok(expense)
    }

    /// Update an expense, moving note totals and category spending with it
    pub fn update_expense(
        &self,
        user_id: i64,
        expense_id: i64,
        update: &ExpenseUpdate,
    ) -> Result<Expense> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let user = require_user_in(&tx, user_id)?;
        let auto_adjust = user.preferences.auto_adjust_budgets;
        let current =
            load_expense(&tx, user_id, expense_id)?.ok_or_else(|| expense_not_found(expense_id))?;

        let label = match &update.label {
            Some(label) => validate_label(label)?.to_string(),
            None => current.label.clone(),
        };
        let amount = match update.amount {
            Some(amount) => validate_amount(amount)?,
            None => current.amount,
        };
        let currency = match &update.currency {
            Some(code) => normalize_currency(code)?,
            None => current.currency.clone(),
        };
        let tags = update.tags.clone().unwrap_or_else(|| current.tags.clone());
        let category_id = update.category_id.unwrap_or(current.category_id);
        let note_id = update.note_id.unwrap_or(current.note_id);

        // Note totals
        if note_id != current.note_id {
            if load_note(&tx, user_id, note_id)?.is_none() {
                return Err(note_not_found(note_id));
            }
            adjust_note_total(&tx, current.note_id, -current.amount)?;
            adjust_note_total(&tx, note_id, amount)?;
        } else if amount != current.amount {
            adjust_note_total(&tx, note_id, money::sub(amount, current.amount))?;
        }

        // Category spending
        if category_id != current.category_id {
            apply_spend_in(&tx, user_id, category_id, amount, auto_adjust)?;
            reverse_spend(&tx, user_id, current.category_id, current.amount, auto_adjust)?;
        } else if amount != current.amount {
            apply_spend_in(
                &tx,
                user_id,
                category_id,
                money::sub(amount, current.amount),
                auto_adjust,
            )?;
        }

        tx.execute(
            r#"
            UPDATE expenses
            SET note_id = ?, category_id = ?, label = ?, amount = ?, currency = ?, tags = ?
            WHERE id = ? AND user_id = ?
            "#,
            params![
                note_id,
                category_id,
                label,
                amount,
                currency,
                encode_tags(&tags)?,
                expense_id,
                user_id
            ],
        )?;

        let expense =
            load_expense(&tx, user_id, expense_id)?.ok_or_else(|| expense_not_found(expense_id))?;
        tx.commit()?;

        info!(user_id, expense_id, category_id, amount, "Updated expense");
        Ok(expense)
    }

    /// Delete an expense and take its amount back out of note and category
    pub fn delete_expense(&self, user_id: i64, expense_id: i64) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let user = require_user_in(&tx, user_id)?;
        let expense =
            load_expense(&tx, user_id, expense_id)?.ok_or_else(|| expense_not_found(expense_id))?;

        adjust_note_total(&tx, expense.note_id, -expense.amount)?;
        reverse_spend(
            &tx,
            user_id,
            expense.category_id,
            expense.amount,
            user.preferences.auto_adjust_budgets,
        )?;
        tx.execute(
            "DELETE FROM expenses WHERE id = ? AND user_id = ?",
            params![expense_id, user_id],
        )?;
        tx.commit()?;

        info!(user_id, expense_id, amount = expense.amount, "Deleted expense");
        Ok(())
    }
}

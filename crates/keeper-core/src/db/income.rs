//! Income source operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{IncomeSource, IncomeUpdate, NewIncomeSource};
use crate::money::round_cents;

fn income_from_row(row: &Row<'_>) -> rusqlite::Result<IncomeSource> {
    let created_at: String = row.get(5)?;
    Ok(IncomeSource {
        id: row.get(0)?,
        name: row.get(1)?,
        amount: row.get(2)?,
        frequency: row.get(3)?,
        payday: row.get(4)?,
        created_at: parse_datetime(&created_at),
    })
}

fn load_income(conn: &Connection, user_id: i64, id: i64) -> Result<Option<IncomeSource>> {
    let income = conn
        .query_row(
            r#"
            SELECT id, name, amount, frequency, payday, created_at
            FROM income_sources WHERE id = ? AND user_id = ?
            "#,
            params![id, user_id],
            income_from_row,
        )
        .optional()?;
    Ok(income)
}

fn validate_income(name: &str, amount: f64, frequency: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidData("name is required".to_string()));
    }
    if frequency.trim().is_empty() {
        return Err(Error::InvalidData("frequency is required".to_string()));
    }
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidData(
            "amount must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}

impl Database {
    /// List income sources, newest first
    pub fn list_income(&self, user_id: i64) -> Result<Vec<IncomeSource>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, name, amount, frequency, payday, created_at
            FROM income_sources
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )?;

        let income = stmt
            .query_map(params![user_id], income_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(income)
    }

    pub fn create_income(&self, user_id: i64, new: &NewIncomeSource) -> Result<IncomeSource> {
        validate_income(&new.name, new.amount, &new.frequency)?;

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO income_sources (user_id, name, amount, frequency, payday)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                new.name.trim(),
                round_cents(new.amount),
                new.frequency.trim(),
                new.payday
            ],
        )?;
        let id = conn.last_insert_rowid();

        info!(user_id, income_id = id, "Created income source");
        load_income(&conn, user_id, id)?.ok_or_else(|| Error::NotFound(format!("income {}", id)))
    }

    /// Apply a partial update to an income source
    pub fn update_income(
        &self,
        user_id: i64,
        income_id: i64,
        update: &IncomeUpdate,
    ) -> Result<IncomeSource> {
        let conn = self.conn()?;
        let current = load_income(&conn, user_id, income_id)?
            .ok_or_else(|| Error::NotFound(format!("income {}", income_id)))?;

        let name = update.name.clone().unwrap_or(current.name);
        let amount = update.amount.unwrap_or(current.amount);
        let frequency = update.frequency.clone().unwrap_or(current.frequency);
        let payday = update.payday.clone().or(current.payday);
        validate_income(&name, amount, &frequency)?;

        conn.execute(
            r#"
            UPDATE income_sources
            SET name = ?, amount = ?, frequency = ?, payday = ?
            WHERE id = ? AND user_id = ?
            "#,
            params![
                name.trim(),
                round_cents(amount),
                frequency.trim(),
                payday,
                income_id,
                user_id
            ],
        )?;

        load_income(&conn, user_id, income_id)?
            .ok_or_else(|| Error::NotFound(format!("income {}", income_id)))
    }

    pub fn delete_income(&self, user_id: i64, income_id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM income_sources WHERE id = ? AND user_id = ?",
            params![income_id, user_id],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("income {}", income_id)));
        }
        Ok(())
    }
}

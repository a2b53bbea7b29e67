//! Spending statistics

use chrono::NaiveDate;
use rusqlite::params;

use super::{format_date, Database};
use crate::error::Result;
use crate::models::{CategoryStat, MonthlyTotal, Statistics};
use crate::money::round_cents;

impl Database {
    /// Aggregate a user's expenses and income
    ///
    /// `from` and `to` are inclusive bounds on the note date of each expense.
    /// Income sources are undated and always count in full.
    pub fn get_statistics(
        &self,
        user_id: i64,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Statistics> {
        let conn = self.conn()?;
        let from = from.map(format_date);
        let to = to.map(format_date);

        let (total_expenses, transaction_count): (f64, i64) = conn.query_row(
            r#"
            SELECT COALESCE(SUM(e.amount), 0), COUNT(*)
            FROM expenses e
            JOIN day_notes n ON n.id = e.note_id
            WHERE e.user_id = ?1
              AND (?2 IS NULL OR n.date >= ?2)
              AND (?3 IS NULL OR n.date <= ?3)
            "#,
            params![user_id, from, to],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let total_expenses = round_cents(total_expenses);

        let total_income: f64 = conn.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM income_sources WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;
        let total_income = round_cents(total_income);

        // Categories with spending, largest first
        let mut stmt = conn.prepare(
            r#"
            SELECT c.id, c.name, c.color, SUM(e.amount) as total, COUNT(e.id)
            FROM expenses e
            JOIN day_notes n ON n.id = e.note_id
            JOIN categories c ON c.id = e.category_id
            WHERE e.user_id = ?1
              AND (?2 IS NULL OR n.date >= ?2)
              AND (?3 IS NULL OR n.date <= ?3)
            GROUP BY c.id
            HAVING total > 0
            ORDER BY total DESC, c.name
            "#,
        )?;
        let category_breakdown = stmt
            .query_map(params![user_id, from, to], |row| {
                let total: f64 = row.get(3)?;
                Ok(CategoryStat {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    color: row.get(2)?,
                    total: round_cents(total),
                    count: row.get(4)?,
                    percentage: if total_expenses > 0.0 {
                        round_cents(total / total_expenses * 100.0)
                    } else {
                        0.0
                    },
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        // Month keys come straight from the YYYY-MM-DD note date
        let mut stmt = conn.prepare(
            r#"
            SELECT substr(n.date, 1, 7) as month, SUM(e.amount)
            FROM expenses e
            JOIN day_notes n ON n.id = e.note_id
            WHERE e.user_id = ?1
              AND (?2 IS NULL OR n.date >= ?2)
              AND (?3 IS NULL OR n.date <= ?3)
            GROUP BY month
            ORDER BY month
            "#,
        )?;
        let monthly = stmt
            .query_map(params![user_id, from, to], |row| {
                let total: f64 = row.get(1)?;
                Ok(MonthlyTotal {
                    month: row.get(0)?,
                    total: round_cents(total),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let average_transaction = if transaction_count > 0 {
            round_cents(total_expenses / transaction_count as f64)
        } else {
            0.0
        };

        Ok(Statistics {
            total_expenses,
            total_income,
            balance: round_cents(total_income - total_expenses),
            transaction_count,
            average_transaction,
            category_breakdown,
            monthly,
        })
    }
}

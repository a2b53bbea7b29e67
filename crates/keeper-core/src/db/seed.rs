//! Demo data for a fresh database

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use super::Database;
use crate::error::Result;
use crate::models::{NewCategory, NewDayNote, NewExpense, NewIncomeSource};

/// What `seed_demo_data` created
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedSummary {
    pub categories: usize,
    pub notes: usize,
    pub expenses: usize,
    pub income_sources: usize,
}

const DEMO_CATEGORIES: [(&str, &str, &str, f64); 3] = [
    ("Food", "#FF8A65", "icon-categories", 200.0),
    ("Transport", "#81D4FA", "icon-wallet", 100.0),
    ("Housing", "#A5D6A7", "icon-settings", 900.0),
];

impl Database {
    /// Populate a user's account with demo categories, a note and expenses
    ///
    /// Expenses go through the normal spend path so category totals match.
    pub fn seed_demo_data(&self, user_id: i64, date: NaiveDate) -> Result<SeedSummary> {
        let mut summary = SeedSummary::default();

        let mut category_ids = Vec::with_capacity(DEMO_CATEGORIES.len());
        for (name, color, icon, allocated) in DEMO_CATEGORIES {
            let category = self.create_category(
                user_id,
                &NewCategory {
                    name: name.to_string(),
                    color: color.to_string(),
                    icon: icon.to_string(),
                    allocated_amount: allocated,
                },
            )?;
            category_ids.push(category.id);
            summary.categories += 1;
        }

        let note = self.create_note(user_id, &NewDayNote { date, pinned: false })?;
        summary.notes += 1;

        let expenses = [
            (category_ids[0], "Groceries", 12.0),
            (category_ids[0], "Coffee", 6.5),
            (category_ids[1], "Bus pass", 7.0),
        ];
        for (category_id, label, amount) in expenses {
            self.add_expense(
                user_id,
                note.id,
                &NewExpense {
                    category_id,
                    label: label.to_string(),
                    amount,
                    currency: None,
                    tags: Vec::new(),
                },
            )?;
            summary.expenses += 1;
        }

        self.create_income(
            user_id,
            &NewIncomeSource {
                name: "Salary".to_string(),
                amount: 2500.0,
                frequency: "monthly".to_string(),
                payday: Some("25".to_string()),
            },
        )?;
        summary.income_sources += 1;

        info!(
            user_id,
            categories = summary.categories,
            expenses = summary.expenses,
            "Seeded demo data"
        );
        Ok(summary)
    }
}

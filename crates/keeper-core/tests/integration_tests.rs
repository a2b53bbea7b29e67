//! Integration tests for keeper-core
//!
//! These tests exercise a full budget month: expenses → overdraw /
//! auto-adjust → period reset → undo → export.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use keeper_core::{
    budget::check_and_reset_budgets_at,
    db::Database,
    export::{decrypt_export, export_encrypted, DecryptedExport, ExportFormat},
    models::{
        CategoryStatus, HistoryReason, NewCategory, NewDayNote, NewExpense, PreferencesUpdate,
    },
    ResetDay,
};

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn new_category(name: &str, allocated: f64) -> NewCategory {
    NewCategory {
        name: name.to_string(),
        color: "#A5D6A7".to_string(),
        icon: "icon-categories".to_string(),
        allocated_amount: allocated,
    }
}

fn new_expense(category_id: i64, label: &str, amount: f64) -> NewExpense {
    NewExpense {
        category_id,
        label: label.to_string(),
        amount,
        currency: None,
        tags: Vec::new(),
    }
}

// =============================================================================
// Budget month workflow
// =============================================================================

#[test]
fn test_budget_month_workflow() {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    let user = db.ensure_local_user().expect("Failed to create local user");

    db.update_preferences(
        user.id,
        &PreferencesUpdate {
            reset_day: Some(ResetDay::new(5).unwrap()),
            auto_adjust_budgets: Some(false),
            ..Default::default()
        },
    )
    .unwrap();
    db.mark_period_started(user.id, at(2025, 3, 6, 12)).unwrap();

    let food = db.create_category(user.id, &new_category("Food", 100.0)).unwrap();
    let fun = db.create_category(user.id, &new_category("Fun", 50.0)).unwrap();

    // Spend through March
    let march_7 = db
        .create_note(user.id, &NewDayNote { date: date(2025, 3, 7), pinned: false })
        .unwrap();
    db.add_expense(user.id, march_7.id, &new_expense(food.id, "Groceries", 80.0))
        .unwrap();
    db.add_expense(user.id, march_7.id, &new_expense(food.id, "Takeaway", 30.0))
        .unwrap();
    db.add_expense(user.id, march_7.id, &new_expense(fun.id, "Cinema", 12.0))
        .unwrap();

    let food_now = db.get_category(user.id, food.id).unwrap().unwrap();
    assert_eq!(food_now.status, CategoryStatus::Overdrawn);
    assert_eq!(food_now.overdrawn_amount, 10.0);

    // Mid-period reads do not reset
    assert!(check_and_reset_budgets_at(&db, user.id, at(2025, 3, 20, 0)).is_none());

    // April 5th starts a new period
    let summary = check_and_reset_budgets_at(&db, user.id, at(2025, 4, 5, 8))
        .expect("reset should be due");
    assert_eq!(summary.period_start, at(2025, 4, 5, 0));
    assert_eq!(summary.categories_reset, 2);

    for c in db.list_categories(user.id).unwrap() {
        assert_eq!(c.spent_total, 0.0);
        assert_eq!(c.status, CategoryStatus::Healthy);
    }
    assert!(check_and_reset_budgets_at(&db, user.id, at(2025, 4, 6, 0)).is_none());

    let resets = db.list_history(user.id, None).unwrap();
    assert_eq!(resets.len(), 2);
    assert!(resets.iter().all(|h| h.reason == HistoryReason::MonthlyReset));

    // Undo the reset on Food: spending comes back, allocation follows it
    let restored = db.undo_last_history(user.id, food.id).unwrap();
    assert_eq!(restored.spent_total, 110.0);
    assert_eq!(restored.allocated_amount, 110.0);
    assert_eq!(restored.status, CategoryStatus::Healthy);
}

#[test]
fn test_auto_adjust_then_undo_workflow() {
    let db = Database::in_memory().unwrap();
    let user = db.ensure_local_user().unwrap();
    assert!(user.preferences.auto_adjust_budgets);

    let food = db.create_category(user.id, &new_category("Food", 100.0)).unwrap();
    let note = db
        .create_note(user.id, &NewDayNote { date: date(2025, 5, 1), pinned: true })
        .unwrap();
    db.add_expense(user.id, note.id, &new_expense(food.id, "Market", 80.0))
        .unwrap();
    let over = db
        .add_expense(user.id, note.id, &new_expense(food.id, "Party", 30.0))
        .unwrap();

    let adjusted = db.get_category(user.id, food.id).unwrap().unwrap();
    assert_eq!(adjusted.status, CategoryStatus::Adjusted);
    assert_eq!(adjusted.allocated_amount, 110.0);

    let history = db.list_history(user.id, Some(food.id)).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].reason, HistoryReason::AutoAdjust);
    assert_eq!((history[0].old_amount, history[0].new_amount), (100.0, 110.0));

    // Removing the expense brings spending back under the raised allocation
    db.delete_expense(user.id, over.id).unwrap();
    let after_delete = db.get_category(user.id, food.id).unwrap().unwrap();
    assert_eq!(after_delete.spent_total, 80.0);
    assert_eq!(after_delete.allocated_amount, 110.0);
    assert_eq!(after_delete.status, CategoryStatus::Healthy);

    let undone = db.undo_last_history(user.id, food.id).unwrap();
    assert_eq!(undone.allocated_amount, 100.0);
    assert!(db.list_history(user.id, Some(food.id)).unwrap().is_empty());
}

#[test]
fn test_export_after_activity() {
    let db = Database::in_memory().unwrap();
    let user = db.ensure_local_user().unwrap();
    db.seed_demo_data(user.id, date(2025, 10, 5)).unwrap();

    let export = export_encrypted(&db, user.id, ExportFormat::Json, "a long passphrase").unwrap();
    let json = serde_json::to_string(&export).unwrap();
    assert!(!json.contains("Groceries"), "export must be encrypted");

    match decrypt_export(&export, "a long passphrase").unwrap() {
        DecryptedExport::Json(dataset) => {
            assert_eq!(dataset.categories.len(), 3);
            assert_eq!(dataset.notes.len(), 1);
            assert_eq!(dataset.notes[0].items.len(), 3);
            assert_eq!(dataset.income.len(), 1);
        }
        DecryptedExport::Csv(_) => panic!("expected JSON"),
    }

    let csv_export = export_encrypted(&db, user.id, ExportFormat::Csv, "a long passphrase").unwrap();
    match decrypt_export(&csv_export, "a long passphrase").unwrap() {
        DecryptedExport::Csv(csv) => {
            assert!(csv.starts_with("table,record\n"));
            assert_eq!(csv.lines().filter(|l| l.starts_with("expenses,")).count(), 3);
        }
        DecryptedExport::Json(_) => panic!("expected CSV"),
    }
}

#[test]
fn test_encrypted_database_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keeper.db");
    let path = path.to_str().unwrap();

    {
        let db = Database::new_with_key(path, Some("correct horse battery")).unwrap();
        let user = db.ensure_local_user().unwrap();
        db.create_category(user.id, &new_category("Food", 10.0)).unwrap();
    }

    let db = Database::new_with_key(path, Some("correct horse battery")).unwrap();
    let user = db.ensure_local_user().unwrap();
    assert_eq!(db.list_categories(user.id).unwrap().len(), 1);

    assert!(Database::new_with_key(path, Some("wrong passphrase")).is_err());
}

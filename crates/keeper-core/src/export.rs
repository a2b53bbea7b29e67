//! Passphrase-encrypted data export
//!
//! Supports:
//! - JSON: the full dataset (user, categories, history, notes with expenses,
//!   income, savings goals)
//! - CSV: one `table,record` row per stored record, the record being JSON
//!
//! Both formats are encrypted with [`crate::crypto::seal`] before leaving the
//! process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::crypto::{self, SealedData};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Category, DayNote, HistoryEntry, IncomeSource, SavingsGoal, User};

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            _ => Err(format!("Unknown export format: {}", s)),
        }
    }
}

/// Everything stored for one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDataset {
    pub exported_at: DateTime<Utc>,
    pub user: User,
    pub categories: Vec<Category>,
    pub history: Vec<HistoryEntry>,
    pub notes: Vec<DayNote>,
    pub income: Vec<IncomeSource>,
    pub savings: Vec<SavingsGoal>,
}

/// One CSV row of a flattened dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRow {
    pub table: String,
    /// The record serialized as JSON
    pub record: String,
}

/// An encrypted export as handed to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptedExport {
    pub format: ExportFormat,
    #[serde(flatten)]
    pub sealed: SealedData,
}

/// Plaintext recovered from an [`EncryptedExport`]
#[derive(Debug, Clone)]
pub enum DecryptedExport {
    Json(Box<ExportDataset>),
    Csv(String),
}

/// Collect a user's data
pub fn build_dataset(db: &Database, user_id: i64) -> Result<ExportDataset> {
    let user = db.require_user(user_id)?;

    Ok(ExportDataset {
        exported_at: Utc::now(),
        categories: db.list_categories(user_id)?,
        history: db.list_history(user_id, None)?,
        notes: db.list_notes(user_id, None, None)?,
        income: db.list_income(user_id)?,
        savings: db.list_savings_goals(user_id)?,
        user,
    })
}

fn push_rows<T: Serialize>(rows: &mut Vec<FlatRow>, table: &str, records: &[T]) -> Result<()> {
    for record in records {
        rows.push(FlatRow {
            table: table.to_string(),
            record: serde_json::to_string(record)?,
        });
    }
    Ok(())
}

/// Serialize a record without one of its nested collections
fn without_field<T: Serialize>(record: &T, field: &str) -> Result<Value> {
    let mut value = serde_json::to_value(record)?;
    if let Some(obj) = value.as_object_mut() {
        obj.remove(field);
    }
    Ok(value)
}

/// Flatten a dataset into one row per stored record
///
/// Nested expenses and contributions get their own tables.
pub fn flatten_dataset(dataset: &ExportDataset) -> Result<Vec<FlatRow>> {
    let mut rows = Vec::new();

    push_rows(&mut rows, "categories", &dataset.categories)?;
    push_rows(&mut rows, "category_history", &dataset.history)?;

    let notes = dataset
        .notes
        .iter()
        .map(|n| without_field(n, "items"))
        .collect::<Result<Vec<_>>>()?;
    push_rows(&mut rows, "day_notes", &notes)?;
    let expenses: Vec<_> = dataset.notes.iter().flat_map(|n| n.items.iter()).collect();
    push_rows(&mut rows, "expenses", &expenses)?;

    push_rows(&mut rows, "income_sources", &dataset.income)?;

    let goals = dataset
        .savings
        .iter()
        .map(|g| without_field(g, "contributions"))
        .collect::<Result<Vec<_>>>()?;
    push_rows(&mut rows, "savings_goals", &goals)?;
    let contributions: Vec<_> = dataset
        .savings
        .iter()
        .flat_map(|g| g.contributions.iter())
        .collect();
    push_rows(&mut rows, "savings_contributions", &contributions)?;

    Ok(rows)
}

/// Render flattened rows as CSV with a `table,record` header
pub fn rows_to_csv(rows: &[FlatRow]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if rows.is_empty() {
        writer.write_record(["table", "record"])?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| Error::InvalidData(format!("CSV is not UTF-8: {}", e)))
}

/// Build, serialize and encrypt a user's data
pub fn export_encrypted(
    db: &Database,
    user_id: i64,
    format: ExportFormat,
    passphrase: &str,
) -> Result<EncryptedExport> {
    let dataset = build_dataset(db, user_id)?;

    let plaintext = match format {
        ExportFormat::Json => serde_json::to_vec(&dataset)?,
        ExportFormat::Csv => rows_to_csv(&flatten_dataset(&dataset)?)?.into_bytes(),
    };

    let sealed = crypto::seal(&plaintext, passphrase)?;
    info!(user_id, format = format.as_str(), bytes = plaintext.len(), "Exported user data");

    Ok(EncryptedExport { format, sealed })
}

/// Decrypt an export with the passphrase it was created with
pub fn decrypt_export(export: &EncryptedExport, passphrase: &str) -> Result<DecryptedExport> {
    let plaintext = crypto::open(&export.sealed, passphrase)?;

    match export.format {
        ExportFormat::Json => Ok(DecryptedExport::Json(Box::new(serde_json::from_slice(
            &plaintext,
        )?))),
        ExportFormat::Csv => String::from_utf8(plaintext)
            .map(DecryptedExport::Csv)
            .map_err(|e| Error::InvalidData(format!("CSV is not UTF-8: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewCategory, NewDayNote, NewExpense};
    use chrono::NaiveDate;

    fn seeded() -> (Database, i64) {
        let db = Database::in_memory().unwrap();
        let user = db.ensure_local_user().unwrap();
        let category = db
            .create_category(
                user.id,
                &NewCategory {
                    name: "Food".to_string(),
                    color: "#FF8A65".to_string(),
                    icon: "icon-categories".to_string(),
                    allocated_amount: 50.0,
                },
            )
            .unwrap();
        let note = db
            .create_note(
                user.id,
                &NewDayNote {
                    date: NaiveDate::from_ymd_opt(2025, 10, 5).unwrap(),
                    pinned: false,
                },
            )
            .unwrap();
        db.add_expense(
            user.id,
            note.id,
            &NewExpense {
                category_id: category.id,
                label: "Lunch, with \"friends\"".to_string(),
                amount: 12.5,
                currency: None,
                tags: vec!["work".to_string()],
            },
        )
        .unwrap();
        (db, user.id)
    }

    #[test]
    fn test_flatten_dataset_tables() {
        let (db, user_id) = seeded();
        let dataset = build_dataset(&db, user_id).unwrap();
        let rows = flatten_dataset(&dataset).unwrap();

        let tables: Vec<&str> = rows.iter().map(|r| r.table.as_str()).collect();
        assert_eq!(
            tables,
            vec![
                "categories",
                "day_notes",
                "expenses",
                "savings_goals"
            ]
        );

        let note: Value = serde_json::from_str(&rows[1].record).unwrap();
        assert!(note.get("items").is_none());
        assert_eq!(note["total"], 12.5);
    }

    #[test]
    fn test_csv_quotes_records() {
        let (db, user_id) = seeded();
        let dataset = build_dataset(&db, user_id).unwrap();
        let csv = rows_to_csv(&flatten_dataset(&dataset).unwrap()).unwrap();

        assert!(csv.starts_with("table,record\n"));

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let rows: Vec<FlatRow> = reader.deserialize().map(|r| r.unwrap()).collect();
        let expense = rows.iter().find(|r| r.table == "expenses").unwrap();
        let record: Value = serde_json::from_str(&expense.record).unwrap();
        assert_eq!(record["label"], "Lunch, with \"friends\"");
    }

    #[test]
    fn test_empty_csv_has_header() {
        assert_eq!(rows_to_csv(&[]).unwrap(), "table,record\n");
    }

    #[test]
    fn test_encrypted_json_export_round_trip() {
        let (db, user_id) = seeded();
        let export = export_encrypted(&db, user_id, ExportFormat::Json, "passphrase-123").unwrap();
        assert_eq!(export.format, ExportFormat::Json);

        match decrypt_export(&export, "passphrase-123").unwrap() {
            DecryptedExport::Json(dataset) => {
                assert_eq!(dataset.user.id, user_id);
                assert_eq!(dataset.categories.len(), 1);
                assert_eq!(dataset.categories[0].spent_total, 12.5);
                assert_eq!(dataset.notes[0].items.len(), 1);
            }
            DecryptedExport::Csv(_) => panic!("expected JSON export"),
        }
    }

    #[test]
    fn test_encrypted_csv_export_wrong_passphrase() {
        let (db, user_id) = seeded();
        let export = export_encrypted(&db, user_id, ExportFormat::Csv, "passphrase-123").unwrap();
        assert!(matches!(
            decrypt_export(&export, "not-the-passphrase"),
            Err(Error::Encryption(_))
        ));
    }

    #[test]
    fn test_short_passphrase_rejected() {
        let (db, user_id) = seeded();
        assert!(matches!(
            export_encrypted(&db, user_id, ExportFormat::Json, "short"),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_envelope_serializes_flat() {
        let (db, user_id) = seeded();
        let export = export_encrypted(&db, user_id, ExportFormat::Csv, "passphrase-123").unwrap();
        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["format"], "csv");
        assert_eq!(json["version"], 1);
        assert!(json["salt"].is_string());
        assert!(json["nonce"].is_string());
        assert!(json["ciphertext"].is_string());
    }
}

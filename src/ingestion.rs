use crate::error::{Result, SpendingForecastError};
use crate::schema::Transaction;
use crate::utils::parse_transaction_date;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Amounts arrive either as JSON numbers or as numeric strings (`"129.99"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountField {
    Number(f64),
    Text(String),
}

/// One loosely typed ledger entry as stored by the application backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub amount: Option<AmountField>,
    #[serde(default)]
    pub merchant: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LedgerDocument {
    Wrapped { transactions: Vec<TransactionRecord> },
    Bare(Vec<TransactionRecord>),
}

impl TransactionRecord {
    pub fn to_transaction(&self, index: usize) -> Result<Transaction> {
        let raw_date = self.date.as_deref().ok_or_else(|| {
            SpendingForecastError::MissingData(format!("Transaction #{} has no date", index))
        })?;
        let date = parse_transaction_date(raw_date)?;

        let amount = match &self.amount {
            None => {
                return Err(SpendingForecastError::MissingData(format!(
                    "Transaction #{} has no amount",
                    index
                )))
            }
            Some(AmountField::Number(value)) => *value,
            Some(AmountField::Text(text)) => text.trim().parse::<f64>().map_err(|_| {
                SpendingForecastError::MissingData(format!(
                    "Transaction #{} has a non-numeric amount '{}'",
                    index, text
                ))
            })?,
        };

        if !amount.is_finite() {
            return Err(SpendingForecastError::MissingData(format!(
                "Transaction #{} has a non-finite amount",
                index
            )));
        }

        Ok(Transaction {
            date,
            amount,
            category: non_blank(&self.category),
            id: non_blank(&self.id),
            merchant: non_blank(&self.merchant),
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn convert_records(records: &[TransactionRecord]) -> Result<Vec<Transaction>> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| record.to_transaction(i))
        .collect()
}

/// Accepts `{"transactions": [...]}` or a bare array of records.
pub fn parse_transactions_json(json: &str) -> Result<Vec<Transaction>> {
    let records = match serde_json::from_str::<LedgerDocument>(json)? {
        LedgerDocument::Wrapped { transactions } => transactions,
        LedgerDocument::Bare(records) => records,
    };
    convert_records(&records)
}

pub fn load_transactions(path: impl AsRef<Path>) -> Result<Vec<Transaction>> {
    let json = std::fs::read_to_string(path)?;
    parse_transactions_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parses_generated_ledger_shape() {
        let json = r#"{
            "transactions": [
                {
                    "id": "0b6f0c1e-2f5a-4d7e-9a57-1f4b4c1d2e3f",
                    "date": "2024-05-17T13:45:12.345Z",
                    "amount": "129.99",
                    "merchant": "Acme LLC",
                    "category": "Electronics"
                },
                { "date": "2024-05-18", "amount": -40, "category": "  " }
            ]
        }"#;

        let txs = parse_transactions_json(json).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].date, NaiveDate::from_ymd_opt(2024, 5, 17).unwrap());
        assert_eq!(txs[0].amount, 129.99);
        assert_eq!(txs[0].category.as_deref(), Some("Electronics"));
        assert_eq!(txs[0].merchant.as_deref(), Some("Acme LLC"));
        assert_eq!(txs[1].amount, -40.0);
        assert_eq!(txs[1].category, None);
    }

    #[test]
    fn test_bare_array() {
        let txs = parse_transactions_json(r#"[{"date": "2024-01-01", "amount": 5}]"#).unwrap();
        assert_eq!(txs.len(), 1);
        assert!(txs[0].is_expense());
    }

    #[test]
    fn test_missing_fields_are_missing_data() {
        let no_amount = r#"[{"date": "2024-01-01"}]"#;
        assert!(matches!(
            parse_transactions_json(no_amount),
            Err(SpendingForecastError::MissingData(_))
        ));

        let no_date = r#"[{"amount": 3.5}]"#;
        assert!(matches!(
            parse_transactions_json(no_date),
            Err(SpendingForecastError::MissingData(_))
        ));

        let bad_amount = r#"[{"date": "2024-01-01", "amount": "twelve"}]"#;
        assert!(matches!(
            parse_transactions_json(bad_amount),
            Err(SpendingForecastError::MissingData(_))
        ));
    }

    #[test]
    fn test_bad_date_and_bad_json() {
        let bad_date = r#"[{"date": "yesterday", "amount": 1}]"#;
        assert!(matches!(
            parse_transactions_json(bad_date),
            Err(SpendingForecastError::DateError(_))
        ));
        assert!(matches!(
            parse_transactions_json("{not json"),
            Err(SpendingForecastError::SerializationError(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        assert!(matches!(
            load_transactions("/definitely/not/here/db.json"),
            Err(SpendingForecastError::IoError(_))
        ));
    }
}

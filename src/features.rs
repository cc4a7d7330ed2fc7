use crate::error::{Result, SpendingForecastError};
use crate::schema::{DailyFeatureRow, FeatureSchema, Transaction, LAG_DEPTH};
use crate::utils::days_between;
use chrono::{Datelike, NaiveDate};
use log::debug;
use std::collections::BTreeMap;

/// Keeps only expenses (`amount > 0`).
///
/// Fails when there is nothing to work with: an empty ledger, a ledger with
/// no positive amounts, or an expense whose amount is not a finite number.
pub fn filter_expenses(transactions: &[Transaction]) -> Result<Vec<Transaction>> {
    if transactions.is_empty() {
        return Err(SpendingForecastError::MissingData(
            "No transactions supplied".to_string(),
        ));
    }

    if let Some(bad) = transactions.iter().find(|t| !t.amount.is_finite()) {
        return Err(SpendingForecastError::MissingData(format!(
            "Transaction on {} has a non-finite amount",
            bad.date
        )));
    }

    let expenses: Vec<Transaction> = transactions
        .iter()
        .filter(|t| t.is_expense())
        .cloned()
        .collect();

    if expenses.is_empty() {
        return Err(SpendingForecastError::MissingData(format!(
            "None of the {} transactions is an expense (amount > 0)",
            transactions.len()
        )));
    }

    Ok(expenses)
}

/// Daily feature rows together with the schema they were built against.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    rows: Vec<DailyFeatureRow>,
    schema: FeatureSchema,
}

impl FeatureSet {
    pub fn rows(&self) -> &[DailyFeatureRow] {
        &self.rows
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    pub fn last_row(&self) -> Option<&DailyFeatureRow> {
        self.rows.last()
    }

    /// Reports whether every lag column of the last row is backed by real history.
    ///
    /// Short histories are still usable (missing lags are zero), so callers
    /// usually log this error rather than abort.
    pub fn check_history(&self) -> Result<()> {
        if self.rows.len() < LAG_DEPTH {
            return Err(SpendingForecastError::InsufficientHistory {
                days: self.rows.len(),
                required: LAG_DEPTH,
            });
        }
        Ok(())
    }
}

struct DayTotals {
    total: f64,
    category_sums: Vec<f64>,
}

pub struct FeatureBuilder;

impl FeatureBuilder {
    pub fn build(transactions: &[Transaction]) -> Result<FeatureSet> {
        let expenses = filter_expenses(transactions)?;
        Self::build_from_expenses(&expenses)
    }

    /// Same as [`FeatureBuilder::build`] for a ledger that is already filtered.
    pub fn build_from_expenses(expenses: &[Transaction]) -> Result<FeatureSet> {
        let expenses: Vec<&Transaction> = expenses.iter().filter(|t| t.is_expense()).collect();
        if expenses.is_empty() {
            return Err(SpendingForecastError::MissingData(
                "No expenses to build features from".to_string(),
            ));
        }

        let schema = FeatureSchema::new(expenses.iter().filter_map(|t| t.category.clone()));
        let n_categories = schema.categories().len();

        let mut days: BTreeMap<NaiveDate, DayTotals> = BTreeMap::new();
        for tx in &expenses {
            let day = days.entry(tx.date).or_insert_with(|| DayTotals {
                total: 0.0,
                category_sums: vec![0.0; n_categories],
            });
            day.total += tx.amount;

            if let Some(slot) = tx.category.as_deref().and_then(|c| schema.category_slot(c)) {
                day.category_sums[slot] += tx.amount;
            }
        }

        let Some(&start) = days.keys().next() else {
            return Err(SpendingForecastError::MissingData(
                "No expense dates found".to_string(),
            ));
        };

        let totals: Vec<f64> = days.values().map(|d| d.total).collect();
        let rows: Vec<DailyFeatureRow> = days
            .into_iter()
            .enumerate()
            .map(|(i, (date, day))| {
                let mut lags = [0.0; LAG_DEPTH];
                for (k, lag) in lags.iter_mut().enumerate() {
                    if let Some(prev) = i.checked_sub(k + 1) {
                        *lag = totals[prev];
                    }
                }

                DailyFeatureRow {
                    date,
                    total_spending: day.total,
                    day_of_week: date.weekday().num_days_from_monday(),
                    month: date.month(),
                    year: date.year(),
                    time_index: days_between(start, date),
                    lags,
                    category_sums: day.category_sums,
                }
            })
            .collect();

        debug!(
            "Built {} daily rows from {} expenses ({} category columns)",
            rows.len(),
            expenses.len(),
            n_categories
        );

        Ok(FeatureSet { rows, schema })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_two_day_scenario() {
        let txs = vec![
            Transaction::new(day(2024, 1, 2), 50.0),
            Transaction::new(day(2024, 1, 1), 100.0),
        ];
        let set = FeatureBuilder::build(&txs).unwrap();
        let rows = set.rows();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].time_index, 0);
        assert_eq!(rows[1].time_index, 1);
        assert_eq!(rows[0].total_spending, 100.0);
        assert_eq!(rows[1].total_spending, 50.0);
        assert_eq!(rows[0].lags, [0.0, 0.0, 0.0]);
        assert_eq!(rows[1].lags, [100.0, 0.0, 0.0]);
        assert_eq!(rows[0].day_of_week, 0); // Monday
        assert!(!set.schema().has_categories());
        assert_eq!(set.schema().width(), 7);
    }

    #[test]
    fn test_groups_by_day_and_sums_categories() {
        let txs = vec![
            Transaction::new(day(2024, 3, 1), 10.0).with_category("Grocery"),
            Transaction::new(day(2024, 3, 1), 5.0).with_category("Books"),
            Transaction::new(day(2024, 3, 1), 2.5).with_category("Grocery"),
            Transaction::new(day(2024, 3, 1), 4.0),
            Transaction::new(day(2024, 3, 4), 20.0).with_category("Books"),
            Transaction::new(day(2024, 3, 4), -300.0).with_category("Salary"),
        ];
        let set = FeatureBuilder::build(&txs).unwrap();

        assert_eq!(set.schema().categories(), &["Books", "Grocery"]);
        let rows = set.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].total_spending, 21.5);
        assert_eq!(rows[0].category_sums, vec![5.0, 12.5]);
        assert_eq!(rows[1].time_index, 3);
        assert_eq!(rows[1].category_sums, vec![20.0, 0.0]);
        assert_eq!(rows[1].lag(1), Some(21.5));
        assert_eq!(rows[1].lag(2), Some(0.0));
        assert_eq!(rows[1].lag(4), None);
    }

    #[test]
    fn test_lags_never_look_ahead() {
        let txs: Vec<Transaction> = (1..=6)
            .map(|d| Transaction::new(day(2024, 6, d), d as f64 * 10.0))
            .collect();
        let set = FeatureBuilder::build(&txs).unwrap();
        let rows = set.rows();

        for (i, row) in rows.iter().enumerate() {
            for k in 1..=LAG_DEPTH {
                let expected = if i >= k { rows[i - k].total_spending } else { 0.0 };
                assert_eq!(row.lag(k), Some(expected), "row {} lag {}", i, k);
            }
        }
        assert!(set.check_history().is_ok());
    }

    #[test]
    fn test_short_history_is_reported() {
        let txs = vec![Transaction::new(day(2024, 1, 1), 10.0)];
        let set = FeatureBuilder::build(&txs).unwrap();
        assert!(matches!(
            set.check_history(),
            Err(SpendingForecastError::InsufficientHistory { days: 1, required: 3 })
        ));
    }

    #[test]
    fn test_missing_data() {
        assert!(matches!(
            FeatureBuilder::build(&[]),
            Err(SpendingForecastError::MissingData(_))
        ));

        let refunds = vec![Transaction::new(day(2024, 1, 1), -25.0)];
        assert!(matches!(
            FeatureBuilder::build(&refunds),
            Err(SpendingForecastError::MissingData(_))
        ));

        let broken = vec![Transaction::new(day(2024, 1, 1), f64::INFINITY)];
        assert!(matches!(
            FeatureBuilder::build(&broken),
            Err(SpendingForecastError::MissingData(_))
        ));
    }
}

//! # Spending Forecast
//!
//! A library for turning a ledger of dated transactions into daily spending
//! forecasts and category-level spending advice.
//!
//! ## Core Concepts
//!
//! - **Expenses**: Only transactions with a positive amount take part
//! - **Daily Features**: One row per spending day with calendar fields, a time index,
//!   three lag features and one spending column per category
//! - **Linear Model**: Least squares over the daily features; underdetermined fits use the
//!   minimum-norm solution so they are reproducible
//! - **Autoregressive Forecast**: Each forecast day feeds its own prediction back in as the
//!   next day's `lag_1`
//! - **Insights**: Category rankings plus rule-based suggestions, computed independently of
//!   the forecast
//!
//! ## Example
//!
//! ```rust,ignore
//! use spending_forecast::*;
//! use chrono::NaiveDate;
//!
//! let transactions = vec![
//!     Transaction::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 100.0)
//!         .with_category("Grocery"),
//!     Transaction::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 50.0)
//!         .with_category("Books"),
//! ];
//!
//! let analyzer = SpendingAnalyzer::new(&transactions).unwrap();
//! let forecasts = analyzer.get_forecasts().unwrap();
//! assert_eq!(forecasts.thirty_day.len(), 30);
//!
//! let insights = analyzer.get_spending_insights();
//! println!("{}", serde_json::to_string_pretty(&insights).unwrap());
//! ```

pub mod error;
pub mod features;
pub mod forecast;
pub mod ingestion;
pub mod insights;
pub mod model;
pub mod schema;
pub mod solver;
pub mod synthetic;
pub mod utils;

pub use error::{Result, SpendingForecastError};
pub use features::{filter_expenses, FeatureBuilder, FeatureSet};
pub use forecast::{ForecastEngine, LagWindow};
pub use ingestion::{load_transactions, parse_transactions_json, TransactionRecord};
pub use insights::{CategoryStats, InsightEngine, SuggestionTier};
pub use model::{fit, FittedModel, ModelTrainer, SpendingPredictor};
pub use schema::*;
pub use synthetic::{SyntheticLedger, DEPARTMENTS};

use log::{debug, info, warn};

/// Everything one forecasting request needs, built once and read-only afterwards.
#[derive(Debug, Clone)]
pub struct SpendingAnalyzer {
    config: AnalyzerConfig,
    transactions: Vec<Transaction>,
    expenses: Vec<Transaction>,
    features: FeatureSet,
    model: FittedModel,
}

impl SpendingAnalyzer {
    pub fn new(transactions: &[Transaction]) -> Result<Self> {
        Self::with_config(transactions, AnalyzerConfig::default())
    }

    pub fn with_config(transactions: &[Transaction], config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;

        info!(
            "Building spending analyzer from {} transactions",
            transactions.len()
        );

        let expenses = filter_expenses(transactions)?;
        let features = FeatureBuilder::build_from_expenses(&expenses)?;

        if let Err(e) = features.check_history() {
            warn!("{}; missing lags are zero-filled, treat forecasts as low confidence", e);
        }

        let mut trainer = ModelTrainer::new(config.solver.clone());
        trainer.fit(&features)?;
        let model = trainer.into_model()?;

        debug!(
            "Analyzer ready: {} expenses over {} days, {} feature columns",
            expenses.len(),
            features.len(),
            features.schema().width()
        );

        Ok(Self {
            config,
            transactions: transactions.to_vec(),
            expenses,
            features,
            model,
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn expenses(&self) -> &[Transaction] {
        &self.expenses
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn model(&self) -> &FittedModel {
        &self.model
    }

    fn engine(&self) -> Result<ForecastEngine<'_, FittedModel>> {
        let last = self.features.last_row().ok_or_else(|| {
            SpendingForecastError::MissingData("No daily rows to forecast from".to_string())
        })?;
        Ok(ForecastEngine::new(&self.model, last))
    }

    pub fn forecast_points(&self, horizon: usize) -> Result<Vec<ForecastPoint>> {
        self.engine()?.run(horizon)
    }

    pub fn forecast(&self, horizon: usize) -> Result<Vec<f64>> {
        self.engine()?.forecast(horizon)
    }

    pub fn get_forecasts(&self) -> Result<SpendingForecasts> {
        self.engine()?.standard_horizons(&self.config.horizons)
    }

    pub fn get_spending_insights(&self) -> SpendingInsights {
        InsightEngine::new(self.config.insights.clone()).analyze(&self.transactions)
    }
}

pub fn get_forecasts(transactions: &[Transaction]) -> Result<SpendingForecasts> {
    SpendingAnalyzer::new(transactions)?.get_forecasts()
}

/// Insights never touch the model, so this skips feature building and fitting.
pub fn get_spending_insights(transactions: &[Transaction]) -> Result<SpendingInsights> {
    filter_expenses(transactions)?;
    Ok(InsightEngine::default().analyze(transactions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_two_day_forecast() {
        let transactions = vec![
            Transaction::new(day(2024, 1, 1), 100.0),
            Transaction::new(day(2024, 1, 2), 50.0),
        ];
        let analyzer = SpendingAnalyzer::new(&transactions).unwrap();

        let points = analyzer.forecast_points(1).unwrap();
        assert_eq!(points.len(), 1);
        let point = &points[0];
        assert_eq!(point.time_index, 2);
        assert_eq!(point.date, day(2024, 1, 3));
        assert_eq!(point.day_of_week, 2);
        assert_eq!(point.lag_1, 50.0);

        // Only time_index, day_of_week and lag_1 carry weight in the minimum-norm fit.
        let expected = 100.0 - 50.0 * (2.0 + 2.0 + 100.0 * 50.0) / 10_002.0;
        assert!((point.predicted_spending - expected).abs() < 1e-6);
        assert!(point.predicted_spending >= 0.0);

        let again = SpendingAnalyzer::new(&transactions).unwrap().forecast(1).unwrap();
        assert_eq!(again, vec![point.predicted_spending]);
    }

    #[test]
    fn test_get_forecasts_lengths() {
        let transactions: Vec<Transaction> = (1..=28)
            .map(|d| {
                let category = if d % 2 == 0 { "Grocery" } else { "Home" };
                Transaction::new(day(2024, 2, d), 20.0 + (d * 37 % 23) as f64)
                    .with_category(category)
            })
            .collect();

        let forecasts = get_forecasts(&transactions).unwrap();
        assert_eq!(forecasts.thirty_day.len(), 30);
        assert_eq!(forecasts.six_month.len(), 180);
        assert_eq!(forecasts.twelve_month.len(), 365);
        assert!(forecasts
            .twelve_month
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0));
        assert_eq!(forecasts.six_month[..], forecasts.twelve_month[..180]);
    }

    #[test]
    fn test_custom_horizons() {
        let transactions: Vec<Transaction> = (1..=10)
            .map(|d| Transaction::new(day(2024, 3, d), 10.0 * d as f64))
            .collect();
        let config = AnalyzerConfig {
            horizons: ForecastHorizons {
                short_days: 7,
                medium_days: 14,
                long_days: 21,
            },
            ..AnalyzerConfig::default()
        };
        let forecasts = SpendingAnalyzer::with_config(&transactions, config)
            .unwrap()
            .get_forecasts()
            .unwrap();
        assert_eq!(forecasts.thirty_day.len(), 7);
        assert_eq!(forecasts.twelve_month.len(), 21);
    }

    #[test]
    fn test_insights_without_categories_are_empty() {
        let transactions = vec![Transaction::new(day(2024, 1, 1), 100.0)];
        let insights = get_spending_insights(&transactions).unwrap();
        assert!(insights.is_empty());
    }

    #[test]
    fn test_income_only_categories_still_give_advice() {
        let transactions = vec![
            Transaction::new(day(2024, 1, 1), 10.0),
            Transaction::new(day(2024, 1, 1), -500.0).with_category("Salary"),
        ];
        let insights = get_spending_insights(&transactions).unwrap();
        assert!(insights.top_categories.is_empty());
        assert_eq!(insights.suggestions, vec![insights::BALANCED_MESSAGE.to_string()]);

        let analyzer = SpendingAnalyzer::new(&transactions).unwrap();
        assert_eq!(analyzer.get_spending_insights(), insights);
    }

    #[test]
    fn test_no_expenses_is_missing_data() {
        let transactions = vec![Transaction::new(day(2024, 1, 1), -100.0)];
        assert!(matches!(
            SpendingAnalyzer::new(&transactions),
            Err(SpendingForecastError::MissingData(_))
        ));
        assert!(matches!(
            get_spending_insights(&transactions),
            Err(SpendingForecastError::MissingData(_))
        ));
    }
}

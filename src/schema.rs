use crate::error::{Result, SpendingForecastError};
use chrono::{Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Number of lag features carried by every row and by the forecast window.
pub const LAG_DEPTH: usize = 3;

/// Leading feature columns, in the order the model sees them.
pub const BASE_COLUMNS: [&str; 7] = [
    "time_index",
    "day_of_week",
    "month",
    "year",
    "lag_1",
    "lag_2",
    "lag_3",
];

pub const CATEGORY_COLUMN_PREFIX: &str = "category_sum_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    /// Positive amounts are expenses; zero and negative entries are ignored.
    pub amount: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
}

impl Transaction {
    pub fn new(date: NaiveDate, amount: f64) -> Self {
        Self {
            date,
            amount,
            category: None,
            id: None,
            merchant: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn is_expense(&self) -> bool {
        self.amount > 0.0
    }
}

/// The closed set of columns a model is trained on.
///
/// Category columns are fixed when the schema is built and are kept in
/// ascending name order after the base columns. A category's column index
/// is looked up through the schema, never derived from a column name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeatureSchema {
    categories: Vec<String>,
}

impl FeatureSchema {
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut categories: Vec<String> = categories.into_iter().map(Into::into).collect();
        categories.sort();
        categories.dedup();
        Self { categories }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn has_categories(&self) -> bool {
        !self.categories.is_empty()
    }

    /// Position of the category inside the category block (not the full row).
    pub fn category_slot(&self, category: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(category))
            .ok()
    }

    /// Position of the category's column inside a full feature row.
    pub fn category_column(&self, category: &str) -> Option<usize> {
        self.category_slot(category)
            .map(|slot| BASE_COLUMNS.len() + slot)
    }

    pub fn width(&self) -> usize {
        BASE_COLUMNS.len() + self.categories.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        BASE_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(
                self.categories
                    .iter()
                    .map(|c| format!("{}{}", CATEGORY_COLUMN_PREFIX, c)),
            )
            .collect()
    }

    /// Lays out one feature row in schema order.
    ///
    /// `category_sums` must hold exactly one value per schema category.
    pub fn assemble(
        &self,
        time_index: i64,
        date: NaiveDate,
        lags: &[f64; LAG_DEPTH],
        category_sums: &[f64],
    ) -> Result<Vec<f64>> {
        if category_sums.len() != self.categories.len() {
            return Err(SpendingForecastError::Prediction(format!(
                "Feature row has {} category values but the schema defines {}",
                category_sums.len(),
                self.categories.len()
            )));
        }

        let mut row = Vec::with_capacity(self.width());
        row.push(time_index as f64);
        row.push(date.weekday().num_days_from_monday() as f64);
        row.push(date.month() as f64);
        row.push(date.year() as f64);
        row.extend_from_slice(lags);
        row.extend_from_slice(category_sums);
        Ok(row)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyFeatureRow {
    pub date: NaiveDate,
    pub total_spending: f64,
    /// Monday = 0 ... Sunday = 6
    pub day_of_week: u32,
    pub month: u32,
    pub year: i32,
    pub time_index: i64,
    pub lags: [f64; LAG_DEPTH],
    /// One value per schema category, in schema order.
    pub category_sums: Vec<f64>,
}

impl DailyFeatureRow {
    /// 1-based lag accessor, `lag(1)` is the previous day's total.
    pub fn lag(&self, k: usize) -> Option<f64> {
        k.checked_sub(1).and_then(|i| self.lags.get(i)).copied()
    }

    pub fn feature_vector(&self, schema: &FeatureSchema) -> Result<Vec<f64>> {
        schema.assemble(self.time_index, self.date, &self.lags, &self.category_sums)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub time_index: i64,
    pub day_of_week: u32,
    pub month: u32,
    pub year: i32,
    pub lag_1: f64,
    pub lag_2: f64,
    pub lag_3: f64,
    pub predicted_spending: f64,
}

/// The three standard forecast horizons, keyed the way the application backend expects.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpendingForecasts {
    #[serde(rename = "30_day")]
    pub thirty_day: Vec<f64>,
    #[serde(rename = "6_month")]
    pub six_month: Vec<f64>,
    #[serde(rename = "12_month")]
    pub twelve_month: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    pub total: f64,
    pub avg_per_transaction: f64,
}

/// Category rankings and advice. Empty when the ledger carries no categories.
///
/// An empty value serializes as `{}`; anything else always carries all three keys,
/// even when the rankings themselves are empty.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SpendingInsights {
    #[serde(default)]
    pub top_categories: Vec<CategorySummary>,
    #[serde(default)]
    pub bottom_categories: Vec<CategorySummary>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl Serialize for SpendingInsights {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        if self.is_empty() {
            return serializer.serialize_map(Some(0))?.end();
        }
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("top_categories", &self.top_categories)?;
        map.serialize_entry("bottom_categories", &self.bottom_categories)?;
        map.serialize_entry("suggestions", &self.suggestions)?;
        map.end()
    }
}

impl SpendingInsights {
    pub fn is_empty(&self) -> bool {
        self.top_categories.is_empty()
            && self.bottom_categories.is_empty()
            && self.suggestions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ForecastHorizons {
    #[schemars(description = "Days covered by the short forecast, reported as '30_day'.")]
    pub short_days: usize,

    #[schemars(description = "Days covered by the medium forecast, reported as '6_month'.")]
    pub medium_days: usize,

    #[schemars(description = "Days covered by the long forecast, reported as '12_month'.")]
    pub long_days: usize,
}

impl Default for ForecastHorizons {
    fn default() -> Self {
        Self {
            short_days: 30,
            medium_days: 180,
            long_days: 365,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InsightThresholds {
    #[schemars(
        description = "A category whose average transaction exceeds this multiple of the overall average gets a warning."
    )]
    pub warning_ratio: f64,

    #[schemars(
        description = "A category whose average transaction exceeds this multiple (but not the warning multiple) gets a reduction hint."
    )]
    pub moderate_ratio: f64,

    #[schemars(
        description = "A category whose average transaction is below this multiple of the overall average gets an increase hint."
    )]
    pub low_ratio: f64,

    #[schemars(description = "How many categories to list in the top and bottom rankings.")]
    pub ranking_size: usize,
}

impl Default for InsightThresholds {
    fn default() -> Self {
        Self {
            warning_ratio: 1.5,
            moderate_ratio: 1.2,
            low_ratio: 0.8,
            ranking_size: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SolverSettings {
    #[schemars(
        description = "Relative cutoff: singular values below rcond times the largest one are treated as zero."
    )]
    pub rcond: f64,

    #[schemars(description = "Upper bound on Jacobi sweeps before the solver gives up.")]
    pub max_sweeps: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            rcond: 1e-10,
            max_sweeps: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub horizons: ForecastHorizons,

    #[serde(default)]
    pub insights: InsightThresholds,

    #[serde(default)]
    pub solver: SolverSettings,
}

impl AnalyzerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AnalyzerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let horizons = &self.horizons;
        if horizons.short_days == 0 || horizons.medium_days == 0 || horizons.long_days == 0 {
            return Err(SpendingForecastError::InvalidConfig(
                "Forecast horizons must be at least one day".to_string(),
            ));
        }

        let t = &self.insights;
        if !(t.low_ratio > 0.0 && t.low_ratio < t.moderate_ratio && t.moderate_ratio < t.warning_ratio)
        {
            return Err(SpendingForecastError::InvalidConfig(format!(
                "Insight ratios must satisfy 0 < low ({}) < moderate ({}) < warning ({})",
                t.low_ratio, t.moderate_ratio, t.warning_ratio
            )));
        }

        if !(self.solver.rcond.is_finite() && self.solver.rcond >= 0.0) || self.solver.max_sweeps == 0
        {
            return Err(SpendingForecastError::InvalidConfig(format!(
                "Solver settings out of range: rcond={}, max_sweeps={}",
                self.solver.rcond, self.solver.max_sweeps
            )));
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AnalyzerConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

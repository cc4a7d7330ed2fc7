use crate::error::{Result, SpendingForecastError};
use crate::features::FeatureSet;
use crate::schema::{FeatureSchema, SolverSettings};
use crate::solver::solve_min_norm;
use log::debug;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Anything that maps a feature row (laid out in its schema's order) to a spending value.
pub trait SpendingPredictor {
    fn schema(&self) -> &FeatureSchema;

    fn predict(&self, row: &[f64]) -> Result<f64>;
}

/// Linear model over the columns of a [`FeatureSchema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    schema: FeatureSchema,
    intercept: f64,
    coefficients: Vec<f64>,
    rank: usize,
    r_squared: f64,
    n_observations: usize,
}

impl FittedModel {
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// One coefficient per schema column, in schema order.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn coefficient(&self, column: &str) -> Option<f64> {
        self.schema
            .column_names()
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.coefficients.get(i).copied())
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    /// In-sample coefficient of determination.
    pub fn r_squared(&self) -> f64 {
        self.r_squared
    }

    pub fn n_observations(&self) -> usize {
        self.n_observations
    }
}

impl SpendingPredictor for FittedModel {
    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn predict(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.coefficients.len() {
            return Err(SpendingForecastError::Prediction(format!(
                "Feature row has {} columns, model expects {}",
                row.len(),
                self.coefficients.len()
            )));
        }

        let value = self.intercept
            + row
                .iter()
                .zip(&self.coefficients)
                .map(|(x, w)| x * w)
                .sum::<f64>();
        Ok(value)
    }
}

/// Design matrix (one row per day, columns in schema order) and the daily totals.
pub fn design_matrix(features: &FeatureSet) -> Result<(Array2<f64>, Array1<f64>)> {
    let schema = features.schema();
    let width = schema.width();
    let mut x = Array2::<f64>::zeros((features.len(), width));
    let mut y = Array1::<f64>::zeros(features.len());

    for (i, row) in features.rows().iter().enumerate() {
        let values = row.feature_vector(schema)?;
        for (j, value) in values.into_iter().enumerate() {
            x[[i, j]] = value;
        }
        y[i] = row.total_spending;
    }

    Ok((x, y))
}

/// Ordinary least squares with intercept.
///
/// Columns and target are mean-centred before solving so the intercept is
/// not penalised by the minimum-norm tie-break.
pub fn fit(features: &FeatureSet, settings: &SolverSettings) -> Result<FittedModel> {
    if features.is_empty() {
        return Err(SpendingForecastError::MissingData(
            "Cannot fit a model without daily rows".to_string(),
        ));
    }

    let (x, y) = design_matrix(features)?;
    let x_mean = x.mean_axis(Axis(0)).ok_or_else(|| {
        SpendingForecastError::Prediction("Design matrix has no rows".to_string())
    })?;
    let y_mean = y.mean().unwrap_or(0.0);

    let x_centered = &x - &x_mean;
    let y_centered = &y - y_mean;

    let solution = solve_min_norm(&x_centered, &y_centered, settings)?;
    let intercept = y_mean - x_mean.dot(&solution.coefficients);

    if !intercept.is_finite() || solution.coefficients.iter().any(|c| !c.is_finite()) {
        return Err(SpendingForecastError::Prediction(
            "Least squares produced non-finite parameters".to_string(),
        ));
    }

    let fitted = x.dot(&solution.coefficients) + intercept;
    let ss_res: f64 = (&y - &fitted).mapv(|r| r * r).sum();
    let ss_tot: f64 = y_centered.mapv(|r| r * r).sum();
    let r_squared = if ss_tot > 1e-10 {
        1.0 - ss_res / ss_tot
    } else {
        1.0
    };

    debug!(
        "Fitted {} columns on {} days: rank {}, {} sweeps, R^2 {:.4}",
        features.schema().width(),
        features.len(),
        solution.rank,
        solution.sweeps,
        r_squared
    );

    Ok(FittedModel {
        schema: features.schema().clone(),
        intercept,
        coefficients: solution.coefficients.to_vec(),
        rank: solution.rank,
        r_squared,
        n_observations: features.len(),
    })
}

/// Holds the model produced by the last successful [`ModelTrainer::fit`].
#[derive(Debug, Clone, Default)]
pub struct ModelTrainer {
    settings: SolverSettings,
    model: Option<FittedModel>,
}

impl ModelTrainer {
    pub fn new(settings: SolverSettings) -> Self {
        Self {
            settings,
            model: None,
        }
    }

    pub fn fit(&mut self, features: &FeatureSet) -> Result<&FittedModel> {
        self.model = None;
        let model = fit(features, &self.settings)?;
        Ok(self.model.insert(model))
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Result<&FittedModel> {
        self.model.as_ref().ok_or_else(not_fitted)
    }

    pub fn into_model(self) -> Result<FittedModel> {
        self.model.ok_or_else(not_fitted)
    }

    pub fn predict(&self, row: &[f64]) -> Result<f64> {
        self.model()?.predict(row)
    }
}

fn not_fitted() -> SpendingForecastError {
    SpendingForecastError::Prediction("Model has not been fitted".to_string())
}

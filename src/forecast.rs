//! Autoregressive daily forecast.
//!
//! Each step predicts one day and feeds the clamped prediction back into the
//! lag window used by the next step. Nothing corrects the drift this causes,
//! so errors compound with the horizon.
//!
//! Two approximations are part of the observable output and are kept as-is:
//! the window starts with the last known day's total in all three slots
//! (not that row's real lags), and every category column is zero for
//! forecast days.

use crate::error::{Result, SpendingForecastError};
use crate::model::SpendingPredictor;
use crate::schema::{
    DailyFeatureRow, ForecastHorizons, ForecastPoint, SpendingForecasts, LAG_DEPTH,
};
use crate::utils::add_days;
use chrono::Datelike;
use log::debug;

/// The three most recent spending values, newest first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagWindow {
    slots: [f64; LAG_DEPTH],
}

impl LagWindow {
    pub fn seeded(value: f64) -> Self {
        Self {
            slots: [value; LAG_DEPTH],
        }
    }

    /// Slot 0 feeds `lag_1`, slot 1 `lag_2`, slot 2 `lag_3`.
    pub fn slot(&self, index: usize) -> Option<f64> {
        self.slots.get(index).copied()
    }

    pub fn slots(&self) -> &[f64; LAG_DEPTH] {
        &self.slots
    }

    /// Pushes the newest value to the front and drops the oldest.
    pub fn push(&mut self, value: f64) {
        self.slots.rotate_right(1);
        self.slots[0] = value;
    }
}

pub struct ForecastEngine<'a, P: SpendingPredictor> {
    predictor: &'a P,
    last_known: &'a DailyFeatureRow,
}

impl<'a, P: SpendingPredictor> ForecastEngine<'a, P> {
    pub fn new(predictor: &'a P, last_known: &'a DailyFeatureRow) -> Self {
        Self {
            predictor,
            last_known,
        }
    }

    pub fn initial_window(&self) -> LagWindow {
        LagWindow::seeded(self.last_known.total_spending)
    }

    /// Predicts day `offset` (1-based) after the last known day and advances `window`.
    pub fn step(&self, window: &mut LagWindow, offset: u64) -> Result<ForecastPoint> {
        let schema = self.predictor.schema();
        let date = add_days(self.last_known.date, offset)?;
        let time_index = self.last_known.time_index + offset as i64;
        let lags = *window.slots();
        let category_sums = vec![0.0; schema.categories().len()];

        let row = schema.assemble(time_index, date, &lags, &category_sums)?;
        let raw = self.predictor.predict(&row)?;
        if !raw.is_finite() {
            return Err(SpendingForecastError::Prediction(format!(
                "Model returned {} for {}",
                raw, date
            )));
        }
        let predicted_spending = raw.max(0.0);

        window.push(predicted_spending);

        Ok(ForecastPoint {
            date,
            time_index,
            day_of_week: date.weekday().num_days_from_monday(),
            month: date.month(),
            year: date.year(),
            lag_1: lags[0],
            lag_2: lags[1],
            lag_3: lags[2],
            predicted_spending,
        })
    }

    pub fn run(&self, horizon: usize) -> Result<Vec<ForecastPoint>> {
        if horizon == 0 {
            return Err(SpendingForecastError::InvalidConfig(
                "Forecast horizon must be at least one day".to_string(),
            ));
        }

        let mut window = self.initial_window();
        let mut points = Vec::with_capacity(horizon);
        for offset in 1..=horizon as u64 {
            points.push(self.step(&mut window, offset)?);
        }

        debug!(
            "Forecast {} days from {} (seed {:.2})",
            horizon, self.last_known.date, self.last_known.total_spending
        );
        Ok(points)
    }

    pub fn forecast(&self, horizon: usize) -> Result<Vec<f64>> {
        Ok(self
            .run(horizon)?
            .into_iter()
            .map(|p| p.predicted_spending)
            .collect())
    }

    /// Each horizon is an independent run from the same starting state.
    pub fn standard_horizons(&self, horizons: &ForecastHorizons) -> Result<SpendingForecasts> {
        Ok(SpendingForecasts {
            thirty_day: self.forecast(horizons.short_days)?,
            six_month: self.forecast(horizons.medium_days)?,
            twelve_month: self.forecast(horizons.long_days)?,
        })
    }
}

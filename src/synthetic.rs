//! Reproducible demo ledgers: roughly 30 purchases a month over a window
//! that ends on a chosen date, amounts uniform between 5 and 1000.

use crate::error::{Result, SpendingForecastError};
use crate::schema::Transaction;
use crate::utils::{add_days, days_between};
use chrono::{Months, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};

pub const DEPARTMENTS: [&str; 22] = [
    "Automotive",
    "Baby",
    "Beauty",
    "Books",
    "Clothing",
    "Computers",
    "Electronics",
    "Games",
    "Garden",
    "Grocery",
    "Health",
    "Home",
    "Industrial",
    "Jewelery",
    "Kids",
    "Movies",
    "Music",
    "Outdoors",
    "Shoes",
    "Sports",
    "Tools",
    "Toys",
];

const MERCHANT_STEMS: [&str; 8] = [
    "Harbor", "Summit", "Maple", "Quarry", "Lantern", "Copper", "Willow", "Beacon",
];
const MERCHANT_SUFFIXES: [&str; 4] = ["LLC", "Group", "and Sons", "Inc"];

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticLedger {
    pub end_date: NaiveDate,
    pub months: u32,
    pub transactions_per_month: usize,
    pub min_amount: f64,
    pub max_amount: f64,
    pub seed: u64,
}

impl SyntheticLedger {
    pub fn new(end_date: NaiveDate, seed: u64) -> Self {
        Self {
            end_date,
            months: 18,
            transactions_per_month: 30,
            min_amount: 5.0,
            max_amount: 1000.0,
            seed,
        }
    }

    pub fn start_date(&self) -> Result<NaiveDate> {
        self.end_date
            .checked_sub_months(Months::new(self.months))
            .ok_or_else(|| {
                SpendingForecastError::DateError(format!(
                    "{} minus {} months is out of range",
                    self.end_date, self.months
                ))
            })
    }

    pub fn generate(&self) -> Result<Vec<Transaction>> {
        if !(self.min_amount > 0.0 && self.min_amount < self.max_amount) {
            return Err(SpendingForecastError::InvalidConfig(format!(
                "Amount range [{}, {}] must be positive and non-empty",
                self.min_amount, self.max_amount
            )));
        }

        let start = self.start_date()?;
        let span = days_between(start, self.end_date).max(0) as u64;
        let count = self.transactions_per_month * self.months as usize;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let day_offsets = Uniform::new_inclusive(0, span);
        let amounts = Uniform::new_inclusive(self.min_amount, self.max_amount);

        let mut transactions = Vec::with_capacity(count);
        for _ in 0..count {
            let date = add_days(start, day_offsets.sample(&mut rng))?;
            let amount = (amounts.sample(&mut rng) * 100.0).round() / 100.0;
            let category = DEPARTMENTS[rng.gen_range(0..DEPARTMENTS.len())];
            let merchant = format!(
                "{} {}",
                MERCHANT_STEMS[rng.gen_range(0..MERCHANT_STEMS.len())],
                MERCHANT_SUFFIXES[rng.gen_range(0..MERCHANT_SUFFIXES.len())]
            );
            let id = format!("{:016x}{:016x}", rng.gen::<u64>(), rng.gen::<u64>());

            transactions.push(Transaction {
                date,
                amount,
                category: Some(category.to_string()),
                id: Some(id),
                merchant: Some(merchant),
            });
        }

        Ok(transactions)
    }
}

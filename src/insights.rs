use crate::schema::{CategorySummary, InsightThresholds, SpendingInsights, Transaction};
use crate::utils::mean;
use log::debug;
use std::collections::BTreeMap;

pub const BALANCED_MESSAGE: &str = "Your spending is balanced across categories. Good job!";

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStats {
    pub category: String,
    pub total: f64,
    pub count: usize,
    pub avg_per_transaction: f64,
}

impl CategoryStats {
    fn summary(&self) -> CategorySummary {
        CategorySummary {
            category: self.category.clone(),
            total: self.total,
            avg_per_transaction: self.avg_per_transaction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionTier {
    Warning,
    Moderate,
    Low,
}

pub struct InsightEngine {
    thresholds: InsightThresholds,
}

impl InsightEngine {
    pub fn new(thresholds: InsightThresholds) -> Self {
        Self { thresholds }
    }

    /// Per-category totals in ascending category order. Uncategorised expenses are skipped.
    pub fn category_stats(expenses: &[Transaction]) -> Vec<CategoryStats> {
        let mut grouped: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
        for tx in expenses.iter().filter(|t| t.is_expense()) {
            if let Some(category) = tx.category.as_deref() {
                let entry = grouped.entry(category).or_insert((0.0, 0));
                entry.0 += tx.amount;
                entry.1 += 1;
            }
        }

        grouped
            .into_iter()
            .map(|(category, (total, count))| CategoryStats {
                category: category.to_string(),
                total,
                count,
                avg_per_transaction: total / count as f64,
            })
            .collect()
    }

    /// Strict comparisons: an average sitting exactly on a ratio falls through to the next tier.
    pub fn classify(&self, avg: f64, overall_avg: f64) -> Option<SuggestionTier> {
        let t = &self.thresholds;
        if avg > overall_avg * t.warning_ratio {
            Some(SuggestionTier::Warning)
        } else if avg > overall_avg * t.moderate_ratio {
            Some(SuggestionTier::Moderate)
        } else if avg < overall_avg * t.low_ratio {
            Some(SuggestionTier::Low)
        } else {
            None
        }
    }

    /// Takes the whole ledger: income rows never enter the statistics, but a
    /// category on any row means the ledger is categorised.
    pub fn analyze(&self, transactions: &[Transaction]) -> SpendingInsights {
        if transactions.iter().all(|t| t.category.is_none()) {
            return SpendingInsights::default();
        }

        let stats = Self::category_stats(transactions);
        if stats.is_empty() {
            debug!("Ledger is categorised but no expense carries a category");
            return SpendingInsights {
                suggestions: vec![BALANCED_MESSAGE.to_string()],
                ..SpendingInsights::default()
            };
        }

        let amounts: Vec<f64> = transactions
            .iter()
            .filter(|t| t.is_expense())
            .map(|t| t.amount)
            .collect();
        let Some(overall_avg) = mean(&amounts) else {
            return SpendingInsights::default();
        };

        // Stable sorts over name-ordered stats, so equal totals stay in name order.
        let mut descending: Vec<&CategoryStats> = stats.iter().collect();
        descending.sort_by(|a, b| b.total.total_cmp(&a.total));
        let mut ascending: Vec<&CategoryStats> = stats.iter().collect();
        ascending.sort_by(|a, b| a.total.total_cmp(&b.total));

        let n = self.thresholds.ranking_size;
        let top_categories = descending.iter().take(n).map(|s| s.summary()).collect();
        let bottom_categories = ascending.iter().take(n).map(|s| s.summary()).collect();

        let mut suggestions: Vec<String> = stats
            .iter()
            .filter_map(|s| {
                self.classify(s.avg_per_transaction, overall_avg)
                    .map(|tier| suggestion_text(tier, s))
            })
            .collect();
        if suggestions.is_empty() {
            suggestions.push(BALANCED_MESSAGE.to_string());
        }

        debug!(
            "Insights over {} categories (overall avg {:.2}): {} suggestion(s)",
            stats.len(),
            overall_avg,
            suggestions.len()
        );

        SpendingInsights {
            top_categories,
            bottom_categories,
            suggestions,
        }
    }
}

impl Default for InsightEngine {
    fn default() -> Self {
        Self::new(InsightThresholds::default())
    }
}

fn suggestion_text(tier: SuggestionTier, stats: &CategoryStats) -> String {
    let cat = &stats.category;
    let avg = stats.avg_per_transaction;
    match tier {
        SuggestionTier::Warning => format!(
            "Warning: Spending in '{}' is much higher than average. Try to set a monthly budget and track your expenses in this category. Tip: Review your recent purchases in '{}' and identify non-essential items to cut back.",
            cat, cat
        ),
        SuggestionTier::Moderate => format!(
            "Consider reducing spending in '{}' (average per transaction: ${:.2}). Try meal planning, price comparison, or limiting impulse buys.",
            cat, avg
        ),
        SuggestionTier::Low => format!(
            "You could consider increasing investment in '{}' (average per transaction: ${:.2}). If this is an important category, review your priorities.",
            cat, avg
        ),
    }
}

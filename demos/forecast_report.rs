use chrono::NaiveDate;
use spending_forecast::*;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let transactions = match std::env::args().nth(1) {
        Some(path) => load_transactions(path)?,
        None => {
            let end = NaiveDate::from_ymd_opt(2024, 6, 30).ok_or("bad end date")?;
            SyntheticLedger::new(end, 42).generate()?
        }
    };

    let analyzer = SpendingAnalyzer::new(&transactions)?;
    let model = analyzer.model();
    println!(
        "Fitted {} columns on {} days (rank {}, R^2 {:.3})",
        model.coefficients().len(),
        model.n_observations(),
        model.rank(),
        model.r_squared()
    );

    let forecasts = analyzer.get_forecasts()?;
    for (label, series) in [
        ("30 days", &forecasts.thirty_day),
        ("6 months", &forecasts.six_month),
        ("12 months", &forecasts.twelve_month),
    ] {
        let total: f64 = series.iter().sum();
        println!("{:>10}: {:>12.2} total, {:>8.2} per day", label, total, total / series.len() as f64);
    }

    println!("\nNext week:");
    for point in analyzer.forecast_points(7)? {
        println!("  {}  {:>8.2}", point.date, point.predicted_spending);
    }

    println!("\n{}", serde_json::to_string_pretty(&analyzer.get_spending_insights())?);
    Ok(())
}

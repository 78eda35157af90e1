use super::super::domain::Debtor;

/// Advisory 0-100 ranking scalar for dashboards. Never consulted by the waterfall.
pub fn health_score(debtor: &Debtor, days_since_payment: i64) -> f64 {
    let score = 100.0 - days_since_payment as f64 / 2.0 - debtor.current_balance / 10_000.0;
    score.clamp(0.0, 100.0)
}

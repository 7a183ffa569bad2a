use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketMetric {
    pub ticker: String,
    pub value: f64,
    /// Signed percent.
    pub change: f64,
    pub trend: Trend,
}

impl MarketMetric {
    pub fn new(ticker: &str, value: f64, change: f64, trend: Trend) -> Self {
        Self {
            ticker: ticker.to_string(),
            value,
            change,
            trend,
        }
    }
}

/// Static telemetry shown on the dashboard. Never mutated after load.
pub fn seed_market() -> Vec<MarketMetric> {
    vec![
        MarketMetric::new("UK_INFRA", 4250.32, 1.2, Trend::Up),
        MarketMetric::new("STL_BEAM", 890.15, -0.4, Trend::Down),
        MarketMetric::new("CON_TECH", 125.44, 3.8, Trend::Up),
        MarketMetric::new("LND_PROP", 5600.00, 0.1, Trend::Up),
        MarketMetric::new("GLB_MAT", 332.10, -1.5, Trend::Down),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_agrees_with_change_sign() {
        for m in seed_market() {
            match m.trend {
                Trend::Up => assert!(m.change > 0.0, "{}", m.ticker),
                Trend::Down => assert!(m.change < 0.0, "{}", m.ticker),
                Trend::Flat => assert_eq!(m.change, 0.0),
            }
        }
    }
}

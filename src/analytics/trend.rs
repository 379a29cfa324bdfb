//! Per-metric trend analysis over a ring of minute-level averages.

use std::collections::VecDeque;

const MAX_MINUTES: usize = 1440;
const STABLE_SLOPE_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Copy)]
pub struct Trend {
    pub direction: TrendDirection,
    pub slope: f64,
    pub strength: f64,
}

pub struct TrendAnalyzer {
    minute_averages: VecDeque<f64>,
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self {
            minute_averages: VecDeque::new(),
        }
    }
}

impl TrendAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_minute_average(&mut self, average: f64) {
        if self.minute_averages.len() >= MAX_MINUTES {
            self.minute_averages.pop_front();
        }
        self.minute_averages.push_back(average);
    }

    /// Ordinary least-squares slope of minute-average against minute index.
    pub fn analyze(&self) -> Option<Trend> {
        let n = self.minute_averages.len();
        if n < 2 {
            return None;
        }

        let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let x_mean = xs.iter().sum::<f64>() / n as f64;
        let y_mean = self.minute_averages.iter().sum::<f64>() / n as f64;

        let mut num = 0.0;
        let mut den = 0.0;
        for (x, y) in xs.iter().zip(self.minute_averages.iter()) {
            num += (x - x_mean) * (y - y_mean);
            den += (x - x_mean).powi(2);
        }

        let slope = if den.abs() < f64::EPSILON { 0.0 } else { num / den };

        let direction = if slope.abs() < STABLE_SLOPE_THRESHOLD {
            TrendDirection::Stable
        } else if slope > 0.0 {
            TrendDirection::Up
        } else {
            TrendDirection::Down
        };

        let strength = (slope.abs() / (y_mean + 1e-6)).min(1.0);

        Some(Trend {
            direction,
            slope,
            strength,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rising_series_reports_up() {
        let mut analyzer = TrendAnalyzer::new();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            analyzer.record_minute_average(v);
        }
        let trend = analyzer.analyze().unwrap();
        assert_eq!(trend.direction, TrendDirection::Up);
    }

    #[test]
    fn flat_series_reports_stable() {
        let mut analyzer = TrendAnalyzer::new();
        for _ in 0..5 {
            analyzer.record_minute_average(10.0);
        }
        let trend = analyzer.analyze().unwrap();
        assert_eq!(trend.direction, TrendDirection::Stable);
    }

    #[test]
    fn ring_caps_at_max_minutes() {
        let mut analyzer = TrendAnalyzer::new();
        for i in 0..(MAX_MINUTES + 10) {
            analyzer.record_minute_average(i as f64);
        }
        assert_eq!(analyzer.minute_averages.len(), MAX_MINUTES);
    }
}

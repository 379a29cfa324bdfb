//! Typed alerting over metric thresholds and detected anomalies.

use chrono::{DateTime, Utc};

use super::anomaly::AnomalySeverity;
use super::window::MetricName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertType {
    HighErrorRate,
    HighLatency,
    TrafficSpike,
    AnomalyDetected,
}

#[derive(Debug, Clone)]
pub struct Alert {
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub metric: MetricName,
    pub value: f64,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

const HIGH_ERROR_RATE_THRESHOLD: f64 = 0.05;
const HIGH_ERROR_RATE_SEVERE_THRESHOLD: f64 = 0.1;
const HIGH_LATENCY_THRESHOLD_MS: f64 = 1000.0;
const HIGH_LATENCY_SEVERE_THRESHOLD_MS: f64 = 5000.0;
const TRAFFIC_SPIKE_MULTIPLIER: f64 = 2.0;
const TRAFFIC_SPIKE_SEVERE_MULTIPLIER: f64 = 5.0;

pub fn check_high_error_rate(errors_in_window: f64, total_in_window: f64) -> Option<Alert> {
    if total_in_window <= 0.0 {
        return None;
    }
    let rate = errors_in_window / total_in_window;
    if rate > HIGH_ERROR_RATE_THRESHOLD {
        let severity = if rate > HIGH_ERROR_RATE_SEVERE_THRESHOLD {
            AlertSeverity::High
        } else {
            AlertSeverity::Medium
        };
        Some(Alert {
            alert_type: AlertType::HighErrorRate,
            severity,
            metric: MetricName::Errors,
            value: rate,
            message: format!("error rate {:.2}% over the last 5 minutes", rate * 100.0),
            timestamp: Utc::now(),
        })
    } else {
        None
    }
}

pub fn check_high_latency(response_time_ms: f64) -> Option<Alert> {
    if response_time_ms > HIGH_LATENCY_THRESHOLD_MS {
        let severity = if response_time_ms > HIGH_LATENCY_SEVERE_THRESHOLD_MS {
            AlertSeverity::High
        } else {
            AlertSeverity::Medium
        };
        Some(Alert {
            alert_type: AlertType::HighLatency,
            severity,
            metric: MetricName::ResponseTime,
            value: response_time_ms,
            message: format!("response time {response_time_ms:.0}ms"),
            timestamp: Utc::now(),
        })
    } else {
        None
    }
}

pub fn check_traffic_spike(current_minute_count: f64, ten_minute_baseline_avg: f64) -> Option<Alert> {
    if ten_minute_baseline_avg <= 0.0 {
        return None;
    }
    let multiplier = current_minute_count / ten_minute_baseline_avg;
    if multiplier > TRAFFIC_SPIKE_MULTIPLIER {
        let severity = if multiplier > TRAFFIC_SPIKE_SEVERE_MULTIPLIER {
            AlertSeverity::Medium
        } else {
            AlertSeverity::Low
        };
        Some(Alert {
            alert_type: AlertType::TrafficSpike,
            severity,
            metric: MetricName::PageViews,
            value: multiplier,
            message: format!("traffic {multiplier:.2}x the 10-minute baseline"),
            timestamp: Utc::now(),
        })
    } else {
        None
    }
}

pub fn alert_from_anomaly(metric: MetricName, anomaly: &super::anomaly::Anomaly) -> Alert {
    let severity = match anomaly.severity {
        AnomalySeverity::High => AlertSeverity::High,
        AnomalySeverity::Medium => AlertSeverity::Medium,
    };
    Alert {
        alert_type: AlertType::AnomalyDetected,
        severity,
        metric,
        value: anomaly.value,
        message: format!(
            "{} deviates from baseline mean {:.2}",
            metric.as_str(),
            anomaly.baseline_mean
        ),
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_rate_above_ten_percent_is_high_severity() {
        let alert = check_high_error_rate(15.0, 100.0).unwrap();
        assert_eq!(alert.severity, AlertSeverity::High);
    }

    #[test]
    fn error_rate_below_threshold_emits_nothing() {
        assert!(check_high_error_rate(1.0, 100.0).is_none());
    }

    #[test]
    fn traffic_spike_never_escalates_past_medium() {
        let alert = check_traffic_spike(700.0, 100.0).unwrap();
        assert_eq!(alert.severity, AlertSeverity::Medium);
    }

    #[test]
    fn latency_above_five_seconds_is_high_severity() {
        let alert = check_high_latency(6000.0).unwrap();
        assert_eq!(alert.severity, AlertSeverity::High);
    }
}

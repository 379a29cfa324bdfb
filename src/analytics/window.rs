//! Per-metric sliding window over the real-time window length, with rolling
//! sum/count for cheap aggregate reads.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

/// The eight operational metrics tracked by the real-time engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    ActiveUsers,
    PageViews,
    EventRegistrations,
    SearchQueries,
    RecommendationClicks,
    PaymentCompletions,
    Errors,
    ResponseTime,
}

impl MetricName {
    pub const ALL: [MetricName; 8] = [
        MetricName::ActiveUsers,
        MetricName::PageViews,
        MetricName::EventRegistrations,
        MetricName::SearchQueries,
        MetricName::RecommendationClicks,
        MetricName::PaymentCompletions,
        MetricName::Errors,
        MetricName::ResponseTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::ActiveUsers => "active_users",
            MetricName::PageViews => "page_views",
            MetricName::EventRegistrations => "event_registrations",
            MetricName::SearchQueries => "search_queries",
            MetricName::RecommendationClicks => "recommendation_clicks",
            MetricName::PaymentCompletions => "payment_completions",
            MetricName::Errors => "errors",
            MetricName::ResponseTime => "response_time",
        }
    }
}

pub struct SlidingWindow {
    data: VecDeque<(DateTime<Utc>, f64)>,
    window_seconds: i64,
    sum: f64,
    last_value: f64,
}

impl SlidingWindow {
    pub fn new(window_seconds: usize) -> Self {
        Self {
            data: VecDeque::new(),
            window_seconds: window_seconds as i64,
            sum: 0.0,
            last_value: 0.0,
        }
    }

    pub fn push(&mut self, ts: DateTime<Utc>, value: f64) {
        self.data.push_back((ts, value));
        self.sum += value;
        self.last_value = value;
        self.trim(ts);
    }

    fn trim(&mut self, now: DateTime<Utc>) {
        while let Some(&(ts, value)) = self.data.front() {
            if (now - ts).num_seconds() > self.window_seconds {
                self.sum -= value;
                self.data.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn count(&self) -> usize {
        self.data.len()
    }

    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            0.0
        } else {
            self.sum / self.data.len() as f64
        }
    }

    pub fn last_value(&self) -> f64 {
        self.last_value
    }

    /// Sum of values within the trailing `seconds`, measured relative to
    /// `now` (used for the 5-minute error-rate and 10-minute traffic
    /// baseline checks, which are narrower than the overall window length).
    pub fn sum_within(&self, now: DateTime<Utc>, seconds: i64) -> f64 {
        self.data
            .iter()
            .filter(|(ts, _)| (now - *ts).num_seconds() <= seconds)
            .map(|(_, v)| v)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Trim against the current wall clock, for callers that read a window
    /// without having just pushed to it.
    pub fn trim_now(&mut self) {
        let now = Utc::now();
        self.trim(now);
    }
}

//! Real-time session tracking, adapted from the source monorepo's
//! Redis-backed `SessionTracker` to an in-process `DashMap`, since
//! persistence/transport is out of scope here.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// 30 minutes: the threshold used when reporting whether a session is
/// currently active.
const ACTIVE_IDLE_THRESHOLD_MINUTES: i64 = 30;
/// 2 hours: the more conservative threshold used by the hourly GC sweep.
/// A session can be reported inactive well before it is actually evicted.
const EVICTION_IDLE_THRESHOLD_HOURS: i64 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_id: String,
    pub user_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub event_count: u32,
    pub page_views: u32,
    pub viewed_events: HashSet<Uuid>,
    pub viewed_categories: HashSet<String>,
    pub is_active: bool,
    /// Running sum of `EngagementAction::interest_weight()` across the
    /// session; negative actions (not-interested, report) pull it down.
    pub engagement_score: f64,
}

impl SessionMetadata {
    fn new(session_id: String, user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            user_id,
            started_at: now,
            last_activity: now,
            event_count: 0,
            page_views: 0,
            viewed_events: HashSet::new(),
            viewed_categories: HashSet::new(),
            is_active: true,
            engagement_score: 0.0,
        }
    }

    pub fn idle_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_activity).num_minutes()
    }

    pub fn is_currently_active(&self, now: DateTime<Utc>) -> bool {
        self.idle_minutes(now) < ACTIVE_IDLE_THRESHOLD_MINUTES
    }
}

/// A page-view event within a session, adapted from the source's
/// `ContentViewEvent`.
#[derive(Debug, Clone)]
pub struct ContentViewEvent {
    pub event_id: Uuid,
    pub category: String,
    pub watch_duration_ms: u32,
    pub content_duration_ms: u32,
    pub completion_rate: f32,
}

impl ContentViewEvent {
    pub fn is_engaged(&self) -> bool {
        self.completion_rate >= 0.5 || self.watch_duration_ms >= 30_000
    }
}

/// Engagement actions, carried over for per-action interest weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementAction {
    Like,
    Comment,
    Share,
    Save,
    NotInterested,
    Report,
}

impl EngagementAction {
    pub fn interest_weight(&self) -> f64 {
        match self {
            EngagementAction::Like => 1.0,
            EngagementAction::Comment => 2.0,
            EngagementAction::Share => 3.0,
            EngagementAction::Save => 2.5,
            EngagementAction::NotInterested => -2.0,
            EngagementAction::Report => -5.0,
        }
    }
}

#[derive(Default)]
pub struct SessionTracker {
    sessions: DashMap<(Uuid, String), SessionMetadata>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_session(&self, user_id: Uuid, session_id: &str) -> SessionMetadata {
        let key = (user_id, session_id.to_string());
        self.sessions
            .entry(key)
            .or_insert_with(|| SessionMetadata::new(session_id.to_string(), user_id))
            .clone()
    }

    pub fn record_view(&self, user_id: Uuid, session_id: &str, event: ContentViewEvent) {
        let key = (user_id, session_id.to_string());
        let mut entry = self
            .sessions
            .entry(key)
            .or_insert_with(|| SessionMetadata::new(session_id.to_string(), user_id));

        entry.last_activity = Utc::now();
        entry.event_count += 1;
        entry.page_views += 1;
        entry.viewed_events.insert(event.event_id);
        entry.viewed_categories.insert(event.category.clone());

        debug!(
            session_id = session_id,
            user_id = %user_id,
            engaged = event.is_engaged(),
            "view recorded"
        );
    }

    pub fn record_engagement(&self, user_id: Uuid, session_id: &str, action: EngagementAction) {
        let key = (user_id, session_id.to_string());
        let mut entry = self
            .sessions
            .entry(key)
            .or_insert_with(|| SessionMetadata::new(session_id.to_string(), user_id));

        entry.last_activity = Utc::now();
        entry.event_count += 1;
        entry.engagement_score += action.interest_weight();

        debug!(
            session_id = session_id,
            user_id = %user_id,
            weight = action.interest_weight(),
            "engagement recorded"
        );
    }

    pub fn get_session(&self, user_id: Uuid, session_id: &str) -> Option<SessionMetadata> {
        self.sessions.get(&(user_id, session_id.to_string())).map(|e| e.clone())
    }

    /// Sessions idle less than 30 minutes, regardless of the outer 2-hour
    /// eviction bound.
    pub fn active_sessions(&self) -> Vec<SessionMetadata> {
        let now = Utc::now();
        self.sessions
            .iter()
            .filter(|e| e.is_currently_active(now))
            .map(|e| e.clone())
            .collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Hourly GC sweep: evict sessions idle over 2 hours. Returns the count
    /// evicted.
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let threshold = Duration::hours(EVICTION_IDLE_THRESHOLD_HOURS);
        let expired: Vec<(Uuid, String)> = self
            .sessions
            .iter()
            .filter(|e| now - e.last_activity > threshold)
            .map(|e| e.key().clone())
            .collect();

        for key in &expired {
            self.sessions.remove(key);
        }
        expired.len()
    }
}

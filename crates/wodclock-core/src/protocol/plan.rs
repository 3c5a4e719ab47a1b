use serde::Serialize;

use super::ProtocolType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SegmentKind {
    Work,
    Rest,
}

/// One timed phase. `duration_secs: None` counts up with no target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub duration_secs: Option<u64>,
}

impl Segment {
    pub fn work(secs: u64) -> Self {
        Self {
            kind: SegmentKind::Work,
            duration_secs: Some(secs),
        }
    }

    pub fn rest(secs: u64) -> Self {
        Self {
            kind: SegmentKind::Rest,
            duration_secs: Some(secs),
        }
    }

    pub fn open_work() -> Self {
        Self {
            kind: SegmentKind::Work,
            duration_secs: None,
        }
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_secs.map(|s| s.saturating_mul(1000))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Repeat {
    /// Segments run once, then the session completes.
    Once,
    /// Segments loop until the run is cancelled.
    Forever,
}

/// One complete configured round-set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub protocol: ProtocolType,
    pub segments: Vec<Segment>,
    pub repeat: Repeat,
}

impl Session {
    /// Total seconds, or `None` when the session never ends on its own.
    pub fn target_secs(&self) -> Option<u64> {
        if self.repeat == Repeat::Forever {
            return None;
        }
        self.segments
            .iter()
            .try_fold(0u64, |acc, s| s.duration_secs.map(|d| acc.saturating_add(d)))
    }

    pub fn is_open_ended(&self) -> bool {
        self.target_secs().is_none()
    }

    pub fn work_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| s.kind == SegmentKind::Work)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedSession {
    pub session: Session,
    pub rest_after_secs: u64,
}

/// Ordered sessions plus inter-session rest.
///
/// Only the builder constructs plans, and never with zero sessions. There is no
/// mutable access once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionPlan {
    protocol: ProtocolType,
    sessions: Vec<PlannedSession>,
}

impl SessionPlan {
    pub(super) fn new(protocol: ProtocolType, sessions: Vec<PlannedSession>) -> Self {
        debug_assert!(!sessions.is_empty(), "a plan always has a session");
        Self { protocol, sessions }
    }

    pub fn protocol(&self) -> ProtocolType {
        self.protocol
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Always false for a built plan; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn sessions(&self) -> &[PlannedSession] {
        &self.sessions
    }

    pub fn session(&self, index: usize) -> Option<&Session> {
        self.sessions.get(index).map(|p| &p.session)
    }

    /// Rest after session `index`; zero past the end.
    pub fn rest_after(&self, index: usize) -> u64 {
        self.sessions
            .get(index)
            .map(|p| p.rest_after_secs)
            .unwrap_or(0)
    }

    /// Total seconds including rests, `None` when any session is open-ended.
    pub fn total_secs(&self) -> Option<u64> {
        self.sessions.iter().try_fold(0u64, |acc, p| {
            p.session
                .target_secs()
                .map(|t| acc.saturating_add(t).saturating_add(p.rest_after_secs))
        })
    }

    /// Seconds before session `index` starts (sessions and rests).
    pub fn cumulative_secs(&self, index: usize) -> Option<u64> {
        self.sessions.iter().take(index).try_fold(0u64, |acc, p| {
            p.session
                .target_secs()
                .map(|t| acc.saturating_add(t).saturating_add(p.rest_after_secs))
        })
    }
}

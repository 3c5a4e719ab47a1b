use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::protocol::{ProtocolType, SegmentKind};
use crate::timer::{TimeUpdate, TimerRuntimeState};
use crate::widget::{CompletedRun, WidgetState};

/// Every state change in the widget produces an Event.
/// The host renders them; the audio emitter listens to a subset.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    MenuOpened {
        at: DateTime<Utc>,
    },
    ProtocolSelected {
        protocol: ProtocolType,
        at: DateTime<Utc>,
    },
    ReturnedToMenu {
        at: DateTime<Utc>,
    },
    TimerStarted {
        protocol: ProtocolType,
        sessions: usize,
        /// `None` when any session is open-ended.
        total_secs: Option<u64>,
        label: Option<String>,
        at: DateTime<Utc>,
    },
    SessionStarted {
        session_index: usize,
        at: DateTime<Utc>,
    },
    PhaseChanged {
        session_index: usize,
        segment_index: usize,
        kind: SegmentKind,
        duration_secs: Option<u64>,
        round: u32,
        at: DateTime<Utc>,
    },
    /// Remaining time in the active segment dropped to a cue second.
    Countdown {
        session_index: usize,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimeUpdate(TimeUpdate),
    RestStarted {
        after_session: usize,
        rest_secs: u64,
        at: DateTime<Utc>,
    },
    RestTick {
        remaining_secs: u64,
        display: String,
    },
    TimerPaused {
        at: DateTime<Utc>,
    },
    TimerResumed {
        at: DateTime<Utc>,
    },
    Minimized {
        at: DateTime<Utc>,
    },
    Maximized {
        at: DateTime<Utc>,
    },
    /// Fired once when the last session finishes. Never for a cancelled run.
    AllComplete {
        run: CompletedRun,
    },
    TimerCancelled {
        session_index: usize,
        at: DateTime<Utc>,
    },
    /// Widget returned to the collapsed badge.
    TimerClosed {
        at: DateTime<Utc>,
    },
    StateSnapshot {
        widget: WidgetState,
        protocol: Option<ProtocolType>,
        runtime: Option<TimerRuntimeState>,
        display: Option<String>,
        /// `None` when the plan has no fixed end.
        progress_pct: Option<f64>,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Short stable name, matching the serialized `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Event::MenuOpened { .. } => "menu_opened",
            Event::ProtocolSelected { .. } => "protocol_selected",
            Event::ReturnedToMenu { .. } => "returned_to_menu",
            Event::TimerStarted { .. } => "timer_started",
            Event::SessionStarted { .. } => "session_started",
            Event::PhaseChanged { .. } => "phase_changed",
            Event::Countdown { .. } => "countdown",
            Event::TimeUpdate(_) => "time_update",
            Event::RestStarted { .. } => "rest_started",
            Event::RestTick { .. } => "rest_tick",
            Event::TimerPaused { .. } => "timer_paused",
            Event::TimerResumed { .. } => "timer_resumed",
            Event::Minimized { .. } => "minimized",
            Event::Maximized { .. } => "maximized",
            Event::AllComplete { .. } => "all_complete",
            Event::TimerCancelled { .. } => "timer_cancelled",
            Event::TimerClosed { .. } => "timer_closed",
            Event::StateSnapshot { .. } => "state_snapshot",
        }
    }
}

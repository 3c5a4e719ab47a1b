//! Session sequencer.
//!
//! Walks a [`SessionPlan`] one session at a time. It owns no clock and knows
//! nothing about rendering: it reacts to "the active session completed" and to
//! elapsed time while resting between sessions.
//!
//! ## State Transitions
//!
//! ```text
//! Running(i) --complete--> Resting(i) --rest elapsed--> Running(i+1)
//! Running(i) --complete, no rest--> Running(i+1)
//! Running(last) --complete--> Completed
//! any non-terminal --cancel--> Cancelled
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::format_mmss;
use crate::protocol::SessionPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SequencerState {
    Running { session_index: usize },
    /// Resting after `session_index` completed.
    Resting { session_index: usize, remaining_ms: u64 },
    Completed,
    Cancelled { session_index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SequencerEvent {
    SessionStarted { session_index: usize },
    RestStarted { after_session: usize, rest_secs: u64 },
    RestTick { remaining_secs: u64, display: String },
    AllComplete { sessions_completed: usize },
    Cancelled { session_index: usize },
}

/// Host-facing runtime view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerRuntimeState {
    /// `plan.len()` once completed.
    pub current_session_index: usize,
    pub is_resting: bool,
    pub rest_remaining_seconds: u64,
    pub is_running: bool,
}

#[derive(Debug, Clone)]
pub struct Sequencer {
    plan: SessionPlan,
    state: SequencerState,
}

impl Sequencer {
    /// Starts in `Running(0)`.
    pub fn new(plan: SessionPlan) -> Self {
        Self {
            plan,
            state: SequencerState::Running { session_index: 0 },
        }
    }

    pub fn plan(&self) -> &SessionPlan {
        &self.plan
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            SequencerState::Completed | SequencerState::Cancelled { .. }
        )
    }

    pub fn is_resting(&self) -> bool {
        matches!(self.state, SequencerState::Resting { .. })
    }

    pub fn current_session_index(&self) -> usize {
        match self.state {
            SequencerState::Running { session_index }
            | SequencerState::Resting { session_index, .. }
            | SequencerState::Cancelled { session_index } => session_index,
            SequencerState::Completed => self.plan.len(),
        }
    }

    pub fn rest_remaining_secs(&self) -> u64 {
        match self.state {
            SequencerState::Resting { remaining_ms, .. } => remaining_ms.div_ceil(1000),
            _ => 0,
        }
    }

    pub fn runtime_state(&self, ticking: bool) -> TimerRuntimeState {
        TimerRuntimeState {
            current_session_index: self.current_session_index(),
            is_resting: self.is_resting(),
            rest_remaining_seconds: self.rest_remaining_secs(),
            is_running: ticking && !self.is_terminal(),
        }
    }

    /// The event announcing the first session.
    pub fn opening_event(&self) -> SequencerEvent {
        SequencerEvent::SessionStarted { session_index: 0 }
    }

    /// The active session finished. Ignored unless `Running`.
    pub fn session_completed(&mut self) -> Vec<SequencerEvent> {
        let SequencerState::Running { session_index } = self.state else {
            return Vec::new();
        };
        let next = session_index + 1;
        if next >= self.plan.len() {
            self.state = SequencerState::Completed;
            info!(sessions = self.plan.len(), "all sessions complete");
            return vec![SequencerEvent::AllComplete {
                sessions_completed: self.plan.len(),
            }];
        }
        let rest_secs = self.plan.rest_after(session_index);
        if rest_secs > 0 {
            self.state = SequencerState::Resting {
                session_index,
                remaining_ms: rest_secs.saturating_mul(1000),
            };
            debug!(after_session = session_index, rest_secs, "rest started");
            vec![SequencerEvent::RestStarted {
                after_session: session_index,
                rest_secs,
            }]
        } else {
            self.state = SequencerState::Running {
                session_index: next,
            };
            debug!(session_index = next, "session started");
            vec![SequencerEvent::SessionStarted {
                session_index: next,
            }]
        }
    }

    /// Spend `delta` of rest. Returns the events and any time left over after
    /// the rest ran out. Ignored unless `Resting`.
    pub fn rest_elapsed(&mut self, delta: Duration) -> (Vec<SequencerEvent>, Duration) {
        let SequencerState::Resting {
            session_index,
            remaining_ms,
        } = self.state
        else {
            return (Vec::new(), Duration::ZERO);
        };
        let delta_ms = delta.as_millis() as u64;
        let left = remaining_ms.saturating_sub(delta_ms);
        if left > 0 {
            self.state = SequencerState::Resting {
                session_index,
                remaining_ms: left,
            };
            let remaining_secs = left.div_ceil(1000);
            return (
                vec![SequencerEvent::RestTick {
                    remaining_secs,
                    display: format_mmss(remaining_secs),
                }],
                Duration::ZERO,
            );
        }

        let overflow = Duration::from_millis(delta_ms - remaining_ms);
        let next = session_index + 1;
        self.state = SequencerState::Running {
            session_index: next,
        };
        debug!(session_index = next, "rest over, session started");
        (
            vec![
                SequencerEvent::RestTick {
                    remaining_secs: 0,
                    display: format_mmss(0),
                },
                SequencerEvent::SessionStarted {
                    session_index: next,
                },
            ],
            overflow,
        )
    }

    /// Cancel from any non-terminal state. No completion signal follows.
    pub fn cancel(&mut self) -> Option<SequencerEvent> {
        if self.is_terminal() {
            return None;
        }
        let session_index = self.current_session_index();
        self.state = SequencerState::Cancelled { session_index };
        info!(session_index, "run cancelled");
        Some(SequencerEvent::Cancelled { session_index })
    }
}

//! Per-session render hook.
//!
//! A [`SessionRenderer`] drives the display of one active session: it walks the
//! session's segments as time is fed in, reports phase changes and countdown
//! cues through a callback, and signals completion through its return value.
//! The sequencer never looks inside a session; it only hears "complete".

use std::time::Duration;

use serde::Serialize;

use super::format_mmss;
use crate::protocol::{ProtocolType, Repeat, SegmentKind, Session};

pub const DEFAULT_COUNTDOWN_SECS: u64 = 3;

/// Snapshot of the active session's display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeUpdate {
    pub session_index: usize,
    pub segment_index: usize,
    pub kind: SegmentKind,
    /// 1-based work round, counting every pass of a repeating session.
    pub round: u32,
    pub label: String,
    pub elapsed_secs: u64,
    /// `None` for count-up segments.
    pub remaining_secs: Option<u64>,
    /// `mm:ss`; remaining when counting down, elapsed when counting up.
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderSignal {
    PhaseChanged {
        segment_index: usize,
        kind: SegmentKind,
        duration_secs: Option<u64>,
        round: u32,
    },
    Countdown {
        remaining_secs: u64,
    },
    TimeUpdate(TimeUpdate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Continue,
    /// Session finished; `overflow` is fed time that ran past its end.
    Complete { overflow: Duration },
}

pub trait SessionRenderer {
    /// Announce the first segment. Called once when the session becomes active.
    fn begin(&mut self, on_signal: &mut dyn FnMut(RenderSignal));

    /// Feed elapsed time.
    fn advance(&mut self, delta: Duration, on_signal: &mut dyn FnMut(RenderSignal)) -> RenderOutcome;

    fn time_update(&self) -> TimeUpdate;

    /// Total time fed into this session so far.
    fn active_elapsed(&self) -> Duration;
}

/// Renderer for `session`, labelled the way its protocol is usually shown.
pub fn renderer_for(
    session_index: usize,
    session: Session,
    countdown_secs: u64,
) -> Box<dyn SessionRenderer> {
    Box::new(SegmentRunner::new(session_index, session, countdown_secs))
}

fn phase_label(protocol: ProtocolType, kind: SegmentKind, round: u32, rounds: Option<usize>) -> String {
    match (protocol, kind) {
        (_, SegmentKind::Rest) => "Rest".to_string(),
        (ProtocolType::ForTime, _) => "For Time".to_string(),
        (ProtocolType::Amrap, _) => "AMRAP".to_string(),
        (ProtocolType::Emom, _) => match rounds {
            Some(total) => format!("Minute {round}/{total}"),
            None => format!("Minute {round}"),
        },
        (ProtocolType::Tabata, _) => match rounds {
            Some(total) => format!("Round {round}/{total}"),
            None => format!("Round {round}"),
        },
    }
}

/// Generic segment walker used for every protocol.
#[derive(Debug, Clone)]
pub struct SegmentRunner {
    session_index: usize,
    session: Session,
    segment_index: usize,
    /// Completed passes over the segment list (repeating sessions only).
    passes: u32,
    elapsed_ms: u64,
    total_elapsed_ms: u64,
    countdown_secs: u64,
    last_cue: Option<u64>,
    done: bool,
}

impl SegmentRunner {
    pub fn new(session_index: usize, session: Session, countdown_secs: u64) -> Self {
        Self {
            session_index,
            session,
            segment_index: 0,
            passes: 0,
            elapsed_ms: 0,
            total_elapsed_ms: 0,
            countdown_secs,
            last_cue: None,
            done: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    fn current_target_ms(&self) -> Option<u64> {
        self.session
            .segments
            .get(self.segment_index)
            .and_then(|s| s.duration_ms())
    }

    fn current_kind(&self) -> SegmentKind {
        self.session
            .segments
            .get(self.segment_index)
            .map(|s| s.kind)
            .unwrap_or(SegmentKind::Work)
    }

    fn round(&self) -> u32 {
        let per_pass = self.session.work_count() as u32;
        let upto = self
            .session
            .segments
            .iter()
            .take(self.segment_index + 1)
            .filter(|s| s.kind == SegmentKind::Work)
            .count() as u32;
        self.passes.saturating_mul(per_pass).saturating_add(upto.max(1))
    }

    fn total_rounds(&self) -> Option<usize> {
        match self.session.repeat {
            Repeat::Once => Some(self.session.work_count()),
            Repeat::Forever => None,
        }
    }

    fn remaining_secs(&self) -> Option<u64> {
        self.current_target_ms()
            .map(|total| total.saturating_sub(self.elapsed_ms).div_ceil(1000))
    }

    /// Move to the next segment. False when the session is exhausted.
    fn next_segment(&mut self) -> bool {
        if self.segment_index + 1 < self.session.segments.len() {
            self.segment_index += 1;
        } else if self.session.repeat == Repeat::Forever {
            self.segment_index = 0;
            self.passes = self.passes.saturating_add(1);
        } else {
            return false;
        }
        self.elapsed_ms = 0;
        self.last_cue = None;
        true
    }

    fn phase_signal(&self) -> RenderSignal {
        RenderSignal::PhaseChanged {
            segment_index: self.segment_index,
            kind: self.current_kind(),
            duration_secs: self.current_target_ms().map(|ms| ms / 1000),
            round: self.round(),
        }
    }
}

impl SessionRenderer for SegmentRunner {
    fn begin(&mut self, on_signal: &mut dyn FnMut(RenderSignal)) {
        on_signal(self.phase_signal());
        on_signal(RenderSignal::TimeUpdate(self.time_update()));
    }

    fn advance(&mut self, delta: Duration, on_signal: &mut dyn FnMut(RenderSignal)) -> RenderOutcome {
        if self.done {
            return RenderOutcome::Complete {
                overflow: Duration::ZERO,
            };
        }
        let mut left = delta.as_millis() as u64;
        self.total_elapsed_ms = self.total_elapsed_ms.saturating_add(left);

        while let Some(target) = self.current_target_ms() {
            let room = target.saturating_sub(self.elapsed_ms);
            if left < room {
                self.elapsed_ms += left;
                left = 0;
                break;
            }
            left -= room;
            self.elapsed_ms = target;
            if !self.next_segment() {
                self.done = true;
                self.total_elapsed_ms = self.total_elapsed_ms.saturating_sub(left);
                return RenderOutcome::Complete {
                    overflow: Duration::from_millis(left),
                };
            }
            on_signal(self.phase_signal());
        }
        // Count-up segment: everything left lands here.
        if self.current_target_ms().is_none() {
            self.elapsed_ms = self.elapsed_ms.saturating_add(left);
        }

        if self.elapsed_ms > 0 {
            if let Some(remaining) = self.remaining_secs() {
                if remaining >= 1 && remaining <= self.countdown_secs && self.last_cue != Some(remaining) {
                    self.last_cue = Some(remaining);
                    on_signal(RenderSignal::Countdown {
                        remaining_secs: remaining,
                    });
                }
            }
        }

        on_signal(RenderSignal::TimeUpdate(self.time_update()));
        RenderOutcome::Continue
    }

    fn time_update(&self) -> TimeUpdate {
        let kind = self.current_kind();
        let round = self.round();
        let remaining_secs = self.remaining_secs();
        let elapsed_secs = self.elapsed_ms / 1000;
        TimeUpdate {
            session_index: self.session_index,
            segment_index: self.segment_index,
            kind,
            round,
            label: phase_label(self.session.protocol, kind, round, self.total_rounds()),
            elapsed_secs,
            remaining_secs,
            display: format_mmss(remaining_secs.unwrap_or(elapsed_secs)),
        }
    }

    fn active_elapsed(&self) -> Duration {
        Duration::from_millis(self.total_elapsed_ms)
    }
}

use serde::Serialize;

use crate::events::Event;
use crate::protocol::SegmentKind;

/// One synthesized beep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tone {
    pub frequency_hz: f32,
    pub duration_ms: u32,
}

const fn tone(frequency_hz: f32, duration_ms: u32) -> Tone {
    Tone {
        frequency_hz,
        duration_ms,
    }
}

const SESSION_START: [Tone; 3] = [tone(880.0, 150), tone(880.0, 150), tone(1320.0, 400)];
const WORK: [Tone; 1] = [tone(1046.5, 250)];
const REST: [Tone; 1] = [tone(523.25, 350)];
const COUNTDOWN: [Tone; 1] = [tone(784.0, 120)];
const ALL_COMPLETE: [Tone; 4] = [
    tone(523.25, 200),
    tone(659.25, 200),
    tone(783.99, 200),
    tone(1046.5, 500),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    SessionStart,
    Work,
    Rest,
    Countdown,
    AllComplete,
}

impl Cue {
    pub fn tones(self) -> &'static [Tone] {
        match self {
            Cue::SessionStart => &SESSION_START,
            Cue::Work => &WORK,
            Cue::Rest => &REST,
            Cue::Countdown => &COUNTDOWN,
            Cue::AllComplete => &ALL_COMPLETE,
        }
    }

    /// Session start and phase changes, as opposed to countdown and finish.
    pub fn is_transition(self) -> bool {
        matches!(self, Cue::SessionStart | Cue::Work | Cue::Rest)
    }

    /// The cue an event should sound, if any.
    pub fn for_event(event: &Event) -> Option<Cue> {
        match event {
            Event::SessionStarted { .. } => Some(Cue::SessionStart),
            // The first phase of a session is covered by the session-start cue.
            Event::PhaseChanged {
                segment_index: 0,
                round: 1,
                ..
            } => None,
            Event::PhaseChanged { kind, .. } => Some(match kind {
                SegmentKind::Work => Cue::Work,
                SegmentKind::Rest => Cue::Rest,
            }),
            Event::RestStarted { .. } => Some(Cue::Rest),
            Event::Countdown { .. } => Some(Cue::Countdown),
            Event::AllComplete { .. } => Some(Cue::AllComplete),
            _ => None,
        }
    }
}

//! # wodclock Core Library
//!
//! Interval-timer engine for workout protocols. The CLI binary is a thin shell
//! over this crate; any other host (a GUI overlay, a kiosk display) drives the
//! same [`TimerWidget`].
//!
//! ## Architecture
//!
//! - **Protocol builder**: turns a [`ProtocolConfig`] into an immutable
//!   [`SessionPlan`] of work/rest segments
//! - **Tick scheduler**: cooperative, wall-clock based; the host polls a
//!   [`TickHandle`] from its own loop
//! - **Sequencer**: walks the plan session by session, inserting rest between
//!   sessions, with no rendering or clock of its own
//! - **Widget**: display-mode state machine wrapping one active run
//! - **Audio**: tones for transitions, best effort
//!
//! Everything is single-threaded; nothing here spawns or blocks.

pub mod audio;
pub mod error;
pub mod events;
pub mod protocol;
pub mod storage;
pub mod timer;
pub mod widget;

pub use audio::{AudioCueEmitter, Cue, Tone, ToneOutput};
pub use error::{AudioError, ConfigError, CoreError, SettingsError};
pub use events::Event;
pub use protocol::{build_plan, ProtocolConfig, ProtocolType, Segment, SegmentKind, Session, SessionPlan};
pub use storage::Settings;
pub use timer::{
    Clock, ManualClock, Sequencer, SequencerState, SystemClock, TickHandle, TickScheduler,
    TimerRuntimeState,
};
pub use widget::{CompletedRun, TimerWidget, WidgetState};

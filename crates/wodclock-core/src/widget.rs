//! Timer overlay widget.
//!
//! The widget is the outer shell a host talks to. It maps user intents onto a
//! display mode and owns, while a run is active, the sequencer, the active
//! session's renderer and the tick handle.
//!
//! ## State Transitions
//!
//! ```text
//! Badge -> Menu -> Config -> Running <-> Minimized
//!           ^        |
//!           +--------+  (go back)
//! any -> Badge        (stop / close / acknowledge)
//! ```
//!
//! Display mode and ticking are independent: `Running` and `Minimized` tick
//! identically, `Badge`, `Menu` and `Config` never hold a tick handle.
//!
//! One widget serves the whole process. The host creates it at startup, passes
//! `&mut TimerWidget` to whatever needs it, and calls [`TimerWidget::shutdown`]
//! (or drops it) on exit.

use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::audio::{AudioCueEmitter, Cue};
use crate::error::ConfigError;
use crate::events::Event;
use crate::protocol::{build_plan, ProtocolConfig, ProtocolType, SessionPlan};
use crate::storage::Settings;
use crate::timer::{
    format_mmss, renderer_for, Clock, RenderOutcome, RenderSignal, SequencerEvent, SequencerState,
    Sequencer, SessionRenderer, TickHandle, TickScheduler, TimeUpdate, TimerRuntimeState,
    DEFAULT_COUNTDOWN_SECS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetState {
    /// Collapsed indicator.
    Badge,
    /// Protocol picker.
    Menu,
    /// Configuration form for the selected protocol.
    Config,
    Running,
    Minimized,
}

/// Summary handed to the completion hook. Never produced for a cancelled run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedRun {
    pub run_id: Uuid,
    /// Opaque workout identifier supplied at start.
    pub label: Option<String>,
    pub protocol: ProtocolType,
    pub sessions_completed: usize,
    /// Time spent in sessions, excluding rest between them.
    pub active_secs: u64,
    pub finished_at: DateTime<Utc>,
}

pub type CompletionHook = Box<dyn FnMut(&CompletedRun)>;

struct ActiveRun {
    sequencer: Sequencer,
    /// Present while a session is running; `None` while resting or finished.
    renderer: Option<Box<dyn SessionRenderer>>,
    ticker: TickHandle,
    label: Option<String>,
    active: Duration,
    last_rest_cue: Option<u64>,
    display: String,
}

pub struct TimerWidget {
    state: WidgetState,
    selected: Option<ProtocolType>,
    run: Option<ActiveRun>,
    scheduler: TickScheduler,
    audio: AudioCueEmitter,
    countdown_secs: u64,
    on_complete: Option<CompletionHook>,
    last_error: Option<ConfigError>,
}

impl TimerWidget {
    pub fn new(scheduler: TickScheduler, audio: AudioCueEmitter) -> Self {
        Self {
            state: WidgetState::Badge,
            selected: None,
            run: None,
            scheduler,
            audio,
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
            on_complete: None,
            last_error: None,
        }
    }

    /// Widget configured from `settings`, with audio through the system output.
    pub fn from_settings(clock: Rc<dyn Clock>, settings: &Settings) -> Self {
        let scheduler = TickScheduler::with_interval(
            clock,
            Duration::from_millis(settings.timer.tick_interval_ms),
        );
        let mut widget = Self::new(scheduler, AudioCueEmitter::from_settings(&settings.audio));
        widget.countdown_secs = settings.timer.countdown_cue_secs;
        widget
    }

    pub fn set_completion_hook(&mut self, hook: CompletionHook) {
        self.on_complete = Some(hook);
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> WidgetState {
        self.state
    }

    pub fn selected_protocol(&self) -> Option<ProtocolType> {
        self.selected
    }

    pub fn plan(&self) -> Option<&SessionPlan> {
        self.run.as_ref().map(|r| r.sequencer.plan())
    }

    pub fn sequencer_state(&self) -> Option<SequencerState> {
        self.run.as_ref().map(|r| r.sequencer.state())
    }

    pub fn runtime_state(&self) -> Option<TimerRuntimeState> {
        self.run
            .as_ref()
            .map(|r| r.sequencer.runtime_state(r.ticker.is_armed()))
    }

    /// True while a tick handle is armed.
    pub fn is_ticking(&self) -> bool {
        self.run.as_ref().is_some_and(|r| r.ticker.is_armed())
    }

    pub fn is_paused(&self) -> bool {
        self.run.as_ref().is_some_and(|r| r.ticker.is_suspended())
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.sequencer_state(), Some(SequencerState::Completed))
    }

    pub fn time_update(&self) -> Option<TimeUpdate> {
        self.run
            .as_ref()
            .and_then(|r| r.renderer.as_ref())
            .map(|r| r.time_update())
    }

    /// Current `mm:ss` of whatever is on screen (session or rest).
    pub fn display(&self) -> Option<&str> {
        self.run.as_ref().map(|r| r.display.as_str())
    }

    pub fn until_next_tick(&self) -> Option<Duration> {
        self.run.as_ref().and_then(|r| r.ticker.until_next())
    }

    /// The error that kept the last `start_timer` in `Config`.
    pub fn last_config_error(&self) -> Option<&ConfigError> {
        self.last_error.as_ref()
    }

    pub fn audio(&self) -> &AudioCueEmitter {
        &self.audio
    }

    /// 0.0 .. 100.0 across the plan; `None` when the plan has no fixed end.
    pub fn progress_pct(&self) -> Option<f64> {
        let run = self.run.as_ref()?;
        let plan = run.sequencer.plan();
        let total = plan.total_secs()? as f64;
        if total == 0.0 {
            return None;
        }
        let done = match run.sequencer.state() {
            SequencerState::Completed => return Some(100.0),
            SequencerState::Cancelled { .. } => return None,
            SequencerState::Running { session_index } => {
                let before = plan.cumulative_secs(session_index)? as f64;
                let within = run
                    .renderer
                    .as_ref()
                    .map(|r| r.active_elapsed().as_secs_f64())
                    .unwrap_or(0.0);
                before + within
            }
            SequencerState::Resting {
                session_index,
                remaining_ms,
            } => {
                let through = plan.cumulative_secs(session_index + 1)? as f64;
                through - remaining_ms as f64 / 1000.0
            }
        };
        Some((done / total * 100.0).clamp(0.0, 100.0))
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            widget: self.state,
            protocol: self.selected,
            runtime: self.runtime_state(),
            display: self.display().map(str::to_string),
            progress_pct: self.progress_pct(),
            at: Utc::now(),
        }
    }

    // ── Navigation ───────────────────────────────────────────────────

    pub fn open_menu(&mut self) -> Option<Event> {
        if self.state != WidgetState::Badge {
            return None;
        }
        self.state = WidgetState::Menu;
        Some(Event::MenuOpened { at: Utc::now() })
    }

    pub fn select_type(&mut self, protocol: ProtocolType) -> Option<Event> {
        if self.state != WidgetState::Menu {
            return None;
        }
        self.state = WidgetState::Config;
        self.selected = Some(protocol);
        self.last_error = None;
        debug!(%protocol, "protocol selected");
        Some(Event::ProtocolSelected {
            protocol,
            at: Utc::now(),
        })
    }

    pub fn go_back_to_menu(&mut self) -> Option<Event> {
        if self.state != WidgetState::Config {
            return None;
        }
        self.state = WidgetState::Menu;
        self.selected = None;
        self.last_error = None;
        Some(Event::ReturnedToMenu { at: Utc::now() })
    }

    // ── Run control ──────────────────────────────────────────────────

    /// Build the plan for the selected protocol and start ticking.
    ///
    /// Outside `Config` this is a no-op returning no events.
    ///
    /// # Errors
    /// Returns the builder's [`ConfigError`]; the widget stays in `Config`
    /// with no run state.
    pub fn start_timer(
        &mut self,
        config: &ProtocolConfig,
        label: Option<String>,
    ) -> Result<Vec<Event>, ConfigError> {
        let (WidgetState::Config, Some(protocol)) = (self.state, self.selected) else {
            return Ok(Vec::new());
        };
        let plan = build_plan(protocol, config).map_err(|err| {
            debug!(%err, "start refused");
            self.last_error = Some(err.clone());
            err
        })?;
        self.last_error = None;

        let mut events = vec![Event::TimerStarted {
            protocol,
            sessions: plan.len(),
            total_secs: plan.total_secs(),
            label: label.clone(),
            at: Utc::now(),
        }];
        info!(%protocol, sessions = plan.len(), label = label.as_deref().unwrap_or(""), "timer started");

        let sequencer = Sequencer::new(plan);
        events.extend(sequencer_event(sequencer.opening_event()));
        let mut run = ActiveRun {
            sequencer,
            renderer: None,
            ticker: self.scheduler.start(),
            label,
            active: Duration::ZERO,
            last_rest_cue: None,
            display: String::new(),
        };
        begin_session(&mut run, 0, self.countdown_secs, &mut events);

        self.run = Some(run);
        self.state = WidgetState::Running;
        Ok(self.dispatch(events))
    }

    pub fn pause(&mut self) -> Option<Event> {
        let run = self.active_run_mut()?;
        if !run.ticker.pause() {
            return None;
        }
        debug!("timer paused");
        Some(Event::TimerPaused { at: Utc::now() })
    }

    pub fn resume(&mut self) -> Option<Event> {
        let run = self.active_run_mut()?;
        if !run.ticker.resume() {
            return None;
        }
        debug!("timer resumed");
        Some(Event::TimerResumed { at: Utc::now() })
    }

    pub fn minimize_timer(&mut self) -> Option<Event> {
        if self.state != WidgetState::Running {
            return None;
        }
        self.state = WidgetState::Minimized;
        Some(Event::Minimized { at: Utc::now() })
    }

    pub fn maximize_timer(&mut self) -> Option<Event> {
        if self.state != WidgetState::Minimized {
            return None;
        }
        self.state = WidgetState::Running;
        Some(Event::Maximized { at: Utc::now() })
    }

    /// Cancel any run and collapse to the badge. Nothing of the run survives.
    pub fn stop_timer(&mut self) -> Vec<Event> {
        self.collapse()
    }

    /// Same as [`stop_timer`](Self::stop_timer); the overlay's close button.
    pub fn close_timer(&mut self) -> Vec<Event> {
        self.collapse()
    }

    /// Cancel the active run. The widget goes straight back to the badge.
    pub fn cancel(&mut self) -> Vec<Event> {
        self.collapse()
    }

    /// Dismiss a completed run.
    pub fn acknowledge_completion(&mut self) -> Vec<Event> {
        if !self.is_complete() {
            return Vec::new();
        }
        self.collapse()
    }

    /// Tear down: drop any run and release the audio output.
    pub fn shutdown(&mut self) {
        let _ = self.collapse();
        self.audio.release();
    }

    /// Drive the widget from the host loop. Returns the events produced by a
    /// due tick, if any.
    pub fn poll(&mut self) -> Vec<Event> {
        let Some(run) = self.run.as_mut() else {
            return Vec::new();
        };
        let Some(tick) = run.ticker.poll() else {
            return Vec::new();
        };
        self.advance(tick.elapsed)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn active_run_mut(&mut self) -> Option<&mut ActiveRun> {
        if !matches!(self.state, WidgetState::Running | WidgetState::Minimized) {
            return None;
        }
        self.run.as_mut().filter(|r| !r.sequencer.is_terminal())
    }

    fn collapse(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if let Some(mut run) = self.run.take() {
            run.ticker.cancel();
            if let Some(ev) = run.sequencer.cancel() {
                events.extend(sequencer_event(ev));
            }
        }
        self.selected = None;
        self.last_error = None;
        if self.state != WidgetState::Badge {
            self.state = WidgetState::Badge;
            events.push(Event::TimerClosed { at: Utc::now() });
        }
        events
    }

    fn advance(&mut self, delta: Duration) -> Vec<Event> {
        let countdown_secs = self.countdown_secs;
        let mut events = Vec::new();
        let mut completed = None;
        let Some(run) = self.run.as_mut() else {
            return events;
        };

        let mut left = delta;
        loop {
            match run.sequencer.state() {
                SequencerState::Running { session_index } => {
                    let Some(renderer) = run.renderer.as_mut() else {
                        break;
                    };
                    let outcome = renderer.advance(left, &mut |signal| {
                        events.push(signal_event(session_index, signal));
                    });
                    let RenderOutcome::Complete { overflow } = outcome else {
                        run.display = renderer.time_update().display;
                        break;
                    };
                    run.active += renderer.active_elapsed();
                    run.renderer = None;
                    for ev in run.sequencer.session_completed() {
                        match ev {
                            SequencerEvent::SessionStarted { session_index } => {
                                events.extend(sequencer_event(ev));
                                begin_session(run, session_index, countdown_secs, &mut events);
                            }
                            SequencerEvent::AllComplete { sessions_completed } => {
                                run.ticker.cancel();
                                run.display = format_mmss(0);
                                completed = Some(CompletedRun {
                                    run_id: Uuid::new_v4(),
                                    label: run.label.clone(),
                                    protocol: run.sequencer.plan().protocol(),
                                    sessions_completed,
                                    active_secs: run.active.as_secs(),
                                    finished_at: Utc::now(),
                                });
                            }
                            SequencerEvent::RestStarted { rest_secs, .. } => {
                                run.last_rest_cue = None;
                                run.display = format_mmss(rest_secs);
                                events.extend(sequencer_event(ev));
                            }
                            other => events.extend(sequencer_event(other)),
                        }
                    }
                    left = overflow;
                }
                SequencerState::Resting { .. } => {
                    let (rest_events, overflow) = run.sequencer.rest_elapsed(left);
                    for ev in rest_events {
                        match ev {
                            SequencerEvent::RestTick {
                                remaining_secs,
                                ref display,
                            } => {
                                run.display = display.clone();
                                events.extend(sequencer_event(ev.clone()));
                                if (1..=countdown_secs).contains(&remaining_secs)
                                    && run.last_rest_cue != Some(remaining_secs)
                                {
                                    run.last_rest_cue = Some(remaining_secs);
                                    events.push(Event::Countdown {
                                        session_index: run.sequencer.current_session_index(),
                                        remaining_secs,
                                        at: Utc::now(),
                                    });
                                }
                            }
                            SequencerEvent::SessionStarted { session_index } => {
                                events.extend(sequencer_event(ev));
                                begin_session(run, session_index, countdown_secs, &mut events);
                            }
                            other => events.extend(sequencer_event(other)),
                        }
                    }
                    left = overflow;
                }
                SequencerState::Completed | SequencerState::Cancelled { .. } => break,
            }
            if left.is_zero() {
                break;
            }
        }

        if let Some(record) = completed {
            info!(run_id = %record.run_id, sessions = record.sessions_completed, "run complete");
            if let Some(hook) = self.on_complete.as_mut() {
                hook(&record);
            }
            events.push(Event::AllComplete { run: record });
        }
        self.dispatch(events)
    }

    /// Route events through the audio emitter and hand them back.
    ///
    /// A catch-up tick can cross several phases at once. Only the last phase
    /// cue and whatever follows it are sounded.
    fn dispatch(&mut self, events: Vec<Event>) -> Vec<Event> {
        let audible_from = events
            .iter()
            .rposition(|e| Cue::for_event(e).is_some_and(Cue::is_transition))
            .unwrap_or(0);
        for event in &events[audible_from..] {
            self.audio.observe(event);
        }
        events
    }
}

impl Drop for TimerWidget {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn begin_session(run: &mut ActiveRun, index: usize, countdown_secs: u64, events: &mut Vec<Event>) {
    let Some(session) = run.sequencer.plan().session(index).cloned() else {
        return;
    };
    let mut renderer = renderer_for(index, session, countdown_secs);
    renderer.begin(&mut |signal| events.push(signal_event(index, signal)));
    run.display = renderer.time_update().display;
    run.renderer = Some(renderer);
}

fn signal_event(session_index: usize, signal: RenderSignal) -> Event {
    match signal {
        RenderSignal::PhaseChanged {
            segment_index,
            kind,
            duration_secs,
            round,
        } => Event::PhaseChanged {
            session_index,
            segment_index,
            kind,
            duration_secs,
            round,
            at: Utc::now(),
        },
        RenderSignal::Countdown { remaining_secs } => Event::Countdown {
            session_index,
            remaining_secs,
            at: Utc::now(),
        },
        RenderSignal::TimeUpdate(update) => Event::TimeUpdate(update),
    }
}

/// `None` for completion, which the widget reports as a [`CompletedRun`].
fn sequencer_event(event: SequencerEvent) -> Option<Event> {
    let event = match event {
        SequencerEvent::SessionStarted { session_index } => Event::SessionStarted {
            session_index,
            at: Utc::now(),
        },
        SequencerEvent::RestStarted {
            after_session,
            rest_secs,
        } => Event::RestStarted {
            after_session,
            rest_secs,
            at: Utc::now(),
        },
        SequencerEvent::RestTick {
            remaining_secs,
            display,
        } => Event::RestTick {
            remaining_secs,
            display,
        },
        SequencerEvent::Cancelled { session_index } => Event::TimerCancelled {
            session_index,
            at: Utc::now(),
        },
        SequencerEvent::AllComplete { .. } => return None,
    };
    Some(event)
}

//! Fire-and-forget cue playback.
//!
//! The output device is opened lazily on the first cue and held until
//! [`AudioCueEmitter::release`] (or drop). If opening or playing fails the
//! emitter goes quiet for the rest of its lifetime; nothing is ever reported
//! back to the timer.

use tracing::debug;

use super::cue::Cue;
use super::output::{default_output_factory, OutputFactory, SilentOutput, ToneOutput};
use crate::error::AudioError;
use crate::events::Event;
use crate::storage::AudioSettings;

enum Slot {
    Unacquired,
    Ready(Box<dyn ToneOutput>),
    Unavailable,
}

pub struct AudioCueEmitter {
    factory: OutputFactory,
    slot: Slot,
    enabled: bool,
    volume: f32,
    played: u64,
}

impl AudioCueEmitter {
    pub fn new(factory: OutputFactory) -> Self {
        Self {
            factory,
            slot: Slot::Unacquired,
            enabled: true,
            volume: 0.5,
            played: 0,
        }
    }

    /// System output when available, honouring `settings`.
    pub fn from_settings(settings: &AudioSettings) -> Self {
        let mut emitter = Self::new(default_output_factory());
        emitter.apply_settings(settings);
        emitter
    }

    pub fn silent() -> Self {
        Self::new(Box::new(|| -> Result<Box<dyn ToneOutput>, AudioError> {
            Ok(Box::new(SilentOutput))
        }))
    }

    pub fn apply_settings(&mut self, settings: &AudioSettings) {
        self.enabled = settings.enabled;
        self.volume = settings.volume.min(100) as f32 / 100.0;
    }

    pub fn is_acquired(&self) -> bool {
        matches!(self.slot, Slot::Ready(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self.slot, Slot::Unavailable)
    }

    /// Cues handed to an output so far.
    pub fn played(&self) -> u64 {
        self.played
    }

    /// Play the cue for `event`, if it has one.
    pub fn observe(&mut self, event: &Event) {
        if let Some(cue) = Cue::for_event(event) {
            self.emit(cue);
        }
    }

    pub fn emit(&mut self, cue: Cue) {
        if !self.enabled {
            return;
        }
        if matches!(self.slot, Slot::Unacquired) {
            self.slot = match (self.factory)() {
                Ok(output) => {
                    debug!(output = output.name(), "audio output acquired");
                    Slot::Ready(output)
                }
                Err(err) => {
                    debug!(%err, "audio output unavailable, cues disabled");
                    Slot::Unavailable
                }
            };
        }
        let Slot::Ready(output) = &mut self.slot else {
            return;
        };
        match output.play(cue.tones(), self.volume) {
            Ok(()) => self.played += 1,
            Err(err) => {
                debug!(%err, ?cue, "cue playback failed, cues disabled");
                self.slot = Slot::Unavailable;
            }
        }
    }

    /// Drop the output. The next cue reopens it.
    pub fn release(&mut self) {
        if self.is_acquired() {
            debug!("audio output released");
        }
        self.slot = Slot::Unacquired;
    }
}

impl Drop for AudioCueEmitter {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::output::RecordingOutput;
    use std::cell::Cell;
    use std::rc::Rc;

    fn recording() -> (RecordingOutput, Rc<Cell<u32>>, AudioCueEmitter) {
        let rec = RecordingOutput::new();
        let opens = Rc::new(Cell::new(0));
        let sink = rec.clone();
        let counter = Rc::clone(&opens);
        let emitter = AudioCueEmitter::new(Box::new(move || -> Result<Box<dyn ToneOutput>, AudioError> {
            counter.set(counter.get() + 1);
            Ok(Box::new(sink.clone()) as Box<dyn ToneOutput>)
        }));
        (rec, opens, emitter)
    }

    #[test]
    fn output_opened_lazily_once() {
        let (rec, opens, mut emitter) = recording();
        assert_eq!(opens.get(), 0);
        emitter.emit(Cue::Work);
        emitter.emit(Cue::Rest);
        assert_eq!(opens.get(), 1);
        assert_eq!(rec.count(), 2);
        assert_eq!(rec.played()[1], Cue::Rest.tones().to_vec());
    }

    #[test]
    fn release_then_emit_reacquires() {
        let (_rec, opens, mut emitter) = recording();
        emitter.emit(Cue::Work);
        emitter.release();
        assert!(!emitter.is_acquired());
        emitter.emit(Cue::Work);
        assert_eq!(opens.get(), 2);
    }

    #[test]
    fn unavailable_output_is_swallowed() {
        let attempts = Rc::new(Cell::new(0));
        let counter = Rc::clone(&attempts);
        let mut emitter = AudioCueEmitter::new(Box::new(move || -> Result<Box<dyn ToneOutput>, AudioError> {
            counter.set(counter.get() + 1);
            Err(AudioError::Unavailable("no device".into()))
        }));
        emitter.emit(Cue::SessionStart);
        emitter.emit(Cue::Countdown);
        assert!(emitter.is_unavailable());
        assert_eq!(attempts.get(), 1);
        assert_eq!(emitter.played(), 0);
    }

    struct Failing;

    impl ToneOutput for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn play(&mut self, _tones: &[crate::audio::Tone], _volume: f32) -> Result<(), AudioError> {
            Err(AudioError::Playback("device lost".into()))
        }
    }

    #[test]
    fn playback_failure_disables_quietly() {
        let mut emitter = AudioCueEmitter::new(Box::new(|| -> Result<Box<dyn ToneOutput>, AudioError> {
            Ok(Box::new(Failing))
        }));
        emitter.emit(Cue::Work);
        assert!(emitter.is_unavailable());
    }

    #[test]
    fn disabled_emitter_never_opens_output() {
        let (rec, opens, mut emitter) = recording();
        emitter.apply_settings(&AudioSettings {
            enabled: false,
            volume: 80,
        });
        emitter.emit(Cue::AllComplete);
        assert_eq!(opens.get(), 0);
        assert_eq!(rec.count(), 0);
    }
}

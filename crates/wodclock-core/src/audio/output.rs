use std::cell::RefCell;
use std::f32::consts::TAU;
use std::rc::Rc;

use super::cue::Tone;
use crate::error::AudioError;

/// Silence between consecutive tones of one cue.
const GAP_MS: u32 = 40;
/// Fade in/out so tones start and stop without clicks.
const RAMP_MS: u32 = 5;

/// Sink for synthesized tones.
///
/// Implementations must return promptly: the timer calls `play` inline on its
/// own loop.
pub trait ToneOutput {
    fn name(&self) -> &str;

    fn play(&mut self, tones: &[Tone], volume: f32) -> Result<(), AudioError>;
}

/// Opens an output on first use.
pub type OutputFactory = Box<dyn FnMut() -> Result<Box<dyn ToneOutput>, AudioError>>;

/// Discards everything.
#[derive(Debug, Default)]
pub struct SilentOutput;

impl ToneOutput for SilentOutput {
    fn name(&self) -> &str {
        "silent"
    }

    fn play(&mut self, _tones: &[Tone], _volume: f32) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Records what would have been played. Clones share one log.
#[derive(Debug, Default, Clone)]
pub struct RecordingOutput {
    log: Rc<RefCell<Vec<Vec<Tone>>>>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<Vec<Tone>> {
        self.log.borrow().clone()
    }

    pub fn count(&self) -> usize {
        self.log.borrow().len()
    }
}

impl ToneOutput for RecordingOutput {
    fn name(&self) -> &str {
        "recording"
    }

    fn play(&mut self, tones: &[Tone], _volume: f32) -> Result<(), AudioError> {
        self.log.borrow_mut().push(tones.to_vec());
        Ok(())
    }
}

/// Output that opens the system device when built with the `audio` feature
/// and stays silent otherwise.
pub fn default_output_factory() -> OutputFactory {
    Box::new(|| -> Result<Box<dyn ToneOutput>, AudioError> {
        #[cfg(feature = "audio")]
        {
            let out = super::cpal_output::CpalOutput::open()?;
            Ok(Box::new(out))
        }
        #[cfg(not(feature = "audio"))]
        {
            Ok(Box::new(SilentOutput))
        }
    })
}

/// Mono sine samples for `tones`, separated by short gaps.
pub fn synthesize(tones: &[Tone], sample_rate: u32, volume: f32) -> Vec<f32> {
    let volume = volume.clamp(0.0, 1.0);
    let sr = sample_rate as f32;
    let gap = (sample_rate as u64 * GAP_MS as u64 / 1000) as usize;
    let ramp = ((sample_rate as u64 * RAMP_MS as u64 / 1000) as usize).max(1);

    let mut samples = Vec::new();
    for (i, tone) in tones.iter().enumerate() {
        if i > 0 {
            samples.extend(std::iter::repeat(0.0).take(gap));
        }
        let n = (sample_rate as u64 * tone.duration_ms as u64 / 1000) as usize;
        let ramp = ramp.min(n / 2).max(1);
        for k in 0..n {
            let envelope = if k < ramp {
                k as f32 / ramp as f32
            } else if n - k <= ramp {
                (n - k) as f32 / ramp as f32
            } else {
                1.0
            };
            let phase = TAU * tone.frequency_hz * k as f32 / sr;
            samples.push(phase.sin() * volume * envelope);
        }
    }
    samples
}

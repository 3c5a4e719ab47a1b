//! Audio cues for timer transitions.

mod cue;
mod emitter;
mod output;
#[cfg(feature = "audio")]
mod cpal_output;

pub use cue::{Cue, Tone};
pub use emitter::AudioCueEmitter;
pub use output::{
    default_output_factory, synthesize, OutputFactory, RecordingOutput, SilentOutput, ToneOutput,
};
#[cfg(feature = "audio")]
pub use cpal_output::CpalOutput;

//! System speaker output via CPAL.
//!
//! One output stream is opened and kept alive for the emitter's lifetime.
//! `play` only synthesizes samples and queues them; the device callback drains
//! the queue on its own thread and plays silence when it runs dry.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use tracing::debug;

use super::cue::Tone;
use super::output::{synthesize, ToneOutput};
use crate::error::AudioError;

pub struct CpalOutput {
    // Held only to keep the stream playing.
    _stream: cpal::Stream,
    queue: Arc<Mutex<VecDeque<f32>>>,
    sample_rate: u32,
    name: String,
}

impl CpalOutput {
    pub fn open() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::Unavailable("no default output device".into()))?;
        let name = device
            .name()
            .unwrap_or_else(|_| "unknown output device".to_string());
        let supported = device
            .default_output_config()
            .map_err(|e| AudioError::Unavailable(e.to_string()))?;
        if supported.sample_format() != SampleFormat::F32 {
            return Err(AudioError::UnsupportedFormat(format!(
                "{:?}",
                supported.sample_format()
            )));
        }
        let config: StreamConfig = supported.into();
        let channels = usize::from(config.channels.max(1));
        let sample_rate = config.sample_rate.0;

        let queue = Arc::new(Mutex::new(VecDeque::<f32>::new()));
        let feed = Arc::clone(&queue);
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let Ok(mut pending) = feed.lock() else {
                        data.fill(0.0);
                        return;
                    };
                    for frame in data.chunks_mut(channels) {
                        let sample = pending.pop_front().unwrap_or(0.0);
                        frame.fill(sample);
                    }
                },
                |err| debug!(%err, "audio_stream_error"),
                None,
            )
            .map_err(|e| AudioError::Unavailable(e.to_string()))?;
        stream
            .play()
            .map_err(|e| AudioError::Playback(e.to_string()))?;

        debug!(device = %name, sample_rate, channels, "audio output opened");
        Ok(Self {
            _stream: stream,
            queue,
            sample_rate,
            name,
        })
    }
}

impl ToneOutput for CpalOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn play(&mut self, tones: &[Tone], volume: f32) -> Result<(), AudioError> {
        let samples = synthesize(tones, self.sample_rate, volume);
        let mut pending = self
            .queue
            .lock()
            .map_err(|_| AudioError::Playback("sample queue poisoned".into()))?;
        pending.extend(samples);
        Ok(())
    }
}

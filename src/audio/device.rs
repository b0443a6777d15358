//! Output through the platform audio device.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{info, warn};

use super::{pan_gains, AudioError, AudioOutput, SoundBuffer};
use crate::animation::Pan;

/// One playback instance. Holds its own reference to the buffer, so swapping
/// the player's current sound never touches it.
struct Voice {
    buffer: Arc<SoundBuffer>,
    cursor: f64,
    step: f64,
    gains: (f32, f32),
}

impl Voice {
    fn next_sample(&mut self) -> Option<f32> {
        let sample = *self.buffer.samples().get(self.cursor as usize)?;
        self.cursor += self.step;
        Some(sample)
    }
}

/// Mixes any number of overlapping voices into the default output stream.
pub struct CpalOutput {
    voices: Arc<Mutex<Vec<Voice>>>,
    device_rate: u32,
    /// Kept alive for as long as output is wanted
    _stream: cpal::Stream,
}

impl CpalOutput {
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::Unavailable("no output device".into()))?;
        let config = device
            .default_output_config()
            .map_err(|e| AudioError::Unavailable(e.to_string()))?;

        let device_rate = config.sample_rate().0;
        let channels = usize::from(config.channels().max(1));
        info!(
            device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
            rate = device_rate,
            channels,
            "audio output ready"
        );

        let voices: Arc<Mutex<Vec<Voice>>> = Arc::new(Mutex::new(Vec::new()));
        let mixer = Arc::clone(&voices);

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let Ok(mut voices) = mixer.lock() else {
                        data.fill(0.0);
                        return;
                    };
                    mix_into(data, channels, &mut voices);
                },
                |err| warn!(error = %err, "audio stream error"),
                None,
            )
            .map_err(|e| AudioError::Unavailable(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::Unavailable(e.to_string()))?;

        Ok(Self {
            voices,
            device_rate,
            _stream: stream,
        })
    }
}

impl AudioOutput for CpalOutput {
    fn play(&mut self, buffer: Arc<SoundBuffer>, pan: Pan) {
        let step = f64::from(buffer.sample_rate()) / f64::from(self.device_rate);
        let voice = Voice {
            buffer,
            cursor: 0.0,
            step,
            gains: pan_gains(pan),
        };
        match self.voices.lock() {
            Ok(mut voices) => voices.push(voice),
            Err(_) => warn!("audio mixer poisoned, cue dropped"),
        }
    }
}

fn mix_into(data: &mut [f32], channels: usize, voices: &mut Vec<Voice>) {
    for frame in data.chunks_mut(channels) {
        let (mut left, mut right) = (0.0_f32, 0.0_f32);
        voices.retain_mut(|voice| match voice.next_sample() {
            Some(s) => {
                left += s * voice.gains.0;
                right += s * voice.gains.1;
                true
            }
            None => false,
        });
        let (left, right) = (left.clamp(-1.0, 1.0), right.clamp(-1.0, 1.0));
        match frame {
            [mono] => *mono = (left + right) * 0.5,
            [l, r, rest @ ..] => {
                *l = left;
                *r = right;
                rest.fill((left + right) * 0.5);
            }
            [] => {}
        }
    }
}

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Duration;

use super::AudioError;

const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// A decoded mono sound, shared read-only between the player and every
/// voice currently playing it.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl SoundBuffer {
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate: sample_rate.max(1),
        }
    }

    /// Zero-length buffer installed when a sound cannot be loaded.
    pub fn silent() -> Self {
        Self::from_samples(Vec::new(), DEFAULT_SAMPLE_RATE)
    }

    pub fn load(path: &Path) -> Result<Self, AudioError> {
        let file = File::open(path).map_err(|source| AudioError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        Self::decode_wav(BufReader::new(file))
    }

    /// Decode a WAV stream, down-mixing to mono and normalising integer
    /// formats into [-1, 1].
    pub fn decode_wav<R: Read>(reader: R) -> Result<Self, AudioError> {
        let mut wav = hound::WavReader::new(reader)?;
        let spec = wav.spec();
        let channels = usize::from(spec.channels.max(1));

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => wav.samples::<f32>().collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
                wav.samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()?
            }
        };

        let samples = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();

        Ok(Self::from_samples(samples, spec.sample_rate))
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_silent(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }
}

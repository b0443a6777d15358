pub mod buffer;
pub mod catalog;
#[cfg(feature = "audio-device")]
pub mod device;

use std::f32::consts::FRAC_PI_2;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::animation::{CueSink, Pan};

pub use buffer::SoundBuffer;
pub use catalog::SoundCatalog;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio output unavailable: {0}")]
    Unavailable(String),

    #[error("failed to read {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode sound: {0}")]
    Decode(#[from] hound::Error),
}

/// Something that can start an independent playback of a buffer.
pub trait AudioOutput {
    fn play(&mut self, buffer: Arc<SoundBuffer>, pan: Pan);
}

/// Equal-power (left, right) gains for a mono source at `pan`.
pub fn pan_gains(pan: Pan) -> (f32, f32) {
    let x = (pan.value() + 1.0) * 0.5;
    ((x * FRAC_PI_2).cos(), (x * FRAC_PI_2).sin())
}

#[derive(Debug)]
struct Loaded {
    generation: u64,
    id: String,
    result: Result<SoundBuffer, AudioError>,
}

/// Holds the current sound and fires panned cues on an output.
///
/// With no output every cue is a no-op. Loads run on a worker thread and
/// are installed by [`AudioCuePlayer::poll_loaded`]; only the most recent
/// request is ever installed.
pub struct AudioCuePlayer {
    output: Option<Box<dyn AudioOutput>>,
    current: Option<Arc<SoundBuffer>>,
    current_id: Option<String>,
    sounds_dir: PathBuf,
    generation: u64,
    loads_tx: Sender<Loaded>,
    loads_rx: Receiver<Loaded>,
}

impl std::fmt::Debug for AudioCuePlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioCuePlayer")
            .field("available", &self.is_available())
            .field("current_id", &self.current_id)
            .field("sounds_dir", &self.sounds_dir)
            .field("generation", &self.generation)
            .finish()
    }
}

impl AudioCuePlayer {
    pub fn new<P: Into<PathBuf>>(output: Option<Box<dyn AudioOutput>>, sounds_dir: P) -> Self {
        let (loads_tx, loads_rx) = mpsc::channel();
        Self {
            output,
            current: None,
            current_id: None,
            sounds_dir: sounds_dir.into(),
            generation: 0,
            loads_tx,
            loads_rx,
        }
    }

    /// A player that never makes a sound.
    pub fn muted<P: Into<PathBuf>>(sounds_dir: P) -> Self {
        Self::new(None, sounds_dir)
    }

    /// Open the default device; falls back to a muted player if that fails.
    pub fn with_default_output<P: Into<PathBuf>>(sounds_dir: P) -> Self {
        match open_default_output() {
            Ok(output) => Self::new(Some(output), sounds_dir),
            Err(e) => {
                warn!(error = %e, "audio disabled");
                Self::muted(sounds_dir)
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.output.is_some()
    }

    pub fn current_sound(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn buffer(&self) -> Option<&Arc<SoundBuffer>> {
        self.current.as_ref()
    }

    /// Fetch and decode `id` in the background; the previous sound stays
    /// active until the new one is installed.
    pub fn load_sound(&mut self, id: &str) {
        self.generation += 1;
        let generation = self.generation;
        let path = self.sounds_dir.join(id);
        let id = id.to_string();
        let tx = self.loads_tx.clone();
        debug!(%id, generation, "loading sound");

        let spawned = thread::Builder::new()
            .name("sound-loader".into())
            .spawn(move || {
                let result = SoundBuffer::load(&path);
                // Receiver gone means the player was dropped; nothing to do
                let _ = tx.send(Loaded {
                    generation,
                    id,
                    result,
                });
            });
        if let Err(e) = spawned {
            warn!(error = %e, "could not spawn sound loader");
        }
    }

    /// Install finished loads. Returns true if the current sound changed.
    pub fn poll_loaded(&mut self) -> bool {
        let mut installed = false;
        while let Ok(loaded) = self.loads_rx.try_recv() {
            if loaded.generation != self.generation {
                debug!(id = %loaded.id, "discarding superseded sound load");
                continue;
            }
            let buffer = match loaded.result {
                Ok(buffer) => {
                    info!(id = %loaded.id, length = ?buffer.duration(), "sound loaded");
                    buffer
                }
                Err(e) => {
                    warn!(id = %loaded.id, error = %e, "sound unavailable, using silence");
                    SoundBuffer::silent()
                }
            };
            self.install(loaded.id, buffer);
            installed = true;
        }
        installed
    }

    /// Replace the current sound immediately. Voices already playing keep the
    /// old buffer alive until they finish.
    pub fn install<S: Into<String>>(&mut self, id: S, buffer: SoundBuffer) {
        self.current = Some(Arc::new(buffer));
        self.current_id = Some(id.into());
    }
}

impl CueSink for AudioCuePlayer {
    fn play_cue(&mut self, pan: Pan) {
        let (Some(output), Some(buffer)) = (self.output.as_mut(), self.current.as_ref()) else {
            return;
        };
        if buffer.is_silent() {
            return;
        }
        output.play(Arc::clone(buffer), pan);
    }
}

#[cfg(feature = "audio-device")]
fn open_default_output() -> Result<Box<dyn AudioOutput>, AudioError> {
    Ok(Box::new(device::CpalOutput::new()?))
}

#[cfg(not(feature = "audio-device"))]
fn open_default_output() -> Result<Box<dyn AudioOutput>, AudioError> {
    Err(AudioError::Unavailable(
        "built without the audio-device feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    type Played = Arc<Mutex<Vec<(Arc<SoundBuffer>, Pan)>>>;

    struct RecordingOutput(Played);

    impl AudioOutput for RecordingOutput {
        fn play(&mut self, buffer: Arc<SoundBuffer>, pan: Pan) {
            self.0.lock().unwrap().push((buffer, pan));
        }
    }

    fn recording_player(dir: &Path) -> (AudioCuePlayer, Played) {
        let played: Played = Arc::default();
        let player = AudioCuePlayer::new(Some(Box::new(RecordingOutput(Arc::clone(&played)))), dir);
        (player, played)
    }

    fn write_wav(path: &Path, samples: &[f32]) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for s in samples {
            writer.write_sample(*s).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn wait_for_install(player: &mut AudioCuePlayer) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if player.poll_loaded() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn pan_gains_are_equal_power() {
        let (l, r) = pan_gains(Pan::Left);
        assert!((l - 1.0).abs() < 1e-6 && r.abs() < 1e-6);
        let (l, r) = pan_gains(Pan::Right);
        assert!(l.abs() < 1e-6 && (r - 1.0).abs() < 1e-6);
        let (l, r) = pan_gains(Pan::Center);
        assert!((l - r).abs() < 1e-6);
        assert!((l * l + r * r - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cue_without_buffer_is_noop() {
        let dir = tempdir().unwrap();
        let (mut player, played) = recording_player(dir.path());
        player.play_cue(Pan::Left);
        assert!(played.lock().unwrap().is_empty());
    }

    #[test]
    fn muted_player_never_plays() {
        let mut player = AudioCuePlayer::muted("/tmp");
        player.install("tick.wav", SoundBuffer::from_samples(vec![0.5; 8], 44_100));
        player.play_cue(Pan::Right);
        assert!(!player.is_available());
        assert_eq!(player.current_sound(), Some("tick.wav"));
    }

    #[test]
    fn overlapping_cues_are_independent_instances() {
        let dir = tempdir().unwrap();
        let (mut player, played) = recording_player(dir.path());
        player.install("a.wav", SoundBuffer::from_samples(vec![0.1; 4], 44_100));
        player.play_cue(Pan::Right);
        player.play_cue(Pan::Left);

        // Swapping the sound leaves the in-flight voices holding the old buffer
        player.install("b.wav", SoundBuffer::from_samples(vec![0.9; 4], 44_100));
        player.play_cue(Pan::Center);

        let played = played.lock().unwrap();
        assert_eq!(played.len(), 3);
        assert_eq!(played[0].1, Pan::Right);
        assert_eq!(played[1].1, Pan::Left);
        assert_eq!(played[0].0.samples()[0], 0.1);
        assert_eq!(played[2].0.samples()[0], 0.9);
        assert!(!Arc::ptr_eq(&played[0].0, &played[2].0));
    }

    #[test]
    fn background_load_installs_sound() {
        let dir = tempdir().unwrap();
        write_wav(&dir.path().join("tick.wav"), &[0.5, -0.5, 0.25]);
        let (mut player, played) = recording_player(dir.path());

        player.load_sound("tick.wav");
        assert!(wait_for_install(&mut player));
        assert_eq!(player.current_sound(), Some("tick.wav"));
        assert_eq!(player.buffer().unwrap().samples(), &[0.5, -0.5, 0.25]);

        player.play_cue(Pan::Right);
        assert_eq!(played.lock().unwrap().len(), 1);
    }

    #[test]
    fn failed_load_falls_back_to_silence() {
        let dir = tempdir().unwrap();
        let (mut player, played) = recording_player(dir.path());

        player.load_sound("missing.wav");
        assert!(wait_for_install(&mut player));
        assert!(player.buffer().unwrap().is_silent());

        player.play_cue(Pan::Left);
        assert!(played.lock().unwrap().is_empty());
    }

    #[test]
    fn superseded_load_is_discarded() {
        let dir = tempdir().unwrap();
        write_wav(&dir.path().join("first.wav"), &[0.1]);
        write_wav(&dir.path().join("second.wav"), &[0.2]);
        let (mut player, _played) = recording_player(dir.path());

        player.load_sound("first.wav");
        player.load_sound("second.wav");
        assert!(wait_for_install(&mut player));
        // give the first loader time to report too; it must not win
        std::thread::sleep(Duration::from_millis(50));
        player.poll_loaded();
        assert_eq!(player.current_sound(), Some("second.wav"));
    }
}

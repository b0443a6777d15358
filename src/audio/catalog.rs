use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Used whenever the sounds directory cannot be listed or holds no WAV files.
pub const FALLBACK_SOUNDS: &[&str] = &["tick.wav", "click.wav", "beep.wav", "chime.wav"];

/// The selectable sound identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundCatalog {
    dir: PathBuf,
    sounds: Vec<String>,
    fallback: bool,
}

impl SoundCatalog {
    /// List `*.wav` files in `dir` sorted by name, or fall back to the fixed list.
    pub fn discover<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref().to_path_buf();
        match list_wav_files(&dir) {
            Ok(sounds) if !sounds.is_empty() => Self {
                dir,
                sounds,
                fallback: false,
            },
            Ok(_) => {
                warn!(dir = %dir.display(), "no sounds found, using fallback list");
                Self::fallback(dir)
            }
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "sound listing failed, using fallback list");
                Self::fallback(dir)
            }
        }
    }

    pub fn fallback(dir: PathBuf) -> Self {
        Self {
            dir,
            sounds: FALLBACK_SOUNDS.iter().map(|s| s.to_string()).collect(),
            fallback: true,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn sounds(&self) -> &[String] {
        &self.sounds
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sounds.iter().any(|s| s == id)
    }
}

fn list_wav_files(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_wav = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
        if !is_wav || !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

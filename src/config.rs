use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;

/// The small set of UI flags that survive restarts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Prefs {
    pub disclaimer_accepted: bool,
    pub settings_expanded: bool,
}

pub trait PrefsStore {
    fn load(&self) -> Prefs;
    fn save(&self, prefs: &Prefs) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FilePrefsStore {
    path: PathBuf,
}

impl FilePrefsStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::prefs_path().unwrap_or_else(|| PathBuf::from("emdr_prefs.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FilePrefsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefsStore for FilePrefsStore {
    fn load(&self) -> Prefs {
        fs::read(&self.path)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<Prefs>(&bytes).ok())
            .unwrap_or_default()
    }

    fn save(&self, prefs: &Prefs) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(prefs)?;
        fs::write(&self.path, data)
    }
}

/// Keeps prefs in memory only; used for headless runs.
#[derive(Debug, Default)]
pub struct MemoryPrefsStore {
    prefs: std::cell::RefCell<Prefs>,
}

impl MemoryPrefsStore {
    pub fn new(prefs: Prefs) -> Self {
        Self {
            prefs: std::cell::RefCell::new(prefs),
        }
    }
}

impl PrefsStore for MemoryPrefsStore {
    fn load(&self) -> Prefs {
        self.prefs.borrow().clone()
    }

    fn save(&self, prefs: &Prefs) -> std::io::Result<()> {
        *self.prefs.borrow_mut() = prefs.clone();
        Ok(())
    }
}

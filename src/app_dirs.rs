use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn project() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "emdr-timer")
    }

    pub fn prefs_path() -> Option<PathBuf> {
        Self::project().map(|pd| pd.config_dir().join("prefs.json"))
    }

    pub fn log_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("emdr-timer");
            Some(state_dir.join("emdr.log"))
        } else {
            Self::project().map(|pd| pd.data_local_dir().join("emdr.log"))
        }
    }

    /// `./sounds` when present, otherwise the per-user data directory.
    pub fn sounds_dir() -> PathBuf {
        let local = PathBuf::from("sounds");
        if local.is_dir() {
            return local;
        }
        Self::project()
            .map(|pd| pd.data_dir().join("sounds"))
            .unwrap_or(local)
    }
}

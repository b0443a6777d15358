use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{info, warn};

use crate::audio::{AudioCuePlayer, SoundCatalog};
use crate::config::{Prefs, PrefsStore};
use crate::session::Session;
use crate::settings::{ConfigField, SessionConfig};

/// Everything the user can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    /// Space bar: start if nothing is in progress, otherwise pause/continue
    StartOrToggle,
    TogglePause,
    Reset,
    ToggleFullscreen,
    ToggleSettings,
    FocusNext,
    FocusPrev,
    Adjust(i32),
    AcceptDisclaimer,
    Quit,
}

impl Command {
    pub fn from_key(key: KeyEvent) -> Option<Self> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Command::Quit);
        }
        let cmd = match key.code {
            KeyCode::Char(' ') => Command::StartOrToggle,
            KeyCode::Enter => Command::Start,
            KeyCode::Char('p') => Command::TogglePause,
            KeyCode::Char('r') => Command::Reset,
            KeyCode::Char('f') => Command::ToggleFullscreen,
            KeyCode::Char('s') => Command::ToggleSettings,
            KeyCode::Tab | KeyCode::Down => Command::FocusNext,
            KeyCode::BackTab | KeyCode::Up => Command::FocusPrev,
            KeyCode::Right | KeyCode::Char('+') | KeyCode::Char('=') => Command::Adjust(1),
            KeyCode::Left | KeyCode::Char('-') => Command::Adjust(-1),
            KeyCode::Char('a') => Command::AcceptDisclaimer,
            KeyCode::Char('q') | KeyCode::Esc => Command::Quit,
            _ => return None,
        };
        Some(cmd)
    }

    fn allowed_before_disclaimer(self) -> bool {
        matches!(self, Command::AcceptDisclaimer | Command::Quit)
    }
}

/// Top-level state: the session plus the chrome around it.
pub struct App {
    pub session: Session<AudioCuePlayer>,
    pub catalog: SoundCatalog,
    pub prefs: Prefs,
    prefs_store: Box<dyn PrefsStore>,
    pub fullscreen: bool,
    pub focus: ConfigField,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        config: SessionConfig,
        mut player: AudioCuePlayer,
        catalog: SoundCatalog,
        prefs_store: Box<dyn PrefsStore>,
    ) -> Self {
        let prefs = prefs_store.load();
        player.load_sound(&config.sound_id);
        Self {
            session: Session::new(config, player),
            catalog,
            prefs,
            prefs_store,
            fullscreen: false,
            focus: ConfigField::Duration,
            should_quit: false,
        }
    }

    pub fn disclaimer_pending(&self) -> bool {
        !self.prefs.disclaimer_accepted
    }

    /// Frame tick: pick up finished sound loads and move the session clock.
    pub fn on_tick(&mut self, now: Duration) {
        self.session.sink_mut().poll_loaded();
        self.session.advance_to(now);
    }

    pub fn on_key(&mut self, key: KeyEvent, now: Duration) {
        if let Some(cmd) = Command::from_key(key) {
            self.apply(cmd, now);
        }
    }

    pub fn apply(&mut self, cmd: Command, now: Duration) {
        if self.disclaimer_pending() && !cmd.allowed_before_disclaimer() {
            return;
        }
        // Bring the session up to date before a transition reads its clock
        self.on_tick(now);

        match cmd {
            Command::Start => self.session.start(),
            Command::StartOrToggle => self.session.start_or_toggle(),
            Command::TogglePause => self.session.pause(),
            Command::Reset => self.session.reset(),
            Command::ToggleFullscreen => self.fullscreen = !self.fullscreen,
            Command::ToggleSettings => {
                self.prefs.settings_expanded = !self.prefs.settings_expanded;
                self.persist_prefs();
            }
            Command::FocusNext => self.focus = self.focus.next(),
            Command::FocusPrev => self.focus = self.focus.prev(),
            Command::Adjust(delta) => self.adjust_focused(delta),
            Command::AcceptDisclaimer => {
                if !self.prefs.disclaimer_accepted {
                    info!("disclaimer accepted");
                    self.prefs.disclaimer_accepted = true;
                    self.persist_prefs();
                }
            }
            Command::Quit => self.should_quit = true,
        }
    }

    fn adjust_focused(&mut self, delta: i32) {
        if !self.prefs.settings_expanded {
            return;
        }
        let field = self.focus;
        let changed = self.session.adjust(field, delta, self.catalog.sounds());
        if changed && field == ConfigField::Sound {
            let id = self.session.config().sound_id.clone();
            self.session.sink_mut().load_sound(&id);
        }
    }

    fn persist_prefs(&self) {
        if let Err(e) = self.prefs_store.save(&self.prefs) {
            warn!(error = %e, "failed to save preferences");
        }
    }
}

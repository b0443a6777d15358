use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use emdr_timer::{
    app::App,
    app_dirs::AppDirs,
    audio::{AudioCuePlayer, SoundCatalog},
    config::FilePrefsStore,
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner, FRAME_INTERVAL},
    settings::{ConfigField, SessionConfig},
    ui::ui,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    sync::Mutex,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// bilateral stimulation timer with a sweeping marker and panned audio cues
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal EMDR timer: a marker sweeps left and right across a track while alternating left/right audio cues play at each extreme, for a fixed number of timed rounds."
)]
pub struct Cli {
    /// seconds per round
    #[clap(short = 'd', long)]
    duration: Option<String>,

    /// number of rounds in a session
    #[clap(short = 'r', long)]
    rounds: Option<String>,

    /// sweep speed from 1 (slowest, 6s per cycle) to 10 (fastest, 1.5s per cycle)
    #[clap(short = 's', long)]
    speed: Option<String>,

    /// marker size in pixels (10px per terminal cell)
    #[clap(long)]
    size: Option<String>,

    /// marker color: a name like "red" or a hex value like "#4a90e2"
    #[clap(short = 'c', long)]
    color: Option<String>,

    /// sound file name inside the sounds directory
    #[clap(long)]
    sound: Option<String>,

    /// directory holding the WAV cue sounds
    #[clap(long)]
    sounds_dir: Option<PathBuf>,

    /// run without opening an audio device
    #[clap(long)]
    no_audio: bool,
}

impl Cli {
    /// Build the starting config; unparseable values keep their defaults.
    fn to_session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::default();
        let inputs = [
            (ConfigField::Duration, &self.duration),
            (ConfigField::Rounds, &self.rounds),
            (ConfigField::Speed, &self.speed),
            (ConfigField::MarkerSize, &self.size),
            (ConfigField::MarkerColor, &self.color),
            (ConfigField::Sound, &self.sound),
        ];
        for (field, raw) in inputs {
            if let Some(raw) = raw {
                config.apply(field, raw);
            }
        }
        config
    }
}

fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging();

    let config = cli.to_session_config();
    let sounds_dir = cli.sounds_dir.clone().unwrap_or_else(AppDirs::sounds_dir);
    let catalog = SoundCatalog::discover(&sounds_dir);
    let player = if cli.no_audio {
        AudioCuePlayer::muted(sounds_dir)
    } else {
        AudioCuePlayer::with_default_output(sounds_dir)
    };
    info!(?config, sounds = catalog.sounds().len(), "starting");

    let mut app = App::new(config, player, catalog, Box::new(FilePrefsStore::new()));

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        warn!(error = %e, "exited with error");
    }
    result
}

fn run<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(FRAME_INTERVAL),
    );

    while !app.should_quit {
        terminal.draw(|f| ui(app, f))?;

        match runner.step() {
            AppEvent::Tick | AppEvent::Resize => app.on_tick(runner.now()),
            AppEvent::Key(key) => app.on_key(key, runner.now()),
        }
    }

    app.session.reset();
    info!("quit");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["emdr"]);
        assert_eq!(cli.to_session_config(), SessionConfig::default());
        assert!(!cli.no_audio);
        assert_eq!(cli.sounds_dir, None);
    }

    #[test]
    fn cli_values_seed_config() {
        let cli = Cli::parse_from([
            "emdr", "-d", "45", "-r", "3", "-s", "8", "--size", "70", "-c", "red", "--sound",
            "bell.wav",
        ]);
        let config = cli.to_session_config();
        assert_eq!(config.duration_secs, 45);
        assert_eq!(config.total_rounds, 3);
        assert_eq!(config.speed_level, 8);
        assert_eq!(config.marker_size, 70);
        assert_eq!(config.marker_color, "red");
        assert_eq!(config.sound_id, "bell.wav");
    }

    #[test]
    fn cli_values_are_permissive() {
        let cli = Cli::parse_from(["emdr", "-d", "abc", "-s", "42", "-r", "2x"]);
        let config = cli.to_session_config();
        assert_eq!(config.duration_secs, SessionConfig::default().duration_secs);
        assert_eq!(config.speed_level, 10);
        assert_eq!(config.total_rounds, 2);
    }

    #[test]
    fn cli_flags() {
        let cli = Cli::parse_from(["emdr", "--no-audio", "--sounds-dir", "/tmp/sounds"]);
        assert!(cli.no_audio);
        assert_eq!(cli.sounds_dir, Some(PathBuf::from("/tmp/sounds")));
    }
}

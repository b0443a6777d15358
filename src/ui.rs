pub mod settings_panel;
pub mod track;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
    Frame,
};

use crate::{app::App, session::SessionState};

use self::settings_panel::{SettingsPanel, PANEL_HEIGHT};
use self::track::Track;

const HORIZONTAL_MARGIN: u16 = 2;

const DISCLAIMER: &str = "This tool provides bilateral visual and audio stimulation. \
It is not a substitute for therapy and is intended for use under the guidance of a \
qualified professional. Stop immediately if you feel unwell.";

pub fn ui(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let session = &self.session;
        let track = Track {
            position: session.marker_position(),
            marker_size_px: session.config().marker_size,
            color: session.config().color(),
        };

        if self.fullscreen {
            track.render(area, buf);
        } else {
            let settings_height = if self.prefs.settings_expanded {
                PANEL_HEIGHT
            } else {
                1
            };
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .horizontal_margin(HORIZONTAL_MARGIN)
                .constraints([
                    Constraint::Length(1), // round / time / state
                    Constraint::Min(3),    // track
                    Constraint::Length(1), // controls
                    Constraint::Length(settings_height),
                    Constraint::Length(1), // key help
                ])
                .split(area);

            render_status(self, chunks[0], buf);

            let track_block = Block::default().borders(Borders::ALL);
            let track_area = track_block.inner(chunks[1]);
            track_block.render(chunks[1], buf);
            track.render(track_area, buf);

            render_controls(self, chunks[2], buf);

            if self.prefs.settings_expanded {
                SettingsPanel {
                    session,
                    focus: self.focus,
                }
                .render(chunks[3], buf);
            } else {
                Paragraph::new(Span::styled(
                    "s: show settings",
                    Style::default().add_modifier(Modifier::DIM),
                ))
                .render(chunks[3], buf);
            }

            Paragraph::new(Span::styled(
                "space start/pause · r reset · f fullscreen · s settings · tab/←→ edit · q quit",
                Style::default().add_modifier(Modifier::DIM),
            ))
            .alignment(Alignment::Center)
            .render(chunks[4], buf);
        }

        if self.disclaimer_pending() {
            render_disclaimer(area, buf);
        }
    }
}

fn render_status(app: &App, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let state_style = match session.state() {
        SessionState::Running => Style::default().fg(Color::Green),
        SessionState::Paused | SessionState::RoundComplete => Style::default().fg(Color::Yellow),
        SessionState::Ended => Style::default().fg(Color::Cyan),
        SessionState::Idle => Style::default().add_modifier(Modifier::DIM),
    };
    let mut spans = vec![
        Span::styled(session.round_label(), bold),
        Span::raw("   "),
        Span::styled(session.time_label(), bold),
        Span::raw("   "),
        Span::styled(session.state().to_string(), state_style),
    ];
    if !session.sink().is_available() {
        spans.push(Span::styled(
            "   (no audio)",
            Style::default().add_modifier(Modifier::DIM),
        ));
    }
    Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .render(area, buf);
}

fn render_controls(app: &App, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let button = |label: &str, enabled: bool| {
        let style = if enabled {
            Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        Span::styled(format!(" {label} "), style)
    };
    let line = Line::from(vec![
        button("Start", session.start_enabled()),
        Span::raw("  "),
        button(session.pause_label(), session.pause_enabled()),
        Span::raw("  "),
        button("Reset", true),
    ]);
    Paragraph::new(line)
        .alignment(Alignment::Center)
        .render(area, buf);
}

fn render_disclaimer(area: Rect, buf: &mut Buffer) {
    let popup = centered(area, 60, 9);
    Clear.render(popup, buf);
    Paragraph::new(vec![
        Line::from(DISCLAIMER),
        Line::from(""),
        Line::from(Span::styled(
            "Press 'a' to accept, 'q' to quit",
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ])
    .wrap(Wrap { trim: true })
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("Disclaimer"))
    .render(popup, buf);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::session::Session;
use crate::settings::ConfigField;

/// Rows needed to draw the expanded panel including borders.
pub const PANEL_HEIGHT: u16 = ConfigField::ALL.len() as u16 + 2;

/// One line per input; locked inputs are dimmed, the focused one highlighted.
pub struct SettingsPanel<'a, S: crate::animation::CueSink> {
    pub session: &'a Session<S>,
    pub focus: ConfigField,
}

impl<S: crate::animation::CueSink> Widget for SettingsPanel<'_, S> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let config = self.session.config();
        let lines: Vec<Line> = ConfigField::ALL
            .iter()
            .map(|&field| {
                let enabled = self.session.input_enabled(field);
                let focused = field == self.focus;
                let mut style = Style::default();
                if !enabled {
                    style = style.add_modifier(Modifier::DIM);
                }
                if focused {
                    style = style.fg(Color::Yellow).add_modifier(Modifier::BOLD);
                }
                let marker = if focused { "▸ " } else { "  " };
                let mut spans = vec![
                    Span::styled(format!("{marker}{:<14}", field.to_string()), style),
                    Span::styled(config.display_value(field), style),
                ];
                if field == ConfigField::MarkerColor {
                    spans.push(Span::raw(" "));
                    spans.push(Span::styled("■", Style::default().fg(config.color())));
                }
                if !enabled {
                    spans.push(Span::styled(" (locked)", style));
                }
                Line::from(spans)
            })
            .collect();

        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Settings"))
            .render(area, buf);
    }
}

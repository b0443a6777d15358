use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// Pixels represented by one terminal cell when sizing the marker.
pub const PX_PER_CELL: u16 = 10;

const MARKER_SYMBOL: &str = "█";

/// The horizontal band the marker sweeps across.
#[derive(Debug, Clone, Copy)]
pub struct Track {
    /// Offset in [-1, 1]; 0 is center.
    pub position: f64,
    pub marker_size_px: u16,
    pub color: Color,
}

impl Track {
    /// Marker footprint in cells, (width, height). Cells are roughly twice as
    /// tall as wide, so height is half the width.
    pub fn marker_cells(&self, area: Rect) -> (u16, u16) {
        let width = (self.marker_size_px / PX_PER_CELL).clamp(1, area.width.max(1));
        let height = (width / 2).clamp(1, area.height.max(1));
        (width, height)
    }

    /// Column of the marker's left edge within `area`.
    pub fn marker_x(&self, area: Rect) -> u16 {
        let (width, _) = self.marker_cells(area);
        let travel = f64::from(area.width.saturating_sub(width)) / 2.0;
        let offset = (travel + self.position.clamp(-1.0, 1.0) * travel).round();
        area.x + offset as u16
    }
}

impl Widget for Track {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let (width, height) = self.marker_cells(area);
        let x = self.marker_x(area);
        let top = area.y + (area.height - height) / 2;
        let style = Style::default().fg(self.color);
        let row = MARKER_SYMBOL.repeat(usize::from(width));
        for y in top..top + height {
            buf.set_string(x, y, &row, style);
        }
    }
}

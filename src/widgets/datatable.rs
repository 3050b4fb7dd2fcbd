use crate::source::RowRecord;
use crate::view::ViewSnapshot;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{
        Cell, Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget,
        Table, TableState, Widget,
    },
};

/// Renders the visible window of a [`ViewSnapshot`] with a header, optional row numbers,
/// and a scrollbar sized to the whole dataset.
pub struct WindowTable<'a> {
    snapshot: &'a ViewSnapshot,
    pub header_bg: Color,
    pub header_fg: Color,
    pub row_numbers_fg: Color,
    pub placeholder_fg: Color,
    pub scrollbar_fg: Color,
    pub table_cell_padding: u16,
    pub max_cell_width: u16,
    pub row_numbers: bool,
    pub row_start_index: usize,
}

impl<'a> WindowTable<'a> {
    pub fn new(snapshot: &'a ViewSnapshot) -> Self {
        Self {
            snapshot,
            header_bg: Color::Indexed(236),
            header_fg: Color::White,
            row_numbers_fg: Color::DarkGray,
            placeholder_fg: Color::DarkGray,
            scrollbar_fg: Color::Cyan,
            table_cell_padding: 1,
            max_cell_width: 30,
            row_numbers: false,
            row_start_index: 0,
        }
    }

    pub fn with_colors(
        mut self,
        header_bg: Color,
        header_fg: Color,
        row_numbers_fg: Color,
        placeholder_fg: Color,
        scrollbar_fg: Color,
    ) -> Self {
        self.header_bg = header_bg;
        self.header_fg = header_fg;
        self.row_numbers_fg = row_numbers_fg;
        self.placeholder_fg = placeholder_fg;
        self.scrollbar_fg = scrollbar_fg;
        self
    }

    pub fn with_row_numbers(mut self, row_numbers: bool, row_start_index: usize) -> Self {
        self.row_numbers = row_numbers;
        self.row_start_index = row_start_index;
        self
    }

    pub fn with_max_cell_width(mut self, width: u16) -> Self {
        self.max_cell_width = width.max(3);
        self
    }

    fn header_style(&self) -> Style {
        if self.header_bg == Color::Reset {
            Style::default().fg(self.header_fg)
        } else {
            Style::default().bg(self.header_bg).fg(self.header_fg)
        }
    }

    fn row_number_width(&self) -> u16 {
        if !self.row_numbers {
            return 0;
        }
        let last = self.snapshot.visible_end.max(1) - 1 + self.row_start_index;
        last.to_string().len() as u16
    }

    fn render_scrollbar(&self, area: Rect, buf: &mut Buffer) {
        let snap = self.snapshot;
        let viewport = (area.height.saturating_sub(1) as f64 * snap.row_height) as usize;
        let mut state = ScrollbarState::new(snap.content_length() as usize)
            .viewport_content_length(viewport)
            .position(snap.scroll_top.max(0.0) as usize);
        Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(None)
            .end_symbol(None)
            .style(Style::default().fg(self.scrollbar_fg))
            .render(
                Rect {
                    y: area.y + 1,
                    height: area.height.saturating_sub(1),
                    ..area
                },
                buf,
                &mut state,
            );
    }
}

fn truncate(text: &str, width: u16) -> String {
    let width = width as usize;
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut s: String = text.chars().take(width.saturating_sub(1)).collect();
    s.push('…');
    s
}

impl Widget for WindowTable<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let snap = self.snapshot;
        if area.height == 0 || area.width == 0 {
            return;
        }
        if snap.column_names.is_empty() {
            Paragraph::new("No columns")
                .centered()
                .style(Style::default().fg(self.placeholder_fg))
                .render(area, buf);
            return;
        }

        let scrollbar_width = 1;
        let table_area = Rect {
            width: area.width.saturating_sub(scrollbar_width),
            ..area
        };

        let visible: Vec<(usize, Option<&RowRecord>)> = snap
            .visible_rows()
            .take(area.height.saturating_sub(1) as usize)
            .collect();

        let mut widths: Vec<u16> = snap
            .column_names
            .iter()
            .map(|name| (name.chars().count() as u16).min(self.max_cell_width))
            .collect();

        let mut rows: Vec<Row> = Vec::with_capacity(visible.len());
        for (index, record) in &visible {
            let mut cells: Vec<Cell> = Vec::with_capacity(widths.len() + 1);
            if self.row_numbers {
                cells.push(
                    Cell::from(Line::from(format!("{}", index + self.row_start_index)).right_aligned())
                        .style(Style::default().fg(self.row_numbers_fg)),
                );
            }
            match record {
                Some(record) => {
                    for (col, name) in snap.column_names.iter().enumerate() {
                        let text = truncate(&record.cell_text(name), self.max_cell_width);
                        widths[col] = widths[col].max(text.chars().count() as u16);
                        cells.push(Cell::from(text));
                    }
                }
                None => {
                    // not buffered yet
                    for _ in snap.column_names.iter() {
                        cells.push(
                            Cell::from("…").style(Style::default().fg(self.placeholder_fg)),
                        );
                    }
                }
            }
            rows.push(Row::new(cells));
        }

        let mut constraints: Vec<Constraint> = Vec::with_capacity(widths.len() + 1);
        let mut header: Vec<Span> = Vec::with_capacity(widths.len() + 1);
        if self.row_numbers {
            constraints.push(Constraint::Length(self.row_number_width()));
            header.push(Span::raw(""));
        }
        constraints.extend(widths.iter().map(|w| Constraint::Length(*w)));
        header.extend(
            snap.column_names
                .iter()
                .map(|name| Span::raw(truncate(name, self.max_cell_width))),
        );

        let mut state = TableState::default();
        StatefulWidget::render(
            Table::new(rows, constraints)
                .column_spacing(self.table_cell_padding)
                .header(Row::new(header).style(self.header_style())),
            table_area,
            buf,
            &mut state,
        );

        if snap.total_row_count > visible.len() {
            self.render_scrollbar(area, buf);
        }
    }
}

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    widgets::{Paragraph, Widget},
};

const CONTROLS: [(&str, &str); 6] = [
    ("j/k", "Row"),
    ("PgUp/PgDn", "Page"),
    ("g/G", "Top/End"),
    ("r", "Row #"),
    ("R", "Reload"),
    ("q", "Quit"),
];

/// Bottom bar: key hints on the left; position or a transient notice on the right.
pub struct Controls {
    pub position: Option<(usize, usize, usize)>,
    pub notice: Option<String>,
    pub dimmed: bool,
    pub busy: bool,
    pub throbber_frame: u8,
    pub bg_color: Color,
    pub key_color: Color,
    pub label_color: Color,
    pub notice_color: Color,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            position: None,
            notice: None,
            dimmed: false,
            busy: false,
            throbber_frame: 0,
            bg_color: Color::Indexed(236),
            key_color: Color::Cyan,
            label_color: Color::White,
            notice_color: Color::Yellow,
        }
    }
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Visible rows `[start, end)` of `total`.
    pub fn with_position(mut self, start: usize, end: usize, total: usize) -> Self {
        self.position = Some((start, end, total));
        self
    }

    pub fn with_notice(mut self, notice: Option<String>) -> Self {
        self.notice = notice;
        self
    }

    pub fn with_dimmed(mut self, dimmed: bool) -> Self {
        self.dimmed = dimmed;
        self
    }

    pub fn with_busy(mut self, busy: bool, throbber_frame: u8) -> Self {
        self.busy = busy;
        self.throbber_frame = throbber_frame;
        self
    }

    pub fn with_colors(
        mut self,
        bg_color: Color,
        key_color: Color,
        label_color: Color,
        notice_color: Color,
    ) -> Self {
        self.bg_color = bg_color;
        self.key_color = key_color;
        self.label_color = label_color;
        self.notice_color = notice_color;
        self
    }

    fn status_text(&self) -> Option<(String, Color)> {
        if let Some(notice) = &self.notice {
            return Some((notice.clone(), self.notice_color));
        }
        self.position.map(|(start, end, total)| {
            let text = if total == 0 {
                "No rows".to_string()
            } else {
                format!("Rows {}–{} of {}", start + 1, end, total)
            };
            (text, self.label_color)
        })
    }
}

impl Widget for &Controls {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let base_style = if self.dimmed {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };
        let bg_style = if self.bg_color == Color::Reset {
            base_style
        } else {
            base_style.bg(self.bg_color)
        };

        let mut constraints = CONTROLS.iter().fold(vec![], |mut acc, (key, action)| {
            acc.push(Constraint::Length(key.chars().count() as u16 + 2));
            acc.push(Constraint::Length(action.chars().count() as u16 + 1));
            acc
        });
        constraints.push(Constraint::Fill(1));
        constraints.push(Constraint::Length(2));

        let layout = Layout::new(Direction::Horizontal, constraints).split(area);

        for (i, (key, action)) in CONTROLS.iter().enumerate() {
            let j = i * 2;
            let key_style = if self.dimmed {
                base_style
            } else {
                base_style.fg(self.key_color)
            };
            Paragraph::new(*key)
                .style(key_style.bold())
                .centered()
                .render(layout[j], buf);
            Paragraph::new(*action)
                .style(bg_style.fg(self.label_color))
                .render(layout[j + 1], buf);
        }

        let status_idx = CONTROLS.len() * 2;
        let (text, color) = self.status_text().unwrap_or_default();
        let color = if self.dimmed { Color::DarkGray } else { color };
        Paragraph::new(text)
            .style(bg_style.fg(color))
            .right_aligned()
            .render(layout[status_idx], buf);

        const THROBBER: [char; 4] = ['|', '/', '-', '\\'];
        let spinner = if self.busy {
            THROBBER[self.throbber_frame as usize % THROBBER.len()].to_string()
        } else {
            String::new()
        };
        Paragraph::new(spinner)
            .style(bg_style.fg(self.key_color))
            .centered()
            .render(layout[status_idx + 1], buf);
    }
}

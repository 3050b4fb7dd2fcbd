use crate::buffer::FetchOutcome;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    widgets::{Paragraph, Widget},
};

#[derive(Default)]
pub struct DebugState {
    pub num_events: usize,
    pub num_frames: usize,
    pub num_key_events: usize,
    pub last_key_event_name: String,
    pub enabled: bool,
    pub fetches_issued: usize,
    pub fetches_applied: usize,
    pub fetches_stale: usize,
    pub fetches_failed: usize,
    /// Buffered range at the last frame, if any.
    pub buffered: Option<(usize, usize)>,
    pub in_flight: usize,
}

impl DebugState {
    pub fn on_key(&mut self, event: &crossterm::event::KeyEvent) {
        self.num_key_events += 1;
        self.last_key_event_name = format!("{:?}", event.code);
    }

    pub fn on_outcome(&mut self, outcome: &FetchOutcome) {
        match outcome {
            FetchOutcome::Applied => self.fetches_applied += 1,
            FetchOutcome::Stale => self.fetches_stale += 1,
            FetchOutcome::Failed(_) => self.fetches_failed += 1,
        }
    }
}

impl Widget for &DebugState {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let buffered = self
            .buffered
            .map(|(s, e)| format!("{}..{}", s, e))
            .unwrap_or_else(|| "-".to_string());
        Paragraph::new(format!(
            "events={} keys={} last_key={} frames={} fetch issued={} applied={} stale={} failed={} in_flight={} buffer={}",
            self.num_events,
            self.num_key_events,
            self.last_key_event_name,
            self.num_frames,
            self.fetches_issued,
            self.fetches_applied,
            self.fetches_stale,
            self.fetches_failed,
            self.in_flight,
            buffered
        ))
        .render(area, buf);
    }
}

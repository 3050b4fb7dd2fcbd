//! View state: the opened dataset, scroll position, and buffer controller, with read-only
//! snapshots handed to the renderer.

use crate::buffer::{BufferController, BufferedWindow, FetchOutcome, FetchRequest, FetchResponse};
use crate::dataset::DatasetHandle;
use crate::scroll::{map_scroll_offset, max_scroll_top};
use crate::source::RowRecord;
use std::sync::Arc;

/// Tunables for one view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSettings {
    pub row_height: f64,
    pub preload_margin: usize,
    pub hysteresis_fraction: f64,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            row_height: 35.0,
            preload_margin: 10,
            hysteresis_fraction: 0.5,
        }
    }
}

/// Everything the renderer needs for one frame. Never half-updated.
#[derive(Debug, Clone)]
pub struct ViewSnapshot {
    pub visible_start: usize,
    pub visible_end: usize,
    pub total_row_count: usize,
    pub buffered: Option<Arc<BufferedWindow>>,
    pub column_names: Arc<[String]>,
    pub scroll_top: f64,
    pub row_height: f64,
}

impl ViewSnapshot {
    pub fn buffered_start(&self) -> Option<usize> {
        self.buffered.as_ref().map(|b| b.start())
    }

    pub fn buffered_rows(&self) -> &[RowRecord] {
        self.buffered.as_ref().map(|b| b.rows()).unwrap_or(&[])
    }

    /// Visible row indices paired with their buffered row, if loaded.
    pub fn visible_rows(&self) -> impl Iterator<Item = (usize, Option<&RowRecord>)> {
        let buffered = self.buffered.as_deref();
        (self.visible_start..self.visible_end).map(move |i| (i, buffered.and_then(|b| b.row(i))))
    }

    /// True when every visible row is in the buffer.
    pub fn is_fully_loaded(&self) -> bool {
        match &self.buffered {
            Some(b) => self.visible_start >= b.start() && self.visible_end <= b.end(),
            None => self.visible_start == self.visible_end,
        }
    }

    /// Scrollbar content length, in scroll units.
    pub fn content_length(&self) -> f64 {
        self.total_row_count as f64 * self.row_height
    }
}

pub struct ViewController {
    dataset: DatasetHandle,
    buffer: BufferController,
    settings: ViewSettings,
    scroll_top: f64,
    viewport_rows: usize,
    start: usize,
}

impl ViewController {
    pub fn new(dataset: DatasetHandle, settings: ViewSettings) -> Self {
        Self {
            buffer: BufferController::new(settings.hysteresis_fraction),
            dataset,
            settings,
            scroll_top: 0.0,
            viewport_rows: 0,
            start: 0,
        }
    }

    pub fn dataset(&self) -> &DatasetHandle {
        &self.dataset
    }

    pub fn buffer(&self) -> &BufferController {
        &self.buffer
    }

    pub fn settings(&self) -> ViewSettings {
        self.settings
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    pub fn viewport_rows(&self) -> usize {
        self.viewport_rows
    }

    fn total_rows(&self) -> usize {
        self.dataset.total_row_count()
    }

    fn window_size(&self) -> usize {
        self.viewport_rows.min(self.total_rows())
    }

    fn notify_buffer(&mut self) -> Option<FetchRequest> {
        let (start, size, total, margin) = (
            self.start,
            self.window_size(),
            self.total_rows(),
            self.settings.preload_margin,
        );
        self.buffer.on_visible_window_change(start, size, total, margin)
    }

    /// Scroll to an absolute offset. Returns the fetch to dispatch, if one is needed.
    pub fn handle_scroll(&mut self, scroll_top: f64) -> Option<FetchRequest> {
        let limit = max_scroll_top(self.settings.row_height, self.viewport_rows, self.total_rows());
        self.scroll_top = if scroll_top.is_nan() {
            0.0
        } else {
            scroll_top.clamp(0.0, limit)
        };
        let new_start = map_scroll_offset(
            self.scroll_top,
            self.settings.row_height,
            self.viewport_rows,
            self.total_rows(),
            self.start,
        );
        if new_start == self.start {
            return None;
        }
        self.start = new_start;
        self.notify_buffer()
    }

    pub fn scroll_by(&mut self, delta: f64) -> Option<FetchRequest> {
        self.handle_scroll(self.scroll_top + delta)
    }

    pub fn scroll_rows(&mut self, rows: isize) -> Option<FetchRequest> {
        let target = (self.start as isize).saturating_add(rows).max(0) as usize;
        self.scroll_to_row(target)
    }

    pub fn scroll_to_row(&mut self, row: usize) -> Option<FetchRequest> {
        self.handle_scroll(row as f64 * self.settings.row_height)
    }

    pub fn scroll_to_end(&mut self) -> Option<FetchRequest> {
        self.handle_scroll(f64::INFINITY)
    }

    /// New viewport height in rows (first layout or terminal resize).
    pub fn set_viewport_rows(&mut self, rows: usize) -> Option<FetchRequest> {
        if rows == self.viewport_rows && self.buffer.last_fetched_start().is_some() {
            return None;
        }
        self.viewport_rows = rows;
        let limit = max_scroll_top(self.settings.row_height, rows, self.total_rows());
        self.scroll_top = self.scroll_top.min(limit);
        self.start = map_scroll_offset(
            self.scroll_top,
            self.settings.row_height,
            rows,
            self.total_rows(),
            usize::MAX,
        );
        self.notify_buffer()
    }

    pub fn complete(&mut self, response: FetchResponse) -> FetchOutcome {
        self.buffer.complete(response)
    }

    /// Drop the buffer and ask for the current window again.
    pub fn reload(&mut self) -> Option<FetchRequest> {
        self.buffer.invalidate();
        self.notify_buffer()
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            visible_start: self.start,
            visible_end: (self.start + self.viewport_rows).min(self.total_rows()),
            total_row_count: self.total_rows(),
            buffered: self.buffer.buffered(),
            column_names: self.dataset.column_names().clone(),
            scroll_top: self.scroll_top,
            row_height: self.settings.row_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViewError;
    use crate::source::{DatasetMeta, RangeSource};
    use serde_json::Value;

    struct Counting(usize);

    impl RangeSource for Counting {
        fn describe(&self) -> Result<DatasetMeta, ViewError> {
            Ok(DatasetMeta {
                total_row_count: self.0,
                column_names: vec!["n".into()],
            })
        }

        fn fetch_range(&self, _: &[String], start: usize, end: usize) -> Result<Vec<RowRecord>, ViewError> {
            Ok((start..end)
                .map(|i| [("n", Value::from(i as u64))].into_iter().collect())
                .collect())
        }
    }

    fn view(total: usize, viewport: usize) -> (ViewController, Option<FetchRequest>) {
        let handle = DatasetHandle::from_source("mem://n", Arc::new(Counting(total))).unwrap();
        let mut v = ViewController::new(handle, ViewSettings::default());
        let first = v.set_viewport_rows(viewport);
        (v, first)
    }

    fn run(v: &mut ViewController, req: FetchRequest) -> FetchOutcome {
        let rows = v
            .dataset()
            .source()
            .fetch_range(v.dataset().column_names(), req.start(), req.end());
        v.complete(FetchResponse {
            ticket: req.ticket,
            result: rows.map(Arc::new),
        })
    }

    #[test]
    fn test_first_layout_fetches_top() {
        let (mut v, first) = view(1000, 20);
        let req = first.unwrap();
        assert_eq!((req.start(), req.end()), (0, 30));
        assert_eq!(run(&mut v, req), FetchOutcome::Applied);
        let snap = v.snapshot();
        assert_eq!((snap.visible_start, snap.visible_end), (0, 20));
        assert!(snap.is_fully_loaded());
        assert_eq!(snap.content_length(), 35_000.0);
    }

    #[test]
    fn test_scroll_within_threshold_reuses_buffer() {
        let (mut v, first) = view(1000, 20);
        run(&mut v, first.unwrap());
        assert!(v.handle_scroll(5.0 * 35.0).is_none());
        assert_eq!(v.start(), 5);
        let snap = v.snapshot();
        assert_eq!(snap.buffered_start(), Some(0));
        let shown: Vec<usize> = snap.visible_rows().map(|(i, _)| i).collect();
        assert_eq!(shown, (5..25).collect::<Vec<_>>());
        assert!(snap.visible_rows().all(|(_, r)| r.is_some()));
    }

    #[test]
    fn test_far_scroll_fetches_new_window() {
        let (mut v, first) = view(1000, 20);
        run(&mut v, first.unwrap());
        let req = v.scroll_to_row(200).unwrap();
        assert_eq!((req.start(), req.end()), (190, 230));
        // not loaded until the fetch lands
        assert!(!v.snapshot().is_fully_loaded());
        run(&mut v, req);
        let snap = v.snapshot();
        assert_eq!(snap.buffered_start(), Some(190));
        assert_eq!(snap.buffered_rows().len(), 40);
        assert!(snap.is_fully_loaded());
    }

    #[test]
    fn test_clamps_at_end() {
        let (mut v, _) = view(100, 30);
        v.handle_scroll(95.0 * 35.0);
        assert_eq!(v.start(), 70);
        assert_eq!(v.scroll_top(), 70.0 * 35.0);
        assert_eq!(v.snapshot().visible_end, 100);

        v.scroll_to_row(0);
        v.scroll_to_end();
        assert_eq!(v.start(), 70);
    }

    #[test]
    fn test_sub_row_scroll_is_noop() {
        let (mut v, first) = view(1000, 20);
        run(&mut v, first.unwrap());
        assert!(v.scroll_by(10.0).is_none());
        assert_eq!(v.start(), 0);
        assert_eq!(v.scroll_top(), 10.0);
    }

    #[test]
    fn test_scroll_rows_saturates_at_top() {
        let (mut v, _) = view(1000, 20);
        v.scroll_rows(3);
        assert_eq!(v.start(), 3);
        v.scroll_rows(-10);
        assert_eq!(v.start(), 0);
    }

    #[test]
    fn test_small_dataset() {
        let (mut v, first) = view(5, 20);
        let req = first.unwrap();
        assert_eq!((req.start(), req.end()), (0, 5));
        run(&mut v, req);
        v.scroll_to_end();
        let snap = v.snapshot();
        assert_eq!((snap.visible_start, snap.visible_end), (0, 5));
        assert!(snap.is_fully_loaded());
    }

    #[test]
    fn test_resize_keeps_position() {
        let (mut v, first) = view(1000, 20);
        run(&mut v, first.unwrap());
        if let Some(req) = v.scroll_to_row(500) {
            run(&mut v, req);
        }
        assert!(v.set_viewport_rows(20).is_none());
        v.set_viewport_rows(40);
        assert_eq!(v.start(), 500);
        assert_eq!(v.snapshot().visible_end, 540);
    }

    #[test]
    fn test_reload_refetches_current_window() {
        let (mut v, first) = view(1000, 20);
        run(&mut v, first.unwrap());
        let req = v.reload().unwrap();
        assert_eq!(req.start(), 0);
        assert!(v.snapshot().buffered.is_none());
    }
}

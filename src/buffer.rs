//! Buffered-window controller: decides when the visible window needs a new range fetch and
//! which fetch results are still relevant when they complete.
//!
//! Fetches are correlated through [`FetchTicket`]s rather than captured state. A completed
//! fetch is applied only if the buffered range desired for the *current* visible window
//! still starts where the ticket's range starts (last-one-relevant-wins), so a slow response
//! can never clobber a fresher buffer.

use crate::error::ViewError;
use crate::source::RowRecord;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Ticket ids are unique per process so a response can never match a ticket of another view.
static NEXT_TICKET_ID: AtomicU64 = AtomicU64::new(1);

/// Logical row range intended for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibleWindow {
    pub start: usize,
    pub size: usize,
}

impl VisibleWindow {
    pub fn end(&self) -> usize {
        self.start + self.size
    }
}

/// Last accepted fetch. `rows.len() == end - start` always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedWindow {
    start: usize,
    end: usize,
    rows: Vec<RowRecord>,
}

impl BufferedWindow {
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn rows(&self) -> &[RowRecord] {
        &self.rows
    }

    pub fn contains(&self, row: usize) -> bool {
        row >= self.start && row < self.end
    }

    /// Row at absolute index `row`, if buffered.
    pub fn row(&self, row: usize) -> Option<&RowRecord> {
        if self.contains(row) {
            self.rows.get(row - self.start)
        } else {
            None
        }
    }
}

/// Identifies one issued fetch and the range it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    pub id: u64,
    /// Visible start at the time the fetch was issued.
    pub visible_start: usize,
    pub buf_start: usize,
    pub buf_end: usize,
}

/// Work order for a range fetch, produced by [`BufferController::on_visible_window_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
}

impl FetchRequest {
    pub fn start(&self) -> usize {
        self.ticket.buf_start
    }

    pub fn end(&self) -> usize {
        self.ticket.buf_end
    }
}

/// A finished fetch travelling back to the controller.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub ticket: FetchTicket,
    pub result: Result<Arc<Vec<RowRecord>>, ViewError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Rows replaced the buffered window.
    Applied,
    /// The visible window moved on while the fetch was in flight; rows dropped.
    Stale,
    /// The source rejected the fetch; buffer unchanged.
    Failed(ViewError),
}

pub struct BufferController {
    visible: VisibleWindow,
    buffered: Option<Arc<BufferedWindow>>,
    last_fetched_start: Option<usize>,
    hysteresis_fraction: f64,
    total_rows: usize,
    preload_margin: usize,
    outstanding: Vec<FetchTicket>,
}

impl BufferController {
    pub fn new(hysteresis_fraction: f64) -> Self {
        Self {
            visible: VisibleWindow::default(),
            buffered: None,
            last_fetched_start: None,
            hysteresis_fraction,
            total_rows: 0,
            preload_margin: 0,
            outstanding: Vec::new(),
        }
    }

    pub fn visible(&self) -> VisibleWindow {
        self.visible
    }

    /// Published buffer; shared so readers never observe a partially replaced window.
    pub fn buffered(&self) -> Option<Arc<BufferedWindow>> {
        self.buffered.clone()
    }

    pub fn last_fetched_start(&self) -> Option<usize> {
        self.last_fetched_start
    }

    pub fn outstanding(&self) -> &[FetchTicket] {
        &self.outstanding
    }

    /// Buffered range wanted around a window starting at `start`, clamped to the dataset.
    pub fn desired_range(
        start: usize,
        window_size: usize,
        total_rows: usize,
        preload_margin: usize,
    ) -> (usize, usize) {
        let buf_start = start.saturating_sub(preload_margin).min(total_rows);
        let buf_end = start
            .saturating_add(window_size)
            .saturating_add(preload_margin)
            .min(total_rows);
        (buf_start, buf_end)
    }

    fn exceeds_hysteresis(&self, new_start: usize, window_size: usize) -> bool {
        // Compared against the start of the last *accepted* buffer, not the last issued fetch.
        match self.last_fetched_start {
            None => true,
            Some(last) => {
                let moved = new_start.abs_diff(last) as f64;
                moved > window_size as f64 * self.hysteresis_fraction
            }
        }
    }

    /// Record the new visible window and decide whether a fetch is needed.
    pub fn on_visible_window_change(
        &mut self,
        new_start: usize,
        window_size: usize,
        total_rows: usize,
        preload_margin: usize,
    ) -> Option<FetchRequest> {
        self.visible = VisibleWindow {
            start: new_start,
            size: window_size,
        };
        self.total_rows = total_rows;
        self.preload_margin = preload_margin;

        if !self.exceeds_hysteresis(new_start, window_size) {
            return None;
        }

        let (buf_start, buf_end) =
            Self::desired_range(new_start, window_size, total_rows, preload_margin);

        if self
            .outstanding
            .iter()
            .any(|t| t.buf_start == buf_start && t.buf_end == buf_end)
        {
            log::trace!("rows {}..{} already in flight", buf_start, buf_end);
            return None;
        }

        let ticket = FetchTicket {
            id: NEXT_TICKET_ID.fetch_add(1, Ordering::Relaxed),
            visible_start: new_start,
            buf_start,
            buf_end,
        };
        self.outstanding.push(ticket);
        log::debug!(
            "fetch #{} issued for rows {}..{} (visible start {})",
            ticket.id,
            buf_start,
            buf_end,
            new_start
        );
        Some(FetchRequest { ticket })
    }

    /// Apply or discard a finished fetch.
    pub fn complete(&mut self, response: FetchResponse) -> FetchOutcome {
        let ticket = response.ticket;
        let before = self.outstanding.len();
        self.outstanding.retain(|t| t.id != ticket.id);
        if self.outstanding.len() == before {
            // issued before invalidate() or by another controller
            log::debug!("fetch #{} is not outstanding; dropped", ticket.id);
            return FetchOutcome::Stale;
        }

        let rows = match response.result {
            Ok(rows) => rows,
            Err(e) => {
                log::warn!("fetch #{} failed: {}", ticket.id, e);
                return FetchOutcome::Failed(e);
            }
        };

        let (expected_start, _) = Self::desired_range(
            self.visible.start,
            self.visible.size,
            self.total_rows,
            self.preload_margin,
        );
        if expected_start != ticket.buf_start {
            log::debug!(
                "fetch #{} for rows {}..{} is stale (now want start {})",
                ticket.id,
                ticket.buf_start,
                ticket.buf_end,
                expected_start
            );
            return FetchOutcome::Stale;
        }

        let requested = ticket.buf_end - ticket.buf_start;
        let mut rows = Arc::try_unwrap(rows).unwrap_or_else(|shared| (*shared).clone());
        if rows.len() != requested {
            log::debug!(
                "fetch #{} returned {} rows for a {}-row range",
                ticket.id,
                rows.len(),
                requested
            );
            rows.truncate(requested);
        }
        let end = ticket.buf_start + rows.len();

        self.buffered = Some(Arc::new(BufferedWindow {
            start: ticket.buf_start,
            end,
            rows,
        }));
        self.last_fetched_start = Some(ticket.visible_start);
        log::debug!("fetch #{} applied: rows {}..{}", ticket.id, ticket.buf_start, end);
        FetchOutcome::Applied
    }

    /// Forget the buffer, the hysteresis marker and in-flight tickets (their responses become stale).
    pub fn invalidate(&mut self) {
        self.buffered = None;
        self.last_fetched_start = None;
        self.outstanding.clear();
    }
}

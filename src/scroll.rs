//! Maps a raw scroll offset to the first visible row.

/// Convert `scroll_top` (in scroll units, `row_height` units per row) into the first visible row.
///
/// Returns `previous_start` untouched when the offset still falls on the same row, so sub-row
/// scroll deltas cause no downstream work. Otherwise the row is clamped into
/// `[0, max(0, total_rows - viewport_rows)]`. Negative or NaN offsets map to row 0.
pub fn map_scroll_offset(
    scroll_top: f64,
    row_height: f64,
    viewport_rows: usize,
    total_rows: usize,
    previous_start: usize,
) -> usize {
    let row_height = if row_height.is_nan() || row_height <= 0.0 {
        1.0
    } else {
        row_height
    };
    let target_start = if scroll_top.is_nan() || scroll_top <= 0.0 {
        0
    } else {
        // float to int casts saturate, so +inf lands on usize::MAX and is clamped below
        (scroll_top / row_height).floor() as usize
    };

    if target_start == previous_start {
        return previous_start;
    }

    target_start.min(max_start(viewport_rows, total_rows))
}

/// Largest valid first-visible row for a viewport of `viewport_rows` rows.
pub fn max_start(viewport_rows: usize, total_rows: usize) -> usize {
    total_rows.saturating_sub(viewport_rows)
}

/// Largest scroll offset that still maps to a valid first row.
pub fn max_scroll_top(row_height: f64, viewport_rows: usize, total_rows: usize) -> f64 {
    max_start(viewport_rows, total_rows) as f64 * row_height.max(0.0)
}

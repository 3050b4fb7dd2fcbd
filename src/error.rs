//! Error taxonomy for opening a dataset and fetching row ranges.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ViewError {
    /// The dataset could not be opened or its metadata could not be read. Fatal to the view.
    #[error("Could not open {url}: {message}")]
    SourceUnavailable { url: String, message: String },

    /// A single range fetch failed. The buffer keeps its last good value.
    #[error("Failed to load rows {start}–{end}: {message}")]
    FetchFailed {
        start: usize,
        end: usize,
        message: String,
    },
}

impl ViewError {
    pub fn source_unavailable(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn fetch_failed(start: usize, end: usize, message: impl Into<String>) -> Self {
        Self::FetchFailed {
            start,
            end,
            message: message.into(),
        }
    }

    /// True when the whole view is unusable (as opposed to a transient fetch failure).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. })
    }
}

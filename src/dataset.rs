//! Opening a dataset: one metadata read up front, then a cheap handle shared with fetch workers.

use crate::error::ViewError;
use crate::lazy_source::LazySource;
use crate::source::RangeSource;
use crate::OpenOptions;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Opened source plus its metadata. Immutable; clones share the source.
#[derive(Clone)]
pub struct DatasetHandle {
    source: Arc<dyn RangeSource>,
    url: String,
    total_row_count: usize,
    column_names: Arc<[String]>,
}

impl fmt::Debug for DatasetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetHandle")
            .field("url", &self.url)
            .field("total_row_count", &self.total_row_count)
            .field("column_names", &self.column_names)
            .finish()
    }
}

impl DatasetHandle {
    /// Read metadata from an already-constructed source.
    pub fn from_source(
        url: impl Into<String>,
        source: Arc<dyn RangeSource>,
    ) -> Result<Self, ViewError> {
        let url = url.into();
        let meta = source.describe()?;
        let mut seen = HashSet::new();
        if let Some(dup) = meta.column_names.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(ViewError::source_unavailable(
                url,
                format!("Duplicate column name: {}", dup),
            ));
        }
        Ok(Self {
            source,
            url,
            total_row_count: meta.total_row_count,
            column_names: meta.column_names.into(),
        })
    }

    /// Restrict the columns fetched and displayed. Order follows `columns`.
    pub fn with_columns(mut self, columns: &[String]) -> Result<Self, ViewError> {
        if columns.is_empty() {
            return Ok(self);
        }
        let mut seen = HashSet::new();
        for c in columns {
            if !self.column_names.contains(c) {
                return Err(ViewError::source_unavailable(
                    &self.url,
                    format!("Column not found: {}", c),
                ));
            }
            if !seen.insert(c.as_str()) {
                return Err(ViewError::source_unavailable(
                    &self.url,
                    format!("Column listed twice: {}", c),
                ));
            }
        }
        self.column_names = columns.to_vec().into();
        Ok(self)
    }

    pub fn source(&self) -> &Arc<dyn RangeSource> {
        &self.source
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn total_row_count(&self) -> usize {
        self.total_row_count
    }

    pub fn column_names(&self) -> &Arc<[String]> {
        &self.column_names
    }
}

/// Open `url` (local path, http(s), s3, gs) and read its metadata. One attempt, no retry.
pub fn open_dataset(url: &str, options: &OpenOptions) -> Result<DatasetHandle, ViewError> {
    log::info!("opening {}", url);
    let source = LazySource::scan(url, options)?;
    let handle = DatasetHandle::from_source(url, Arc::new(source))?;
    let handle = match &options.columns {
        Some(columns) => handle.with_columns(columns)?,
        None => handle,
    };
    log::info!(
        "opened {}: {} rows, {} columns",
        url,
        handle.total_row_count(),
        handle.column_names().len()
    );
    Ok(handle)
}

//! Range sources: anything that can report dataset metadata and return rows for an index range.
//!
//! Also classifies the user-supplied location as local path or remote URL (S3, GCS, HTTP/HTTPS).

use crate::error::ViewError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Dataset-level metadata reported by a [`RangeSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetMeta {
    pub total_row_count: usize,
    pub column_names: Vec<String>,
}

/// One fetched row: column name to cell value. Immutable once fetched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RowRecord(Map<String, Value>);

impl RowRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.0.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Cell rendered as text: strings unquoted, null and missing columns empty.
    pub fn cell_text(&self, column: &str) -> String {
        match self.0.get(column) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for RowRecord {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Random-access row source. Calls may run concurrently from worker threads and may
/// complete in any order.
pub trait RangeSource: Send + Sync {
    /// Row count and column names. Fails with [`ViewError::SourceUnavailable`].
    fn describe(&self) -> Result<DatasetMeta, ViewError>;

    /// Rows `[start, end)` restricted to `columns`. Fails with [`ViewError::FetchFailed`].
    fn fetch_range(
        &self,
        columns: &[String],
        start: usize,
        end: usize,
    ) -> Result<Vec<RowRecord>, ViewError>;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum InputSource {
    Local(PathBuf),
    S3(String),
    Gcs(String),
    Http(String),
}

/// Classifies the location as local, S3, GCS, or HTTP/HTTPS using string parsing only (no filesystem calls).
pub(crate) fn input_source(location: &str) -> InputSource {
    if let Some(after_scheme) = location.find("://") {
        let prefix = location[..after_scheme].to_lowercase();
        let rest = location[after_scheme + 3..].to_string();
        if prefix == "s3" || prefix == "s3a" {
            return InputSource::S3(rest);
        }
        if prefix == "gs" || prefix == "gcs" {
            return InputSource::Gcs(rest);
        }
        if prefix == "http" || prefix == "https" {
            return InputSource::Http(location.to_string());
        }
    }
    InputSource::Local(PathBuf::from(location))
}

/// Content length of an HTTP(S) object from a HEAD request; None when unknown or unreachable.
#[cfg(feature = "http")]
pub(crate) fn remote_size(url: &str) -> Option<u64> {
    let response = ureq::request("HEAD", url)
        .timeout(std::time::Duration::from_secs(15))
        .call();
    match response {
        Ok(r) => r
            .header("Content-Length")
            .and_then(|s| s.parse::<u64>().ok()),
        Err(e) => {
            log::debug!("HEAD {} failed: {}", url, e);
            None
        }
    }
}

#[cfg(not(feature = "http"))]
pub(crate) fn remote_size(_url: &str) -> Option<u64> {
    None
}

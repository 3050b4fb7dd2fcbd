//! Polars-backed [`RangeSource`]: scans Parquet lazily so a range fetch only reads the
//! row groups that overlap the requested slice.

use crate::error::ViewError;
use crate::error_display::user_message_from_polars;
use crate::source::{input_source, DatasetMeta, InputSource, RangeSource, RowRecord};
use crate::OpenOptions;
use polars::prelude::*;
use serde_json::Value;

#[cfg(feature = "cloud")]
use polars::io::cloud::{AmazonS3ConfigKey, CloudOptions};

pub struct LazySource {
    lf: LazyFrame,
    url: String,
}

impl LazySource {
    /// Wrap an existing LazyFrame (in-memory data, or a scan built elsewhere).
    pub fn from_lazyframe(lf: LazyFrame, url: impl Into<String>) -> Self {
        Self {
            lf,
            url: url.into(),
        }
    }

    /// Build a lazy Parquet scan for a local path or remote URL. No data is read yet.
    pub fn scan(url: &str, options: &OpenOptions) -> Result<Self, ViewError> {
        let unavailable = |e: PolarsError| ViewError::source_unavailable(url, user_message_from_polars(&e));
        let lf = match input_source(url) {
            InputSource::Local(path) => {
                if !path.exists() {
                    return Err(ViewError::source_unavailable(url, "File not found."));
                }
                let pl_path = PlPath::Local(path.as_path().into());
                LazyFrame::scan_parquet(pl_path, ScanArgsParquet::default()).map_err(unavailable)?
            }
            InputSource::Http(full) => {
                #[cfg(feature = "http")]
                {
                    LazyFrame::scan_parquet(PlPath::new(&full), ScanArgsParquet::default())
                        .map_err(unavailable)?
                }
                #[cfg(not(feature = "http"))]
                {
                    let _ = full;
                    return Err(ViewError::source_unavailable(
                        url,
                        "HTTP/HTTPS URLs are not supported in this build. Rebuild with default features.",
                    ));
                }
            }
            InputSource::S3(rest) => {
                #[cfg(feature = "cloud")]
                {
                    let full = format!("s3://{rest}");
                    let args = ScanArgsParquet {
                        cloud_options: Some(build_s3_cloud_options(options)),
                        ..Default::default()
                    };
                    LazyFrame::scan_parquet(PlPath::new(&full), args).map_err(|e| {
                        ViewError::source_unavailable(
                            url,
                            format!(
                                "Could not read from S3. Check credentials and URL: {}",
                                user_message_from_polars(&e)
                            ),
                        )
                    })?
                }
                #[cfg(not(feature = "cloud"))]
                {
                    let _ = rest;
                    return Err(ViewError::source_unavailable(
                        url,
                        "S3 is not supported in this build. Rebuild with default features.",
                    ));
                }
            }
            InputSource::Gcs(rest) => {
                #[cfg(feature = "cloud")]
                {
                    let full = format!("gs://{rest}");
                    let args = ScanArgsParquet {
                        cloud_options: Some(CloudOptions::default()),
                        ..Default::default()
                    };
                    LazyFrame::scan_parquet(PlPath::new(&full), args).map_err(|e| {
                        ViewError::source_unavailable(
                            url,
                            format!(
                                "Could not read from GCS. Check credentials and URL: {}",
                                user_message_from_polars(&e)
                            ),
                        )
                    })?
                }
                #[cfg(not(feature = "cloud"))]
                {
                    let _ = rest;
                    return Err(ViewError::source_unavailable(
                        url,
                        "GCS (gs://) is not supported in this build. Rebuild with default features.",
                    ));
                }
            }
        };
        #[cfg(not(feature = "cloud"))]
        let _ = options;
        Ok(Self::from_lazyframe(lf, url))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RangeSource for LazySource {
    fn describe(&self) -> Result<DatasetMeta, ViewError> {
        let unavailable =
            |e: PolarsError| ViewError::source_unavailable(&self.url, user_message_from_polars(&e));

        let schema = self.lf.clone().collect_schema().map_err(unavailable)?;
        let column_names: Vec<String> = schema.iter_names().map(|s| s.to_string()).collect();

        // Parquet answers len() from the footer without touching row groups.
        let counted = self
            .lf
            .clone()
            .select([len()])
            .collect()
            .map_err(unavailable)?;
        let total_row_count = counted
            .get_columns()
            .first()
            .and_then(|c| c.get(0).ok())
            .and_then(|v| v.extract::<u64>())
            .ok_or_else(|| ViewError::source_unavailable(&self.url, "Could not read row count."))?
            as usize;

        Ok(DatasetMeta {
            total_row_count,
            column_names,
        })
    }

    fn fetch_range(
        &self,
        columns: &[String],
        start: usize,
        end: usize,
    ) -> Result<Vec<RowRecord>, ViewError> {
        let len = end.saturating_sub(start);
        if len == 0 {
            return Ok(Vec::new());
        }
        let exprs: Vec<Expr> = columns.iter().map(|name| col(name.as_str())).collect();
        let df = self
            .lf
            .clone()
            .select(exprs)
            .slice(start as i64, len as IdxSize)
            .collect()
            .map_err(|e| ViewError::fetch_failed(start, end, user_message_from_polars(&e)))?;
        Ok(dataframe_to_rows(&df))
    }
}

#[cfg(feature = "cloud")]
fn build_s3_cloud_options(options: &OpenOptions) -> CloudOptions {
    let mut opts = CloudOptions::default();
    let mut configs: Vec<(AmazonS3ConfigKey, String)> = Vec::new();
    if let Some(e) = &options.s3_endpoint_url {
        configs.push((AmazonS3ConfigKey::Endpoint, e.clone()));
    }
    if let Some(k) = &options.s3_access_key_id {
        configs.push((AmazonS3ConfigKey::AccessKeyId, k.clone()));
    }
    if let Some(s) = &options.s3_secret_access_key {
        configs.push((AmazonS3ConfigKey::SecretAccessKey, s.clone()));
    }
    if let Some(r) = &options.s3_region {
        configs.push((AmazonS3ConfigKey::Region, r.clone()));
    }
    if !configs.is_empty() {
        opts = opts.with_aws(configs);
    }
    opts
}

/// Convert every row of `df` into a [`RowRecord`] keyed by column name.
pub fn dataframe_to_rows(df: &DataFrame) -> Vec<RowRecord> {
    let columns = df.get_columns();
    (0..df.height())
        .map(|row| {
            columns
                .iter()
                .map(|c| {
                    let value = c
                        .get(row)
                        .map(|v| any_value_to_json(&v))
                        .unwrap_or(Value::Null);
                    (c.name().to_string(), value)
                })
                .collect()
        })
        .collect()
}

/// Cell value as JSON. Numbers and booleans keep their type; everything else is displayed as text.
pub fn any_value_to_json(value: &AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(*b),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        AnyValue::Int32(v) => Value::from(*v),
        AnyValue::Int64(v) => Value::from(*v),
        AnyValue::UInt32(v) => Value::from(*v),
        AnyValue::UInt64(v) => Value::from(*v),
        AnyValue::Float32(v) => float_to_json(*v as f64),
        AnyValue::Float64(v) => float_to_json(*v),
        other => Value::String(other.to_string()),
    }
}

fn float_to_json(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

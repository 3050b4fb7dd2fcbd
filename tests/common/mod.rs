#![allow(dead_code)]

use polars::prelude::*;
use rowpeek::{DatasetMeta, RangeSource, RowRecord, ViewError};
use serde_json::Value;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// `rows` rows of (id, title, views) with predictable values.
pub fn wiki_frame(rows: usize) -> DataFrame {
    df!(
        "id" => (0..rows as i64).collect::<Vec<i64>>(),
        "title" => (0..rows).map(|i| format!("Article {}", i)).collect::<Vec<String>>(),
        "views" => (0..rows).map(|i| (i * 7 % 1000) as i64).collect::<Vec<i64>>()
    )
    .unwrap()
}

/// Write `wiki_frame(rows)` as Parquet into `dir` with small row groups so range reads
/// only touch part of the file.
pub fn write_wiki_parquet(dir: &Path, rows: usize) -> PathBuf {
    let path = dir.join("wiki.parquet");
    let mut df = wiki_frame(rows);
    let file = File::create(&path).unwrap();
    ParquetWriter::new(file)
        .with_row_group_size(Some(128))
        .finish(&mut df)
        .unwrap();
    path
}

/// In-memory source that records every fetch and can be told to fail.
pub struct ScriptedSource {
    pub total: usize,
    pub columns: Vec<String>,
    pub fetches: Mutex<Vec<(usize, usize)>>,
    pub fail_next: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            columns: vec!["id".into(), "title".into()],
            fetches: Mutex::new(Vec::new()),
            fail_next: AtomicUsize::new(0),
        }
    }

    /// Fail the next `n` fetches.
    pub fn fail(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn fetch_log(&self) -> Vec<(usize, usize)> {
        self.fetches.lock().unwrap().clone()
    }
}

impl RangeSource for ScriptedSource {
    fn describe(&self) -> std::result::Result<DatasetMeta, ViewError> {
        Ok(DatasetMeta {
            total_row_count: self.total,
            column_names: self.columns.clone(),
        })
    }

    fn fetch_range(
        &self,
        _columns: &[String],
        start: usize,
        end: usize,
    ) -> std::result::Result<Vec<RowRecord>, ViewError> {
        self.fetches.lock().unwrap().push((start, end));
        let failing = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ViewError::fetch_failed(start, end, "connection reset"));
        }
        Ok((start..end.min(self.total))
            .map(|i| {
                [
                    ("id", Value::from(i as u64)),
                    ("title", Value::String(format!("Article {}", i))),
                ]
                .into_iter()
                .collect()
            })
            .collect())
    }
}

//! Shared CLI definitions for rowpeek.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use clap::{CommandFactory, Parser};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Half-open row range `[start, end)` given on the command line as `START:END`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
}

impl RowRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl FromStr for RowRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once(':')
            .ok_or_else(|| format!("expected START:END, got '{}'", s))?;
        let start: usize = start
            .trim()
            .parse()
            .map_err(|_| format!("invalid range start '{}'", start))?;
        let end: usize = end
            .trim()
            .parse()
            .map_err(|_| format!("invalid range end '{}'", end))?;
        if end < start {
            return Err(format!("range end {} is before start {}", end, start));
        }
        Ok(Self { start, end })
    }
}

impl fmt::Display for RowRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// Command-line arguments for rowpeek
#[derive(Clone, Parser, Debug)]
#[command(
    name = "rowpeek",
    version,
    about = "Scroll through huge remote Parquet datasets in the terminal",
    long_about = "Opens a Parquet dataset (local path, http(s)://, s3:// or gs://) and \
                  fetches only the rows around the visible window while you scroll."
)]
pub struct Args {
    /// Location of the dataset: local path, http(s):// URL, s3://bucket/key or gs://bucket/key
    #[arg(required_unless_present = "generate_config", value_name = "URL")]
    pub url: Option<String>,

    /// Scroll units per row; the mouse wheel and keys move the scroll offset in these units (default: 35)
    #[arg(long = "row-height", value_name = "UNITS")]
    pub row_height: Option<f64>,

    /// Extra rows fetched beyond the visible window on each side (default: 10)
    #[arg(long = "preload-margin", value_name = "ROWS")]
    pub preload_margin: Option<usize>,

    /// Fraction of the window height the view must move before a new fetch is issued (default: 0.5)
    #[arg(long = "hysteresis-fraction", value_name = "FRACTION")]
    pub hysteresis_fraction: Option<f64>,

    /// Only fetch and show these columns (comma separated). Default: all columns
    #[arg(long = "columns", value_name = "COLS", value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Display row numbers on the left side of the table
    #[arg(long = "row-numbers", action)]
    pub row_numbers: bool,

    /// Starting index for row numbers (default: 0)
    #[arg(long = "row-start-index")]
    pub row_start_index: Option<usize>,

    /// Fetch rows START:END, print them as JSON lines to stdout and exit
    #[arg(long = "print-range", value_name = "START:END")]
    pub print_range: Option<RowRange>,

    /// Enable debug mode to show fetch counters and buffer state
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Write log output to this file (level from RUST_LOG, default: info)
    #[arg(long = "log", value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Generate default configuration file at ~/.config/rowpeek/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,

    /// S3-compatible endpoint URL (overrides config and AWS_ENDPOINT_URL). Example: http://localhost:9000
    #[arg(long = "s3-endpoint-url", value_name = "URL")]
    pub s3_endpoint_url: Option<String>,

    /// S3 access key (overrides config and AWS_ACCESS_KEY_ID)
    #[arg(long = "s3-access-key-id", value_name = "KEY")]
    pub s3_access_key_id: Option<String>,

    /// S3 secret key (overrides config and AWS_SECRET_ACCESS_KEY)
    #[arg(long = "s3-secret-access-key", value_name = "SECRET")]
    pub s3_secret_access_key: Option<String>,

    /// S3 region (overrides config and AWS_REGION). Example: us-east-1
    #[arg(long = "s3-region", value_name = "REGION")]
    pub s3_region: Option<String>,
}

/// Escape `|` and newlines for use in markdown table cells.
fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

fn value_placeholder(arg: &clap::Arg) -> String {
    arg.get_value_names()
        .map(|names| {
            names
                .iter()
                .map(|n: &clap::builder::Str| format!("<{}>", n.as_ref() as &str))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

/// Render command-line options as markdown.
///
/// Used by the gen_docs binary; output is written to stdout.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = String::from("# Command Line Options\n\n");

    out.push_str("## Usage\n\n```\n");
    let usage = cmd.render_usage();
    out.push_str(&usage.to_string());
    out.push_str("\n```\n\n");

    out.push_str("## Options\n\n");
    out.push_str("| Option | Description |\n");
    out.push_str("|--------|-------------|\n");

    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_ref().to_string();
        if id == "help" || id == "version" {
            continue;
        }

        let option_str = if arg.is_positional() {
            let placeholder = value_placeholder(arg);
            if arg.is_required_set() {
                placeholder
            } else {
                format!("[{placeholder}]")
            }
        } else {
            let mut parts = Vec::new();
            if let Some(s) = arg.get_short() {
                parts.push(format!("-{s}"));
            }
            if let Some(l) = arg.get_long() {
                parts.push(format!("--{l}"));
            }
            let op = parts.join(", ");
            let placeholder = if arg.get_action().takes_values() {
                value_placeholder(arg)
            } else {
                String::new()
            };
            if placeholder.is_empty() {
                op
            } else {
                format!("{op} {placeholder}")
            }
        };

        let help = arg
            .get_help()
            .map(|h| escape_table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!("| `{option_str}` | {help} |\n"));
    }

    out
}

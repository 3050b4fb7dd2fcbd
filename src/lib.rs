use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use std::io::Write;
use std::sync::mpsc::Sender;

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph};

pub mod buffer;
pub mod config;
pub mod dataset;
pub mod error;
pub mod error_display;
pub mod fetch;
pub mod lazy_source;
pub mod scroll;
pub mod source;
pub mod view;
pub mod widgets;

pub use buffer::{
    BufferController, BufferedWindow, FetchOutcome, FetchRequest, FetchResponse, FetchTicket,
    VisibleWindow,
};
pub use config::{
    rgb_to_256_color, rgb_to_basic_ansi, AppConfig, ColorParser, ConfigManager, Theme,
};
pub use dataset::{open_dataset, DatasetHandle};
pub use error::ViewError;
pub use lazy_source::LazySource;
pub use rowpeek_cli::{Args, RowRange};
pub use scroll::map_scroll_offset;
pub use source::{DatasetMeta, RangeSource, RowRecord};
pub use view::{ViewController, ViewSettings, ViewSnapshot};

use widgets::controls::Controls;
use widgets::datatable::WindowTable;
use widgets::debug::DebugState;

/// Application name used for the config directory and other app-specific paths
pub const APP_NAME: &str = "rowpeek";

#[derive(Default, Clone, Debug)]
pub struct OpenOptions {
    /// Restrict fetched columns; `None` means all columns in dataset order.
    pub columns: Option<Vec<String>>,
    pub s3_endpoint_url: Option<String>,
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    pub s3_region: Option<String>,
    pub view: ViewSettings,
    pub row_numbers: bool,
    pub row_start_index: usize,
    pub debug: bool,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn with_view(mut self, view: ViewSettings) -> Self {
        self.view = view;
        self
    }

    /// Create OpenOptions from CLI args and config, with CLI args taking precedence.
    ///
    /// The display tunables are validated after the CLI overrides are applied.
    pub fn from_args_and_config(args: &Args, config: &AppConfig) -> Result<Self> {
        let mut display = config.display.clone();
        if let Some(row_height) = args.row_height {
            display.row_height = row_height;
        }
        if let Some(preload_margin) = args.preload_margin {
            display.preload_margin = preload_margin;
        }
        if let Some(hysteresis_fraction) = args.hysteresis_fraction {
            display.hysteresis_fraction = hysteresis_fraction;
        }
        if let Some(row_start_index) = args.row_start_index {
            display.row_start_index = row_start_index;
        }
        display.row_numbers |= args.row_numbers;
        display
            .validate()
            .wrap_err("Invalid display option on the command line or in the config file")?;

        let cloud = &config.cloud;
        Ok(Self {
            columns: if args.columns.is_empty() {
                None
            } else {
                Some(args.columns.clone())
            },
            s3_endpoint_url: args
                .s3_endpoint_url
                .clone()
                .or_else(|| cloud.s3_endpoint_url.clone()),
            s3_access_key_id: args
                .s3_access_key_id
                .clone()
                .or_else(|| cloud.s3_access_key_id.clone()),
            s3_secret_access_key: args
                .s3_secret_access_key
                .clone()
                .or_else(|| cloud.s3_secret_access_key.clone()),
            s3_region: args.s3_region.clone().or_else(|| cloud.s3_region.clone()),
            view: ViewSettings {
                row_height: display.row_height,
                preload_margin: display.preload_margin,
                hysteresis_fraction: display.hysteresis_fraction,
            },
            row_numbers: display.row_numbers,
            row_start_index: display.row_start_index,
            debug: args.debug || config.debug.enabled,
        })
    }
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Open(String, OpenOptions),
    LoadingPhase(String, u16),
    /// Remote object size in bytes, when known.
    LoadingSize(u64),
    DatasetOpened(Result<DatasetHandle, ViewError>),
    RowsFetched(FetchResponse),
    Exit,
    /// Unrecoverable failure outside the view (e.g. a worker could not start).
    Crash(String),
    Resize(u16, u16), // resized (width, height)
}

#[derive(Default)]
pub struct ErrorModal {
    pub active: bool,
    pub message: String,
}

impl ErrorModal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, message: String) {
        self.active = true;
        self.message = message;
    }

    pub fn hide(&mut self) {
        self.active = false;
        self.message.clear();
    }
}

#[derive(Clone, Debug, Default)]
pub enum LoadingState {
    #[default]
    Idle,
    Loading {
        url: String,
        size: Option<u64>,
        current_phase: String,
        progress_percent: u16,
    },
}

impl LoadingState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadingState::Loading { .. })
    }
}

fn format_bytes(n: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", n, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

pub struct App {
    view: Option<ViewController>,
    options: OpenOptions,
    events: Sender<AppEvent>,
    debug: DebugState,
    error_modal: ErrorModal,
    /// Transient status-bar message (non-fatal fetch failures).
    notice: Option<String>,
    loading_state: LoadingState,
    theme: Theme,
    config: AppConfig,
    throbber_frame: u8,
}

impl App {
    fn render_loading_gauge(loading_state: &LoadingState, area: Rect, buf: &mut Buffer) {
        if let LoadingState::Loading {
            url,
            size,
            current_phase,
            progress_percent,
        } = loading_state
        {
            let gauge_width = ((area.width as f64 * 0.5) as u16).max(30).min(area.width);
            let gauge_height = 5u16;

            let center_layout = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Fill(1),
                    Constraint::Length(gauge_height),
                    Constraint::Fill(1),
                ])
                .split(area);

            let gauge_area_layout = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Fill(1),
                    Constraint::Length(gauge_width),
                    Constraint::Fill(1),
                ])
                .split(center_layout[1]);

            let title = match size {
                Some(bytes) => format!("Loading {} ({})", url, format_bytes(*bytes)),
                None => format!("Loading {}", url),
            };
            Gauge::default()
                .block(Block::default().borders(Borders::ALL).title(title))
                .percent(*progress_percent)
                .label(current_phase.clone())
                .render(gauge_area_layout[1], buf);
        }
    }

    pub fn new(events: Sender<AppEvent>) -> App {
        Self::new_with_config(events, Theme::default(), AppConfig::default())
    }

    pub fn new_with_config(events: Sender<AppEvent>, theme: Theme, app_config: AppConfig) -> App {
        let debug = DebugState {
            enabled: app_config.debug.enabled,
            ..DebugState::default()
        };
        Self {
            view: None,
            options: OpenOptions::default(),
            events,
            debug,
            error_modal: ErrorModal::new(),
            notice: None,
            loading_state: LoadingState::Idle,
            theme,
            config: app_config,
            throbber_frame: 0,
        }
    }

    pub fn enable_debug(&mut self) {
        self.debug.enabled = true;
    }

    pub fn view(&self) -> Option<&ViewController> {
        self.view.as_ref()
    }

    pub fn snapshot(&self) -> Option<ViewSnapshot> {
        self.view.as_ref().map(|v| v.snapshot())
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_modal
            .active
            .then_some(self.error_modal.message.as_str())
    }

    pub fn loading_state(&self) -> &LoadingState {
        &self.loading_state
    }

    pub fn debug_state(&self) -> &DebugState {
        &self.debug
    }

    fn color(&self, name: &str) -> ratatui::style::Color {
        self.theme.get(name)
    }

    /// True while something is in flight (open or range fetch).
    pub fn is_busy(&self) -> bool {
        self.loading_state.is_loading()
            || self
                .view
                .as_ref()
                .is_some_and(|v| !v.buffer().outstanding().is_empty())
    }

    fn dispatch(&mut self, request: Option<FetchRequest>) {
        let (Some(request), Some(view)) = (request, self.view.as_ref()) else {
            return;
        };
        self.debug.fetches_issued += 1;
        fetch::spawn_fetch(view.dataset(), request, self.events.clone());
    }

    /// Tell the view how many table rows fit on screen.
    pub fn set_viewport_rows(&mut self, rows: usize) {
        let request = self.view.as_mut().and_then(|v| v.set_viewport_rows(rows));
        self.dispatch(request);
    }

    fn scroll(&mut self, f: impl FnOnce(&mut ViewController) -> Option<FetchRequest>) {
        let request = self.view.as_mut().and_then(f);
        self.dispatch(request);
    }

    fn page_rows(&self) -> isize {
        self.view
            .as_ref()
            .map(|v| v.viewport_rows().max(1) as isize)
            .unwrap_or(1)
    }

    fn key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        self.debug.on_key(event);

        if self.error_modal.active {
            match event.code {
                KeyCode::Esc | KeyCode::Enter => self.error_modal.hide(),
                KeyCode::Char('q') => return Some(AppEvent::Exit),
                _ => {}
            }
            return None;
        }

        self.notice = None;
        let page = self.page_rows();
        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
        match event.code {
            KeyCode::Char('q') | KeyCode::Esc => return Some(AppEvent::Exit),
            KeyCode::Char('c') if ctrl => return Some(AppEvent::Exit),
            KeyCode::Char('j') | KeyCode::Down => self.scroll(|v| v.scroll_rows(1)),
            KeyCode::Char('k') | KeyCode::Up => self.scroll(|v| v.scroll_rows(-1)),
            KeyCode::Char('d') if ctrl => self.scroll(|v| v.scroll_rows(page / 2)),
            KeyCode::Char('u') if ctrl => self.scroll(|v| v.scroll_rows(-(page / 2))),
            KeyCode::PageDown | KeyCode::Char(' ') => self.scroll(|v| v.scroll_rows(page)),
            KeyCode::PageUp => self.scroll(|v| v.scroll_rows(-page)),
            KeyCode::Char('g') | KeyCode::Home => self.scroll(|v| v.scroll_to_row(0)),
            KeyCode::Char('G') | KeyCode::End => self.scroll(|v| v.scroll_to_end()),
            KeyCode::Char('r') => self.options.row_numbers = !self.options.row_numbers,
            KeyCode::Char('R') => self.scroll(|v| v.reload()),
            _ => {}
        }
        None
    }

    fn mouse(&mut self, event: &MouseEvent) {
        let step = self.config.performance.scroll_step;
        match event.kind {
            MouseEventKind::ScrollDown => self.scroll(|v| v.scroll_by(step)),
            MouseEventKind::ScrollUp => self.scroll(|v| v.scroll_by(-step)),
            _ => {}
        }
    }

    fn open(&mut self, url: &str, options: &OpenOptions) {
        self.view = None;
        self.notice = None;
        self.error_modal.hide();
        self.options = options.clone();
        if options.debug {
            self.enable_debug();
        }
        self.set_loading_phase(url, "Opening", 10);
        fetch::spawn_open(url.to_string(), options.clone(), self.events.clone());
    }

    fn set_loading_phase(&mut self, url: &str, phase: &str, percent: u16) {
        let size = match &self.loading_state {
            LoadingState::Loading { size, .. } => *size,
            LoadingState::Idle => None,
        };
        self.loading_state = LoadingState::Loading {
            url: url.to_string(),
            size,
            current_phase: phase.to_string(),
            progress_percent: percent.min(100),
        };
    }

    fn dataset_opened(&mut self, result: std::result::Result<DatasetHandle, ViewError>) {
        self.loading_state = LoadingState::Idle;
        match result {
            Ok(handle) => {
                self.view = Some(ViewController::new(handle, self.options.view));
            }
            Err(e) => {
                log::error!("{}", e);
                self.error_modal.show(e.to_string());
            }
        }
    }

    fn rows_fetched(&mut self, response: FetchResponse) {
        let Some(view) = self.view.as_mut() else {
            return;
        };
        let outcome = view.complete(response);
        self.debug.on_outcome(&outcome);
        match outcome {
            FetchOutcome::Applied => self.notice = None,
            FetchOutcome::Stale => {}
            FetchOutcome::Failed(e) => self.notice = Some(e.to_string()),
        }
    }

    /// Handle one event. Takes ownership so fetched rows move into the buffer without a copy.
    pub fn event(&mut self, event: AppEvent) -> Option<AppEvent> {
        self.debug.num_events += 1;

        match event {
            AppEvent::Key(key) => self.key(&key),
            AppEvent::Mouse(mouse) => {
                self.mouse(&mouse);
                None
            }
            AppEvent::Open(url, options) => {
                self.open(&url, &options);
                None
            }
            AppEvent::LoadingPhase(phase, percent) => {
                if let LoadingState::Loading { url, .. } = &self.loading_state {
                    let url = url.clone();
                    self.set_loading_phase(&url, &phase, percent);
                }
                None
            }
            AppEvent::LoadingSize(bytes) => {
                if let LoadingState::Loading { size, .. } = &mut self.loading_state {
                    *size = Some(bytes);
                }
                None
            }
            AppEvent::DatasetOpened(result) => {
                self.dataset_opened(result);
                None
            }
            AppEvent::RowsFetched(response) => {
                self.rows_fetched(response);
                None
            }
            AppEvent::Resize(_cols, _rows) => None,
            AppEvent::Exit | AppEvent::Crash(_) => None,
        }
    }

    fn render_title(&self, area: Rect, buf: &mut Buffer) {
        let mut spans = vec![Span::styled(
            APP_NAME,
            Style::default()
                .fg(self.color("primary"))
                .add_modifier(Modifier::BOLD),
        )];
        if let Some(view) = &self.view {
            spans.push(Span::raw(" "));
            spans.push(Span::styled(
                view.dataset().url().to_string(),
                Style::default().fg(self.color("text_primary")),
            ));
            spans.push(Span::styled(
                format!(
                    "  {} rows × {} columns",
                    view.dataset().total_row_count(),
                    view.dataset().column_names().len()
                ),
                Style::default().fg(self.color("text_secondary")),
            ));
        }
        Paragraph::new(Line::from(spans)).render(area, buf);
    }

    fn render_error(&self, area: Rect, buf: &mut Buffer) {
        let popup_area = centered_rect(area, 70, 40);
        Clear.render(popup_area, buf);
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Error")
            .border_style(Style::default().fg(self.color("modal_border_error")));
        let inner_area = block.inner(popup_area);
        block.render(popup_area, buf);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(inner_area);

        Paragraph::new(self.error_modal.message.as_str())
            .style(Style::default().fg(self.color("error")))
            .wrap(ratatui::widgets::Wrap { trim: true })
            .render(chunks[0], buf);
        Paragraph::new("Esc to dismiss, q to quit")
            .centered()
            .style(Style::default().fg(self.color("dimmed")))
            .render(chunks[1], buf);
    }
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.debug.num_frames += 1;
        if self.is_busy() {
            self.throbber_frame = self.throbber_frame.wrapping_add(1);
        }

        let mut constraints = vec![
            Constraint::Length(1), // Title
            Constraint::Fill(1),   // Table
            Constraint::Length(1), // Controls
        ];
        if self.debug.enabled {
            constraints.push(Constraint::Length(1));
        }
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        self.render_title(layout[0], buf);

        // header row takes one line
        let table_rows = layout[1].height.saturating_sub(1) as usize;
        if self.view.as_ref().map(|v| v.viewport_rows()) != Some(table_rows) {
            self.set_viewport_rows(table_rows);
        }

        let snapshot = self.snapshot();
        if let Some(snapshot) = &snapshot {
            WindowTable::new(snapshot)
                .with_colors(
                    self.color("table_header_bg"),
                    self.color("table_header"),
                    self.color("row_numbers"),
                    self.color("placeholder"),
                    self.color("scrollbar"),
                )
                .with_row_numbers(self.options.row_numbers, self.options.row_start_index)
                .with_max_cell_width(self.config.display.max_cell_width)
                .render(layout[1], buf);
        } else if self.loading_state.is_loading() {
            App::render_loading_gauge(&self.loading_state, layout[1], buf);
        }

        let mut controls = Controls::new()
            .with_colors(
                self.color("controls_bg"),
                self.color("keybind_hints"),
                self.color("keybind_labels"),
                self.color("warning"),
            )
            .with_notice(self.notice.clone())
            .with_dimmed(self.error_modal.active)
            .with_busy(self.is_busy(), self.throbber_frame);
        if let Some(s) = &snapshot {
            controls = controls.with_position(s.visible_start, s.visible_end, s.total_row_count);
        }
        controls.render(layout[2], buf);

        if self.debug.enabled {
            self.debug.buffered = snapshot
                .as_ref()
                .and_then(|s| s.buffered.as_ref())
                .map(|b| (b.start(), b.end()));
            self.debug.in_flight = self
                .view
                .as_ref()
                .map(|v| v.buffer().outstanding().len())
                .unwrap_or(0);
            (&self.debug).render(layout[3], buf);
        }

        if self.error_modal.active {
            self.render_error(area, buf);
        }
    }
}

fn centered_rect(r: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Open `url`, fetch `range` (clamped to the dataset) and write each row as a JSON line.
pub fn print_range(
    url: &str,
    options: &OpenOptions,
    range: RowRange,
    out: &mut impl Write,
) -> Result<usize> {
    let dataset = open_dataset(url, options)?;
    let total = dataset.total_row_count();
    let start = range.start.min(total);
    let end = range.end.min(total);
    let rows = dataset
        .source()
        .fetch_range(dataset.column_names(), start, end)?;
    for row in &rows {
        serde_json::to_writer(&mut *out, row)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    log::info!("printed rows {}..{} of {}", start, start + rows.len(), url);
    Ok(rows.len())
}

/// Run the interactive viewer until the user quits.
pub fn run(url: String, options: OpenOptions, config: AppConfig) -> Result<()> {
    use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
    use std::sync::mpsc;

    let theme = Theme::from_config(&config.theme)?;

    let mut terminal = ratatui::try_init().map_err(|e| {
        color_eyre::eyre::eyre!(
            "rowpeek requires an interactive terminal (TTY). No terminal detected: {}. \
             Use --print-range for non-interactive output.",
            e
        )
    })?;
    crossterm::execute!(std::io::stdout(), EnableMouseCapture)?;

    let (tx, rx) = mpsc::channel::<AppEvent>();
    let mut app = App::new_with_config(tx.clone(), theme, config.clone());
    let poll_interval = std::time::Duration::from_millis(config.performance.event_poll_interval_ms);

    terminal.draw(|frame| frame.render_widget(&mut app, frame.area()))?;
    tx.send(AppEvent::Open(url, options))?;

    let result = (|| -> Result<()> {
        loop {
            if crossterm::event::poll(poll_interval)? {
                match crossterm::event::read()? {
                    crossterm::event::Event::Key(key) => {
                        if key.is_press() {
                            tx.send(AppEvent::Key(key))?
                        }
                    }
                    crossterm::event::Event::Mouse(mouse) => tx.send(AppEvent::Mouse(mouse))?,
                    crossterm::event::Event::Resize(cols, rows) => {
                        tx.send(AppEvent::Resize(cols, rows))?
                    }
                    _ => {}
                }
            }

            let mut updated = app.is_busy();
            // drain so a burst of wheel events costs one frame
            loop {
                match rx.try_recv() {
                    Ok(AppEvent::Exit) => return Ok(()),
                    Ok(AppEvent::Crash(msg)) => return Err(color_eyre::eyre::eyre!(msg)),
                    Ok(event) => {
                        if let Some(next) = app.event(event) {
                            tx.send(next)?;
                        }
                        updated = true;
                    }
                    Err(mpsc::TryRecvError::Empty) => break,
                    Err(mpsc::TryRecvError::Disconnected) => return Ok(()),
                }
            }

            if updated {
                terminal.draw(|frame| frame.render_widget(&mut app, frame.area()))?;
            }
        }
    })();

    let _ = crossterm::execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DatasetMeta;
    use serde_json::Value;
    use std::sync::mpsc;
    use std::sync::Arc;

    struct Numbers(usize);

    impl RangeSource for Numbers {
        fn describe(&self) -> std::result::Result<DatasetMeta, ViewError> {
            Ok(DatasetMeta {
                total_row_count: self.0,
                column_names: vec!["n".into()],
            })
        }

        fn fetch_range(
            &self,
            _: &[String],
            start: usize,
            end: usize,
        ) -> std::result::Result<Vec<RowRecord>, ViewError> {
            Ok((start..end)
                .map(|i| [("n", Value::from(i as u64))].into_iter().collect())
                .collect())
        }
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn opened_app(total: usize) -> (App, mpsc::Receiver<AppEvent>) {
        let (tx, rx) = mpsc::channel();
        let mut app = App::new(tx);
        let handle = DatasetHandle::from_source("mem://numbers", Arc::new(Numbers(total))).unwrap();
        app.event(AppEvent::DatasetOpened(Ok(handle)));
        (app, rx)
    }

    /// Deliver fetch results posted by worker threads.
    fn pump(app: &mut App, rx: &mpsc::Receiver<AppEvent>) {
        while app.is_busy() {
            let ev = rx
                .recv_timeout(std::time::Duration::from_secs(5))
                .expect("fetch result");
            app.event(ev);
        }
    }

    fn args() -> Args {
        Args {
            url: Some("data.parquet".into()),
            row_height: None,
            preload_margin: None,
            hysteresis_fraction: None,
            columns: Vec::new(),
            row_numbers: false,
            row_start_index: None,
            print_range: None,
            debug: false,
            log: None,
            generate_config: false,
            force: false,
            s3_endpoint_url: None,
            s3_access_key_id: None,
            s3_secret_access_key: None,
            s3_region: None,
        }
    }

    #[test]
    fn test_open_options_cli_overrides_config() {
        let args = Args {
            row_height: Some(20.0),
            columns: vec!["a".into()],
            s3_region: Some("eu-west-1".into()),
            ..args()
        };
        let mut config = AppConfig::default();
        config.display.preload_margin = 25;
        config.display.row_numbers = true;
        config.cloud.s3_region = Some("us-east-1".into());
        config.cloud.s3_endpoint_url = Some("http://localhost:9000".into());

        let opts = OpenOptions::from_args_and_config(&args, &config).unwrap();
        assert_eq!(opts.view.row_height, 20.0);
        assert_eq!(opts.view.preload_margin, 25);
        assert_eq!(opts.view.hysteresis_fraction, 0.5);
        assert!(opts.row_numbers);
        assert_eq!(opts.columns, Some(vec!["a".to_string()]));
        assert_eq!(opts.s3_region.as_deref(), Some("eu-west-1"));
        assert_eq!(opts.s3_endpoint_url.as_deref(), Some("http://localhost:9000"));
    }

    #[test]
    fn test_open_options_rejects_bad_cli_tunables() {
        let config = AppConfig::default();
        for row_height in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let args = Args {
                row_height: Some(row_height),
                ..args()
            };
            let err = OpenOptions::from_args_and_config(&args, &config).unwrap_err();
            assert!(format!("{:#}", err).contains("row_height"), "got: {:#}", err);
        }
        for hysteresis_fraction in [-0.1, f64::NAN] {
            let args = Args {
                hysteresis_fraction: Some(hysteresis_fraction),
                ..args()
            };
            let err = OpenOptions::from_args_and_config(&args, &config).unwrap_err();
            assert!(format!("{:#}", err).contains("hysteresis_fraction"), "got: {:#}", err);
        }
        let args = Args {
            hysteresis_fraction: Some(0.0),
            ..args()
        };
        assert!(OpenOptions::from_args_and_config(&args, &config).is_ok());
    }

    #[test]
    fn test_fetched_rows_move_into_buffer() {
        let (mut app, _rx) = opened_app(1000);
        app.set_viewport_rows(20);
        let ticket = app.view().unwrap().buffer().outstanding()[0];
        let rows: Vec<RowRecord> = (ticket.buf_start..ticket.buf_end)
            .map(|i| [("n", Value::from(i as u64))].into_iter().collect())
            .collect();
        let rows = Arc::new(rows);
        let data = rows.as_ptr();

        app.event(AppEvent::RowsFetched(FetchResponse {
            ticket,
            result: Ok(rows),
        }));
        let snap = app.snapshot().unwrap();
        assert!(snap.is_fully_loaded());
        // same allocation: the rows were not copied on the way in
        assert_eq!(snap.buffered_rows().as_ptr(), data);
    }

    #[test]
    fn test_keys_scroll_and_fetch() {
        let (mut app, rx) = opened_app(1000);
        app.set_viewport_rows(20);
        pump(&mut app, &rx);
        let snap = app.snapshot().unwrap();
        assert_eq!(snap.buffered_start(), Some(0));
        assert!(snap.is_fully_loaded());

        app.event(key(KeyCode::Char('j')));
        assert_eq!(app.snapshot().unwrap().visible_start, 1);
        assert!(!app.is_busy());

        app.event(key(KeyCode::Char('G')));
        assert_eq!(app.snapshot().unwrap().visible_start, 980);
        pump(&mut app, &rx);
        let snap = app.snapshot().unwrap();
        assert_eq!(snap.buffered_start(), Some(970));
        assert!(snap.is_fully_loaded());

        app.event(key(KeyCode::Home));
        assert_eq!(app.snapshot().unwrap().visible_start, 0);
        assert_eq!(app.debug_state().fetches_issued, 3);
    }

    #[test]
    fn test_mouse_wheel_scrolls_by_step() {
        let (mut app, _rx) = opened_app(1000);
        app.set_viewport_rows(20);
        let wheel = AppEvent::Mouse(MouseEvent {
            kind: MouseEventKind::ScrollDown,
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        });
        // 40 units per notch, 35 units per row
        app.event(wheel.clone());
        assert_eq!(app.snapshot().unwrap().visible_start, 1);
        app.event(wheel);
        assert_eq!(app.snapshot().unwrap().visible_start, 2);
    }

    #[test]
    fn test_failed_open_shows_error() {
        let (tx, _rx) = mpsc::channel();
        let mut app = App::new(tx);
        let err = ViewError::source_unavailable("s3://b/k", "access denied");
        app.event(AppEvent::DatasetOpened(Err(err)));
        assert!(app.snapshot().is_none());
        assert_eq!(app.error_message(), Some("Could not open s3://b/k: access denied"));
        assert!(app.event(key(KeyCode::Esc)).is_none());
        assert!(app.error_message().is_none());
        assert!(matches!(app.event(key(KeyCode::Char('q'))), Some(AppEvent::Exit)));
    }

    #[test]
    fn test_render_sets_viewport_from_area() {
        let (mut app, rx) = opened_app(1000);
        let area = Rect::new(0, 0, 60, 12);
        let mut buf = Buffer::empty(area);
        (&mut app).render(area, &mut buf);
        // title + header + controls
        assert_eq!(app.view().unwrap().viewport_rows(), 9);
        pump(&mut app, &rx);
        let mut buf = Buffer::empty(area);
        (&mut app).render(area, &mut buf);
        let snap = app.snapshot().unwrap();
        assert_eq!((snap.visible_start, snap.visible_end), (0, 9));
    }

    #[test]
    fn test_print_range_writes_json_lines() {
        use polars::prelude::*;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nums.parquet");
        let mut df = df!("n" => (0..100i64).collect::<Vec<_>>()).unwrap();
        let file = std::fs::File::create(&path).unwrap();
        ParquetWriter::new(file)
            .finish(&mut df)
            .unwrap();

        let mut out = Vec::new();
        let url = path.to_string_lossy().to_string();
        let written = print_range(
            &url,
            &OpenOptions::default(),
            RowRange { start: 95, end: 120 },
            &mut out,
        )
        .unwrap();
        assert_eq!(written, 5);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], r#"{"n":95}"#);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}

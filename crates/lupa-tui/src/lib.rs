// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use lupa_app::{
    AggOptions, BindingGroup, BindingTier, CountOptions, FetchOutcome, FetchPayload,
    FieldCapability, FilterPolarity, Filters, Highlighter, LogEntry, MetricSeries,
    Mode, ModeKind, PerspectiveItem, PerspectiveKind, RankedField, RequestKind, SearchOptions,
    Session, SessionCommand, SessionEvent, SignalType, TransactionNameAgg, bindings_for,
    detect_lookback, pad_or_truncate, quick_bindings, ranked_field_list,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, Paragraph, Row, Sparkline, Table, TableState, Wrap,
};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::OffsetDateTime;
use time::macros::format_description;

const POLL_INTERVAL: Duration = Duration::from_millis(120);
const TICK_PERIOD: Duration = Duration::from_secs(2);
const STATUS_CLEAR_DELAY: Duration = Duration::from_secs(4);
const HALF_PAGE_ROWS: isize = 10;
const JUMP_ROWS: isize = 100_000;

#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub kind: RequestKind,
    pub generation: u64,
    pub params: FetchParams,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchParams {
    Search(SearchOptions),
    Metrics(AggOptions),
    TransactionNames(AggOptions),
    FieldCaps,
    Perspective {
        kind: PerspectiveKind,
        options: AggOptions,
    },
    AutoDetect {
        signal: SignalType,
        filters: Filters,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchData {
    pub entries: Vec<LogEntry>,
    pub rendered_query: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Chunk { request_id: u64, content: String },
    Completed { request_id: u64, body: String },
    Failed { request_id: u64, error: String },
}

impl ChatEvent {
    const fn request_id(&self) -> u64 {
        match self {
            Self::Chunk { request_id, .. }
            | Self::Completed { request_id, .. }
            | Self::Failed { request_id, .. } => *request_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    Tick,
    ClearStatus { token: u64 },
    Fetch(FetchOutcome),
    Chat(ChatEvent),
}

pub trait DataSource {
    fn search(&mut self, options: &SearchOptions) -> Result<SearchData>;
    fn count(&mut self, options: &CountOptions) -> Result<u64>;
    fn aggregate_metrics(&mut self, options: &AggOptions) -> Result<Vec<MetricSeries>>;
    fn transaction_names(&mut self, options: &AggOptions) -> Result<Vec<TransactionNameAgg>>;
    fn perspective(
        &mut self,
        kind: PerspectiveKind,
        options: &AggOptions,
    ) -> Result<Vec<PerspectiveItem>>;
    fn field_capabilities(&mut self) -> Result<Vec<FieldCapability>>;
    fn ping(&mut self) -> Result<()>;
    fn index_pattern(&mut self) -> String;
    fn set_index_pattern(&mut self, pattern: &str) -> Result<()>;
    fn chat_reply(&mut self, prompt: &str, history: &[ChatTurn]) -> Result<String>;

    fn fetch(&mut self, request: &FetchRequest) -> Result<FetchPayload> {
        match &request.params {
            FetchParams::Search(options) => {
                let data = self.search(options)?;
                Ok(FetchPayload::Logs {
                    entries: data.entries,
                    rendered_query: data.rendered_query,
                })
            }
            FetchParams::Metrics(options) => {
                Ok(FetchPayload::Metrics(self.aggregate_metrics(options)?))
            }
            FetchParams::TransactionNames(options) => Ok(FetchPayload::TransactionNames(
                self.transaction_names(options)?,
            )),
            FetchParams::FieldCaps => Ok(FetchPayload::FieldCaps(self.field_capabilities()?)),
            FetchParams::Perspective { kind, options } => Ok(FetchPayload::Perspective {
                kind: *kind,
                items: self.perspective(*kind, options)?,
            }),
            FetchParams::AutoDetect { signal, filters } => {
                let (lookback, observed_count) = detect_lookback(|lookback| {
                    self.count(&CountOptions {
                        signal: *signal,
                        filters: filters.clone(),
                        lookback,
                    })
                });
                Ok(FetchPayload::AutoDetect {
                    lookback,
                    observed_count,
                })
            }
        }
    }

    fn spawn_fetch(&mut self, request: FetchRequest, tx: Sender<InternalEvent>) -> Result<()> {
        let result = self.fetch(&request).map_err(|error| error.to_string());
        tx.send(InternalEvent::Fetch(FetchOutcome {
            kind: request.kind,
            generation: request.generation,
            result,
        }))
        .map_err(|_| anyhow::anyhow!("fetch event channel closed"))?;
        Ok(())
    }

    fn spawn_chat(
        &mut self,
        request_id: u64,
        prompt: &str,
        history: &[ChatTurn],
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let event = match self.chat_reply(prompt, history) {
            Ok(body) => InternalEvent::Chat(ChatEvent::Completed { request_id, body }),
            Err(error) => InternalEvent::Chat(ChatEvent::Failed {
                request_id,
                error: error.to_string(),
            }),
        };
        tx.send(event)
            .map_err(|_| anyhow::anyhow!("chat event channel closed"))?;
        Ok(())
    }

    fn cancel_chat(&mut self, _request_id: u64) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChatInFlight {
    request_id: u64,
    assistant_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ChatUiState {
    transcript: Vec<ChatTurn>,
    input: String,
    in_flight: Option<ChatInFlight>,
    next_request_id: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct ViewData {
    status_line: Option<String>,
    status_token: u64,
    chat: ChatUiState,
}

pub fn run_app<S: DataSource>(session: &mut Session, source: &mut S) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();
    spawn_tick_thread(internal_tx.clone());

    dispatch_startup_fetches(session, source, &internal_tx);

    let mut result = Ok(());
    loop {
        if process_internal_events(session, source, &mut view_data, &internal_tx, &internal_rx) {
            break;
        }

        if let Err(error) = terminal.draw(|frame| render(frame, session, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(POLL_INTERVAL).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(session, source, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn spawn_tick_thread(tx: Sender<InternalEvent>) {
    thread::spawn(move || {
        loop {
            thread::sleep(TICK_PERIOD);
            if tx.send(InternalEvent::Tick).is_err() {
                break;
            }
        }
    });
}

fn dispatch_startup_fetches<S: DataSource>(
    session: &mut Session,
    source: &mut S,
    tx: &Sender<InternalEvent>,
) {
    if session.auto_detect_on_start && session.signal != SignalType::Chat {
        dispatch_fetch(session, source, tx, RequestKind::AutoDetect);
    } else if let Some(kind) = session.refresh_kind() {
        dispatch_fetch(session, source, tx, kind);
    }
    if session.signal != SignalType::Chat {
        dispatch_fetch(session, source, tx, RequestKind::FieldCaps);
    }
}

fn dispatch_fetch<S: DataSource>(
    session: &mut Session,
    source: &mut S,
    tx: &Sender<InternalEvent>,
    kind: RequestKind,
) {
    let generation = session.begin_fetch(kind);
    let params = match kind {
        RequestKind::Logs => FetchParams::Search(session.search_options()),
        RequestKind::MetricsAgg => FetchParams::Metrics(session.agg_options()),
        RequestKind::TransactionNames => FetchParams::TransactionNames(session.agg_options()),
        RequestKind::FieldCaps => FetchParams::FieldCaps,
        RequestKind::Perspective => FetchParams::Perspective {
            kind: active_perspective_kind(session),
            options: session.agg_options(),
        },
        RequestKind::AutoDetect => FetchParams::AutoDetect {
            signal: session.signal,
            filters: session.filters.clone(),
        },
    };
    let request = FetchRequest {
        kind,
        generation,
        params,
    };
    if let Err(error) = source.spawn_fetch(request, tx.clone()) {
        session.apply_fetch(FetchOutcome {
            kind,
            generation,
            result: Err(error.to_string()),
        });
    }
}

fn active_perspective_kind(session: &Session) -> PerspectiveKind {
    match &session.mode {
        Mode::PerspectiveList { kind, .. } => *kind,
        _ => PerspectiveKind::Services,
    }
}

fn process_internal_events<S: DataSource>(
    session: &mut Session,
    source: &mut S,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) -> bool {
    let mut quit = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::Tick => {
                if session.auto_refresh
                    && session.signal == SignalType::Logs
                    && session.mode.kind() == ModeKind::List
                {
                    dispatch_fetch(session, source, tx, RequestKind::Logs);
                }
            }
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                view_data.status_line = None;
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::Fetch(outcome) => {
                let events = session.apply_fetch(outcome);
                quit |= handle_session_events(session, source, view_data, tx, events);
            }
            InternalEvent::Chat(event) => {
                handle_chat_event(view_data, event);
            }
        }
    }
    quit
}

fn handle_session_events<S: DataSource>(
    session: &mut Session,
    source: &mut S,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    events: Vec<SessionEvent>,
) -> bool {
    let mut quit = false;
    for event in events {
        match event {
            SessionEvent::FetchNeeded(kind) => {
                dispatch_fetch(session, source, tx, kind);
            }
            SessionEvent::Quit => {
                quit = true;
            }
            SessionEvent::LookbackChanged(lookback) => {
                emit_status(view_data, tx, format!("lookback {}", lookback.as_str()));
            }
            SessionEvent::SortChanged(sort) => {
                emit_status(view_data, tx, format!("sort {}", sort.as_str()));
            }
            SessionEvent::AutoRefreshChanged(enabled) => {
                let status = if enabled {
                    "auto refresh on"
                } else {
                    "auto refresh off"
                };
                emit_status(view_data, tx, status);
            }
            SessionEvent::FilterChanged => {
                let summary = session.filters.summary();
                let status = if summary.is_empty() {
                    "filters cleared".to_owned()
                } else {
                    summary
                };
                emit_status(view_data, tx, status);
            }
            SessionEvent::IndexPatternChanged => {
                if let Err(error) = source.set_index_pattern(&session.index_pattern) {
                    session.raise_error(error.to_string());
                } else {
                    emit_status(view_data, tx, format!("index {}", session.index_pattern));
                }
            }
            SessionEvent::InputRejected(message) => {
                emit_status(view_data, tx, message);
            }
            SessionEvent::ErrorRaised(_)
            | SessionEvent::ModeChanged(_)
            | SessionEvent::SignalChanged(_)
            | SessionEvent::FieldsChanged
            | SessionEvent::DataApplied(_) => {}
        }
    }
    quit
}

fn apply_command<S: DataSource>(
    session: &mut Session,
    source: &mut S,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    command: SessionCommand,
) -> bool {
    let events = session.apply(command);
    handle_session_events(session, source, view_data, tx, events)
}

fn schedule_status_clear(tx: &Sender<InternalEvent>, token: u64) {
    let sender = tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_DELAY);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(view_data: &mut ViewData, tx: &Sender<InternalEvent>, message: impl Into<String>) {
    view_data.status_line = Some(message.into());
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(tx, view_data.status_token);
}

fn handle_key_event<S: DataSource>(
    session: &mut Session,
    source: &mut S,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    match session.mode.kind() {
        ModeKind::SearchInput => {
            handle_text_input_key(session, source, view_data, tx, key, TextTarget::Search)
        }
        ModeKind::IndexInput => {
            handle_text_input_key(session, source, view_data, tx, key, TextTarget::Index)
        }
        ModeKind::FieldSelector => handle_field_selector_key(session, source, view_data, tx, key),
        ModeKind::PerspectiveList => handle_perspective_key(session, source, view_data, tx, key),
        ModeKind::Detail | ModeKind::DetailRaw => {
            handle_detail_key(session, source, view_data, tx, key)
        }
        ModeKind::MetricDetail => handle_metric_detail_key(session, source, view_data, tx, key),
        ModeKind::QueryOverlay | ModeKind::HelpOverlay | ModeKind::ErrorModal => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?')) {
                apply_command(session, source, view_data, tx, SessionCommand::Back)
            } else {
                false
            }
        }
        ModeKind::QuitConfirm => match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                apply_command(session, source, view_data, tx, SessionCommand::ConfirmQuit)
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                apply_command(session, source, view_data, tx, SessionCommand::Back)
            }
            _ => false,
        },
        ModeKind::Chat => handle_chat_key(session, source, view_data, tx, key),
        ModeKind::List | ModeKind::TraceNames | ModeKind::MetricsDashboard => {
            handle_browse_key(session, source, view_data, tx, key)
        }
    }
}

fn signal_for_key(ch: char) -> Option<SignalType> {
    match ch {
        '1' => Some(SignalType::Logs),
        '2' => Some(SignalType::Traces),
        '3' => Some(SignalType::Metrics),
        '4' => Some(SignalType::Chat),
        _ => None,
    }
}

fn handle_browse_key<S: DataSource>(
    session: &mut Session,
    source: &mut S,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let command = match (key.code, key.modifiers) {
        (KeyCode::Char('j') | KeyCode::Down, _) => SessionCommand::MoveCursor(1),
        (KeyCode::Char('k') | KeyCode::Up, _) => SessionCommand::MoveCursor(-1),
        (KeyCode::Char('d'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            SessionCommand::MoveCursor(HALF_PAGE_ROWS)
        }
        (KeyCode::Char('u'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            SessionCommand::MoveCursor(-HALF_PAGE_ROWS)
        }
        (KeyCode::Char('g'), _) => SessionCommand::MoveCursor(-JUMP_ROWS),
        (KeyCode::Char('G'), _) => SessionCommand::MoveCursor(JUMP_ROWS),
        (KeyCode::Enter, _) => match session.mode.kind() {
            ModeKind::TraceNames => SessionCommand::DrillSelection,
            _ => SessionCommand::OpenDetail,
        },
        (KeyCode::Char('t'), KeyModifiers::NONE) => SessionCommand::DrillSelection,
        (KeyCode::Char('/'), _) => SessionCommand::OpenSearchInput,
        (KeyCode::Char('l'), KeyModifiers::NONE) => SessionCommand::CycleLookback,
        (KeyCode::Char('L'), _) => SessionCommand::StartAutoDetect,
        (KeyCode::Char('s'), KeyModifiers::NONE) => SessionCommand::ToggleSort,
        (KeyCode::Char('r'), KeyModifiers::NONE) => SessionCommand::ToggleAutoRefresh,
        (KeyCode::Char('e'), KeyModifiers::NONE) => SessionCommand::CycleLevelFilter,
        (KeyCode::Char('c'), KeyModifiers::NONE) => SessionCommand::ClearFilters,
        (KeyCode::Char('f'), KeyModifiers::NONE) => SessionCommand::OpenFieldSelector,
        (KeyCode::Char('v'), KeyModifiers::NONE) => SessionCommand::OpenQueryOverlay,
        (KeyCode::Char('i'), KeyModifiers::NONE) => SessionCommand::OpenIndexInput,
        (KeyCode::Char('S'), _) => SessionCommand::OpenPerspective(PerspectiveKind::Services),
        (KeyCode::Char('R'), _) => SessionCommand::OpenPerspective(PerspectiveKind::Resources),
        (KeyCode::Char('?'), _) => SessionCommand::OpenHelp,
        (KeyCode::Esc, _) => SessionCommand::Back,
        (KeyCode::Char('q'), KeyModifiers::NONE) => SessionCommand::RequestQuit,
        (KeyCode::Char(ch), _) => match signal_for_key(ch) {
            Some(signal) => SessionCommand::SwitchSignal(signal),
            None => return false,
        },
        _ => return false,
    };
    apply_command(session, source, view_data, tx, command)
}

enum TextTarget {
    Search,
    Index,
}

fn handle_text_input_key<S: DataSource>(
    session: &mut Session,
    source: &mut S,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
    target: TextTarget,
) -> bool {
    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => {
            return apply_command(session, source, view_data, tx, SessionCommand::Back);
        }
        (KeyCode::Enter, _) => {
            let command = match target {
                TextTarget::Search => SessionCommand::SubmitSearch,
                TextTarget::Index => SessionCommand::SubmitIndexPattern,
            };
            return apply_command(session, source, view_data, tx, command);
        }
        (KeyCode::Backspace, _) => {
            if let Mode::SearchInput { buffer } | Mode::IndexInput { buffer } = &mut session.mode {
                buffer.pop();
            }
        }
        (KeyCode::Char('u'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            if let Mode::SearchInput { buffer } | Mode::IndexInput { buffer } = &mut session.mode {
                buffer.clear();
            }
        }
        (KeyCode::Char(ch), modifiers)
            if modifiers.is_empty() || modifiers == KeyModifiers::SHIFT =>
        {
            if let Mode::SearchInput { buffer } | Mode::IndexInput { buffer } = &mut session.mode {
                buffer.push(ch);
            }
        }
        _ => {}
    }
    false
}

fn handle_field_selector_key<S: DataSource>(
    session: &mut Session,
    source: &mut S,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => {
            return apply_command(session, source, view_data, tx, SessionCommand::Back);
        }
        (KeyCode::Down, _) => {
            return apply_command(session, source, view_data, tx, SessionCommand::MoveCursor(1));
        }
        (KeyCode::Up, _) => {
            return apply_command(session, source, view_data, tx, SessionCommand::MoveCursor(-1));
        }
        (KeyCode::Char('n'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            return apply_command(session, source, view_data, tx, SessionCommand::MoveCursor(1));
        }
        (KeyCode::Char('p'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            return apply_command(session, source, view_data, tx, SessionCommand::MoveCursor(-1));
        }
        (KeyCode::Enter, _) => {
            let Some(entry) = selected_ranked_field(session) else {
                return false;
            };
            let toggled = entry.name.clone();
            let quit = apply_command(
                session,
                source,
                view_data,
                tx,
                SessionCommand::ToggleField(toggled.clone()),
            );
            emit_status(view_data, tx, format!("toggled {toggled}"));
            return quit;
        }
        (KeyCode::Backspace, _) => {
            if let Mode::FieldSelector { filter, cursor } = &mut session.mode {
                filter.pop();
                *cursor = 0;
            }
        }
        (KeyCode::Char('u'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            if let Mode::FieldSelector { filter, cursor } = &mut session.mode {
                filter.clear();
                *cursor = 0;
            }
        }
        (KeyCode::Char(ch), modifiers)
            if modifiers.is_empty() || modifiers == KeyModifiers::SHIFT =>
        {
            if let Mode::FieldSelector { filter, cursor } = &mut session.mode {
                filter.push(ch);
                *cursor = 0;
            }
        }
        _ => {}
    }
    false
}

fn ranked_fields(session: &Session) -> Vec<RankedField> {
    let filter = match &session.mode {
        Mode::FieldSelector { filter, .. } => filter.as_str(),
        _ => "",
    };
    ranked_field_list(&session.available_fields, &session.display_fields, filter)
}

fn selected_ranked_field(session: &Session) -> Option<RankedField> {
    let Mode::FieldSelector { cursor, .. } = &session.mode else {
        return None;
    };
    ranked_fields(session).into_iter().nth(*cursor)
}

fn handle_perspective_key<S: DataSource>(
    session: &mut Session,
    source: &mut S,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let command = match key.code {
        KeyCode::Esc => SessionCommand::Back,
        KeyCode::Char('j') | KeyCode::Down => SessionCommand::MoveCursor(1),
        KeyCode::Char('k') | KeyCode::Up => SessionCommand::MoveCursor(-1),
        KeyCode::Enter => SessionCommand::ApplyPerspective(FilterPolarity::Include),
        KeyCode::Char('x') | KeyCode::Char('-') => {
            SessionCommand::ApplyPerspective(FilterPolarity::Exclude)
        }
        _ => return false,
    };
    apply_command(session, source, view_data, tx, command)
}

fn handle_detail_key<S: DataSource>(
    session: &mut Session,
    source: &mut S,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let command = match key.code {
        KeyCode::Esc => SessionCommand::Back,
        KeyCode::Char('j') | KeyCode::Down => SessionCommand::MoveCursor(1),
        KeyCode::Char('k') | KeyCode::Up => SessionCommand::MoveCursor(-1),
        KeyCode::Char('w') => SessionCommand::ToggleRawDetail,
        KeyCode::Char('?') => SessionCommand::OpenHelp,
        _ => return false,
    };
    apply_command(session, source, view_data, tx, command)
}

fn handle_metric_detail_key<S: DataSource>(
    session: &mut Session,
    source: &mut S,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let command = match key.code {
        KeyCode::Esc => SessionCommand::Back,
        KeyCode::Char('j') | KeyCode::Down => SessionCommand::MoveCursor(1),
        KeyCode::Char('k') | KeyCode::Up => SessionCommand::MoveCursor(-1),
        _ => return false,
    };
    apply_command(session, source, view_data, tx, command)
}

fn handle_chat_key<S: DataSource>(
    session: &mut Session,
    source: &mut S,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        if let Some(in_flight) = view_data.chat.in_flight.take() {
            let _ = source.cancel_chat(in_flight.request_id);
            if let Some(turn) = view_data
                .chat
                .transcript
                .get_mut(in_flight.assistant_index)
            {
                turn.body = "(canceled)".to_owned();
            }
            emit_status(view_data, tx, "chat canceled");
        }
        return false;
    }

    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => apply_command(session, source, view_data, tx, SessionCommand::Back),
        (KeyCode::Enter, _) => {
            submit_chat(source, view_data, tx);
            false
        }
        (KeyCode::Backspace, _) => {
            view_data.chat.input.pop();
            false
        }
        (KeyCode::Char('u'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            view_data.chat.input.clear();
            false
        }
        (KeyCode::Char('q'), KeyModifiers::NONE) if view_data.chat.input.is_empty() => {
            apply_command(session, source, view_data, tx, SessionCommand::RequestQuit)
        }
        (KeyCode::Char(ch), modifiers)
            if (modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) =>
        {
            if view_data.chat.input.is_empty() {
                if let Some(signal) = signal_for_key(ch) {
                    return apply_command(
                        session,
                        source,
                        view_data,
                        tx,
                        SessionCommand::SwitchSignal(signal),
                    );
                }
            }
            view_data.chat.input.push(ch);
            false
        }
        _ => false,
    }
}

fn submit_chat<S: DataSource>(
    source: &mut S,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    let input = view_data.chat.input.trim().to_owned();
    if input.is_empty() || view_data.chat.in_flight.is_some() {
        return;
    }
    view_data.chat.input.clear();

    let history = view_data.chat.transcript.clone();
    view_data.chat.transcript.push(ChatTurn {
        role: ChatRole::User,
        body: input.clone(),
    });
    view_data.chat.transcript.push(ChatTurn {
        role: ChatRole::Assistant,
        body: String::new(),
    });
    let assistant_index = view_data.chat.transcript.len() - 1;

    view_data.chat.next_request_id += 1;
    let request_id = view_data.chat.next_request_id;
    view_data.chat.in_flight = Some(ChatInFlight {
        request_id,
        assistant_index,
    });

    if let Err(error) = source.spawn_chat(request_id, &input, &history, tx.clone()) {
        if let Some(turn) = view_data.chat.transcript.get_mut(assistant_index) {
            turn.body = format!("chat failed: {error}");
        }
        view_data.chat.in_flight = None;
    }
}

fn handle_chat_event(view_data: &mut ViewData, event: ChatEvent) {
    let Some(in_flight) = view_data.chat.in_flight else {
        return;
    };
    if event.request_id() != in_flight.request_id {
        return;
    }
    let Some(turn) = view_data
        .chat
        .transcript
        .get_mut(in_flight.assistant_index)
    else {
        view_data.chat.in_flight = None;
        return;
    };

    match event {
        ChatEvent::Chunk { content, .. } => {
            turn.body.push_str(&content);
        }
        ChatEvent::Completed { body, .. } => {
            if !body.is_empty() {
                turn.body = body;
            }
            view_data.chat.in_flight = None;
        }
        ChatEvent::Failed { error, .. } => {
            turn.body = format!("chat failed: {error}");
            view_data.chat.in_flight = None;
        }
    }
}

fn render(frame: &mut ratatui::Frame, session: &Session, view_data: &ViewData) {
    let [title_area, body_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_title_bar(frame, session, title_area);

    match session.surface_mode().clone() {
        Mode::List => render_log_list(frame, session, body_area),
        Mode::TraceNames => render_trace_names(frame, session, body_area),
        Mode::MetricsDashboard => render_metrics_dashboard(frame, session, body_area),
        Mode::MetricDetail { index } => render_metric_detail(frame, session, body_area, index),
        Mode::Detail { index } => render_detail(frame, session, body_area, index, false),
        Mode::DetailRaw { index } => render_detail(frame, session, body_area, index, true),
        Mode::Chat => render_chat(frame, view_data, body_area),
        _ => {}
    }

    match &session.mode {
        Mode::SearchInput { buffer } => {
            render_input_overlay(frame, body_area, "search", buffer);
        }
        Mode::IndexInput { buffer } => {
            render_input_overlay(frame, body_area, "index pattern", buffer);
        }
        Mode::QueryOverlay => render_query_overlay(frame, session, body_area),
        Mode::FieldSelector { cursor, filter } => {
            render_field_selector(frame, session, body_area, *cursor, filter);
        }
        Mode::PerspectiveList { kind, cursor } => {
            render_perspective(frame, session, body_area, *kind, *cursor);
        }
        Mode::ErrorModal { message } => render_error_modal(frame, body_area, message),
        Mode::QuitConfirm => render_quit_confirm(frame, body_area),
        Mode::HelpOverlay => render_help(frame, session, body_area),
        _ => {}
    }

    render_status_line(frame, session, view_data, status_area);
}

fn render_title_bar(frame: &mut ratatui::Frame, session: &Session, area: Rect) {
    let mut spans = Vec::new();
    for signal in SignalType::ALL {
        let style = if signal == session.signal {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!(" {} ", signal.label()), style));
    }
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        format!("lookback:{}", session.lookback.as_str()),
        Style::default().fg(Color::Yellow),
    ));
    spans.push(Span::raw(" "));
    spans.push(Span::styled(
        format!("index:{}", session.index_pattern),
        Style::default().fg(Color::DarkGray),
    ));
    let summary = session.filters.summary();
    if !summary.is_empty() {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(summary, Style::default().fg(Color::Magenta)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn highlight_cell<'a>(
    highlighter: &Highlighter,
    text: &str,
    width: usize,
    base: Style,
) -> Line<'a> {
    let cell = highlighter.apply(text, width);
    match cell.matched {
        Some(range) => {
            let chars: Vec<char> = cell.text.chars().collect();
            let before: String = chars[..range.start].iter().collect();
            let marked: String = chars[range.start..range.end].iter().collect();
            let after: String = chars[range.end..].iter().collect();
            Line::from(vec![
                Span::styled(before, base),
                Span::styled(
                    marked,
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(after, base),
            ])
        }
        None => Line::from(Span::styled(cell.text, base)),
    }
}

fn column_widths(session: &Session, area: Rect) -> Vec<(String, String, usize)> {
    let fixed_total: u16 = session
        .display_fields
        .iter()
        .map(|field| if field.width == 0 { 0 } else { field.width + 1 })
        .sum();
    let flexible = area.width.saturating_sub(fixed_total + 2).max(8) as usize;
    session
        .display_fields
        .iter()
        .map(|field| {
            let width = if field.width == 0 {
                flexible
            } else {
                field.width as usize
            };
            (field.path.clone(), field.label.clone(), width)
        })
        .collect()
}

fn entry_cell_text(entry: &LogEntry, path: &str) -> String {
    if path == "@timestamp" {
        return format_timestamp(entry.timestamp);
    }
    entry.field_text(path).unwrap_or_default()
}

fn format_timestamp(timestamp: Option<OffsetDateTime>) -> String {
    let Some(timestamp) = timestamp else {
        return "-".to_owned();
    };
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    timestamp.format(&format).unwrap_or_else(|_| "-".to_owned())
}

fn level_style(level: Option<&str>) -> Style {
    match level.map(str::to_ascii_lowercase).as_deref() {
        Some("error" | "fatal" | "critical") => Style::default().fg(Color::Red),
        Some("warn" | "warning") => Style::default().fg(Color::Yellow),
        Some("debug" | "trace") => Style::default().fg(Color::DarkGray),
        _ => Style::default(),
    }
}

fn render_log_list(frame: &mut ratatui::Frame, session: &Session, area: Rect) {
    let columns = column_widths(session, area);
    let highlighter = Highlighter::new(&session.filters.query);

    let header = Row::new(
        columns
            .iter()
            .map(|(_, label, width)| {
                Cell::from(Span::styled(
                    pad_or_truncate(label, *width),
                    Style::default().add_modifier(Modifier::BOLD),
                ))
            })
            .collect::<Vec<_>>(),
    );

    let rows: Vec<Row> = session
        .log_entries
        .iter()
        .map(|entry| {
            let base = level_style(entry.level.as_deref());
            Row::new(
                columns
                    .iter()
                    .map(|(path, _, width)| {
                        Cell::from(highlight_cell(
                            &highlighter,
                            &entry_cell_text(entry, path),
                            *width,
                            base,
                        ))
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect();

    let constraints: Vec<Constraint> = columns
        .iter()
        .map(|(_, _, width)| Constraint::Length(*width as u16))
        .collect();

    let mut title = format!(" {} ({}) ", list_title(session), session.log_entries.len());
    if session.is_loading(RequestKind::Logs) {
        title.push_str("loading… ");
    }
    let table = Table::new(rows, constraints)
        .header(header)
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .block(Block::default().borders(Borders::ALL).title(title));
    let mut table_state = TableState::default();
    table_state.select(Some(session.list_cursor));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn list_title(session: &Session) -> String {
    match (&session.drill.transaction_name, &session.drill.trace_id) {
        (_, Some(trace_id)) => format!("spans {trace_id}"),
        (Some(name), None) => format!("transactions {name}"),
        (None, None) => session.signal.label().to_owned(),
    }
}

fn render_trace_names(frame: &mut ratatui::Frame, session: &Session, area: Rect) {
    let highlighter = Highlighter::new(&session.filters.query);
    let name_width = area.width.saturating_sub(44).max(16) as usize;

    let header = Row::new(vec![
        Cell::from(Span::styled("NAME", Style::default().add_modifier(Modifier::BOLD))),
        Cell::from(Span::styled("COUNT", Style::default().add_modifier(Modifier::BOLD))),
        Cell::from(Span::styled("AVG MS", Style::default().add_modifier(Modifier::BOLD))),
        Cell::from(Span::styled("P95 MS", Style::default().add_modifier(Modifier::BOLD))),
        Cell::from(Span::styled("ERR%", Style::default().add_modifier(Modifier::BOLD))),
    ]);

    let rows: Vec<Row> = session
        .transaction_names
        .iter()
        .map(|agg| {
            let base = Style::default();
            Row::new(vec![
                Cell::from(highlight_cell(&highlighter, &agg.name, name_width, base)),
                Cell::from(Span::styled(format!("{}", agg.count), base)),
                Cell::from(Span::styled(
                    format!("{:.1}", agg.avg_duration_us / 1_000.0),
                    base,
                )),
                Cell::from(Span::styled(
                    format!("{:.1}", agg.p95_duration_us / 1_000.0),
                    base,
                )),
                Cell::from(Span::styled(
                    format!("{:.1}", agg.error_rate * 100.0),
                    base,
                )),
            ])
        })
        .collect();

    let mut title = format!(" transactions ({}) ", session.transaction_names.len());
    if session.is_loading(RequestKind::TransactionNames) {
        title.push_str("loading… ");
    }
    let table = Table::new(
        rows,
        [
            Constraint::Min(16),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(6),
        ],
    )
    .header(header)
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
    .block(Block::default().borders(Borders::ALL).title(title));
    let mut table_state = TableState::default();
    table_state.select(Some(session.trace_cursor));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn render_metrics_dashboard(frame: &mut ratatui::Frame, session: &Session, area: Rect) {
    let mut title = format!(" metrics ({}) ", session.metric_series.len());
    if session.is_loading(RequestKind::MetricsAgg) {
        title.push_str("loading… ");
    }
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if session.metric_series.is_empty() {
        frame.render_widget(Paragraph::new("no metric series loaded"), inner);
        return;
    }

    let visible = (inner.height / 3).max(1) as usize;
    let first = session
        .metric_cursor
        .saturating_sub(visible.saturating_sub(1));
    let constraints: Vec<Constraint> = (0..visible).map(|_| Constraint::Length(3)).collect();
    let slots = Layout::vertical(constraints).split(inner);

    for (slot, (index, series)) in slots.iter().zip(
        session
            .metric_series
            .iter()
            .enumerate()
            .skip(first)
            .take(visible),
    ) {
        let selected = index == session.metric_cursor;
        let style = if selected {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let data: Vec<u64> = series.points.iter().map(|point| point.value as u64).collect();
        let sparkline = Sparkline::default()
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(style)
                    .title(format!(
                        " {} min {:.1} avg {:.1} max {:.1} ",
                        series.name, series.min, series.avg, series.max
                    )),
            )
            .data(&data)
            .style(style);
        frame.render_widget(sparkline, *slot);
    }
}

fn render_metric_detail(frame: &mut ratatui::Frame, session: &Session, area: Rect, index: usize) {
    let Some(series) = session.metric_series.get(index) else {
        frame.render_widget(
            Paragraph::new("metric series no longer loaded")
                .block(Block::default().borders(Borders::ALL).title(" metric ")),
            area,
        );
        return;
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", series.name));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [chart_area, stats_area] =
        Layout::vertical([Constraint::Min(3), Constraint::Length(2)]).areas(inner);

    let data: Vec<u64> = series.points.iter().map(|point| point.value as u64).collect();
    frame.render_widget(
        Sparkline::default()
            .data(&data)
            .style(Style::default().fg(Color::Cyan)),
        chart_area,
    );
    frame.render_widget(
        Paragraph::new(format!(
            "points {}  min {:.2}  avg {:.2}  max {:.2}",
            series.points.len(),
            series.min,
            series.avg,
            series.max
        )),
        stats_area,
    );
}

fn render_detail(
    frame: &mut ratatui::Frame,
    session: &Session,
    area: Rect,
    index: usize,
    raw: bool,
) {
    let Some(entry) = session.log_entries.get(index) else {
        frame.render_widget(
            Paragraph::new("entry no longer loaded")
                .block(Block::default().borders(Borders::ALL).title(" detail ")),
            area,
        );
        return;
    };

    let title = format!(
        " entry {}/{} {} ",
        index + 1,
        session.log_entries.len(),
        if raw { "(raw)" } else { "" }
    );
    let block = Block::default().borders(Borders::ALL).title(title);

    if raw {
        let body = serde_json::to_string_pretty(&entry.document.0)
            .unwrap_or_else(|_| entry.document.0.to_string());
        frame.render_widget(
            Paragraph::new(body).wrap(Wrap { trim: false }).block(block),
            area,
        );
        return;
    }

    let highlighter = Highlighter::new(&session.filters.query);
    let mut lines = Vec::new();
    let mut paths = Vec::new();
    flatten_document(&entry.document.0, String::new(), &mut paths);
    for (path, value) in paths {
        let mut spans = vec![Span::styled(
            format!("{path}: "),
            Style::default().fg(Color::DarkGray),
        )];
        for segment in highlighter.apply_to_field(&value) {
            if segment.matched {
                spans.push(Span::styled(
                    segment.text,
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ));
            } else {
                spans.push(Span::raw(segment.text));
            }
        }
        lines.push(Line::from(spans));
    }
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(block),
        area,
    );
}

fn flatten_document(value: &serde_json::Value, prefix: String, out: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_document(child, path, out);
            }
        }
        serde_json::Value::Null => {}
        serde_json::Value::String(text) => out.push((prefix, text.clone())),
        other => out.push((prefix, other.to_string())),
    }
}

fn render_chat(frame: &mut ratatui::Frame, view_data: &ViewData, area: Rect) {
    let [transcript_area, input_area] =
        Layout::vertical([Constraint::Min(3), Constraint::Length(3)]).areas(area);

    let mut lines = Vec::new();
    for turn in &view_data.chat.transcript {
        let (prefix, style) = match turn.role {
            ChatRole::User => ("you: ", Style::default().fg(Color::Cyan)),
            ChatRole::Assistant => ("lupa: ", Style::default().fg(Color::Green)),
        };
        let body = if turn.body.is_empty() && view_data.chat.in_flight.is_some() {
            "…"
        } else {
            turn.body.as_str()
        };
        lines.push(Line::from(vec![
            Span::styled(prefix, style.add_modifier(Modifier::BOLD)),
            Span::raw(body.to_owned()),
        ]));
    }
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title(" chat ")),
        transcript_area,
    );

    frame.render_widget(
        Paragraph::new(format!("> {}", view_data.chat.input))
            .block(Block::default().borders(Borders::ALL).title(" message ")),
        input_area,
    );
}

fn overlay_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_input_overlay(frame: &mut ratatui::Frame, area: Rect, title: &str, buffer: &str) {
    let overlay = overlay_area(area, area.width.saturating_sub(10).clamp(20, 70), 3);
    frame.render_widget(Clear, overlay);
    frame.render_widget(
        Paragraph::new(format!("{buffer}_"))
            .block(Block::default().borders(Borders::ALL).title(format!(" {title} "))),
        overlay,
    );
}

fn render_query_overlay(frame: &mut ratatui::Frame, session: &Session, area: Rect) {
    let overlay = overlay_area(
        area,
        area.width.saturating_sub(6).max(30),
        area.height.saturating_sub(4).max(8),
    );
    frame.render_widget(Clear, overlay);

    let body = match &session.rendered_query {
        Some(raw) => match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(parsed) => {
                serde_json::to_string_pretty(&parsed).unwrap_or_else(|_| raw.clone())
            }
            Err(_) => raw.clone(),
        },
        None => "no query issued yet".to_owned(),
    };
    frame.render_widget(
        Paragraph::new(body)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title(" backend query ")),
        overlay,
    );
}

fn render_field_selector(
    frame: &mut ratatui::Frame,
    session: &Session,
    area: Rect,
    cursor: usize,
    filter: &str,
) {
    let overlay = overlay_area(
        area,
        area.width.saturating_sub(10).clamp(30, 72),
        area.height.saturating_sub(4).max(10),
    );
    frame.render_widget(Clear, overlay);

    let ranked = ranked_fields(session);
    let mut lines = vec![Line::from(format!("filter: {filter}_"))];
    let visible_rows = overlay.height.saturating_sub(3) as usize;
    let first = cursor.saturating_sub(visible_rows.saturating_sub(1));
    for (index, entry) in ranked.iter().enumerate().skip(first).take(visible_rows) {
        let marker = if entry.selected { "[x]" } else { "[ ]" };
        let style = if index == cursor {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(
            format!("{marker} {} ({})", entry.name, entry.doc_count),
            style,
        )));
    }
    if ranked.is_empty() {
        lines.push(Line::from("no matching fields"));
    }

    let mut title = " fields ".to_owned();
    if session.is_loading(RequestKind::FieldCaps) {
        title.push_str("loading… ");
    }
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title)),
        overlay,
    );
}

fn render_perspective(
    frame: &mut ratatui::Frame,
    session: &Session,
    area: Rect,
    kind: PerspectiveKind,
    cursor: usize,
) {
    let overlay = overlay_area(
        area,
        area.width.saturating_sub(20).clamp(26, 60),
        area.height.saturating_sub(6).max(8),
    );
    frame.render_widget(Clear, overlay);

    let mut lines = Vec::new();
    let visible_rows = overlay.height.saturating_sub(2) as usize;
    let first = cursor.saturating_sub(visible_rows.saturating_sub(1));
    for (index, item) in session
        .perspective_items
        .iter()
        .enumerate()
        .skip(first)
        .take(visible_rows)
    {
        let style = if index == cursor {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(
            format!("{:<30} {}", item.name, item.count),
            style,
        )));
    }
    if session.perspective_items.is_empty() {
        lines.push(Line::from(if session.is_loading(RequestKind::Perspective) {
            "loading…"
        } else {
            "nothing aggregated"
        }));
    }

    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} (enter include, x exclude) ", kind.label())),
        ),
        overlay,
    );
}

fn render_error_modal(frame: &mut ratatui::Frame, area: Rect, message: &str) {
    let overlay = overlay_area(area, area.width.saturating_sub(12).clamp(24, 70), 6);
    frame.render_widget(Clear, overlay);
    frame.render_widget(
        Paragraph::new(format!("{message}\n\npress esc to dismiss"))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red))
                    .title(" error "),
            ),
        overlay,
    );
}

fn render_quit_confirm(frame: &mut ratatui::Frame, area: Rect) {
    let overlay = overlay_area(area, 30, 4);
    frame.render_widget(Clear, overlay);
    frame.render_widget(
        Paragraph::new("quit lupa? (y/n)")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" quit ")),
        overlay,
    );
}

fn render_help(frame: &mut ratatui::Frame, session: &Session, area: Rect) {
    let overlay = overlay_area(
        area,
        area.width.saturating_sub(10).clamp(34, 64),
        area.height.saturating_sub(4).max(10),
    );
    frame.render_widget(Clear, overlay);

    let parent = session.help_parent_kind();
    let mut lines = Vec::new();
    for group in [
        BindingGroup::Navigate,
        BindingGroup::Filter,
        BindingGroup::View,
        BindingGroup::Session,
    ] {
        let bindings: Vec<_> = bindings_for(parent)
            .iter()
            .filter(|binding| binding.group == group)
            .collect();
        if bindings.is_empty() {
            continue;
        }
        lines.push(Line::from(Span::styled(
            group.label().to_owned(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for binding in bindings {
            let tier = if binding.tier == BindingTier::Quick {
                "*"
            } else {
                " "
            };
            lines.push(Line::from(format!(
                " {tier} {:<10} {}",
                binding.keys, binding.label
            )));
        }
    }

    frame.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(" keys ")),
        overlay,
    );
}

fn render_status_line(
    frame: &mut ratatui::Frame,
    session: &Session,
    view_data: &ViewData,
    area: Rect,
) {
    let left = if let Some(status) = &view_data.status_line {
        status.clone()
    } else if let Some(error) = &session.last_error {
        format!("error: {error}")
    } else if session.any_loading() {
        let loading: Vec<&str> = RequestKind::ALL
            .iter()
            .filter(|kind| session.is_loading(**kind))
            .map(|kind| kind.label())
            .collect();
        format!("loading {}", loading.join(", "))
    } else {
        String::new()
    };

    let hints: Vec<String> = quick_bindings(session.mode.kind())
        .map(|binding| format!("{}:{}", binding.keys, binding.label))
        .collect();
    let right = hints.join("  ");

    let left_width = area.width.saturating_sub(right.chars().count() as u16 + 1) as usize;
    let line = Line::from(vec![
        Span::styled(
            pad_or_truncate(&left, left_width),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw(" "),
        Span::styled(right, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

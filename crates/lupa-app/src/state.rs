// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::fields::{self, DisplayField};
use crate::ledger::{FetchOutcome, FetchPayload, RequestKind, RequestLedger};
use crate::model::{
    AggOptions, CountOptions, FieldCapability, FilterPolarity, Filters, LogEntry, LogLevel,
    Lookback, MetricSeries, PerspectiveItem, PerspectiveKind, PolarFilter, SearchOptions,
    SearchScope, SignalType, SortDirection, TransactionNameAgg,
};

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_INDEX_PATTERN: &str = "logs-*";

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    List,
    SearchInput { buffer: String },
    Detail { index: usize },
    DetailRaw { index: usize },
    IndexInput { buffer: String },
    QueryOverlay,
    FieldSelector { cursor: usize, filter: String },
    MetricsDashboard,
    MetricDetail { index: usize },
    TraceNames,
    PerspectiveList { kind: PerspectiveKind, cursor: usize },
    ErrorModal { message: String },
    QuitConfirm,
    HelpOverlay,
    Chat,
}

impl Mode {
    pub const fn is_surface(&self) -> bool {
        matches!(
            self,
            Self::List
                | Self::Detail { .. }
                | Self::DetailRaw { .. }
                | Self::MetricsDashboard
                | Self::MetricDetail { .. }
                | Self::TraceNames
                | Self::Chat
        )
    }

    pub const fn kind(&self) -> ModeKind {
        match self {
            Self::List => ModeKind::List,
            Self::SearchInput { .. } => ModeKind::SearchInput,
            Self::Detail { .. } => ModeKind::Detail,
            Self::DetailRaw { .. } => ModeKind::DetailRaw,
            Self::IndexInput { .. } => ModeKind::IndexInput,
            Self::QueryOverlay => ModeKind::QueryOverlay,
            Self::FieldSelector { .. } => ModeKind::FieldSelector,
            Self::MetricsDashboard => ModeKind::MetricsDashboard,
            Self::MetricDetail { .. } => ModeKind::MetricDetail,
            Self::TraceNames => ModeKind::TraceNames,
            Self::PerspectiveList { .. } => ModeKind::PerspectiveList,
            Self::ErrorModal { .. } => ModeKind::ErrorModal,
            Self::QuitConfirm => ModeKind::QuitConfirm,
            Self::HelpOverlay => ModeKind::HelpOverlay,
            Self::Chat => ModeKind::Chat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    List,
    SearchInput,
    Detail,
    DetailRaw,
    IndexInput,
    QueryOverlay,
    FieldSelector,
    MetricsDashboard,
    MetricDetail,
    TraceNames,
    PerspectiveList,
    ErrorModal,
    QuitConfirm,
    HelpOverlay,
    Chat,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TraceDrill {
    pub transaction_name: Option<String>,
    pub trace_id: Option<String>,
}

impl TraceDrill {
    pub fn is_active(&self) -> bool {
        self.transaction_name.is_some() || self.trace_id.is_some()
    }

    pub fn walk_up(&mut self) -> bool {
        if self.trace_id.take().is_some() {
            return true;
        }
        self.transaction_name.take().is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    SwitchSignal(SignalType),
    CycleLookback,
    ToggleSort,
    ToggleAutoRefresh,
    CycleLevelFilter,
    ClearFilters,
    StartAutoDetect,
    OpenSearchInput,
    SubmitSearch,
    OpenIndexInput,
    SubmitIndexPattern,
    OpenQueryOverlay,
    OpenFieldSelector,
    ToggleField(String),
    OpenPerspective(PerspectiveKind),
    ApplyPerspective(FilterPolarity),
    OpenDetail,
    ToggleRawDetail,
    OpenHelp,
    DrillSelection,
    MoveCursor(isize),
    Back,
    RequestQuit,
    ConfirmQuit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ModeChanged(ModeKind),
    SignalChanged(SignalType),
    LookbackChanged(Lookback),
    SortChanged(SortDirection),
    AutoRefreshChanged(bool),
    FilterChanged,
    FieldsChanged,
    IndexPatternChanged,
    FetchNeeded(RequestKind),
    DataApplied(RequestKind),
    ErrorRaised(String),
    InputRejected(String),
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub mode: Mode,
    stack: Vec<Mode>,
    pub signal: SignalType,
    pub filters: Filters,
    pub lookback: Lookback,
    pub sort: SortDirection,
    pub auto_refresh: bool,
    pub auto_detect_on_start: bool,
    pub page_size: usize,
    pub index_pattern: String,
    pub display_fields: Vec<DisplayField>,
    pub available_fields: Vec<FieldCapability>,
    pub log_entries: Vec<LogEntry>,
    pub rendered_query: Option<String>,
    pub transaction_names: Vec<TransactionNameAgg>,
    pub metric_series: Vec<MetricSeries>,
    pub perspective_items: Vec<PerspectiveItem>,
    pub drill: TraceDrill,
    pub list_cursor: usize,
    pub trace_cursor: usize,
    pub metric_cursor: usize,
    pub last_error: Option<String>,
    loading: [bool; RequestKind::ALL.len()],
    ledger: RequestLedger,
}

impl Session {
    pub fn new(signal: SignalType) -> Self {
        Self {
            mode: Self::initial_mode(signal),
            stack: Vec::new(),
            signal,
            filters: Filters::default(),
            lookback: Lookback::default(),
            sort: SortDirection::default(),
            auto_refresh: false,
            auto_detect_on_start: false,
            page_size: DEFAULT_PAGE_SIZE,
            index_pattern: DEFAULT_INDEX_PATTERN.to_owned(),
            display_fields: fields::default_fields(signal),
            available_fields: Vec::new(),
            log_entries: Vec::new(),
            rendered_query: None,
            transaction_names: Vec::new(),
            metric_series: Vec::new(),
            perspective_items: Vec::new(),
            drill: TraceDrill::default(),
            list_cursor: 0,
            trace_cursor: 0,
            metric_cursor: 0,
            last_error: None,
            loading: [false; RequestKind::ALL.len()],
            ledger: RequestLedger::default(),
        }
    }

    pub const fn initial_mode(signal: SignalType) -> Mode {
        match signal {
            SignalType::Logs => Mode::List,
            SignalType::Traces => Mode::TraceNames,
            SignalType::Metrics => Mode::MetricsDashboard,
            SignalType::Chat => Mode::Chat,
        }
    }

    pub fn push_mode(&mut self, next: Mode) {
        let previous = std::mem::replace(&mut self.mode, next);
        self.stack.push(previous);
    }

    pub fn pop_mode(&mut self) -> bool {
        match self.stack.pop() {
            Some(previous) => {
                self.mode = previous;
                true
            }
            None => false,
        }
    }

    pub fn peek_parent(&self) -> Option<&Mode> {
        self.stack.last()
    }

    pub fn clear_stack(&mut self) {
        self.stack.clear();
    }

    pub fn surface_mode(&self) -> &Mode {
        std::iter::once(&self.mode)
            .chain(self.stack.iter().rev())
            .find(|mode| mode.is_surface())
            .unwrap_or(&self.mode)
    }

    pub fn help_parent_kind(&self) -> ModeKind {
        if self.mode.kind() == ModeKind::HelpOverlay {
            self.peek_parent()
                .map_or(ModeKind::List, |parent| parent.kind())
        } else {
            self.mode.kind()
        }
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_loading(&self, kind: RequestKind) -> bool {
        self.loading[kind.index()]
    }

    pub fn any_loading(&self) -> bool {
        self.loading.iter().any(|flag| *flag)
    }

    pub fn current_generation(&self, kind: RequestKind) -> u64 {
        self.ledger.current(kind)
    }

    pub fn refresh_kind(&self) -> Option<RequestKind> {
        match self.signal {
            SignalType::Logs => Some(RequestKind::Logs),
            SignalType::Traces => {
                if self.drill.is_active() {
                    Some(RequestKind::Logs)
                } else {
                    Some(RequestKind::TransactionNames)
                }
            }
            SignalType::Metrics => Some(RequestKind::MetricsAgg),
            SignalType::Chat => None,
        }
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            signal: self.signal,
            filters: self.filters.clone(),
            lookback: self.lookback,
            sort: self.sort,
            page_size: self.page_size,
            search_fields: fields::collect_search_fields(&self.display_fields),
            scope: SearchScope {
                transaction_name: self.drill.transaction_name.clone(),
                trace_id: self.drill.trace_id.clone(),
            },
        }
    }

    pub fn count_options(&self) -> CountOptions {
        CountOptions {
            signal: self.signal,
            filters: self.filters.clone(),
            lookback: self.lookback,
        }
    }

    pub fn agg_options(&self) -> AggOptions {
        AggOptions {
            filters: self.filters.clone(),
            lookback: self.lookback,
        }
    }

    pub fn begin_fetch(&mut self, kind: RequestKind) -> u64 {
        self.loading[kind.index()] = true;
        self.ledger.next(kind)
    }

    pub fn apply_fetch(&mut self, outcome: FetchOutcome) -> Vec<SessionEvent> {
        let FetchOutcome {
            kind,
            generation,
            result,
        } = outcome;
        if !self.ledger.is_current(kind, generation) {
            return Vec::new();
        }
        self.loading[kind.index()] = false;

        match result {
            Ok(payload) => {
                self.last_error = None;
                let mut events = vec![SessionEvent::DataApplied(kind)];
                match payload {
                    FetchPayload::Logs {
                        entries,
                        rendered_query,
                    } => {
                        self.log_entries = entries;
                        self.rendered_query = rendered_query;
                        self.list_cursor = clamp_cursor(self.list_cursor, self.log_entries.len());
                        if let Mode::Detail { index } | Mode::DetailRaw { index } = &mut self.mode {
                            *index = clamp_cursor(*index, self.log_entries.len());
                        }
                    }
                    FetchPayload::Metrics(series) => {
                        self.metric_series = series;
                        self.metric_cursor =
                            clamp_cursor(self.metric_cursor, self.metric_series.len());
                    }
                    FetchPayload::TransactionNames(names) => {
                        self.transaction_names = names;
                        self.trace_cursor =
                            clamp_cursor(self.trace_cursor, self.transaction_names.len());
                    }
                    FetchPayload::FieldCaps(capabilities) => {
                        self.available_fields = capabilities;
                    }
                    FetchPayload::Perspective { items, .. } => {
                        self.perspective_items = items;
                        if let Mode::PerspectiveList { cursor, .. } = &mut self.mode {
                            *cursor = clamp_cursor(*cursor, self.perspective_items.len());
                        }
                    }
                    FetchPayload::AutoDetect { lookback, .. } => {
                        self.lookback = lookback;
                        events.push(SessionEvent::LookbackChanged(lookback));
                        if let Some(refresh) = self.refresh_kind() {
                            events.push(SessionEvent::FetchNeeded(refresh));
                        }
                    }
                }
                events
            }
            Err(message) => self.raise_error(message),
        }
    }

    pub fn raise_error(&mut self, message: String) -> Vec<SessionEvent> {
        self.last_error = Some(message.clone());
        let mut events = vec![SessionEvent::ErrorRaised(message.clone())];
        if self.mode.kind() != ModeKind::ErrorModal {
            self.push_mode(Mode::ErrorModal { message });
            events.push(SessionEvent::ModeChanged(ModeKind::ErrorModal));
        }
        events
    }

    pub fn apply(&mut self, command: SessionCommand) -> Vec<SessionEvent> {
        match command {
            SessionCommand::SwitchSignal(next) => self.switch_signal(next),
            SessionCommand::CycleLookback => {
                self.lookback = self.lookback.next();
                let mut events = vec![SessionEvent::LookbackChanged(self.lookback)];
                events.extend(self.refresh_event());
                events
            }
            SessionCommand::ToggleSort => {
                self.sort = self.sort.toggled();
                let mut events = vec![SessionEvent::SortChanged(self.sort)];
                events.extend(self.refresh_event());
                events
            }
            SessionCommand::ToggleAutoRefresh => {
                self.auto_refresh = !self.auto_refresh;
                vec![SessionEvent::AutoRefreshChanged(self.auto_refresh)]
            }
            SessionCommand::CycleLevelFilter => {
                self.filters.level = LogLevel::cycled(self.filters.level);
                let mut events = vec![SessionEvent::FilterChanged];
                events.extend(self.refresh_event());
                events
            }
            SessionCommand::ClearFilters => {
                self.filters = Filters::default();
                let mut events = vec![SessionEvent::FilterChanged];
                events.extend(self.refresh_event());
                events
            }
            SessionCommand::StartAutoDetect => {
                vec![SessionEvent::FetchNeeded(RequestKind::AutoDetect)]
            }
            SessionCommand::OpenSearchInput => {
                let buffer = self.filters.query.clone();
                self.push_mode(Mode::SearchInput { buffer });
                vec![SessionEvent::ModeChanged(ModeKind::SearchInput)]
            }
            SessionCommand::SubmitSearch => self.submit_search(),
            SessionCommand::OpenIndexInput => {
                let buffer = self.index_pattern.clone();
                self.push_mode(Mode::IndexInput { buffer });
                vec![SessionEvent::ModeChanged(ModeKind::IndexInput)]
            }
            SessionCommand::SubmitIndexPattern => self.submit_index_pattern(),
            SessionCommand::OpenQueryOverlay => {
                self.push_mode(Mode::QueryOverlay);
                vec![SessionEvent::ModeChanged(ModeKind::QueryOverlay)]
            }
            SessionCommand::OpenFieldSelector => {
                self.push_mode(Mode::FieldSelector {
                    cursor: 0,
                    filter: String::new(),
                });
                vec![
                    SessionEvent::ModeChanged(ModeKind::FieldSelector),
                    SessionEvent::FetchNeeded(RequestKind::FieldCaps),
                ]
            }
            SessionCommand::ToggleField(path) => {
                fields::toggle_field(&mut self.display_fields, &path);
                let mut events = vec![SessionEvent::FieldsChanged];
                events.extend(self.refresh_event());
                events
            }
            SessionCommand::OpenPerspective(kind) => {
                self.push_mode(Mode::PerspectiveList { kind, cursor: 0 });
                vec![
                    SessionEvent::ModeChanged(ModeKind::PerspectiveList),
                    SessionEvent::FetchNeeded(RequestKind::Perspective),
                ]
            }
            SessionCommand::ApplyPerspective(polarity) => self.apply_perspective(polarity),
            SessionCommand::OpenDetail => self.open_detail(),
            SessionCommand::ToggleRawDetail => match &self.mode {
                Mode::Detail { index } => {
                    let index = *index;
                    self.push_mode(Mode::DetailRaw { index });
                    vec![SessionEvent::ModeChanged(ModeKind::DetailRaw)]
                }
                Mode::DetailRaw { .. } => {
                    if self.pop_mode() {
                        vec![SessionEvent::ModeChanged(self.mode.kind())]
                    } else {
                        Vec::new()
                    }
                }
                _ => Vec::new(),
            },
            SessionCommand::OpenHelp => {
                if self.mode.kind() == ModeKind::HelpOverlay {
                    return Vec::new();
                }
                self.push_mode(Mode::HelpOverlay);
                vec![SessionEvent::ModeChanged(ModeKind::HelpOverlay)]
            }
            SessionCommand::DrillSelection => self.drill_selection(),
            SessionCommand::MoveCursor(delta) => {
                self.move_cursor(delta);
                Vec::new()
            }
            SessionCommand::Back => self.back(),
            SessionCommand::RequestQuit => self.request_quit(),
            SessionCommand::ConfirmQuit => {
                if self.mode.kind() == ModeKind::QuitConfirm {
                    vec![SessionEvent::Quit]
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn refresh_event(&self) -> Option<SessionEvent> {
        self.refresh_kind().map(SessionEvent::FetchNeeded)
    }

    fn switch_signal(&mut self, next: SignalType) -> Vec<SessionEvent> {
        if next == self.signal {
            return Vec::new();
        }
        self.signal = next;
        self.clear_stack();
        self.drill = TraceDrill::default();
        self.display_fields = fields::default_fields(next);
        self.mode = Self::initial_mode(next);
        self.list_cursor = 0;
        self.trace_cursor = 0;
        self.metric_cursor = 0;

        let mut events = vec![
            SessionEvent::SignalChanged(next),
            SessionEvent::ModeChanged(self.mode.kind()),
        ];
        events.extend(self.refresh_event());
        if next != SignalType::Chat {
            events.push(SessionEvent::FetchNeeded(RequestKind::FieldCaps));
        }
        events
    }

    fn submit_search(&mut self) -> Vec<SessionEvent> {
        let Mode::SearchInput { buffer } = &self.mode else {
            return Vec::new();
        };
        self.filters.query = buffer.trim().to_owned();
        self.pop_mode();
        let mut events = vec![
            SessionEvent::FilterChanged,
            SessionEvent::ModeChanged(self.mode.kind()),
        ];
        events.extend(self.refresh_event());
        events
    }

    fn submit_index_pattern(&mut self) -> Vec<SessionEvent> {
        let Mode::IndexInput { buffer } = &self.mode else {
            return Vec::new();
        };
        let trimmed = buffer.trim().to_owned();
        if trimmed.is_empty() {
            return vec![SessionEvent::InputRejected(
                "index pattern must not be empty".to_owned(),
            )];
        }
        self.index_pattern = trimmed;
        self.pop_mode();
        let mut events = vec![
            SessionEvent::IndexPatternChanged,
            SessionEvent::ModeChanged(self.mode.kind()),
        ];
        events.extend(self.refresh_event());
        events.push(SessionEvent::FetchNeeded(RequestKind::FieldCaps));
        events
    }

    fn apply_perspective(&mut self, polarity: FilterPolarity) -> Vec<SessionEvent> {
        let Mode::PerspectiveList { kind, cursor } = &self.mode else {
            return Vec::new();
        };
        let Some(item) = self.perspective_items.get(*cursor) else {
            return Vec::new();
        };
        let filter = PolarFilter {
            value: item.name.clone(),
            polarity,
        };
        match kind {
            PerspectiveKind::Services => self.filters.service = Some(filter),
            PerspectiveKind::Resources => self.filters.resource = Some(filter),
        }
        self.pop_mode();
        let mut events = vec![
            SessionEvent::FilterChanged,
            SessionEvent::ModeChanged(self.mode.kind()),
        ];
        events.extend(self.refresh_event());
        events
    }

    fn open_detail(&mut self) -> Vec<SessionEvent> {
        match self.mode {
            Mode::List if !self.log_entries.is_empty() => {
                let index = self.list_cursor;
                self.push_mode(Mode::Detail { index });
                vec![SessionEvent::ModeChanged(ModeKind::Detail)]
            }
            Mode::MetricsDashboard if !self.metric_series.is_empty() => {
                let index = self.metric_cursor;
                self.push_mode(Mode::MetricDetail { index });
                vec![SessionEvent::ModeChanged(ModeKind::MetricDetail)]
            }
            _ => Vec::new(),
        }
    }

    fn drill_selection(&mut self) -> Vec<SessionEvent> {
        match self.mode {
            Mode::TraceNames => {
                let Some(agg) = self.transaction_names.get(self.trace_cursor) else {
                    return Vec::new();
                };
                self.drill.transaction_name = Some(agg.name.clone());
                self.drill.trace_id = None;
                self.list_cursor = 0;
                self.push_mode(Mode::List);
                vec![
                    SessionEvent::ModeChanged(ModeKind::List),
                    SessionEvent::FetchNeeded(RequestKind::Logs),
                ]
            }
            Mode::List
                if self.signal == SignalType::Traces
                    && self.drill.transaction_name.is_some()
                    && self.drill.trace_id.is_none() =>
            {
                let Some(trace_id) = self
                    .log_entries
                    .get(self.list_cursor)
                    .and_then(LogEntry::trace_id)
                else {
                    return Vec::new();
                };
                self.drill.trace_id = Some(trace_id);
                self.list_cursor = 0;
                vec![SessionEvent::FetchNeeded(RequestKind::Logs)]
            }
            _ => Vec::new(),
        }
    }

    fn back(&mut self) -> Vec<SessionEvent> {
        if self.mode.kind() == ModeKind::List && self.signal == SignalType::Traces {
            if self.drill.trace_id.take().is_some() {
                self.list_cursor = 0;
                return vec![SessionEvent::FetchNeeded(RequestKind::Logs)];
            }
            if self.drill.transaction_name.take().is_some() {
                self.list_cursor = 0;
                if self.pop_mode() {
                    return vec![SessionEvent::ModeChanged(self.mode.kind())];
                }
                self.mode = Mode::TraceNames;
                return vec![SessionEvent::ModeChanged(ModeKind::TraceNames)];
            }
        }

        if self.pop_mode() {
            vec![SessionEvent::ModeChanged(self.mode.kind())]
        } else {
            Vec::new()
        }
    }

    fn request_quit(&mut self) -> Vec<SessionEvent> {
        let at_top_level = self.stack.is_empty()
            && self.mode.kind() == Self::initial_mode(self.signal).kind()
            && !self.drill.is_active();
        if at_top_level {
            return vec![SessionEvent::Quit];
        }
        if self.mode.kind() == ModeKind::QuitConfirm {
            return Vec::new();
        }
        self.push_mode(Mode::QuitConfirm);
        vec![SessionEvent::ModeChanged(ModeKind::QuitConfirm)]
    }

    fn move_cursor(&mut self, delta: isize) {
        match &mut self.mode {
            Mode::List => {
                self.list_cursor = step(self.list_cursor, delta, self.log_entries.len());
            }
            Mode::TraceNames => {
                self.trace_cursor = step(self.trace_cursor, delta, self.transaction_names.len());
            }
            Mode::MetricsDashboard => {
                self.metric_cursor = step(self.metric_cursor, delta, self.metric_series.len());
            }
            Mode::Detail { index } | Mode::DetailRaw { index } => {
                *index = step(*index, delta, self.log_entries.len());
            }
            Mode::MetricDetail { index } => {
                *index = step(*index, delta, self.metric_series.len());
            }
            Mode::PerspectiveList { cursor, .. } => {
                *cursor = step(*cursor, delta, self.perspective_items.len());
            }
            Mode::FieldSelector { cursor, filter } => {
                let bounds = fields::ranked_field_list(
                    &self.available_fields,
                    &self.display_fields,
                    filter,
                )
                .len();
                *cursor = step(*cursor, delta, bounds);
            }
            _ => {}
        }
    }
}

fn clamp_cursor(cursor: usize, len: usize) -> usize {
    cursor.min(len.saturating_sub(1))
}

fn step(cursor: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let moved = cursor as isize + delta;
    moved.clamp(0, len as isize - 1) as usize
}

#[cfg(test)]
mod tests {
    use super::{Mode, ModeKind, Session, SessionCommand, SessionEvent};
    use crate::ledger::{FetchOutcome, FetchPayload, RequestKind};
    use crate::model::{
        Document, FilterPolarity, Lookback, LogEntry, PerspectiveItem, PerspectiveKind,
        SignalType, TransactionNameAgg,
    };
    use serde_json::json;

    fn entry(message: &str, trace_id: Option<&str>) -> LogEntry {
        let mut source = json!({ "message": message });
        if let Some(id) = trace_id {
            source["trace"] = json!({ "id": id });
        }
        LogEntry {
            timestamp: None,
            level: Some("info".to_owned()),
            service: Some("checkout".to_owned()),
            message: message.to_owned(),
            document: Document(source),
        }
    }

    fn transaction(name: &str) -> TransactionNameAgg {
        TransactionNameAgg {
            name: name.to_owned(),
            count: 10,
            avg_duration_us: 1_500.0,
            p95_duration_us: 4_000.0,
            error_rate: 0.1,
        }
    }

    fn logs_outcome(generation: u64, messages: &[&str]) -> FetchOutcome {
        FetchOutcome {
            kind: RequestKind::Logs,
            generation,
            result: Ok(FetchPayload::Logs {
                entries: messages.iter().map(|message| entry(message, None)).collect(),
                rendered_query: Some("{}".to_owned()),
            }),
        }
    }

    #[test]
    fn initial_mode_follows_signal() {
        assert_eq!(Session::new(SignalType::Logs).mode, Mode::List);
        assert_eq!(Session::new(SignalType::Traces).mode, Mode::TraceNames);
        assert_eq!(Session::new(SignalType::Metrics).mode, Mode::MetricsDashboard);
        assert_eq!(Session::new(SignalType::Chat).mode, Mode::Chat);
    }

    #[test]
    fn push_pop_stack_symmetry() {
        let mut session = Session::new(SignalType::Logs);
        let original = session.mode.clone();

        session.push_mode(Mode::QueryOverlay);
        session.push_mode(Mode::HelpOverlay);
        session.push_mode(Mode::QuitConfirm);
        assert_eq!(session.stack_depth(), 3);

        assert!(session.pop_mode());
        assert!(session.pop_mode());
        assert!(session.pop_mode());
        assert_eq!(session.mode, original);
        assert_eq!(session.stack_depth(), 0);
    }

    #[test]
    fn pop_on_empty_stack_is_reported_noop() {
        let mut session = Session::new(SignalType::Logs);
        let before = session.clone();
        assert!(!session.pop_mode());
        assert_eq!(session, before);
    }

    #[test]
    fn peek_parent_does_not_mutate() {
        let mut session = Session::new(SignalType::Logs);
        session.push_mode(Mode::HelpOverlay);
        assert_eq!(session.peek_parent(), Some(&Mode::List));
        assert_eq!(session.stack_depth(), 1);
        assert_eq!(session.mode, Mode::HelpOverlay);
    }

    #[test]
    fn stale_result_is_discarded_without_touching_state() {
        let mut session = Session::new(SignalType::Logs);
        let first = session.begin_fetch(RequestKind::Logs);
        let second = session.begin_fetch(RequestKind::Logs);

        let events = session.apply_fetch(logs_outcome(second, &["fresh"]));
        assert_eq!(events, vec![SessionEvent::DataApplied(RequestKind::Logs)]);
        assert_eq!(session.log_entries.len(), 1);
        assert_eq!(session.log_entries[0].message, "fresh");
        assert!(!session.is_loading(RequestKind::Logs));

        let third = session.begin_fetch(RequestKind::Logs);
        assert!(session.is_loading(RequestKind::Logs));
        let events = session.apply_fetch(logs_outcome(first, &["stale"]));
        assert!(events.is_empty());
        assert_eq!(session.log_entries[0].message, "fresh");
        assert!(session.is_loading(RequestKind::Logs));

        let events = session.apply_fetch(logs_outcome(third, &["newest"]));
        assert_eq!(events, vec![SessionEvent::DataApplied(RequestKind::Logs)]);
        assert_eq!(session.log_entries[0].message, "newest");
    }

    #[test]
    fn out_of_order_completion_applies_only_latest_generation() {
        let mut session = Session::new(SignalType::Logs);
        let g1 = session.begin_fetch(RequestKind::Logs);
        let g2 = session.begin_fetch(RequestKind::Logs);

        assert!(session.apply_fetch(logs_outcome(g1, &["old"])).is_empty());
        let events = session.apply_fetch(logs_outcome(g2, &["new"]));
        assert_eq!(events, vec![SessionEvent::DataApplied(RequestKind::Logs)]);
        assert_eq!(session.log_entries[0].message, "new");
    }

    #[test]
    fn failed_fetch_keeps_previous_data_and_opens_error_modal() {
        let mut session = Session::new(SignalType::Logs);
        let generation = session.begin_fetch(RequestKind::Logs);
        session.apply_fetch(logs_outcome(generation, &["kept"]));

        let generation = session.begin_fetch(RequestKind::Logs);
        let events = session.apply_fetch(FetchOutcome {
            kind: RequestKind::Logs,
            generation,
            result: Err("backend unreachable".to_owned()),
        });
        assert!(events.contains(&SessionEvent::ModeChanged(ModeKind::ErrorModal)));
        assert_eq!(session.log_entries[0].message, "kept");
        assert_eq!(session.last_error.as_deref(), Some("backend unreachable"));
        assert!(!session.is_loading(RequestKind::Logs));

        assert_eq!(
            session.apply(SessionCommand::Back),
            vec![SessionEvent::ModeChanged(ModeKind::List)]
        );
    }

    #[test]
    fn auto_detect_result_updates_lookback_and_chains_refresh() {
        let mut session = Session::new(SignalType::Logs);
        let generation = session.begin_fetch(RequestKind::AutoDetect);
        let events = session.apply_fetch(FetchOutcome {
            kind: RequestKind::AutoDetect,
            generation,
            result: Ok(FetchPayload::AutoDetect {
                lookback: Lookback::OneDay,
                observed_count: 12_000,
            }),
        });
        assert_eq!(session.lookback, Lookback::OneDay);
        assert!(events.contains(&SessionEvent::LookbackChanged(Lookback::OneDay)));
        assert!(events.contains(&SessionEvent::FetchNeeded(RequestKind::Logs)));
    }

    #[test]
    fn switch_signal_clears_stack_and_requests_data() {
        let mut session = Session::new(SignalType::Logs);
        session.push_mode(Mode::HelpOverlay);

        let events = session.apply(SessionCommand::SwitchSignal(SignalType::Traces));
        assert_eq!(session.mode, Mode::TraceNames);
        assert_eq!(session.stack_depth(), 0);
        assert!(events.contains(&SessionEvent::SignalChanged(SignalType::Traces)));
        assert!(events.contains(&SessionEvent::FetchNeeded(RequestKind::TransactionNames)));
        assert!(events.contains(&SessionEvent::FetchNeeded(RequestKind::FieldCaps)));
    }

    #[test]
    fn switch_to_same_signal_is_noop() {
        let mut session = Session::new(SignalType::Logs);
        assert!(session
            .apply(SessionCommand::SwitchSignal(SignalType::Logs))
            .is_empty());
    }

    #[test]
    fn search_submit_updates_filter_and_refetches() {
        let mut session = Session::new(SignalType::Logs);
        session.apply(SessionCommand::OpenSearchInput);
        if let Mode::SearchInput { buffer } = &mut session.mode {
            buffer.push_str("timeout");
        }

        let events = session.apply(SessionCommand::SubmitSearch);
        assert_eq!(session.filters.query, "timeout");
        assert_eq!(session.mode, Mode::List);
        assert!(events.contains(&SessionEvent::FetchNeeded(RequestKind::Logs)));
    }

    #[test]
    fn empty_index_pattern_is_rejected_locally() {
        let mut session = Session::new(SignalType::Logs);
        session.apply(SessionCommand::OpenIndexInput);
        if let Mode::IndexInput { buffer } = &mut session.mode {
            buffer.clear();
            buffer.push_str("   ");
        }

        let events = session.apply(SessionCommand::SubmitIndexPattern);
        assert_eq!(
            events,
            vec![SessionEvent::InputRejected(
                "index pattern must not be empty".to_owned()
            )]
        );
        assert_eq!(session.mode.kind(), ModeKind::IndexInput);
        assert_eq!(session.index_pattern, "logs-*");
    }

    #[test]
    fn index_pattern_submit_refetches_fields_and_data() {
        let mut session = Session::new(SignalType::Logs);
        session.apply(SessionCommand::OpenIndexInput);
        if let Mode::IndexInput { buffer } = &mut session.mode {
            buffer.clear();
            buffer.push_str("apm-*");
        }

        let events = session.apply(SessionCommand::SubmitIndexPattern);
        assert_eq!(session.index_pattern, "apm-*");
        assert!(events.contains(&SessionEvent::FetchNeeded(RequestKind::Logs)));
        assert!(events.contains(&SessionEvent::FetchNeeded(RequestKind::FieldCaps)));
    }

    #[test]
    fn perspective_selection_sets_polar_filter() {
        let mut session = Session::new(SignalType::Logs);
        session.apply(SessionCommand::OpenPerspective(PerspectiveKind::Services));
        session.perspective_items = vec![
            PerspectiveItem {
                name: "checkout".to_owned(),
                count: 100,
            },
            PerspectiveItem {
                name: "billing".to_owned(),
                count: 50,
            },
        ];
        session.apply(SessionCommand::MoveCursor(1));

        let events = session.apply(SessionCommand::ApplyPerspective(FilterPolarity::Exclude));
        let service = session.filters.service.clone().expect("service filter set");
        assert_eq!(service.value, "billing");
        assert_eq!(service.polarity, FilterPolarity::Exclude);
        assert_eq!(session.mode, Mode::List);
        assert!(events.contains(&SessionEvent::FetchNeeded(RequestKind::Logs)));
    }

    #[test]
    fn trace_escape_walks_data_hierarchy_before_popping() {
        let mut session = Session::new(SignalType::Traces);
        session.transaction_names = vec![transaction("GET /cart")];

        let events = session.apply(SessionCommand::DrillSelection);
        assert_eq!(session.mode, Mode::List);
        assert_eq!(session.drill.transaction_name.as_deref(), Some("GET /cart"));
        assert!(events.contains(&SessionEvent::FetchNeeded(RequestKind::Logs)));

        session.log_entries = vec![entry("span", Some("trace-1"))];
        let events = session.apply(SessionCommand::DrillSelection);
        assert_eq!(session.drill.trace_id.as_deref(), Some("trace-1"));
        assert!(events.contains(&SessionEvent::FetchNeeded(RequestKind::Logs)));

        let events = session.apply(SessionCommand::Back);
        assert_eq!(session.drill.trace_id, None);
        assert_eq!(session.drill.transaction_name.as_deref(), Some("GET /cart"));
        assert_eq!(session.mode, Mode::List);
        assert!(events.contains(&SessionEvent::FetchNeeded(RequestKind::Logs)));

        session.apply(SessionCommand::Back);
        assert_eq!(session.mode, Mode::TraceNames);
        assert!(!session.drill.is_active());
    }

    #[test]
    fn quit_is_immediate_only_at_top_level() {
        let mut session = Session::new(SignalType::Logs);
        assert_eq!(
            session.apply(SessionCommand::RequestQuit),
            vec![SessionEvent::Quit]
        );

        let mut session = Session::new(SignalType::Logs);
        session.apply(SessionCommand::OpenQueryOverlay);
        let events = session.apply(SessionCommand::RequestQuit);
        assert_eq!(events, vec![SessionEvent::ModeChanged(ModeKind::QuitConfirm)]);
        assert_eq!(
            session.apply(SessionCommand::ConfirmQuit),
            vec![SessionEvent::Quit]
        );
    }

    #[test]
    fn quit_confirm_can_be_cancelled_by_back() {
        let mut session = Session::new(SignalType::Logs);
        session.apply(SessionCommand::OpenQueryOverlay);
        session.apply(SessionCommand::RequestQuit);
        session.apply(SessionCommand::Back);
        assert_eq!(session.mode.kind(), ModeKind::QueryOverlay);
    }

    #[test]
    fn detail_raw_toggle_round_trips_through_stack() {
        let mut session = Session::new(SignalType::Logs);
        session.log_entries = vec![entry("one", None), entry("two", None)];
        session.apply(SessionCommand::MoveCursor(1));
        session.apply(SessionCommand::OpenDetail);
        assert_eq!(session.mode, Mode::Detail { index: 1 });

        session.apply(SessionCommand::ToggleRawDetail);
        assert_eq!(session.mode, Mode::DetailRaw { index: 1 });

        session.apply(SessionCommand::ToggleRawDetail);
        assert_eq!(session.mode, Mode::Detail { index: 1 });

        session.apply(SessionCommand::Back);
        assert_eq!(session.mode, Mode::List);
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut session = Session::new(SignalType::Logs);
        session.apply(SessionCommand::MoveCursor(5));
        assert_eq!(session.list_cursor, 0);

        session.log_entries = vec![entry("a", None), entry("b", None), entry("c", None)];
        session.apply(SessionCommand::MoveCursor(10));
        assert_eq!(session.list_cursor, 2);
        session.apply(SessionCommand::MoveCursor(-10));
        assert_eq!(session.list_cursor, 0);
    }

    #[test]
    fn shrinking_result_set_clamps_cursor() {
        let mut session = Session::new(SignalType::Logs);
        let generation = session.begin_fetch(RequestKind::Logs);
        session.apply_fetch(logs_outcome(generation, &["a", "b", "c"]));
        session.apply(SessionCommand::MoveCursor(2));
        assert_eq!(session.list_cursor, 2);

        let generation = session.begin_fetch(RequestKind::Logs);
        session.apply_fetch(logs_outcome(generation, &["only"]));
        assert_eq!(session.list_cursor, 0);
    }

    #[test]
    fn field_toggle_triggers_refetch() {
        let mut session = Session::new(SignalType::Logs);
        let events = session.apply(SessionCommand::ToggleField("http.request.method".to_owned()));
        assert!(events.contains(&SessionEvent::FieldsChanged));
        assert!(events.contains(&SessionEvent::FetchNeeded(RequestKind::Logs)));
        assert!(session
            .display_fields
            .iter()
            .any(|field| field.path == "http.request.method"));
    }

    #[test]
    fn search_options_capture_drill_scope() {
        let mut session = Session::new(SignalType::Traces);
        session.transaction_names = vec![transaction("GET /cart")];
        session.apply(SessionCommand::DrillSelection);

        let options = session.search_options();
        assert_eq!(options.scope.transaction_name.as_deref(), Some("GET /cart"));
        assert_eq!(options.scope.trace_id, None);
        assert_eq!(options.signal, SignalType::Traces);
        assert!(options.search_fields.contains(&"transaction.name".to_owned()));
    }

    #[test]
    fn refresh_kind_tracks_signal_and_drill() {
        let mut session = Session::new(SignalType::Traces);
        assert_eq!(session.refresh_kind(), Some(RequestKind::TransactionNames));
        session.drill.transaction_name = Some("GET /cart".to_owned());
        assert_eq!(session.refresh_kind(), Some(RequestKind::Logs));

        assert_eq!(
            Session::new(SignalType::Chat).refresh_kind(),
            None
        );
        assert_eq!(
            Session::new(SignalType::Metrics).refresh_kind(),
            Some(RequestKind::MetricsAgg)
        );
    }

    #[test]
    fn error_modal_is_not_stacked_twice() {
        let mut session = Session::new(SignalType::Logs);
        session.raise_error("first".to_owned());
        let depth = session.stack_depth();
        session.raise_error("second".to_owned());
        assert_eq!(session.stack_depth(), depth);
        assert_eq!(session.last_error.as_deref(), Some("second"));
    }
}

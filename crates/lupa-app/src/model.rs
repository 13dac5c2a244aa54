// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalType {
    Logs,
    Traces,
    Metrics,
    Chat,
}

impl SignalType {
    pub const ALL: [Self; 4] = [Self::Logs, Self::Traces, Self::Metrics, Self::Chat];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Logs => "logs",
            Self::Traces => "traces",
            Self::Metrics => "metrics",
            Self::Chat => "chat",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "logs" => Some(Self::Logs),
            "traces" => Some(Self::Traces),
            "metrics" => Some(Self::Metrics),
            "chat" => Some(Self::Chat),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Logs => "logs",
            Self::Traces => "traces",
            Self::Metrics => "metrics",
            Self::Chat => "chat",
        }
    }

    pub const fn event_kind(self) -> Option<&'static str> {
        match self {
            Self::Logs | Self::Chat => None,
            Self::Traces => Some("transaction"),
            Self::Metrics => Some("metric"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Lookback {
    FiveMinutes,
    OneHour,
    OneDay,
    OneWeek,
    All,
}

impl Lookback {
    pub const ALL: [Self; 5] = [
        Self::FiveMinutes,
        Self::OneHour,
        Self::OneDay,
        Self::OneWeek,
        Self::All,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FiveMinutes => "5m",
            Self::OneHour => "1h",
            Self::OneDay => "24h",
            Self::OneWeek => "1w",
            Self::All => "all",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "5m" => Some(Self::FiveMinutes),
            "1h" => Some(Self::OneHour),
            "24h" => Some(Self::OneDay),
            "1w" => Some(Self::OneWeek),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    pub const fn narrowest() -> Self {
        Self::FiveMinutes
    }

    pub fn next(self) -> Self {
        let position = Self::ALL
            .iter()
            .position(|entry| *entry == self)
            .unwrap_or(0);
        Self::ALL[(position + 1) % Self::ALL.len()]
    }

    pub const fn range_expression(self) -> Option<&'static str> {
        match self {
            Self::FiveMinutes => Some("now-5m"),
            Self::OneHour => Some("now-1h"),
            Self::OneDay => Some("now-24h"),
            Self::OneWeek => Some("now-7d"),
            Self::All => None,
        }
    }

    pub const fn histogram_interval(self) -> &'static str {
        match self {
            Self::FiveMinutes => "10s",
            Self::OneHour => "1m",
            Self::OneDay => "30m",
            Self::OneWeek => "3h",
            Self::All => "1d",
        }
    }
}

impl Default for Lookback {
    fn default() -> Self {
        Self::OneHour
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl Default for SortDirection {
    fn default() -> Self {
        Self::Desc
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub const ALL: [Self; 5] = [
        Self::Error,
        Self::Warn,
        Self::Info,
        Self::Debug,
        Self::Trace,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "error" | "err" | "fatal" | "critical" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }

    pub fn cycled(current: Option<Self>) -> Option<Self> {
        match current {
            None => Some(Self::Error),
            Some(level) => {
                let position = Self::ALL
                    .iter()
                    .position(|entry| *entry == level)
                    .unwrap_or(0);
                if position + 1 >= Self::ALL.len() {
                    None
                } else {
                    Some(Self::ALL[position + 1])
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterPolarity {
    Include,
    Exclude,
}

impl FilterPolarity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Include => "include",
            Self::Exclude => "exclude",
        }
    }

    pub const fn marker(self) -> &'static str {
        match self {
            Self::Include => "+",
            Self::Exclude => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolarFilter {
    pub value: String,
    pub polarity: FilterPolarity,
}

impl PolarFilter {
    pub fn include(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            polarity: FilterPolarity::Include,
        }
    }

    pub fn exclude(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            polarity: FilterPolarity::Exclude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Filters {
    pub query: String,
    pub level: Option<LogLevel>,
    pub service: Option<PolarFilter>,
    pub resource: Option<PolarFilter>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.query.trim().is_empty()
            && self.level.is_none()
            && self.service.is_none()
            && self.resource.is_none()
    }

    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.query.trim().is_empty() {
            parts.push(format!("q:{}", self.query.trim()));
        }
        if let Some(level) = self.level {
            parts.push(format!("level:{}", level.as_str()));
        }
        if let Some(service) = &self.service {
            parts.push(format!("svc{}{}", service.polarity.marker(), service.value));
        }
        if let Some(resource) = &self.resource {
            parts.push(format!("res{}{}", resource.polarity.marker(), resource.value));
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerspectiveKind {
    Services,
    Resources,
}

impl PerspectiveKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Services => "services",
            Self::Resources => "resources",
        }
    }

    pub const fn field(self) -> &'static str {
        match self {
            Self::Services => "service.name",
            Self::Resources => "resource.name",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Document(pub Value);

impl Document {
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let Value::Object(map) = &self.0 else {
            return None;
        };
        if let Some(value) = map.get(path) {
            return Some(value);
        }

        let mut current = &self.0;
        for segment in path.split('.') {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn get_text(&self, path: &str) -> Option<String> {
        match self.get_path(path)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            Value::Array(values) => Some(
                values
                    .iter()
                    .map(|value| match value {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            Value::Null | Value::Object(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: Option<OffsetDateTime>,
    pub level: Option<String>,
    pub service: Option<String>,
    pub message: String,
    pub document: Document,
}

impl LogEntry {
    pub fn field_text(&self, path: &str) -> Option<String> {
        self.document.get_text(path)
    }

    pub fn trace_id(&self) -> Option<String> {
        self.document.get_text("trace.id")
    }

    pub fn transaction_name(&self) -> Option<String> {
        self.document.get_text("transaction.name")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionNameAgg {
    pub name: String,
    pub count: u64,
    pub avg_duration_us: f64,
    pub p95_duration_us: f64,
    pub error_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub epoch_millis: i64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub name: String,
    pub points: Vec<MetricPoint>,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerspectiveItem {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCapability {
    pub name: String,
    pub doc_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SearchScope {
    pub transaction_name: Option<String>,
    pub trace_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub signal: SignalType,
    pub filters: Filters,
    pub lookback: Lookback,
    pub sort: SortDirection,
    pub page_size: usize,
    pub search_fields: Vec<String>,
    pub scope: SearchScope,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountOptions {
    pub signal: SignalType,
    pub filters: Filters,
    pub lookback: Lookback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggOptions {
    pub filters: Filters,
    pub lookback: Lookback,
}

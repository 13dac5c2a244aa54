// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::model::{FieldCapability, Lookback, LogEntry, MetricSeries, PerspectiveItem,
    PerspectiveKind, TransactionNameAgg};
use std::time::Duration;

pub const POINT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const AGGREGATION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Logs,
    MetricsAgg,
    TransactionNames,
    FieldCaps,
    Perspective,
    AutoDetect,
}

impl RequestKind {
    pub const ALL: [Self; 6] = [
        Self::Logs,
        Self::MetricsAgg,
        Self::TransactionNames,
        Self::FieldCaps,
        Self::Perspective,
        Self::AutoDetect,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Logs => "logs",
            Self::MetricsAgg => "metrics",
            Self::TransactionNames => "transactions",
            Self::FieldCaps => "fields",
            Self::Perspective => "perspective",
            Self::AutoDetect => "auto-range",
        }
    }

    pub const fn timeout(self) -> Duration {
        match self {
            Self::Logs | Self::FieldCaps => POINT_FETCH_TIMEOUT,
            Self::MetricsAgg | Self::TransactionNames | Self::Perspective | Self::AutoDetect => {
                AGGREGATION_TIMEOUT
            }
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Logs => 0,
            Self::MetricsAgg => 1,
            Self::TransactionNames => 2,
            Self::FieldCaps => 3,
            Self::Perspective => 4,
            Self::AutoDetect => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestLedger {
    generations: [u64; RequestKind::ALL.len()],
}

impl RequestLedger {
    pub fn next(&mut self, kind: RequestKind) -> u64 {
        let slot = &mut self.generations[kind.index()];
        *slot += 1;
        *slot
    }

    pub fn current(&self, kind: RequestKind) -> u64 {
        self.generations[kind.index()]
    }

    pub fn is_current(&self, kind: RequestKind, generation: u64) -> bool {
        self.current(kind) == generation
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchPayload {
    Logs {
        entries: Vec<LogEntry>,
        rendered_query: Option<String>,
    },
    Metrics(Vec<MetricSeries>),
    TransactionNames(Vec<TransactionNameAgg>),
    FieldCaps(Vec<FieldCapability>),
    Perspective {
        kind: PerspectiveKind,
        items: Vec<PerspectiveItem>,
    },
    AutoDetect {
        lookback: Lookback,
        observed_count: u64,
    },
}

impl FetchPayload {
    pub const fn kind(&self) -> RequestKind {
        match self {
            Self::Logs { .. } => RequestKind::Logs,
            Self::Metrics(_) => RequestKind::MetricsAgg,
            Self::TransactionNames(_) => RequestKind::TransactionNames,
            Self::FieldCaps(_) => RequestKind::FieldCaps,
            Self::Perspective { .. } => RequestKind::Perspective,
            Self::AutoDetect { .. } => RequestKind::AutoDetect,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub kind: RequestKind,
    pub generation: u64,
    pub result: Result<FetchPayload, String>,
}

#[cfg(test)]
mod tests {
    use super::{AGGREGATION_TIMEOUT, POINT_FETCH_TIMEOUT, RequestKind, RequestLedger};

    #[test]
    fn generations_are_monotonic_per_kind() {
        let mut ledger = RequestLedger::default();
        assert_eq!(ledger.next(RequestKind::Logs), 1);
        assert_eq!(ledger.next(RequestKind::Logs), 2);
        assert_eq!(ledger.next(RequestKind::Perspective), 1);
        assert_eq!(ledger.current(RequestKind::Logs), 2);
        assert_eq!(ledger.current(RequestKind::Perspective), 1);
    }

    #[test]
    fn staleness_compares_against_latest_generation() {
        let mut ledger = RequestLedger::default();
        let first = ledger.next(RequestKind::Logs);
        let second = ledger.next(RequestKind::Logs);
        assert!(!ledger.is_current(RequestKind::Logs, first));
        assert!(ledger.is_current(RequestKind::Logs, second));
    }

    #[test]
    fn point_fetches_use_short_timeout() {
        assert_eq!(RequestKind::Logs.timeout(), POINT_FETCH_TIMEOUT);
        assert_eq!(RequestKind::FieldCaps.timeout(), POINT_FETCH_TIMEOUT);
        assert_eq!(RequestKind::MetricsAgg.timeout(), AGGREGATION_TIMEOUT);
        assert_eq!(RequestKind::AutoDetect.timeout(), AGGREGATION_TIMEOUT);
    }
}

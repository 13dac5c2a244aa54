// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use lupa_app::{
    Document, FieldCapability, LogEntry, Lookback, MetricPoint, MetricSeries, PerspectiveItem,
    PerspectiveKind, TransactionNameAgg,
};
use serde_json::json;
use time::{Duration, OffsetDateTime};

const SERVICES: [&str; 6] = [
    "checkout",
    "billing",
    "catalog",
    "gateway",
    "search",
    "notifications",
];

const LEVELS: [&str; 5] = ["info", "warn", "error", "debug", "info"];

const MESSAGES: [&str; 8] = [
    "request completed",
    "upstream timeout while calling billing",
    "connection reset by peer",
    "cache miss for product listing",
    "retrying payment capture",
    "slow query detected",
    "request completed with degraded latency",
    "scheduled export finished",
];

const TRANSACTION_NAMES: [&str; 6] = [
    "GET /api/cart",
    "POST /api/checkout",
    "GET /api/products",
    "GET /api/products/{id}",
    "POST /api/payments",
    "GET /healthz",
];

const RESOURCES: [&str; 5] = [
    "postgresql",
    "redis",
    "elasticsearch",
    "kafka",
    "s3",
];

const METRIC_NAMES: [&str; 4] = [
    "system.cpu.total.norm.pct",
    "system.memory.actual.free",
    "jvm.gc.alloc",
    "nodejs.eventloop.delay.avg.ms",
];

pub fn base_time() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH + Duration::days(20_000)
}

pub fn sample_log_entries(count: usize) -> Vec<LogEntry> {
    (0..count)
        .map(|index| {
            let service = SERVICES[index % SERVICES.len()];
            let level = LEVELS[index % LEVELS.len()];
            let message = MESSAGES[index % MESSAGES.len()];
            let timestamp = base_time() - Duration::seconds(index as i64 * 7);
            let trace_id = format!("trace-{:04}", index / 3);
            LogEntry {
                timestamp: Some(timestamp),
                level: Some(level.to_owned()),
                service: Some(service.to_owned()),
                message: message.to_owned(),
                document: Document(json!({
                    "message": message,
                    "log": { "level": level },
                    "service": { "name": service },
                    "trace": { "id": trace_id },
                    "transaction": {
                        "name": TRANSACTION_NAMES[index % TRANSACTION_NAMES.len()],
                        "duration": { "us": 900 + (index as i64 % 17) * 350 },
                    },
                    "host": { "name": format!("node-{}", index % 4) },
                    "url": { "path": format!("/api/{}", service) },
                })),
            }
        })
        .collect()
}

pub fn sample_transaction_names(count: usize) -> Vec<TransactionNameAgg> {
    (0..count)
        .map(|index| TransactionNameAgg {
            name: TRANSACTION_NAMES[index % TRANSACTION_NAMES.len()].to_owned(),
            count: 1_000_u64.saturating_sub(index as u64 * 90),
            avg_duration_us: 1_200.0 + index as f64 * 310.0,
            p95_duration_us: 4_800.0 + index as f64 * 900.0,
            error_rate: (index as f64 * 0.015) % 0.3,
        })
        .collect()
}

pub fn sample_metric_series(count: usize) -> Vec<MetricSeries> {
    (0..count)
        .map(|index| {
            let points: Vec<MetricPoint> = (0..24)
                .map(|step| MetricPoint {
                    epoch_millis: (base_time() + Duration::minutes(step * 5)).unix_timestamp()
                        * 1_000,
                    value: ((index + 1) * 10) as f64
                        + ((step * 7 + index as i64 * 3) % 23) as f64,
                })
                .collect();
            let values: Vec<f64> = points.iter().map(|point| point.value).collect();
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let avg = values.iter().sum::<f64>() / values.len() as f64;
            MetricSeries {
                name: METRIC_NAMES[index % METRIC_NAMES.len()].to_owned(),
                points,
                min,
                max,
                avg,
            }
        })
        .collect()
}

pub fn sample_perspective(kind: PerspectiveKind) -> Vec<PerspectiveItem> {
    let names: &[&str] = match kind {
        PerspectiveKind::Services => &SERVICES,
        PerspectiveKind::Resources => &RESOURCES,
    };
    names
        .iter()
        .enumerate()
        .map(|(index, name)| PerspectiveItem {
            name: (*name).to_owned(),
            count: 5_000_u64.saturating_sub(index as u64 * 700),
        })
        .collect()
}

pub fn sample_field_capabilities() -> Vec<FieldCapability> {
    [
        ("@timestamp", 9_800),
        ("message", 9_800),
        ("log.level", 9_650),
        ("service.name", 9_800),
        ("host.name", 9_400),
        ("url.path", 7_200),
        ("trace.id", 6_900),
        ("transaction.name", 6_900),
        ("transaction.duration.us", 6_900),
        ("http.response.status_code", 5_400),
        ("kubernetes.pod.name", 3_100),
        ("error.message", 840),
    ]
    .into_iter()
    .map(|(name, doc_count)| FieldCapability {
        name: name.to_owned(),
        doc_count,
    })
    .collect()
}

pub fn lookback_counts(counts: [u64; 5]) -> impl FnMut(Lookback) -> anyhow::Result<u64> {
    move |lookback| {
        let index = Lookback::ALL
            .iter()
            .position(|entry| *entry == lookback)
            .expect("lookback is a member of the ordered set");
        Ok(counts[index])
    }
}

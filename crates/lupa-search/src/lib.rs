// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use lupa_app::{
    AGGREGATION_TIMEOUT, AggOptions, CountOptions, Document, FieldCapability, Filters, LogEntry,
    Lookback, MetricPoint, MetricSeries, POINT_FETCH_TIMEOUT, PerspectiveItem, PerspectiveKind,
    SearchOptions, SignalType, SortDirection,
    TransactionNameAgg,
};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use url::Url;

const FIELD_SAMPLE_SIZE: usize = 100;
const TRANSACTION_NAME_BUCKETS: usize = 50;
const PERSPECTIVE_BUCKETS: usize = 40;
const METRIC_SERIES_BUCKETS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    None,
    Basic { username: String, password: String },
    ApiKey(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub entries: Vec<LogEntry>,
    pub rendered_query: String,
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    index_pattern: String,
    credentials: Credentials,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, index_pattern: &str, credentials: Credentials) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("backend.base_url must not be empty");
        }
        Url::parse(&base_url)
            .with_context(|| format!("backend.base_url {base_url:?} is not a valid URL"))?;
        if index_pattern.trim().is_empty() {
            bail!("backend.index_pattern must not be empty");
        }

        let http = HttpClient::builder()
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            index_pattern: index_pattern.trim().to_owned(),
            credentials,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn index_pattern(&self) -> &str {
        &self.index_pattern
    }

    pub fn set_index_pattern(&mut self, pattern: &str) -> Result<()> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            bail!("index pattern must not be empty");
        }
        self.index_pattern = trimmed.to_owned();
        Ok(())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::None => request,
            Credentials::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            Credentials::ApiKey(key) => request.header("Authorization", format!("ApiKey {key}")),
        }
    }

    fn post_json(&self, path: &str, body: &Value, timeout: std::time::Duration) -> Result<Value> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .authorize(self.http.post(&url).timeout(timeout).json(body))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        response.json().context("decode backend response")
    }

    pub fn search(&self, options: &SearchOptions) -> Result<SearchResult> {
        let body = build_search_body(options);
        let rendered_query = serde_json::to_string(&body).context("render query body")?;
        let parsed = self.post_json(
            &format!("{}/_search", self.index_pattern),
            &body,
            POINT_FETCH_TIMEOUT,
        )?;
        Ok(SearchResult {
            entries: parse_hits(&parsed),
            rendered_query,
        })
    }

    pub fn tail(&self, options: &SearchOptions) -> Result<SearchResult> {
        let mut options = options.clone();
        options.filters.query.clear();
        options.sort = SortDirection::Desc;
        self.search(&options)
    }

    pub fn count(&self, options: &CountOptions) -> Result<u64> {
        let body = build_count_body(options);
        let parsed = self.post_json(
            &format!("{}/_count", self.index_pattern),
            &body,
            AGGREGATION_TIMEOUT,
        )?;
        parsed
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| anyhow!("count response missing count field"))
    }

    pub fn aggregate_metrics(&self, options: &AggOptions) -> Result<Vec<MetricSeries>> {
        let body = build_metrics_body(options);
        let parsed = self.post_json(
            &format!("{}/_search", self.index_pattern),
            &body,
            AGGREGATION_TIMEOUT,
        )?;

        let buckets = agg_buckets(&parsed, "series");
        let mut series = Vec::new();
        for bucket in buckets {
            let Some(name) = bucket.get("key").and_then(Value::as_str) else {
                continue;
            };
            let points: Vec<MetricPoint> = bucket
                .get("over_time")
                .and_then(|agg| agg.get("buckets"))
                .and_then(Value::as_array)
                .map(|entries| {
                    entries
                        .iter()
                        .filter_map(|entry| {
                            Some(MetricPoint {
                                epoch_millis: entry.get("key")?.as_i64()?,
                                value: entry.get("doc_count")?.as_f64()?,
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();
            let values: Vec<f64> = points.iter().map(|point| point.value).collect();
            let (min, max, avg) = if values.is_empty() {
                (0.0, 0.0, 0.0)
            } else {
                (
                    values.iter().copied().fold(f64::INFINITY, f64::min),
                    values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                    values.iter().sum::<f64>() / values.len() as f64,
                )
            };
            series.push(MetricSeries {
                name: name.to_owned(),
                points,
                min,
                max,
                avg,
            });
        }
        Ok(series)
    }

    pub fn transaction_names(&self, options: &AggOptions) -> Result<Vec<TransactionNameAgg>> {
        let body = build_transaction_names_body(options);
        let parsed = self.post_json(
            &format!("{}/_search", self.index_pattern),
            &body,
            AGGREGATION_TIMEOUT,
        )?;

        let mut names = Vec::new();
        for bucket in agg_buckets(&parsed, "names") {
            let Some(name) = bucket.get("key").and_then(Value::as_str) else {
                continue;
            };
            let count = bucket
                .get("doc_count")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            let avg_duration_us = bucket
                .get("avg_duration")
                .and_then(|agg| agg.get("value"))
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            let p95_duration_us = bucket
                .get("p95_duration")
                .and_then(|agg| agg.get("values"))
                .and_then(|values| values.get("95.0"))
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            let failures = bucket
                .get("failures")
                .and_then(|agg| agg.get("doc_count"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            let error_rate = if count == 0 {
                0.0
            } else {
                failures as f64 / count as f64
            };
            names.push(TransactionNameAgg {
                name: name.to_owned(),
                count,
                avg_duration_us,
                p95_duration_us,
                error_rate,
            });
        }
        Ok(names)
    }

    pub fn perspective(
        &self,
        kind: PerspectiveKind,
        options: &AggOptions,
    ) -> Result<Vec<PerspectiveItem>> {
        let body = build_perspective_body(kind, options);
        let parsed = self.post_json(
            &format!("{}/_search", self.index_pattern),
            &body,
            AGGREGATION_TIMEOUT,
        )?;

        Ok(agg_buckets(&parsed, "values")
            .iter()
            .filter_map(|bucket| {
                Some(PerspectiveItem {
                    name: bucket.get("key")?.as_str()?.to_owned(),
                    count: bucket.get("doc_count")?.as_u64()?,
                })
            })
            .collect())
    }

    pub fn field_capabilities(&self) -> Result<Vec<FieldCapability>> {
        let url = format!(
            "{}/{}/_field_caps?fields=*",
            self.base_url, self.index_pattern
        );
        let response = self
            .authorize(self.http.get(&url).timeout(POINT_FETCH_TIMEOUT))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        let parsed: Value = response.json().context("decode field capabilities")?;
        let Some(fields) = parsed.get("fields").and_then(Value::as_object) else {
            bail!("field capabilities response missing fields object");
        };
        let mut names: Vec<String> = fields
            .keys()
            .filter(|name| !name.starts_with('_'))
            .cloned()
            .collect();
        names.sort();

        let counts = self.sample_field_counts()?;
        Ok(names
            .into_iter()
            .map(|name| {
                let doc_count = counts.get(&name).copied().unwrap_or(0);
                FieldCapability { name, doc_count }
            })
            .collect())
    }

    fn sample_field_counts(&self) -> Result<std::collections::HashMap<String, u64>> {
        let body = json!({
            "size": FIELD_SAMPLE_SIZE,
            "sort": [{ "@timestamp": { "order": "desc", "unmapped_type": "date" } }],
            "query": { "match_all": {} },
        });
        let parsed = self.post_json(
            &format!("{}/_search", self.index_pattern),
            &body,
            POINT_FETCH_TIMEOUT,
        )?;

        let mut counts = std::collections::HashMap::new();
        if let Some(hits) = parsed
            .get("hits")
            .and_then(|hits| hits.get("hits"))
            .and_then(Value::as_array)
        {
            for hit in hits {
                if let Some(source) = hit.get("_source") {
                    let mut paths = Vec::new();
                    flatten_paths(source, String::new(), &mut paths);
                    for path in paths {
                        *counts.entry(path).or_insert(0) += 1;
                    }
                }
            }
        }
        Ok(counts)
    }

    pub fn ping(&self) -> Result<()> {
        let response = self
            .authorize(self.http.get(&self.base_url).timeout(POINT_FETCH_TIMEOUT))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(())
    }
}

pub fn build_query(
    filters: &Filters,
    lookback: Lookback,
    signal: SignalType,
    search_fields: &[String],
    scope: &lupa_app::SearchScope,
) -> Value {
    let mut must: Vec<Value> = Vec::new();
    let mut must_not: Vec<Value> = Vec::new();

    if let Some(expression) = lookback.range_expression() {
        must.push(json!({ "range": { "@timestamp": { "gte": expression } } }));
    }

    if let Some(trace_id) = &scope.trace_id {
        must.push(json!({ "term": { "trace.id": trace_id } }));
    } else {
        if let Some(name) = &scope.transaction_name {
            must.push(json!({ "term": { "transaction.name": name } }));
        }
        if let Some(kind) = signal.event_kind() {
            must.push(json!({ "term": { "processor.event": kind } }));
        }
    }

    let query = filters.query.trim();
    if !query.is_empty() {
        if search_fields.is_empty() {
            must.push(json!({ "multi_match": { "query": query, "lenient": true } }));
        } else {
            must.push(json!({
                "multi_match": { "query": query, "fields": search_fields, "lenient": true }
            }));
        }
    }

    if let Some(level) = filters.level {
        must.push(json!({ "term": { "log.level": level.as_str() } }));
    }

    for (field, filter) in [
        ("service.name", &filters.service),
        ("resource.name", &filters.resource),
    ] {
        let Some(filter) = filter else { continue };
        let clause = json!({ "term": { field: filter.value } });
        match filter.polarity {
            lupa_app::FilterPolarity::Include => must.push(clause),
            lupa_app::FilterPolarity::Exclude => must_not.push(clause),
        }
    }

    json!({ "bool": { "must": must, "must_not": must_not } })
}

pub fn build_search_body(options: &SearchOptions) -> Value {
    json!({
        "size": options.page_size,
        "sort": [{ "@timestamp": { "order": options.sort.as_str(), "unmapped_type": "date" } }],
        "query": build_query(
            &options.filters,
            options.lookback,
            options.signal,
            &options.search_fields,
            &options.scope,
        ),
    })
}

pub fn build_count_body(options: &CountOptions) -> Value {
    json!({
        "query": build_query(
            &options.filters,
            options.lookback,
            options.signal,
            &[],
            &lupa_app::SearchScope::default(),
        ),
    })
}

pub fn build_metrics_body(options: &AggOptions) -> Value {
    json!({
        "size": 0,
        "query": build_query(
            &options.filters,
            options.lookback,
            SignalType::Metrics,
            &[],
            &lupa_app::SearchScope::default(),
        ),
        "aggs": {
            "series": {
                "terms": { "field": "metricset.name", "size": METRIC_SERIES_BUCKETS },
                "aggs": {
                    "over_time": {
                        "date_histogram": {
                            "field": "@timestamp",
                            "fixed_interval": options.lookback.histogram_interval(),
                        },
                    },
                },
            },
        },
    })
}

pub fn build_transaction_names_body(options: &AggOptions) -> Value {
    json!({
        "size": 0,
        "query": build_query(
            &options.filters,
            options.lookback,
            SignalType::Traces,
            &[],
            &lupa_app::SearchScope::default(),
        ),
        "aggs": {
            "names": {
                "terms": { "field": "transaction.name", "size": TRANSACTION_NAME_BUCKETS },
                "aggs": {
                    "avg_duration": { "avg": { "field": "transaction.duration.us" } },
                    "p95_duration": {
                        "percentiles": {
                            "field": "transaction.duration.us",
                            "percents": [95.0],
                        },
                    },
                    "failures": {
                        "filter": { "term": { "event.outcome": "failure" } },
                    },
                },
            },
        },
    })
}

pub fn build_perspective_body(kind: PerspectiveKind, options: &AggOptions) -> Value {
    json!({
        "size": 0,
        "query": build_query(
            &options.filters,
            options.lookback,
            SignalType::Logs,
            &[],
            &lupa_app::SearchScope::default(),
        ),
        "aggs": {
            "values": {
                "terms": { "field": kind.field(), "size": PERSPECTIVE_BUCKETS },
            },
        },
    })
}

fn parse_hits(parsed: &Value) -> Vec<LogEntry> {
    let Some(hits) = parsed
        .get("hits")
        .and_then(|hits| hits.get("hits"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };
    hits.iter()
        .filter_map(|hit| hit.get("_source").cloned())
        .map(parse_log_entry)
        .collect()
}

fn parse_log_entry(source: Value) -> LogEntry {
    let document = Document(source);
    let timestamp = document
        .get_text("@timestamp")
        .and_then(|raw| OffsetDateTime::parse(&raw, &Rfc3339).ok());
    let level = document.get_text("log.level");
    let service = document.get_text("service.name");
    let message = document
        .get_text("message")
        .or_else(|| document.get_text("transaction.name"))
        .unwrap_or_default();
    LogEntry {
        timestamp,
        level,
        service,
        message,
        document,
    }
}

fn agg_buckets<'a>(parsed: &'a Value, name: &str) -> Vec<&'a Map<String, Value>> {
    parsed
        .get("aggregations")
        .and_then(|aggs| aggs.get(name))
        .and_then(|agg| agg.get("buckets"))
        .and_then(Value::as_array)
        .map(|buckets| buckets.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

fn flatten_paths(value: &Value, prefix: String, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_paths(child, path, out);
            }
        }
        Value::Null => {}
        _ => {
            if !prefix.is_empty() {
                out.push(prefix);
            }
        }
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("request to {base_url} timed out");
    }
    anyhow!(
        "cannot reach search backend at {base_url}: {error} -- verify [backend] base_url and credentials"
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    let reason = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|parsed| {
            parsed
                .get("error")
                .and_then(|error| error.get("reason"))
                .and_then(Value::as_str)
                .map(str::to_owned)
        });
    match reason {
        Some(reason) => anyhow!("backend returned {status}: {reason}"),
        None if body.trim().is_empty() => anyhow!("backend returned {status}"),
        None => {
            let trimmed: String = body.chars().take(200).collect();
            anyhow!("backend returned {status}: {trimmed}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Client, Credentials, build_count_body, build_perspective_body, build_query,
        build_search_body, build_transaction_names_body, parse_log_entry,
    };
    use lupa_app::{
        CountOptions, Filters, LogLevel, Lookback, PerspectiveKind, PolarFilter, SearchOptions,
        SearchScope, SignalType, SortDirection,
    };
    use serde_json::json;

    fn options() -> SearchOptions {
        SearchOptions {
            signal: SignalType::Logs,
            filters: Filters::default(),
            lookback: Lookback::OneHour,
            sort: SortDirection::Desc,
            page_size: 100,
            search_fields: vec!["message".to_owned(), "service.name".to_owned()],
            scope: SearchScope::default(),
        }
    }

    #[test]
    fn new_rejects_invalid_configuration() {
        assert!(Client::new("", "logs-*", Credentials::None).is_err());
        assert!(Client::new("not a url", "logs-*", Credentials::None).is_err());
        assert!(Client::new("http://localhost:9200", "  ", Credentials::None).is_err());
    }

    #[test]
    fn set_index_pattern_rejects_empty() {
        let mut client =
            Client::new("http://localhost:9200", "logs-*", Credentials::None).expect("client");
        assert!(client.set_index_pattern("  ").is_err());
        client.set_index_pattern(" apm-* ").expect("valid pattern");
        assert_eq!(client.index_pattern(), "apm-*");
    }

    #[test]
    fn query_includes_lookback_range() {
        let body = build_search_body(&options());
        let must = body["query"]["bool"]["must"].as_array().expect("must array");
        assert!(must.iter().any(|clause| {
            clause["range"]["@timestamp"]["gte"] == json!("now-1h")
        }));
    }

    #[test]
    fn all_lookback_has_no_range_clause() {
        let mut options = options();
        options.lookback = Lookback::All;
        let body = build_search_body(&options);
        let must = body["query"]["bool"]["must"].as_array().expect("must array");
        assert!(must.iter().all(|clause| clause.get("range").is_none()));
    }

    #[test]
    fn free_text_searches_collected_fields() {
        let mut options = options();
        options.filters.query = "timeout".to_owned();
        let body = build_search_body(&options);
        let must = body["query"]["bool"]["must"].as_array().expect("must array");
        let multi_match = must
            .iter()
            .find_map(|clause| clause.get("multi_match"))
            .expect("multi_match clause");
        assert_eq!(multi_match["query"], json!("timeout"));
        assert_eq!(multi_match["fields"], json!(["message", "service.name"]));
    }

    #[test]
    fn exclude_polarity_lands_in_must_not() {
        let mut options = options();
        options.filters.service = Some(PolarFilter::include("checkout"));
        options.filters.resource = Some(PolarFilter::exclude("redis"));
        let body = build_search_body(&options);
        let bool_query = &body["query"]["bool"];
        assert!(bool_query["must"]
            .as_array()
            .expect("must")
            .iter()
            .any(|clause| clause["term"]["service.name"] == json!("checkout")));
        assert!(bool_query["must_not"]
            .as_array()
            .expect("must_not")
            .iter()
            .any(|clause| clause["term"]["resource.name"] == json!("redis")));
    }

    #[test]
    fn level_filter_becomes_term_clause() {
        let mut options = options();
        options.filters.level = Some(LogLevel::Error);
        let body = build_search_body(&options);
        assert!(body["query"]["bool"]["must"]
            .as_array()
            .expect("must")
            .iter()
            .any(|clause| clause["term"]["log.level"] == json!("error")));
    }

    #[test]
    fn trace_scope_overrides_event_kind_narrowing() {
        let scope = SearchScope {
            transaction_name: Some("GET /cart".to_owned()),
            trace_id: Some("abc123".to_owned()),
        };
        let query = build_query(
            &Filters::default(),
            Lookback::All,
            SignalType::Traces,
            &[],
            &scope,
        );
        let must = query["bool"]["must"].as_array().expect("must");
        assert!(must.iter().any(|clause| clause["term"]["trace.id"] == json!("abc123")));
        assert!(must
            .iter()
            .all(|clause| clause.get("term").and_then(|term| term.get("processor.event")).is_none()));
    }

    #[test]
    fn transaction_scope_narrows_to_transaction_events() {
        let scope = SearchScope {
            transaction_name: Some("GET /cart".to_owned()),
            trace_id: None,
        };
        let query = build_query(
            &Filters::default(),
            Lookback::All,
            SignalType::Traces,
            &[],
            &scope,
        );
        let must = query["bool"]["must"].as_array().expect("must");
        assert!(must
            .iter()
            .any(|clause| clause["term"]["transaction.name"] == json!("GET /cart")));
        assert!(must
            .iter()
            .any(|clause| clause["term"]["processor.event"] == json!("transaction")));
    }

    #[test]
    fn count_body_carries_signal_narrowing() {
        let body = build_count_body(&CountOptions {
            signal: SignalType::Traces,
            filters: Filters::default(),
            lookback: Lookback::FiveMinutes,
        });
        let must = body["query"]["bool"]["must"].as_array().expect("must");
        assert!(must
            .iter()
            .any(|clause| clause["term"]["processor.event"] == json!("transaction")));
        assert!(body.get("size").is_none());
    }

    #[test]
    fn transaction_names_body_nests_duration_and_failure_aggs() {
        let body = build_transaction_names_body(&lupa_app::AggOptions {
            filters: Filters::default(),
            lookback: Lookback::OneDay,
        });
        let aggs = &body["aggs"]["names"]["aggs"];
        assert_eq!(
            aggs["avg_duration"]["avg"]["field"],
            json!("transaction.duration.us")
        );
        assert_eq!(
            aggs["failures"]["filter"]["term"]["event.outcome"],
            json!("failure")
        );
    }

    #[test]
    fn perspective_body_targets_kind_field() {
        let body = build_perspective_body(
            PerspectiveKind::Resources,
            &lupa_app::AggOptions {
                filters: Filters::default(),
                lookback: Lookback::OneDay,
            },
        );
        assert_eq!(
            body["aggs"]["values"]["terms"]["field"],
            json!("resource.name")
        );
    }

    #[test]
    fn log_entry_parsing_pulls_typed_header_fields() {
        let entry = parse_log_entry(json!({
            "@timestamp": "2026-01-09T10:15:30Z",
            "message": "upstream timeout",
            "log": { "level": "error" },
            "service": { "name": "checkout" },
        }));
        assert!(entry.timestamp.is_some());
        assert_eq!(entry.level.as_deref(), Some("error"));
        assert_eq!(entry.service.as_deref(), Some("checkout"));
        assert_eq!(entry.message, "upstream timeout");
    }

    #[test]
    fn log_entry_without_message_falls_back_to_transaction_name() {
        let entry = parse_log_entry(json!({
            "transaction": { "name": "GET /cart" },
        }));
        assert_eq!(entry.message, "GET /cart");
    }
}

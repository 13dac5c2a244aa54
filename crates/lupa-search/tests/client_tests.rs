// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use lupa_app::{
    AggOptions, CountOptions, Filters, Lookback, PerspectiveKind, SearchOptions, SearchScope,
    SignalType, SortDirection,
};
use lupa_search::{Client, Credentials};
use std::thread;
use tiny_http::{Header, Response, Server};

fn json_response(body: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body)
        .with_status_code(200)
        .with_header(
            Header::from_bytes("Content-Type", "application/json")
                .expect("valid content type header"),
        )
}

fn search_options() -> SearchOptions {
    SearchOptions {
        signal: SignalType::Logs,
        filters: Filters::default(),
        lookback: Lookback::OneHour,
        sort: SortDirection::Desc,
        page_size: 50,
        search_fields: vec!["message".to_owned()],
        scope: SearchScope::default(),
    }
}

#[test]
fn ping_error_contains_actionable_remediation() {
    let client = Client::new("http://127.0.0.1:1", "logs-*", Credentials::None)
        .expect("client should initialize");

    let error = client
        .ping()
        .expect_err("ping should fail for unreachable endpoint");
    let message = error.to_string();
    assert!(message.contains("[backend] base_url"));
}

#[test]
fn search_parses_hits_and_returns_rendered_query() -> Result<()> {
    let server = Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/logs-*/_search");
        let body = r#"{
            "hits": { "hits": [
                { "_source": {
                    "@timestamp": "2026-01-09T10:15:30Z",
                    "message": "upstream timeout",
                    "log": { "level": "error" },
                    "service": { "name": "checkout" }
                } },
                { "_source": { "message": "request completed" } }
            ] }
        }"#;
        request.respond(json_response(body)).expect("respond");
    });

    let client = Client::new(&addr, "logs-*", Credentials::None)?;
    let result = client.search(&search_options())?;

    assert_eq!(result.entries.len(), 2);
    assert_eq!(result.entries[0].message, "upstream timeout");
    assert_eq!(result.entries[0].service.as_deref(), Some("checkout"));
    assert!(result.rendered_query.contains("now-1h"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn count_reads_count_field() -> Result<()> {
    let server = Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/logs-*/_count");
        request
            .respond(json_response(r#"{ "count": 12000 }"#))
            .expect("respond");
    });

    let client = Client::new(&addr, "logs-*", Credentials::None)?;
    let count = client.count(&CountOptions {
        signal: SignalType::Logs,
        filters: Filters::default(),
        lookback: Lookback::OneDay,
    })?;
    assert_eq!(count, 12_000);

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn transaction_names_parses_nested_aggregations() -> Result<()> {
    let server = Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/apm-*/_search");
        let body = r#"{
            "aggregations": { "names": { "buckets": [
                {
                    "key": "GET /api/cart",
                    "doc_count": 200,
                    "avg_duration": { "value": 1500.5 },
                    "p95_duration": { "values": { "95.0": 4800.0 } },
                    "failures": { "doc_count": 20 }
                }
            ] } }
        }"#;
        request.respond(json_response(body)).expect("respond");
    });

    let client = Client::new(&addr, "apm-*", Credentials::None)?;
    let names = client.transaction_names(&AggOptions {
        filters: Filters::default(),
        lookback: Lookback::OneDay,
    })?;

    assert_eq!(names.len(), 1);
    assert_eq!(names[0].name, "GET /api/cart");
    assert_eq!(names[0].count, 200);
    assert!((names[0].avg_duration_us - 1500.5).abs() < f64::EPSILON);
    assert!((names[0].p95_duration_us - 4800.0).abs() < f64::EPSILON);
    assert!((names[0].error_rate - 0.1).abs() < 1e-9);

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn perspective_parses_terms_buckets() -> Result<()> {
    let server = Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let body = r#"{
            "aggregations": { "values": { "buckets": [
                { "key": "checkout", "doc_count": 5000 },
                { "key": "billing", "doc_count": 1200 }
            ] } }
        }"#;
        request.respond(json_response(body)).expect("respond");
    });

    let client = Client::new(&addr, "logs-*", Credentials::None)?;
    let items = client.perspective(
        PerspectiveKind::Services,
        &AggOptions {
            filters: Filters::default(),
            lookback: Lookback::OneHour,
        },
    )?;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].name, "checkout");
    assert_eq!(items[0].count, 5_000);

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn backend_error_reason_is_surfaced() -> Result<()> {
    let server = Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let response = Response::from_string(
            r#"{ "error": { "reason": "no such index [logs-nope]" } }"#,
        )
        .with_status_code(404);
        request.respond(response).expect("respond");
    });

    let client = Client::new(&addr, "logs-nope", Credentials::None)?;
    let error = client
        .search(&search_options())
        .expect_err("missing index should fail");
    assert!(error.to_string().contains("no such index [logs-nope]"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn field_capabilities_merge_names_with_sampled_counts() -> Result<()> {
    let server = Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let caps = server.recv().expect("field caps request expected");
        assert!(caps.url().starts_with("/logs-*/_field_caps"));
        caps.respond(json_response(
            r#"{ "fields": {
                "@timestamp": { "date": {} },
                "message": { "text": {} },
                "service.name": { "keyword": {} },
                "_id": { "_id": {} }
            } }"#,
        ))
        .expect("respond");

        let sample = server.recv().expect("sample request expected");
        assert_eq!(sample.url(), "/logs-*/_search");
        sample
            .respond(json_response(
                r#"{ "hits": { "hits": [
                    { "_source": { "message": "a", "service": { "name": "checkout" } } },
                    { "_source": { "message": "b" } }
                ] } }"#,
            ))
            .expect("respond");
    });

    let client = Client::new(&addr, "logs-*", Credentials::None)?;
    let capabilities = client.field_capabilities()?;

    assert!(!capabilities.iter().any(|entry| entry.name == "_id"));
    let message = capabilities
        .iter()
        .find(|entry| entry.name == "message")
        .expect("message field present");
    assert_eq!(message.doc_count, 2);
    let service = capabilities
        .iter()
        .find(|entry| entry.name == "service.name")
        .expect("service field present");
    assert_eq!(service.doc_count, 1);

    handle.join().expect("server thread should join");
    Ok(())
}

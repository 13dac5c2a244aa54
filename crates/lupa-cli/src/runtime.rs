// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use lupa_app::{
    AggOptions, CountOptions, FetchOutcome, FieldCapability, FilterPolarity, Lookback,
    MetricSeries, PerspectiveItem, PerspectiveKind, SearchOptions, SortDirection,
    TransactionNameAgg,
};
use lupa_tui::{ChatEvent, ChatRole, ChatTurn, DataSource, FetchRequest, InternalEvent, SearchData};
use std::sync::mpsc::Sender;
use std::thread;

#[derive(Debug, Clone)]
pub struct BackendRuntime {
    search: lupa_search::Client,
    llm: Option<lupa_llm::Client>,
}

impl BackendRuntime {
    pub fn new(search: lupa_search::Client, llm: Option<lupa_llm::Client>) -> Self {
        Self { search, llm }
    }

    fn chat_messages(prompt: &str, history: &[ChatTurn]) -> Vec<lupa_llm::Message> {
        let mut messages = vec![lupa_llm::Message::system(lupa_llm::SYSTEM_PROMPT)];
        for turn in history {
            messages.push(match turn.role {
                ChatRole::User => lupa_llm::Message::user(turn.body.clone()),
                ChatRole::Assistant => lupa_llm::Message::assistant(turn.body.clone()),
            });
        }
        messages.push(lupa_llm::Message::user(prompt));
        messages
    }
}

impl DataSource for BackendRuntime {
    fn search(&mut self, options: &SearchOptions) -> Result<SearchData> {
        let result = if options.filters.query.trim().is_empty() {
            self.search.tail(options)?
        } else {
            self.search.search(options)?
        };
        Ok(SearchData {
            entries: result.entries,
            rendered_query: Some(result.rendered_query),
        })
    }

    fn count(&mut self, options: &CountOptions) -> Result<u64> {
        self.search.count(options)
    }

    fn aggregate_metrics(&mut self, options: &AggOptions) -> Result<Vec<MetricSeries>> {
        self.search.aggregate_metrics(options)
    }

    fn transaction_names(&mut self, options: &AggOptions) -> Result<Vec<TransactionNameAgg>> {
        self.search.transaction_names(options)
    }

    fn perspective(
        &mut self,
        kind: PerspectiveKind,
        options: &AggOptions,
    ) -> Result<Vec<PerspectiveItem>> {
        self.search.perspective(kind, options)
    }

    fn field_capabilities(&mut self) -> Result<Vec<FieldCapability>> {
        self.search.field_capabilities()
    }

    fn ping(&mut self) -> Result<()> {
        self.search.ping()
    }

    fn index_pattern(&mut self) -> String {
        self.search.index_pattern().to_owned()
    }

    fn set_index_pattern(&mut self, pattern: &str) -> Result<()> {
        self.search.set_index_pattern(pattern)
    }

    fn chat_reply(&mut self, prompt: &str, history: &[ChatTurn]) -> Result<String> {
        let Some(llm) = &self.llm else {
            bail!("chat is disabled; set [llm] enabled = true in the config");
        };
        llm.chat_complete(&Self::chat_messages(prompt, history))
    }

    fn spawn_fetch(&mut self, request: FetchRequest, tx: Sender<InternalEvent>) -> Result<()> {
        let mut worker = self.clone();
        thread::spawn(move || {
            let result = worker.fetch(&request).map_err(|error| error.to_string());
            let _ = tx.send(InternalEvent::Fetch(FetchOutcome {
                kind: request.kind,
                generation: request.generation,
                result,
            }));
        });
        Ok(())
    }

    fn spawn_chat(
        &mut self,
        request_id: u64,
        prompt: &str,
        history: &[ChatTurn],
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let Some(llm) = self.llm.clone() else {
            tx.send(InternalEvent::Chat(ChatEvent::Failed {
                request_id,
                error: "chat is disabled; set [llm] enabled = true in the config".to_owned(),
            }))
            .map_err(|_| anyhow::anyhow!("chat event channel closed"))?;
            return Ok(());
        };

        let messages = Self::chat_messages(prompt, history);
        thread::spawn(move || {
            let stream = match llm.chat_stream(&messages) {
                Ok(stream) => stream,
                Err(error) => {
                    let _ = tx.send(InternalEvent::Chat(ChatEvent::Failed {
                        request_id,
                        error: error.to_string(),
                    }));
                    return;
                }
            };

            for chunk in stream {
                match chunk {
                    Ok(chunk) => {
                        if !chunk.content.is_empty() {
                            let _ = tx.send(InternalEvent::Chat(ChatEvent::Chunk {
                                request_id,
                                content: chunk.content,
                            }));
                        }
                        if chunk.done {
                            break;
                        }
                    }
                    Err(error) => {
                        let _ = tx.send(InternalEvent::Chat(ChatEvent::Failed {
                            request_id,
                            error: error.to_string(),
                        }));
                        return;
                    }
                }
            }
            let _ = tx.send(InternalEvent::Chat(ChatEvent::Completed {
                request_id,
                body: String::new(),
            }));
        });
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DemoSource {
    index_pattern: String,
}

impl Default for DemoSource {
    fn default() -> Self {
        Self {
            index_pattern: "demo-*".to_owned(),
        }
    }
}

const DEMO_ENTRY_COUNT: usize = 200;
const DEMO_COUNTS: [u64; 5] = [120, 2_400, 12_000, 48_000, 120_000];

impl DataSource for DemoSource {
    fn search(&mut self, options: &SearchOptions) -> Result<SearchData> {
        let mut entries = lupa_testkit::sample_log_entries(DEMO_ENTRY_COUNT);

        if let Some(name) = &options.scope.transaction_name {
            entries.retain(|entry| entry.transaction_name().as_deref() == Some(name.as_str()));
        }
        if let Some(trace_id) = &options.scope.trace_id {
            entries.retain(|entry| entry.trace_id().as_deref() == Some(trace_id.as_str()));
        }
        if let Some(level) = options.filters.level {
            entries.retain(|entry| {
                entry
                    .level
                    .as_deref()
                    .and_then(lupa_app::LogLevel::parse)
                    == Some(level)
            });
        }
        if let Some(service) = &options.filters.service {
            match service.polarity {
                FilterPolarity::Include => {
                    entries
                        .retain(|entry| entry.service.as_deref() == Some(service.value.as_str()));
                }
                FilterPolarity::Exclude => {
                    entries
                        .retain(|entry| entry.service.as_deref() != Some(service.value.as_str()));
                }
            }
        }
        let query = options.filters.query.trim().to_lowercase();
        if !query.is_empty() {
            entries.retain(|entry| entry.message.to_lowercase().contains(&query));
        }
        if options.sort == SortDirection::Asc {
            entries.reverse();
        }
        entries.truncate(options.page_size);

        Ok(SearchData {
            entries,
            rendered_query: Some(
                serde_json::to_string(&lupa_search::build_search_body(options))
                    .unwrap_or_default(),
            ),
        })
    }

    fn count(&mut self, options: &CountOptions) -> Result<u64> {
        let index = Lookback::ALL
            .iter()
            .position(|lookback| *lookback == options.lookback)
            .unwrap_or(0);
        Ok(DEMO_COUNTS[index])
    }

    fn aggregate_metrics(&mut self, _options: &AggOptions) -> Result<Vec<MetricSeries>> {
        Ok(lupa_testkit::sample_metric_series(4))
    }

    fn transaction_names(&mut self, _options: &AggOptions) -> Result<Vec<TransactionNameAgg>> {
        Ok(lupa_testkit::sample_transaction_names(6))
    }

    fn perspective(
        &mut self,
        kind: PerspectiveKind,
        _options: &AggOptions,
    ) -> Result<Vec<PerspectiveItem>> {
        Ok(lupa_testkit::sample_perspective(kind))
    }

    fn field_capabilities(&mut self) -> Result<Vec<FieldCapability>> {
        Ok(lupa_testkit::sample_field_capabilities())
    }

    fn ping(&mut self) -> Result<()> {
        Ok(())
    }

    fn index_pattern(&mut self) -> String {
        self.index_pattern.clone()
    }

    fn set_index_pattern(&mut self, pattern: &str) -> Result<()> {
        if pattern.trim().is_empty() {
            bail!("index pattern must not be empty");
        }
        self.index_pattern = pattern.trim().to_owned();
        Ok(())
    }

    fn chat_reply(&mut self, prompt: &str, _history: &[ChatTurn]) -> Result<String> {
        Ok(format!(
            "demo mode has no chat endpoint configured. You asked: {prompt}"
        ))
    }
}

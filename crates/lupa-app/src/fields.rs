// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::model::{FieldCapability, SignalType};

pub const FIELD_LABEL_MAX: usize = 12;
pub const TOGGLED_FIELD_WIDTH: u16 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayField {
    pub path: String,
    pub label: String,
    pub width: u16,
    pub selected: bool,
    pub search_fields: Option<Vec<String>>,
}

impl DisplayField {
    fn fixed(
        path: &str,
        label: &str,
        width: u16,
        search_fields: Option<&[&str]>,
    ) -> Self {
        Self {
            path: path.to_owned(),
            label: label.to_owned(),
            width,
            selected: true,
            search_fields: search_fields
                .map(|fields| fields.iter().map(|field| (*field).to_owned()).collect()),
        }
    }

    pub fn resolved_search_fields(&self) -> Option<Vec<&str>> {
        let configured = self.search_fields.as_ref()?;
        if configured.is_empty() {
            Some(vec![self.path.as_str()])
        } else {
            Some(configured.iter().map(String::as_str).collect())
        }
    }
}

pub fn default_fields(signal: SignalType) -> Vec<DisplayField> {
    match signal {
        SignalType::Logs => vec![
            DisplayField::fixed("@timestamp", "TIME", 19, None),
            DisplayField::fixed("log.level", "LEVEL", 5, Some(&[])),
            DisplayField::fixed("service.name", "SERVICE", 16, Some(&[])),
            DisplayField::fixed(
                "resource.name",
                "RESOURCE",
                20,
                Some(&["resource.name", "url.path", "host.name"]),
            ),
            DisplayField::fixed("message", "MESSAGE", 0, Some(&[])),
        ],
        SignalType::Traces => vec![
            DisplayField::fixed("@timestamp", "TIME", 19, None),
            DisplayField::fixed("transaction.duration.us", "DURATION", 10, None),
            DisplayField::fixed("service.name", "SERVICE", 16, Some(&[])),
            DisplayField::fixed("transaction.type", "TYPE", 10, Some(&[])),
            DisplayField::fixed("transaction.name", "NAME", 0, Some(&[])),
        ],
        SignalType::Metrics => vec![
            DisplayField::fixed("@timestamp", "TIME", 19, None),
            DisplayField::fixed("metricset.name", "METRICSET", 14, Some(&[])),
            DisplayField::fixed("service.name", "SERVICE", 16, Some(&[])),
            DisplayField::fixed("message", "MESSAGE", 0, Some(&[])),
        ],
        SignalType::Chat => Vec::new(),
    }
}

pub fn derived_label(path: &str) -> String {
    let segment = path.rsplit('.').next().unwrap_or(path);
    segment.to_uppercase().chars().take(FIELD_LABEL_MAX).collect()
}

fn suggests_time_or_duration(path: &str) -> bool {
    let lowered = path.to_ascii_lowercase();
    lowered.contains("timestamp") || lowered.contains("duration")
}

pub fn toggle_field(fields: &mut Vec<DisplayField>, path: &str) -> bool {
    if let Some(position) = fields.iter().position(|field| field.path == path) {
        fields.remove(position);
        return false;
    }

    let search_fields = if suggests_time_or_duration(path) {
        None
    } else {
        Some(Vec::new())
    };
    fields.push(DisplayField {
        path: path.to_owned(),
        label: derived_label(path),
        width: TOGGLED_FIELD_WIDTH,
        selected: true,
        search_fields,
    });
    true
}

pub fn collect_search_fields(fields: &[DisplayField]) -> Vec<String> {
    let mut collected: Vec<String> = Vec::new();
    for field in fields {
        let Some(resolved) = field.resolved_search_fields() else {
            continue;
        };
        for name in resolved {
            if !collected.iter().any(|existing| existing == name) {
                collected.push(name.to_owned());
            }
        }
    }
    collected
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedField {
    pub name: String,
    pub doc_count: u64,
    pub selected: bool,
}

pub fn ranked_field_list(
    available: &[FieldCapability],
    fields: &[DisplayField],
    text_filter: &str,
) -> Vec<RankedField> {
    let needle = text_filter.trim().to_ascii_lowercase();
    let matches = |name: &str| needle.is_empty() || name.to_ascii_lowercase().contains(&needle);

    let mut ranked = Vec::new();
    for field in fields {
        if !matches(&field.path) {
            continue;
        }
        let doc_count = available
            .iter()
            .find(|capability| capability.name == field.path)
            .map(|capability| capability.doc_count)
            .unwrap_or_else(|| {
                field
                    .resolved_search_fields()
                    .map(|aliases| {
                        aliases
                            .iter()
                            .filter_map(|alias| {
                                available
                                    .iter()
                                    .find(|capability| capability.name == *alias)
                                    .map(|capability| capability.doc_count)
                            })
                            .max()
                            .unwrap_or(0)
                    })
                    .unwrap_or(0)
            });
        ranked.push(RankedField {
            name: field.path.clone(),
            doc_count,
            selected: true,
        });
    }

    let mut rest: Vec<RankedField> = available
        .iter()
        .filter(|capability| {
            matches(&capability.name)
                && !fields.iter().any(|field| field.path == capability.name)
        })
        .map(|capability| RankedField {
            name: capability.name.clone(),
            doc_count: capability.doc_count,
            selected: false,
        })
        .collect();
    rest.sort_by(|left, right| right.doc_count.cmp(&left.doc_count));
    ranked.extend(rest);
    ranked
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::state::ModeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingTier {
    Quick,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingGroup {
    Navigate,
    Filter,
    View,
    Session,
}

impl BindingGroup {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Navigate => "navigate",
            Self::Filter => "filter",
            Self::View => "view",
            Self::Session => "session",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    pub keys: &'static str,
    pub label: &'static str,
    pub tier: BindingTier,
    pub group: BindingGroup,
}

const fn quick(keys: &'static str, label: &'static str, group: BindingGroup) -> KeyBinding {
    KeyBinding {
        keys,
        label,
        tier: BindingTier::Quick,
        group,
    }
}

const fn full(keys: &'static str, label: &'static str, group: BindingGroup) -> KeyBinding {
    KeyBinding {
        keys,
        label,
        tier: BindingTier::Full,
        group,
    }
}

const LIST_BINDINGS: &[KeyBinding] = &[
    quick("j/k", "move", BindingGroup::Navigate),
    quick("enter", "detail", BindingGroup::Navigate),
    quick("/", "search", BindingGroup::Filter),
    quick("l", "lookback", BindingGroup::Filter),
    quick("?", "help", BindingGroup::Session),
    full("g/G", "top/bottom", BindingGroup::Navigate),
    full("t", "drill trace", BindingGroup::Navigate),
    full("e", "level filter", BindingGroup::Filter),
    full("S", "services", BindingGroup::Filter),
    full("R", "resources", BindingGroup::Filter),
    full("c", "clear filters", BindingGroup::Filter),
    full("L", "auto range", BindingGroup::Filter),
    full("s", "sort", BindingGroup::View),
    full("f", "fields", BindingGroup::View),
    full("v", "query", BindingGroup::View),
    full("i", "index", BindingGroup::View),
    full("r", "auto refresh", BindingGroup::View),
    full("1/2/3/4", "signal", BindingGroup::Session),
    full("esc", "back", BindingGroup::Session),
    full("q", "quit", BindingGroup::Session),
];

const TRACE_NAMES_BINDINGS: &[KeyBinding] = &[
    quick("j/k", "move", BindingGroup::Navigate),
    quick("enter", "transactions", BindingGroup::Navigate),
    quick("l", "lookback", BindingGroup::Filter),
    quick("?", "help", BindingGroup::Session),
    full("/", "search", BindingGroup::Filter),
    full("S", "services", BindingGroup::Filter),
    full("L", "auto range", BindingGroup::Filter),
    full("i", "index", BindingGroup::View),
    full("1/2/3/4", "signal", BindingGroup::Session),
    full("q", "quit", BindingGroup::Session),
];

const METRICS_BINDINGS: &[KeyBinding] = &[
    quick("j/k", "move", BindingGroup::Navigate),
    quick("enter", "detail", BindingGroup::Navigate),
    quick("l", "lookback", BindingGroup::Filter),
    quick("?", "help", BindingGroup::Session),
    full("L", "auto range", BindingGroup::Filter),
    full("i", "index", BindingGroup::View),
    full("1/2/3/4", "signal", BindingGroup::Session),
    full("q", "quit", BindingGroup::Session),
];

const DETAIL_BINDINGS: &[KeyBinding] = &[
    quick("j/k", "next/prev", BindingGroup::Navigate),
    quick("w", "raw", BindingGroup::View),
    quick("esc", "back", BindingGroup::Session),
    full("?", "help", BindingGroup::Session),
];

const DETAIL_RAW_BINDINGS: &[KeyBinding] = &[
    quick("j/k", "next/prev", BindingGroup::Navigate),
    quick("w", "formatted", BindingGroup::View),
    quick("esc", "back", BindingGroup::Session),
];

const METRIC_DETAIL_BINDINGS: &[KeyBinding] = &[
    quick("j/k", "next/prev", BindingGroup::Navigate),
    quick("esc", "back", BindingGroup::Session),
];

const TEXT_INPUT_BINDINGS: &[KeyBinding] = &[
    quick("enter", "apply", BindingGroup::Session),
    quick("esc", "cancel", BindingGroup::Session),
    full("ctrl-u", "clear", BindingGroup::Session),
];

const QUERY_OVERLAY_BINDINGS: &[KeyBinding] = &[quick("esc", "close", BindingGroup::Session)];

const FIELD_SELECTOR_BINDINGS: &[KeyBinding] = &[
    quick("j/k", "move", BindingGroup::Navigate),
    quick("enter", "toggle", BindingGroup::View),
    quick("esc", "close", BindingGroup::Session),
    full("type", "filter fields", BindingGroup::Filter),
    full("ctrl-u", "clear filter", BindingGroup::Filter),
];

const PERSPECTIVE_BINDINGS: &[KeyBinding] = &[
    quick("j/k", "move", BindingGroup::Navigate),
    quick("enter", "include", BindingGroup::Filter),
    quick("x", "exclude", BindingGroup::Filter),
    quick("esc", "close", BindingGroup::Session),
];

const ERROR_MODAL_BINDINGS: &[KeyBinding] = &[quick("esc/enter", "dismiss", BindingGroup::Session)];

const QUIT_CONFIRM_BINDINGS: &[KeyBinding] = &[
    quick("y/enter", "quit", BindingGroup::Session),
    quick("n/esc", "stay", BindingGroup::Session),
];

const HELP_BINDINGS: &[KeyBinding] = &[quick("esc/?", "close", BindingGroup::Session)];

const CHAT_BINDINGS: &[KeyBinding] = &[
    quick("enter", "send", BindingGroup::Session),
    quick("ctrl-c", "cancel reply", BindingGroup::Session),
    full("1/2/3", "back to data", BindingGroup::Session),
    full("esc", "back", BindingGroup::Session),
    full("q", "quit", BindingGroup::Session),
];

pub fn bindings_for(kind: ModeKind) -> &'static [KeyBinding] {
    match kind {
        ModeKind::List => LIST_BINDINGS,
        ModeKind::TraceNames => TRACE_NAMES_BINDINGS,
        ModeKind::MetricsDashboard => METRICS_BINDINGS,
        ModeKind::Detail => DETAIL_BINDINGS,
        ModeKind::DetailRaw => DETAIL_RAW_BINDINGS,
        ModeKind::MetricDetail => METRIC_DETAIL_BINDINGS,
        ModeKind::SearchInput | ModeKind::IndexInput => TEXT_INPUT_BINDINGS,
        ModeKind::QueryOverlay => QUERY_OVERLAY_BINDINGS,
        ModeKind::FieldSelector => FIELD_SELECTOR_BINDINGS,
        ModeKind::PerspectiveList => PERSPECTIVE_BINDINGS,
        ModeKind::ErrorModal => ERROR_MODAL_BINDINGS,
        ModeKind::QuitConfirm => QUIT_CONFIRM_BINDINGS,
        ModeKind::HelpOverlay => HELP_BINDINGS,
        ModeKind::Chat => CHAT_BINDINGS,
    }
}

pub fn quick_bindings(kind: ModeKind) -> impl Iterator<Item = &'static KeyBinding> {
    bindings_for(kind)
        .iter()
        .filter(|binding| binding.tier == BindingTier::Quick)
}

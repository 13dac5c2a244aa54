// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightedCell {
    pub text: String,
    pub matched: Option<Range<usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSegment {
    pub text: String,
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlighter {
    query: Vec<char>,
}

impl Highlighter {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.chars().collect(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    pub fn apply(&self, text: &str, max_width: usize) -> HighlightedCell {
        let chars: Vec<char> = text.chars().collect();
        if !self.is_active() || max_width == 0 {
            return HighlightedCell {
                text: pad_or_truncate(text, max_width),
                matched: None,
            };
        }

        let Some(start) = find_from(&chars, &self.query, 0) else {
            return HighlightedCell {
                text: pad_or_truncate(text, max_width),
                matched: None,
            };
        };
        let end = start + self.query.len();

        let window_start = if end <= max_width {
            0
        } else {
            let anchored = start.saturating_sub(max_width / 3);
            let right_aligned = end.saturating_sub(max_width);
            anchored.max(right_aligned).min(chars.len().saturating_sub(max_width))
        };

        let mut window: String = chars
            .iter()
            .skip(window_start)
            .take(max_width)
            .collect();
        let taken = window.chars().count();
        window.extend(std::iter::repeat(' ').take(max_width - taken));

        let marked_start = start.saturating_sub(window_start);
        let marked_end = (end - window_start).min(max_width);
        HighlightedCell {
            text: window,
            matched: Some(marked_start..marked_end),
        }
    }

    pub fn apply_to_field(&self, text: &str) -> Vec<HighlightSegment> {
        if !self.is_active() {
            return vec![HighlightSegment {
                text: text.to_owned(),
                matched: false,
            }];
        }

        let chars: Vec<char> = text.chars().collect();
        let mut segments = Vec::new();
        let mut cursor = 0;
        while let Some(start) = find_from(&chars, &self.query, cursor) {
            if start > cursor {
                segments.push(HighlightSegment {
                    text: chars[cursor..start].iter().collect(),
                    matched: false,
                });
            }
            let end = start + self.query.len();
            segments.push(HighlightSegment {
                text: chars[start..end].iter().collect(),
                matched: true,
            });
            cursor = end;
        }
        if cursor < chars.len() {
            segments.push(HighlightSegment {
                text: chars[cursor..].iter().collect(),
                matched: false,
            });
        }
        if segments.is_empty() {
            segments.push(HighlightSegment {
                text: String::new(),
                matched: false,
            });
        }
        segments
    }
}

pub fn pad_or_truncate(text: &str, width: usize) -> String {
    let mut out: String = text.chars().take(width).collect();
    let taken = out.chars().count();
    out.extend(std::iter::repeat(' ').take(width.saturating_sub(taken)));
    out
}

fn find_from(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&offset| {
        haystack[offset..offset + needle.len()]
            .iter()
            .zip(needle)
            .all(|(left, right)| {
                left.to_lowercase().eq(right.to_lowercase())
            })
    })
}

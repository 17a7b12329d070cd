/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use crate::types::{MetricRecord, MetricTagMap};

fn substitute_graphite(c: char, out: &mut String) {
    match c {
        '%' => out.push_str("Pct"),
        ' ' => out.push('_'),
        '\\' | '/' | '[' | ']' => out.push('|'),
        _ => out.push(c),
    }
}

fn graphite_disallowed(c: char) -> bool {
    c.is_control()
        || c.is_whitespace()
        || matches!(c, '"' | '\'' | '(' | ')' | '{' | '}' | ',' | '=' | ';')
}

/// Rewrite a path into the graphite alphabet.
///
/// With `sanitize` every character graphite can not store is dropped and
/// runs of dots are collapsed. With `substitute` some common characters are
/// replaced by readable stand-ins before that.
pub(crate) fn graphite_path(path: &str, sanitize: bool, substitute: bool) -> String {
    let mut substituted = String::with_capacity(path.len() + 8);
    if substitute {
        for c in path.chars() {
            substitute_graphite(c, &mut substituted);
        }
    } else {
        substituted.push_str(path);
    }
    if !sanitize {
        return substituted;
    }

    let mut out = String::with_capacity(substituted.len());
    let mut last_dot = true;
    for c in substituted.chars() {
        if graphite_disallowed(c) {
            continue;
        }
        if c == '.' {
            if last_dot {
                continue;
            }
            last_dot = true;
        } else {
            last_dot = false;
        }
        out.push(c);
    }
    while out.ends_with('.') {
        out.pop();
    }
    out
}

fn opentsdb_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/')
}

/// Rewrite a metric name, tag key or tag value into the opentsdb alphabet.
pub(crate) fn opentsdb_name(s: &str, sanitize: bool, substitute: bool) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.trim().chars() {
        if substitute {
            match c {
                '%' => {
                    out.push_str("Pct");
                    continue;
                }
                ' ' => {
                    out.push('_');
                    continue;
                }
                _ => {}
            }
        }
        if !sanitize || opentsdb_allowed(c) {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    out
}

pub(crate) fn graphite_record(
    record: &MetricRecord,
    sanitize: bool,
    substitute: bool,
) -> Option<MetricRecord> {
    let path = graphite_path(&record.path, sanitize, substitute);
    if path.is_empty() {
        return None;
    }
    Some(MetricRecord {
        path,
        value: record.value,
        timestamp: record.timestamp,
        tags: record.tags.clone(),
    })
}

pub(crate) fn opentsdb_record(
    record: &MetricRecord,
    sanitize: bool,
    substitute: bool,
) -> Option<MetricRecord> {
    let path = opentsdb_name(&record.path, sanitize, substitute);
    if path.is_empty() {
        return None;
    }
    let mut tags = MetricTagMap::new();
    for (k, v) in &record.tags {
        let k = opentsdb_name(k, sanitize, substitute);
        let v = opentsdb_name(v, sanitize, substitute);
        if k.is_empty() || v.is_empty() {
            continue;
        }
        tags.insert(k, v);
    }
    Some(MetricRecord {
        path,
        value: record.value,
        timestamp: record.timestamp,
        tags,
    })
}

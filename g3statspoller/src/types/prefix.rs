/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;

/// The composed `global.collector.` prefix put in front of every queued path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricPrefix(String);

impl MetricPrefix {
    pub fn new(global: &str, collector: &str) -> Self {
        let mut s = String::with_capacity(global.len() + collector.len() + 2);
        push_segment(&mut s, global);
        push_segment(&mut s, collector);
        MetricPrefix(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn apply(&self, path: &str) -> String {
        let path = path.trim_start_matches('.');
        let mut s = String::with_capacity(self.0.len() + path.len());
        s.push_str(&self.0);
        s.push_str(path);
        s
    }
}

fn push_segment(buf: &mut String, segment: &str) {
    let segment = segment.trim_matches('.');
    if segment.is_empty() {
        return;
    }
    buf.push_str(segment);
    buf.push('.');
}

impl fmt::Display for MetricPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose() {
        for (g, c) in [
            ("host1", "db"),
            ("host1.", "db"),
            ("host1", "db."),
            ("host1.", "db."),
            (".host1", ".db."),
        ] {
            let prefix = MetricPrefix::new(g, c);
            assert_eq!(prefix.apply("Available"), "host1.db.Available");
        }
    }

    #[test]
    fn empty_segments() {
        let prefix = MetricPrefix::new("", "db");
        assert_eq!(prefix.apply("Available"), "db.Available");

        let prefix = MetricPrefix::new("host1", "");
        assert_eq!(prefix.apply("Available"), "host1.Available");

        let prefix = MetricPrefix::new("", "");
        assert_eq!(prefix.apply("Available"), "Available");
        assert_eq!(prefix.as_str(), "");
    }
}

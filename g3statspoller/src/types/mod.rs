/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeMap;

use chrono::Utc;

mod value;
pub use value::MetricValue;

mod prefix;
pub use prefix::MetricPrefix;

pub type MetricTagMap = BTreeMap<String, String>;

/// The wire protocol family a record is queued for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricFamily {
    /// path only records
    Graphite,
    /// tagged records
    OpenTsdb,
}

impl MetricFamily {
    pub(crate) fn index(self) -> usize {
        match self {
            MetricFamily::Graphite => 0,
            MetricFamily::OpenTsdb => 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricRecord {
    pub path: String,
    pub value: MetricValue,
    pub timestamp: u64,
    pub tags: MetricTagMap,
}

impl MetricRecord {
    pub fn new<P: Into<String>>(path: P, value: MetricValue, timestamp: u64) -> Self {
        MetricRecord {
            path: path.into(),
            value,
            timestamp,
            tags: MetricTagMap::new(),
        }
    }

    pub fn with_tags<P: Into<String>>(
        path: P,
        value: MetricValue,
        timestamp: u64,
        tags: MetricTagMap,
    ) -> Self {
        MetricRecord {
            path: path.into(),
            value,
            timestamp,
            tags,
        }
    }

    pub fn family(&self) -> MetricFamily {
        if self.tags.is_empty() {
            MetricFamily::Graphite
        } else {
            MetricFamily::OpenTsdb
        }
    }

    pub(crate) fn prefixed(mut self, prefix: &MetricPrefix) -> Self {
        self.path = prefix.apply(&self.path);
        self
    }
}

pub(crate) fn unix_timestamp() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}

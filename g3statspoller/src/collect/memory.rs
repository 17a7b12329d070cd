/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::{Path, PathBuf};

use anyhow::Context;
use rust_decimal::{Decimal, RoundingStrategy};

use super::Collect;
use crate::types::{MetricRecord, MetricValue, unix_timestamp};

const KILOBYTE: i64 = 1024;
const MEGABYTE: i64 = 1024 * 1024;
const SCALE: u32 = 7;

const FREEABLE_FIELDS: [&str; 5] = ["SwapCached", "Cached", "Buffers", "MemFree", "SReclaimable"];

pub(crate) struct MemoryCollector {
    name: String,
    meminfo_file: PathBuf,
}

impl MemoryCollector {
    pub(crate) fn new(name: String, proc_dir: &Path) -> Self {
        MemoryCollector {
            name,
            meminfo_file: proc_dir.join("meminfo"),
        }
    }
}

/// Field values of `/proc/meminfo` in bytes, in file order.
///
/// Every value is taken as kB, as the kernel prints the unit for almost all fields.
fn parse_meminfo(content: &str) -> Vec<(&str, i64)> {
    let mut fields = Vec::new();
    for line in content.lines() {
        let Some((name, rest)) = line.trim().split_once(':') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let Some(value) = rest.split_ascii_whitespace().next() else {
            continue;
        };
        let Ok(kb) = value.parse::<i64>() else {
            continue;
        };
        if let Some(bytes) = kb.checked_mul(KILOBYTE) {
            fields.push((name, bytes));
        }
    }
    fields
}

fn div_round(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    let v = numerator.checked_div(denominator)?;
    Some(v.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero))
}

fn derived_metrics(fields: &[(&str, i64)]) -> Vec<(&'static str, Decimal)> {
    let get = |name: &str| fields.iter().find(|(n, _)| *n == name).map(|(_, v)| *v);
    let Some(total) = get("MemTotal") else {
        return Vec::new();
    };
    let free: i64 = FREEABLE_FIELDS.iter().filter_map(|&f| get(f)).sum();
    let used = total - free;

    let total = Decimal::from(total);
    let free = Decimal::from(free);
    let used = Decimal::from(used);
    let megabyte = Decimal::from(MEGABYTE);

    let mut derived = vec![
        ("Total-Bytes", total),
        ("Free-Bytes", free),
        ("Used-Bytes", used),
    ];
    for (name, bytes) in [
        ("Total-Megabytes", total),
        ("Free-Megabytes", free),
        ("Used-Megabytes", used),
    ] {
        if let Some(mb) = div_round(bytes, megabyte) {
            derived.push((name, mb));
        }
    }
    if total > Decimal::ZERO {
        if let Some(ratio) = div_round(free, total) {
            derived.push(("Used-Pct", Decimal::ONE_HUNDRED - ratio * Decimal::ONE_HUNDRED));
        }
    }
    derived
}

fn meminfo_records(content: &str, timestamp: u64) -> Vec<MetricRecord> {
    let fields = parse_meminfo(content);
    let mut records = Vec::with_capacity(fields.len() + 7);
    for (name, bytes) in &fields {
        if *bytes >= 0 {
            records.push(MetricRecord::new(
                format!("Raw.{name}-Bytes"),
                MetricValue::from(*bytes),
                timestamp,
            ));
        }
    }
    for (name, value) in derived_metrics(&fields) {
        if value >= Decimal::ZERO {
            records.push(MetricRecord::new(
                format!("Derived.{name}"),
                MetricValue::new(value),
                timestamp,
            ));
        }
    }
    records
}

impl Collect for MemoryCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&mut self) -> anyhow::Result<Vec<MetricRecord>> {
        let content = tokio::fs::read_to_string(&self.meminfo_file)
            .await
            .context(format!("failed to read {}", self.meminfo_file.display()))?;
        Ok(meminfo_records(&content, unix_timestamp()))
    }
}

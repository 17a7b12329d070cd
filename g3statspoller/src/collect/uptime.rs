/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, anyhow};

use super::Collect;
use crate::types::{MetricRecord, MetricValue, unix_timestamp};

pub(crate) struct UptimeCollector {
    name: String,
    uptime_file: PathBuf,
}

impl UptimeCollector {
    pub(crate) fn new(name: String, proc_dir: &Path) -> Self {
        UptimeCollector {
            name,
            uptime_file: proc_dir.join("uptime"),
        }
    }
}

/// Parse the seconds since boot, the first field of `/proc/uptime`.
fn parse_uptime(content: &str) -> anyhow::Result<MetricValue> {
    let field = content
        .split_ascii_whitespace()
        .next()
        .ok_or_else(|| anyhow!("empty uptime content"))?;
    let value = MetricValue::from_str(field).context(format!("invalid uptime value {field}"))?;
    if value < MetricValue::ZERO {
        return Err(anyhow!("negative uptime value {field}"));
    }
    Ok(value)
}

impl Collect for UptimeCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&mut self) -> anyhow::Result<Vec<MetricRecord>> {
        let content = tokio::fs::read_to_string(&self.uptime_file)
            .await
            .context(format!("failed to read {}", self.uptime_file.display()))?;
        let value = parse_uptime(&content)?;
        Ok(vec![MetricRecord::new(
            "OS_Uptime-Seconds",
            value,
            unix_timestamp(),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        let v = parse_uptime("350735.47 234388.90\n").unwrap();
        assert_eq!(v.to_string(), "350735.47");

        assert!(parse_uptime("").is_err());
        assert!(parse_uptime("abc 1.0").is_err());
        assert!(parse_uptime("-1.5 1.0").is_err());
    }

    #[tokio::test]
    async fn collect() {
        let dir = std::env::temp_dir().join(format!("g3statspoller-uptime-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("uptime"), "120.00 80.10\n").unwrap();

        let mut collector = UptimeCollector::new("uptime".to_string(), &dir);
        let records = collector.collect().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, "OS_Uptime-Seconds");
        assert_eq!(records[0].value.to_string(), "120");

        let mut missing = UptimeCollector::new("uptime".to_string(), &dir.join("none"));
        assert!(missing.collect().await.is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}

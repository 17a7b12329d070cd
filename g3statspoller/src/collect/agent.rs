/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use super::Collect;
use crate::build;
use crate::output;
use crate::types::{MetricRecord, MetricValue, unix_timestamp};

/// Reports the health of this process: liveness, version and transmit errors.
pub(crate) struct AgentCollector {
    name: String,
    version_metric: String,
}

impl AgentCollector {
    pub(crate) fn new(name: String) -> Self {
        AgentCollector {
            name,
            version_metric: version_metric(build::VERSION),
        }
    }
}

fn version_metric(version: &str) -> String {
    let version = if version.is_empty() {
        "unknown"
    } else {
        version
    };
    format!("Agent.Version={}", version.replace('.', "-"))
}

fn agent_records(version_metric: &str, transmit_errors: u64, timestamp: u64) -> Vec<MetricRecord> {
    vec![
        MetricRecord::new("Agent.Available", MetricValue::ONE, timestamp),
        MetricRecord::new(version_metric, MetricValue::ONE, timestamp),
        MetricRecord::new(
            "Agent.Transmit-Errors",
            MetricValue::from(transmit_errors),
            timestamp,
        ),
    ]
}

impl Collect for AgentCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&mut self) -> anyhow::Result<Vec<MetricRecord>> {
        Ok(agent_records(
            &self.version_metric,
            output::transmit_errors(),
            unix_timestamp(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version() {
        assert_eq!(version_metric("1.10.2"), "Agent.Version=1-10-2");
        assert_eq!(version_metric(""), "Agent.Version=unknown");
    }

    #[test]
    fn records() {
        let lines: Vec<String> = agent_records("Agent.Version=0-1-0", 7, 100)
            .iter()
            .map(|r| format!("{} {} {}", r.path, r.value, r.timestamp))
            .collect();
        assert_eq!(
            lines,
            vec![
                "Agent.Available 1 100",
                "Agent.Version=0-1-0 1 100",
                "Agent.Transmit-Errors 7 100",
            ]
        );
    }

    #[tokio::test]
    async fn collect() {
        let mut collector = AgentCollector::new("agent".to_string());
        let records = collector.collect().await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].path, version_metric(build::VERSION));
        assert!(records[2].value >= MetricValue::ZERO);
    }
}

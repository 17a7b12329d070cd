/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use crate::config::yaml;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct OutputConfig {
    pub(crate) interval: Duration,
    pub(crate) max_workers: usize,
    pub(crate) shutdown_wait: Duration,
    pub(crate) cycle_safety_margin: Duration,
    pub(crate) timeout_margin: Duration,
    pub(crate) queue_soft_capacity: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            interval: Duration::from_secs(30),
            max_workers: 16,
            shutdown_wait: Duration::from_secs(5),
            cycle_safety_margin: Duration::from_secs(1),
            timeout_margin: Duration::from_secs(1),
            queue_soft_capacity: 1_000_000,
        }
    }
}

impl OutputConfig {
    pub(crate) fn parse(v: &Yaml) -> anyhow::Result<Self> {
        let mut config = OutputConfig::default();
        if let Yaml::Hash(map) = v {
            yaml::foreach_kv(map, |k, v| config.set(k, v))?;
        } else {
            return Err(anyhow!("yaml value type for 'output' should be 'map'"));
        }
        config.check()?;
        Ok(config)
    }

    fn set(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match yaml::normalize_key(k).as_str() {
            "interval" | "output_interval" => {
                self.interval = yaml::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                Ok(())
            }
            "max_workers" => {
                self.max_workers =
                    yaml::as_usize(v).context(format!("invalid usize value for key {k}"))?;
                Ok(())
            }
            "shutdown_wait" => {
                self.shutdown_wait = yaml::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                Ok(())
            }
            "cycle_safety_margin" => {
                self.cycle_safety_margin = yaml::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                Ok(())
            }
            "timeout_margin" => {
                self.timeout_margin = yaml::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                Ok(())
            }
            "queue_soft_capacity" => {
                self.queue_soft_capacity =
                    yaml::as_usize(v).context(format!("invalid usize value for key {k}"))?;
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        }
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.interval.is_zero() {
            return Err(anyhow!("output interval should not be zero"));
        }
        if self.max_workers == 0 {
            return Err(anyhow!("max workers should not be zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::yaml::load_test_doc;

    #[test]
    fn parse() {
        let doc = load_test_doc("interval: 10s\nmax-workers: 4\nshutdown_wait: 2s");
        let config = OutputConfig::parse(&doc).unwrap();
        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.shutdown_wait, Duration::from_secs(2));
        assert_eq!(config.timeout_margin, Duration::from_secs(1));
    }

    #[test]
    fn invalid() {
        let doc = load_test_doc("interval: 0");
        assert!(OutputConfig::parse(&doc).is_err());

        let doc = load_test_doc("emit_interval: 1s");
        assert!(OutputConfig::parse(&doc).is_err());

        let doc = load_test_doc("- 1");
        assert!(OutputConfig::parse(&doc).is_err());
    }
}

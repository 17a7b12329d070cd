/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::Path;

use anyhow::anyhow;
use yaml_rust::{Yaml, yaml};

use super::CollectorBaseConfig;
use crate::config::yaml as conf_yaml;

/// Config of the collector reporting the health of this process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct AgentCollectorConfig {
    pub(crate) base: CollectorBaseConfig,
}

impl AgentCollectorConfig {
    pub(crate) fn parse(map: &yaml::Hash, conf_dir: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = AgentCollectorConfig {
            base: CollectorBaseConfig::new("StatsPoller"),
        };

        conf_yaml::foreach_kv(map, |k, v| config.set(k, v, conf_dir))?;

        config.base.check("agent")?;
        Ok(config)
    }

    fn set(&mut self, k: &str, v: &Yaml, conf_dir: Option<&Path>) -> anyhow::Result<()> {
        if self.base.set_by_yaml_kv(k, v, conf_dir)? {
            Ok(())
        } else {
            Err(anyhow!("invalid key {k}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::yaml::load_test_doc;
    use std::time::Duration;

    #[test]
    fn parse() {
        let doc = load_test_doc("interval: 10s");
        let config = AgentCollectorConfig::parse(doc.as_hash().unwrap(), None).unwrap();
        assert_eq!(config.base.name, "agent");
        assert_eq!(config.base.prefix, "StatsPoller");
        assert_eq!(config.base.interval, Duration::from_secs(10));

        let doc = load_test_doc("proc_dir: /proc");
        assert!(AgentCollectorConfig::parse(doc.as_hash().unwrap(), None).is_err());
    }
}

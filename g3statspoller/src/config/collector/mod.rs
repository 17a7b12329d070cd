/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, anyhow};
use yaml_rust::{Yaml, yaml};

use crate::config::yaml as conf_yaml;

mod base;
pub(crate) use base::CollectorBaseConfig;

pub(crate) mod agent;
pub(crate) mod external;
pub(crate) mod file_counter;
pub(crate) mod proc;
pub(crate) mod process_counter;

const CONFIG_KEY_COLLECTOR_TYPE: &str = "type";

#[derive(Clone, Debug)]
pub(crate) enum AnyCollectorConfig {
    Uptime(proc::ProcCollectorConfig),
    Memory(proc::ProcCollectorConfig),
    FileCounter(file_counter::FileCounterCollectorConfig),
    ProcessCounter(process_counter::ProcessCounterCollectorConfig),
    Agent(agent::AgentCollectorConfig),
    External(external::ExternalCollectorConfig),
}

impl AnyCollectorConfig {
    pub(crate) fn base(&self) -> &CollectorBaseConfig {
        match self {
            AnyCollectorConfig::Uptime(c) => &c.base,
            AnyCollectorConfig::Memory(c) => &c.base,
            AnyCollectorConfig::FileCounter(c) => &c.base,
            AnyCollectorConfig::ProcessCounter(c) => &c.base,
            AnyCollectorConfig::Agent(c) => &c.base,
            AnyCollectorConfig::External(c) => &c.base,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.base().name
    }

    pub(crate) fn collector_type(&self) -> &'static str {
        match self {
            AnyCollectorConfig::Uptime(_) => "Uptime",
            AnyCollectorConfig::Memory(_) => "Memory",
            AnyCollectorConfig::FileCounter(_) => "FileCounter",
            AnyCollectorConfig::ProcessCounter(_) => "ProcessCounter",
            AnyCollectorConfig::Agent(_) => "Agent",
            AnyCollectorConfig::External(_) => "External",
        }
    }
}

pub(crate) fn load_all(v: &Yaml, conf_dir: Option<&Path>) -> anyhow::Result<Vec<AnyCollectorConfig>> {
    let mut collectors = Vec::new();
    let mut names = HashSet::new();
    conf_yaml::foreach_map(v, |map| {
        let collector = load_collector(map, conf_dir)?;
        if !names.insert(collector.name().to_string()) {
            return Err(anyhow!(
                "collector with name {} already exists",
                collector.name()
            ));
        }
        collectors.push(collector);
        Ok(())
    })?;
    Ok(collectors)
}

fn load_collector(map: &yaml::Hash, conf_dir: Option<&Path>) -> anyhow::Result<AnyCollectorConfig> {
    let collector_type = conf_yaml::hash_get_required_str(map, CONFIG_KEY_COLLECTOR_TYPE)?;
    match conf_yaml::normalize_key(collector_type).as_str() {
        "uptime" => {
            let config = proc::ProcCollectorConfig::parse(map, conf_dir, "uptime", "Linux.Uptime")
                .context("failed to load this Uptime collector")?;
            Ok(AnyCollectorConfig::Uptime(config))
        }
        "memory" => {
            let config = proc::ProcCollectorConfig::parse(map, conf_dir, "memory", "Linux.Memory")
                .context("failed to load this Memory collector")?;
            Ok(AnyCollectorConfig::Memory(config))
        }
        "file_counter" => {
            let config = file_counter::FileCounterCollectorConfig::parse(map, conf_dir)
                .context("failed to load this FileCounter collector")?;
            Ok(AnyCollectorConfig::FileCounter(config))
        }
        "process_counter" => {
            let config = process_counter::ProcessCounterCollectorConfig::parse(map, conf_dir)
                .context("failed to load this ProcessCounter collector")?;
            Ok(AnyCollectorConfig::ProcessCounter(config))
        }
        "agent" | "statspoller" => {
            let config = agent::AgentCollectorConfig::parse(map, conf_dir)
                .context("failed to load this Agent collector")?;
            Ok(AnyCollectorConfig::Agent(config))
        }
        "external" => {
            let config = external::ExternalCollectorConfig::parse(map, conf_dir)
                .context("failed to load this External collector")?;
            Ok(AnyCollectorConfig::External(config))
        }
        _ => Err(anyhow!("unsupported collector type {collector_type}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::yaml::load_test_doc;

    #[test]
    fn load_list() {
        let doc = load_test_doc(
            r#"
- type: uptime
- type: memory
  interval: 15s
  proc_dir: /host/proc
- type: file-counter
  root_dir: /var/spool
  prefix: Spool
- type: process_counter
  enable: false
- type: agent
- type: external
  metrics_file: /tmp/app.out
"#,
        );
        let all = load_all(&doc, None).unwrap();
        assert_eq!(all.len(), 6);
        assert_eq!(all[0].name(), "uptime");
        assert_eq!(all[0].base().prefix, "Linux.Uptime");
        assert_eq!(all[1].collector_type(), "Memory");
        let AnyCollectorConfig::Memory(memory) = &all[1] else {
            panic!("unexpected collector type");
        };
        assert_eq!(memory.proc_dir, Path::new("/host/proc"));
        assert_eq!(all[2].name(), "filecounter_Spool");
        assert!(!all[3].base().enable);
        assert_eq!(all[4].collector_type(), "Agent");
        assert_eq!(all[5].name(), "external_app");
    }

    #[test]
    fn duplicate_name() {
        let doc = load_test_doc("- type: uptime\n- type: uptime");
        assert!(load_all(&doc, None).is_err());

        let doc = load_test_doc("- type: uptime\n- type: uptime\n  name: uptime2");
        assert_eq!(load_all(&doc, None).unwrap().len(), 2);
    }

    #[test]
    fn invalid() {
        let doc = load_test_doc("- type: mysql");
        assert!(load_all(&doc, None).is_err());

        let doc = load_test_doc("- type: uptime\n  regex: a");
        assert!(load_all(&doc, None).is_err());
    }
}

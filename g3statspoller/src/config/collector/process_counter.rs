/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use regex::Regex;
use yaml_rust::{Yaml, yaml};

use super::CollectorBaseConfig;
use crate::config::yaml as conf_yaml;

#[derive(Clone, Debug)]
pub(crate) struct ProcessCounterRule {
    pub(crate) identifier: String,
    pub(crate) regex: Regex,
}

impl ProcessCounterRule {
    fn parse(v: &Yaml) -> anyhow::Result<Self> {
        let Yaml::Hash(map) = v else {
            return Err(anyhow!("yaml value type for process counter rule should be 'map'"));
        };

        let mut identifier = String::new();
        let mut regex = None;
        conf_yaml::foreach_kv(map, |k, v| match conf_yaml::normalize_key(k).as_str() {
            "identifier" | "name" => {
                identifier = conf_yaml::as_string(v)?.trim().to_string();
                Ok(())
            }
            "regex" => {
                let s = conf_yaml::as_string(v)?;
                let r = Regex::new(&s).context(format!("invalid regex value for key {k}"))?;
                regex = Some(r);
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        })?;

        if identifier.is_empty() {
            return Err(anyhow!("identifier is not set"));
        }
        let Some(regex) = regex else {
            return Err(anyhow!("regex is not set"));
        };
        Ok(ProcessCounterRule { identifier, regex })
    }
}

#[derive(Clone, Debug)]
pub(crate) struct ProcessCounterCollectorConfig {
    pub(crate) base: CollectorBaseConfig,
    pub(crate) proc_dir: PathBuf,
    pub(crate) rules: Vec<ProcessCounterRule>,
}

impl ProcessCounterCollectorConfig {
    pub(crate) fn parse(map: &yaml::Hash, conf_dir: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = ProcessCounterCollectorConfig {
            base: CollectorBaseConfig::new("ProcessCounter"),
            proc_dir: PathBuf::from("/proc"),
            rules: Vec::new(),
        };

        conf_yaml::foreach_kv(map, |k, v| config.set(k, v, conf_dir))?;

        config.base.check("process_counter")?;
        Ok(config)
    }

    fn set(&mut self, k: &str, v: &Yaml, conf_dir: Option<&Path>) -> anyhow::Result<()> {
        if self.base.set_by_yaml_kv(k, v, conf_dir)? {
            return Ok(());
        }
        match conf_yaml::normalize_key(k).as_str() {
            "proc_dir" | "proc_location" => {
                self.proc_dir =
                    conf_yaml::as_path(v, None).context(format!("invalid path value for key {k}"))?;
                Ok(())
            }
            "rules" | "regex" => {
                self.rules = conf_yaml::as_list(v, ProcessCounterRule::parse)
                    .context(format!("invalid process counter rules for key {k}"))?;
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::yaml::load_test_doc;

    #[test]
    fn parse() {
        let doc = load_test_doc(
            r#"
interval: 10s
rules:
  - identifier: " nginx "
    regex: "nginx: (master|worker)"
  - identifier: sshd
    regex: "^/usr/sbin/sshd"
"#,
        );
        let config = ProcessCounterCollectorConfig::parse(doc.as_hash().unwrap(), None).unwrap();
        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.rules[0].identifier, "nginx");
        assert!(config.rules[0].regex.is_match("nginx: worker process"));
        assert_eq!(config.base.name, "process_counter");
        assert_eq!(config.proc_dir, PathBuf::from("/proc"));
    }

    #[test]
    fn invalid_rule() {
        let doc = load_test_doc("rules:\n  - identifier: a\n    regex: \"(\"");
        assert!(ProcessCounterCollectorConfig::parse(doc.as_hash().unwrap(), None).is_err());

        let doc = load_test_doc("rules:\n  - regex: abc");
        assert!(ProcessCounterCollectorConfig::parse(doc.as_hash().unwrap(), None).is_err());
    }
}

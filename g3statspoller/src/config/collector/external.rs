/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, anyhow};
use yaml_rust::{Yaml, yaml};

use super::CollectorBaseConfig;
use crate::config::yaml as conf_yaml;

const DEFAULT_MAX_METRIC_AGE: Duration = Duration::from_secs(90);

/// Config of a collector that runs an external program and reads the
/// metric lines it writes to a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ExternalCollectorConfig {
    pub(crate) base: CollectorBaseConfig,
    pub(crate) program: Vec<String>,
    pub(crate) metrics_file: PathBuf,
    pub(crate) max_metric_age: Duration,
    pub(crate) always_check_file: bool,
}

impl ExternalCollectorConfig {
    pub(crate) fn parse(map: &yaml::Hash, conf_dir: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = ExternalCollectorConfig {
            base: CollectorBaseConfig::new(""),
            program: Vec::new(),
            metrics_file: PathBuf::new(),
            max_metric_age: DEFAULT_MAX_METRIC_AGE,
            always_check_file: true,
        };

        conf_yaml::foreach_kv(map, |k, v| config.set(k, v, conf_dir))?;

        config.check()?;
        Ok(config)
    }

    fn set(&mut self, k: &str, v: &Yaml, conf_dir: Option<&Path>) -> anyhow::Result<()> {
        if self.base.set_by_yaml_kv(k, v, conf_dir)? {
            return Ok(());
        }
        match conf_yaml::normalize_key(k).as_str() {
            "program" | "command" => {
                let s = conf_yaml::as_string(v)?;
                self.program = s.split_ascii_whitespace().map(|s| s.to_string()).collect();
                Ok(())
            }
            "metrics_file" | "program_output_file" => {
                let path = conf_yaml::as_path(v, conf_dir)
                    .context(format!("invalid path value for key {k}"))?;
                self.metrics_file = path;
                Ok(())
            }
            "max_metric_age" => {
                self.max_metric_age = conf_yaml::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                Ok(())
            }
            "always_check_file" | "always_check_output_files" => {
                self.always_check_file = conf_yaml::as_bool(v)?;
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        }
    }

    fn check(&mut self) -> anyhow::Result<()> {
        if self.metrics_file.as_os_str().is_empty() {
            return Err(anyhow!("metrics file is not set"));
        }
        if self.base.file_output() == Some(self.metrics_file.as_path()) {
            return Err(anyhow!("output file should not be the metrics file"));
        }
        let default_name = match self.metrics_file.file_stem() {
            Some(stem) => format!("external_{}", stem.to_string_lossy()),
            None => "external".to_string(),
        };
        self.base.check(&default_name)
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
program: /opt/plugins/redis.sh  --port 6379
metrics_file: output/redis.out
prefix: Redis
max_metric_age: 120s
always_check_file: false
"#,
        );
        let config = ExternalCollectorConfig::parse(
            doc.as_hash().unwrap(),
            Some(Path::new("/var/lib/poller")),
        )
        .unwrap();
        assert_eq!(config.program, vec!["/opt/plugins/redis.sh", "--port", "6379"]);
        assert_eq!(
            config.metrics_file,
            Path::new("/var/lib/poller/output/redis.out")
        );
        assert_eq!(config.base.name, "external_redis");
        assert_eq!(config.base.prefix, "Redis");
        assert_eq!(config.max_metric_age, Duration::from_secs(120));
        assert!(!config.always_check_file);
    }

    #[test]
    fn file_only() {
        let doc = load_test_doc("metrics_file: /tmp/app.out");
        let config = ExternalCollectorConfig::parse(doc.as_hash().unwrap(), None).unwrap();
        assert!(config.program.is_empty());
        assert_eq!(config.max_metric_age, DEFAULT_MAX_METRIC_AGE);
        assert!(config.always_check_file);
    }

    #[test]
    fn invalid() {
        let doc = load_test_doc("program: /bin/true");
        assert!(ExternalCollectorConfig::parse(doc.as_hash().unwrap(), None).is_err());

        let doc = load_test_doc(
            "metrics_file: /tmp/a.out\noutput_file: /tmp/a.out\nwrite_output_files: true",
        );
        assert!(ExternalCollectorConfig::parse(doc.as_hash().unwrap(), None).is_err());
    }
}

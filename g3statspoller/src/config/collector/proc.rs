/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use yaml_rust::{Yaml, yaml};

use super::CollectorBaseConfig;
use crate::config::yaml as conf_yaml;

const DEFAULT_PROC_DIR: &str = "/proc";

/// Config of a collector reading a single file below the proc filesystem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ProcCollectorConfig {
    pub(crate) base: CollectorBaseConfig,
    pub(crate) proc_dir: PathBuf,
}

impl ProcCollectorConfig {
    fn new(default_prefix: &str) -> Self {
        ProcCollectorConfig {
            base: CollectorBaseConfig::new(default_prefix),
            proc_dir: PathBuf::from(DEFAULT_PROC_DIR),
        }
    }

    pub(crate) fn parse(
        map: &yaml::Hash,
        conf_dir: Option<&Path>,
        default_name: &str,
        default_prefix: &str,
    ) -> anyhow::Result<Self> {
        let mut config = ProcCollectorConfig::new(default_prefix);

        conf_yaml::foreach_kv(map, |k, v| config.set(k, v, conf_dir))?;

        config.base.check(default_name)?;
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
            _ => Err(anyhow!("invalid key {k}")),
        }
    }
}

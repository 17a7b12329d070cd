/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use yaml_rust::{Yaml, yaml};

use super::CollectorBaseConfig;
use crate::config::yaml as conf_yaml;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct FileCounterCollectorConfig {
    pub(crate) base: CollectorBaseConfig,
    pub(crate) root_dir: Option<PathBuf>,
    pub(crate) count_subdirectories: bool,
}

impl FileCounterCollectorConfig {
    pub(crate) fn parse(map: &yaml::Hash, conf_dir: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = FileCounterCollectorConfig {
            base: CollectorBaseConfig::new("FileCounter"),
            root_dir: None,
            count_subdirectories: false,
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
            "root_dir" | "root_directory" => {
                let dir = conf_yaml::as_path(v, conf_dir)
                    .context(format!("invalid path value for key {k}"))?;
                self.root_dir = Some(dir);
                Ok(())
            }
            "count_subdirectories" | "recursive" => {
                self.count_subdirectories = conf_yaml::as_bool(v)?;
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        }
    }

    fn check(&mut self) -> anyhow::Result<()> {
        if self.root_dir.is_none() {
            return Err(anyhow!("root dir is not set"));
        }
        let default_name = format!("filecounter_{}", self.base.prefix);
        self.base.check(&default_name)
    }
}

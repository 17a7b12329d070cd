/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use crate::config::yaml;

/// Settings every collector type carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CollectorBaseConfig {
    pub(crate) name: String,
    pub(crate) enable: bool,
    pub(crate) interval: Duration,
    pub(crate) prefix: String,
    pub(crate) output_file: Option<PathBuf>,
    pub(crate) write_output_files: bool,
}

impl CollectorBaseConfig {
    pub(crate) fn new(default_prefix: &str) -> Self {
        CollectorBaseConfig {
            name: String::new(),
            enable: true,
            interval: Duration::from_secs(30),
            prefix: default_prefix.to_string(),
            output_file: None,
            write_output_files: false,
        }
    }

    /// Returns false if the key is not a common collector key.
    pub(crate) fn set_by_yaml_kv(
        &mut self,
        k: &str,
        v: &Yaml,
        conf_dir: Option<&Path>,
    ) -> anyhow::Result<bool> {
        match yaml::normalize_key(k).as_str() {
            "type" => Ok(true),
            "name" => {
                self.name = yaml::as_string(v)?;
                Ok(true)
            }
            "enable" => {
                self.enable = yaml::as_bool(v)?;
                Ok(true)
            }
            "interval" | "collection_interval" => {
                self.interval = yaml::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                Ok(true)
            }
            "prefix" | "metric_prefix" => {
                self.prefix = yaml::as_string(v)?;
                Ok(true)
            }
            "output_file" => {
                let path = yaml::as_path(v, conf_dir)
                    .context(format!("invalid path value for key {k}"))?;
                self.output_file = Some(path);
                Ok(true)
            }
            "write_output_files" | "write_output_file" => {
                self.write_output_files = yaml::as_bool(v)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub(crate) fn check(&mut self, default_name: &str) -> anyhow::Result<()> {
        if self.name.is_empty() {
            self.name = default_name.to_string();
        }
        if self.interval.is_zero() {
            return Err(anyhow!("collection interval should not be zero"));
        }
        if self.write_output_files && self.output_file.is_none() {
            self.output_file = Some(PathBuf::from(format!("./output/{}.out", self.name)));
        }
        Ok(())
    }

    pub(crate) fn file_output(&self) -> Option<&Path> {
        if self.write_output_files {
            self.output_file.as_deref()
        } else {
            None
        }
    }
}

/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::Path;

use anyhow::anyhow;
use yaml_rust::Yaml;

pub(crate) mod collector;
pub(crate) mod destination;
pub(crate) mod output;
pub(crate) mod yaml;

use collector::AnyCollectorConfig;
use destination::AnyDestinationConfig;
use output::OutputConfig;

const HOSTNAME_VARIABLE: &str = "$HOSTNAME";

pub struct PollerConfig {
    pub(crate) hostname: String,
    pub(crate) global_prefix: String,
    pub(crate) output: OutputConfig,
    pub(crate) destinations: Vec<AnyDestinationConfig>,
    pub(crate) collectors: Vec<AnyCollectorConfig>,
}

impl PollerConfig {
    fn new(hostname: &str) -> Self {
        PollerConfig {
            hostname: hostname.to_string(),
            global_prefix: hostname.to_string(),
            output: OutputConfig::default(),
            destinations: Vec::new(),
            collectors: Vec::new(),
        }
    }

    fn load_doc(
        &mut self,
        map: &yaml_rust::yaml::Hash,
        conf_dir: Option<&Path>,
    ) -> anyhow::Result<()> {
        yaml::foreach_kv(map, |k, v| match yaml::normalize_key(k).as_str() {
            "global_metric_name_prefix" | "global_prefix" => {
                let prefix = yaml::as_string(v)?;
                self.global_prefix = prefix.replace(HOSTNAME_VARIABLE, &self.hostname);
                Ok(())
            }
            "output" => {
                self.output = OutputConfig::parse(v)?;
                Ok(())
            }
            "destination" => {
                let destinations = destination::load_all(v)?;
                for d in destinations {
                    if self.destinations.iter().any(|o| o.name() == d.name()) {
                        return Err(anyhow!(
                            "destination with name {} already exists",
                            d.name()
                        ));
                    }
                    self.destinations.push(d);
                }
                Ok(())
            }
            "collector" => {
                let collectors = collector::load_all(v, conf_dir)?;
                for c in collectors {
                    if self.collectors.iter().any(|o| o.name() == c.name()) {
                        return Err(anyhow!(
                            "collector with name {} already exists",
                            c.name()
                        ));
                    }
                    self.collectors.push(c);
                }
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k} in main conf")),
        })
    }

    pub fn enabled_destinations(&self) -> usize {
        self.destinations.iter().filter(|d| d.enabled()).count()
    }

    pub fn enabled_collectors(&self) -> usize {
        self.collectors.iter().filter(|c| c.base().enable).count()
    }
}

pub fn load(config_file: &Path) -> anyhow::Result<PollerConfig> {
    load_with_hostname(config_file, crate::hostname::get())
}

fn load_with_hostname(config_file: &Path, hostname: &str) -> anyhow::Result<PollerConfig> {
    let conf_dir = config_file.parent();
    let mut config = PollerConfig::new(hostname);

    // allow multiple docs, and treat them as the same
    yaml::foreach_doc(config_file, |_, doc| match doc {
        Yaml::Hash(map) => config.load_doc(map, conf_dir),
        _ => Err(anyhow!("yaml doc root should be hash")),
    })?;

    Ok(config)
}

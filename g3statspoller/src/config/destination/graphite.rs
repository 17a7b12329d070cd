/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::anyhow;
use yaml_rust::{Yaml, yaml};

use super::{DeliveryConfig, DestinationConfig, TcpPeerConfig};
use crate::config::yaml as conf_yaml;

const DESTINATION_CONFIG_TYPE: &str = "Graphite";
const DEFAULT_PORT: u16 = 2003;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct GraphiteDestinationConfig {
    name: String,
    enable: bool,
    pub(crate) peer: TcpPeerConfig,
    pub(crate) delivery: DeliveryConfig,
}

impl GraphiteDestinationConfig {
    fn new() -> Self {
        GraphiteDestinationConfig {
            name: String::new(),
            enable: true,
            peer: TcpPeerConfig::new(DEFAULT_PORT),
            delivery: DeliveryConfig::default(),
        }
    }

    pub(crate) fn parse(map: &yaml::Hash) -> anyhow::Result<Self> {
        let mut config = GraphiteDestinationConfig::new();

        conf_yaml::foreach_kv(map, |k, v| config.set(k, v))?;

        config.check()?;
        Ok(config)
    }

    fn set(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match conf_yaml::normalize_key(k).as_str() {
            super::CONFIG_KEY_DESTINATION_TYPE => Ok(()),
            super::CONFIG_KEY_DESTINATION_NAME => {
                self.name = conf_yaml::as_string(v)?;
                Ok(())
            }
            super::CONFIG_KEY_DESTINATION_ENABLE => {
                self.enable = conf_yaml::as_bool(v)?;
                Ok(())
            }
            _ => {
                if self.peer.set_by_yaml_kv(k, v)? {
                    Ok(())
                } else {
                    self.delivery.set_by_yaml_kv(k, v)
                }
            }
        }
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.name.is_empty() {
            return Err(anyhow!("name is not set"));
        }
        self.peer.check()?;
        self.delivery.check()
    }
}

impl DestinationConfig for GraphiteDestinationConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn destination_type(&self) -> &'static str {
        DESTINATION_CONFIG_TYPE
    }

    fn enabled(&self) -> bool {
        self.enable
    }

    fn delivery(&self) -> &DeliveryConfig {
        &self.delivery
    }
}

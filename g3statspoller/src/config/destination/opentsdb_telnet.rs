/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::anyhow;
use yaml_rust::{Yaml, yaml};

use super::{DeliveryConfig, DestinationConfig, TcpPeerConfig};
use crate::config::yaml as conf_yaml;

const DESTINATION_CONFIG_TYPE: &str = "OpenTSDB-Telnet";
const DEFAULT_PORT: u16 = 4242;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct OpentsdbTelnetDestinationConfig {
    name: String,
    enable: bool,
    pub(crate) peer: TcpPeerConfig,
    pub(crate) delivery: DeliveryConfig,
    pub(crate) host_tag: String,
}

impl OpentsdbTelnetDestinationConfig {
    fn new() -> Self {
        OpentsdbTelnetDestinationConfig {
            name: String::new(),
            enable: true,
            peer: TcpPeerConfig::new(DEFAULT_PORT),
            delivery: DeliveryConfig::default(),
            host_tag: super::DEFAULT_HOST_TAG.to_string(),
        }
    }

    pub(crate) fn parse(map: &yaml::Hash) -> anyhow::Result<Self> {
        let mut config = OpentsdbTelnetDestinationConfig::new();

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
            "host_tag" => {
                self.host_tag = conf_yaml::as_string(v)?;
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
        if self.host_tag.is_empty() {
            return Err(anyhow!("host tag name should not be empty"));
        }
        self.peer.check()?;
        self.delivery.check()
    }
}

impl DestinationConfig for OpentsdbTelnetDestinationConfig {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::yaml::load_test_doc;

    #[test]
    fn parse_defaults() {
        let doc = load_test_doc("name: t1\nhost: tsdb.local");
        let config = OpentsdbTelnetDestinationConfig::parse(doc.as_hash().unwrap()).unwrap();
        assert_eq!(config.destination_type(), "OpenTSDB-Telnet");
        assert_eq!(config.peer.lookup_str(), "tsdb.local:4242");
        assert_eq!(config.delivery.batch_size, 1000);
        assert!(!config.delivery.sanitize);
        assert_eq!(config.host_tag, "SP_Host");
    }

    #[test]
    fn missing_name() {
        let doc = load_test_doc("host: tsdb.local\nport: 4243");
        assert!(OpentsdbTelnetDestinationConfig::parse(doc.as_hash().unwrap()).is_err());
    }
}

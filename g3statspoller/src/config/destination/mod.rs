/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::HashSet;

use anyhow::{Context, anyhow};
use yaml_rust::{Yaml, yaml};

use crate::config::yaml as conf_yaml;

mod delivery;
pub(crate) use delivery::DeliveryConfig;

pub(crate) mod graphite;
pub(crate) mod opentsdb_http;
pub(crate) mod opentsdb_telnet;

const CONFIG_KEY_DESTINATION_TYPE: &str = "type";
const CONFIG_KEY_DESTINATION_NAME: &str = "name";
const CONFIG_KEY_DESTINATION_ENABLE: &str = "enable";

const DEFAULT_HOST_TAG: &str = "SP_Host";

pub(crate) trait DestinationConfig {
    fn name(&self) -> &str;
    fn destination_type(&self) -> &'static str;
    fn enabled(&self) -> bool;
    fn delivery(&self) -> &DeliveryConfig;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum AnyDestinationConfig {
    Graphite(graphite::GraphiteDestinationConfig),
    OpentsdbTelnet(opentsdb_telnet::OpentsdbTelnetDestinationConfig),
    OpentsdbHttp(opentsdb_http::OpentsdbHttpDestinationConfig),
}

macro_rules! impl_any_fn {
    ($name:ident, $ret:ty) => {
        pub(crate) fn $name(&self) -> $ret {
            match self {
                AnyDestinationConfig::Graphite(c) => c.$name(),
                AnyDestinationConfig::OpentsdbTelnet(c) => c.$name(),
                AnyDestinationConfig::OpentsdbHttp(c) => c.$name(),
            }
        }
    };
}

impl AnyDestinationConfig {
    impl_any_fn!(name, &str);
    impl_any_fn!(destination_type, &'static str);
    impl_any_fn!(enabled, bool);
    impl_any_fn!(delivery, &DeliveryConfig);
}

/// Host and port of a line protocol server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TcpPeerConfig {
    pub(crate) host: String,
    pub(crate) port: u16,
}

impl TcpPeerConfig {
    fn new(default_port: u16) -> Self {
        TcpPeerConfig {
            host: String::new(),
            port: default_port,
        }
    }

    /// Returns false if the key is not a peer key.
    fn set_by_yaml_kv(&mut self, k: &str, v: &Yaml) -> anyhow::Result<bool> {
        match conf_yaml::normalize_key(k).as_str() {
            "host" | "server" => {
                self.host = conf_yaml::as_string(v)?;
                Ok(true)
            }
            "port" => {
                self.port = conf_yaml::as_u16(v)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.host.is_empty() {
            return Err(anyhow!("peer host is not set"));
        }
        if self.port == 0 {
            return Err(anyhow!("peer port should not be zero"));
        }
        Ok(())
    }

    /// The address string accepted by `tokio::net::lookup_host`.
    pub(crate) fn lookup_str(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

pub(crate) fn load_all(v: &Yaml) -> anyhow::Result<Vec<AnyDestinationConfig>> {
    let mut destinations = Vec::new();
    let mut names = HashSet::new();
    conf_yaml::foreach_map(v, |map| {
        let destination = load_destination(map)?;
        if !names.insert(destination.name().to_string()) {
            return Err(anyhow!(
                "destination with name {} already exists",
                destination.name()
            ));
        }
        destinations.push(destination);
        Ok(())
    })?;
    Ok(destinations)
}

fn load_destination(map: &yaml::Hash) -> anyhow::Result<AnyDestinationConfig> {
    let destination_type = conf_yaml::hash_get_required_str(map, CONFIG_KEY_DESTINATION_TYPE)?;
    match conf_yaml::normalize_key(destination_type).as_str() {
        "graphite" => {
            let config = graphite::GraphiteDestinationConfig::parse(map)
                .context("failed to load this Graphite destination")?;
            Ok(AnyDestinationConfig::Graphite(config))
        }
        "opentsdb_telnet" | "opentsdb" => {
            let config = opentsdb_telnet::OpentsdbTelnetDestinationConfig::parse(map)
                .context("failed to load this OpenTSDB telnet destination")?;
            Ok(AnyDestinationConfig::OpentsdbTelnet(config))
        }
        "opentsdb_http" => {
            let config = opentsdb_http::OpentsdbHttpDestinationConfig::parse(map)
                .context("failed to load this OpenTSDB HTTP destination")?;
            Ok(AnyDestinationConfig::OpentsdbHttp(config))
        }
        _ => Err(anyhow!("unsupported destination type {destination_type}")),
    }
}

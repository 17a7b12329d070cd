/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;

use anyhow::{Context, anyhow};
use http::Uri;
use http::uri::PathAndQuery;
use yaml_rust::{Yaml, yaml};

use super::{DeliveryConfig, DestinationConfig, TcpPeerConfig};
use crate::config::yaml as conf_yaml;

const DESTINATION_CONFIG_TYPE: &str = "OpenTSDB-HTTP";
const DEFAULT_PORT: u16 = 4242;
const DEFAULT_API_PATH: &str = "/api/put";

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct OpentsdbHttpDestinationConfig {
    name: String,
    enable: bool,
    url: Option<Uri>,
    pub(crate) peer: TcpPeerConfig,
    pub(crate) api_path: PathAndQuery,
    pub(crate) delivery: DeliveryConfig,
    pub(crate) host_tag: String,
    pub(crate) rsp_head_max_size: usize,
}

impl OpentsdbHttpDestinationConfig {
    fn new() -> Self {
        OpentsdbHttpDestinationConfig {
            name: String::new(),
            enable: true,
            url: None,
            peer: TcpPeerConfig::new(DEFAULT_PORT),
            api_path: PathAndQuery::from_static(DEFAULT_API_PATH),
            delivery: DeliveryConfig::default(),
            host_tag: super::DEFAULT_HOST_TAG.to_string(),
            rsp_head_max_size: 8192,
        }
    }

    pub(crate) fn parse(map: &yaml::Hash) -> anyhow::Result<Self> {
        let mut config = OpentsdbHttpDestinationConfig::new();

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
            "url" => {
                let s = conf_yaml::as_string(v)?;
                let url = Uri::from_str(&s).context(format!("invalid url value for key {k}"))?;
                self.url = Some(url);
                Ok(())
            }
            "host_tag" => {
                self.host_tag = conf_yaml::as_string(v)?;
                Ok(())
            }
            "rsp_header_max_size" => {
                self.rsp_head_max_size =
                    conf_yaml::as_usize(v).context(format!("invalid usize value for key {k}"))?;
                Ok(())
            }
            _ => self.delivery.set_by_yaml_kv(k, v),
        }
    }

    fn check(&mut self) -> anyhow::Result<()> {
        if self.name.is_empty() {
            return Err(anyhow!("name is not set"));
        }
        let Some(url) = &self.url else {
            return Err(anyhow!("url is not set"));
        };
        match url.scheme_str() {
            Some("http") | None => {}
            Some(s) => return Err(anyhow!("unsupported url scheme {s}")),
        }
        let Some(host) = url.host() else {
            return Err(anyhow!("no host found in url {url}"));
        };
        self.peer.host = host.trim_start_matches('[').trim_end_matches(']').to_string();
        if let Some(port) = url.port_u16() {
            self.peer.port = port;
        }
        if let Some(pq) = url.path_and_query() {
            if pq.path() != "/" || pq.query().is_some() {
                self.api_path = pq.clone();
            }
        }
        if self.host_tag.is_empty() {
            return Err(anyhow!("host tag name should not be empty"));
        }
        self.peer.check()?;
        self.delivery.check()
    }

    /// The value of the Host header.
    pub(crate) fn host_header(&self) -> String {
        match self.url.as_ref().and_then(|u| u.authority()) {
            Some(authority) => authority.as_str().to_string(),
            None => self.peer.lookup_str(),
        }
    }
}

impl DestinationConfig for OpentsdbHttpDestinationConfig {
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

/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use crate::config::yaml;

const DEFAULT_BATCH_SIZE: usize = 1000;
const DEFAULT_RETRY_ATTEMPTS: usize = 2;

/// Delivery settings shared by every destination type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct DeliveryConfig {
    pub(crate) batch_size: usize,
    pub(crate) retry_attempts: usize,
    pub(crate) connect_timeout: Option<Duration>,
    pub(crate) read_timeout: Option<Duration>,
    pub(crate) sanitize: bool,
    pub(crate) substitute_chars: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        DeliveryConfig {
            batch_size: DEFAULT_BATCH_SIZE,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            connect_timeout: None,
            read_timeout: None,
            sanitize: false,
            substitute_chars: false,
        }
    }
}

impl DeliveryConfig {
    pub(crate) fn set_by_yaml_kv(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match yaml::normalize_key(k).as_str() {
            "batch_size" | "max_metrics_per_message" => {
                self.batch_size =
                    yaml::as_usize(v).context(format!("invalid usize value for key {k}"))?;
                Ok(())
            }
            "retry_attempts" | "send_retry_attempts" => {
                self.retry_attempts =
                    yaml::as_usize(v).context(format!("invalid usize value for key {k}"))?;
                Ok(())
            }
            "connect_timeout" => {
                let timeout = yaml::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                self.connect_timeout = Some(timeout);
                Ok(())
            }
            "read_timeout" => {
                let timeout = yaml::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                self.read_timeout = Some(timeout);
                Ok(())
            }
            "sanitize" | "sanitize_metrics" => {
                self.sanitize = yaml::as_bool(v)?;
                Ok(())
            }
            "substitute_chars" | "substitute_characters" => {
                self.substitute_chars = yaml::as_bool(v)?;
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        }
    }

    pub(crate) fn check(&self) -> anyhow::Result<()> {
        if self.batch_size == 0 {
            return Err(anyhow!("batch size should not be zero"));
        }
        if matches!(self.connect_timeout, Some(d) if d.is_zero()) {
            return Err(anyhow!("connect timeout should not be zero"));
        }
        if matches!(self.read_timeout, Some(d) if d.is_zero()) {
            return Err(anyhow!("read timeout should not be zero"));
        }
        Ok(())
    }
}

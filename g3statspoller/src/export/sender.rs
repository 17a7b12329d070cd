/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use log::debug;

use super::format::{GraphiteLineFormat, OpentsdbTelnetFormat};
use super::http::OpentsdbHttpTransport;
use super::tcp::TcpLineTransport;
use super::{DeliveryReport, IoTimeouts, deliver, sanitize};
use crate::config::destination::{AnyDestinationConfig, DeliveryConfig};
use crate::types::MetricRecord;

/// Delivers the records of one output cycle to one destination.
pub(crate) struct Sender {
    config: Arc<AnyDestinationConfig>,
    hostname: Arc<str>,
}

impl Sender {
    pub(crate) fn new(config: Arc<AnyDestinationConfig>, hostname: Arc<str>) -> Self {
        Sender { config, hostname }
    }

    pub(crate) fn name(&self) -> &str {
        self.config.name()
    }

    fn prepare<F>(&self, records: &[MetricRecord], convert: F) -> (Vec<MetricRecord>, usize)
    where
        F: Fn(&MetricRecord, bool, bool) -> Option<MetricRecord>,
    {
        let delivery = self.config.delivery();
        let mut prepared = Vec::with_capacity(records.len());
        let mut skipped = 0;
        for record in records {
            match convert(record, delivery.sanitize, delivery.substitute_chars) {
                Some(r) => prepared.push(r),
                None => {
                    debug!(
                        "destination {}: skip record with empty path, raw path: {:?}",
                        self.name(),
                        record.path
                    );
                    skipped += 1;
                }
            }
        }
        (prepared, skipped)
    }

    pub(crate) async fn send(
        &self,
        records: &[MetricRecord],
        timeouts: IoTimeouts,
    ) -> DeliveryReport {
        let name = self.name();
        let DeliveryConfig {
            batch_size,
            retry_attempts,
            ..
        } = *self.config.delivery();

        let (report, skipped) = match self.config.as_ref() {
            AnyDestinationConfig::Graphite(c) => {
                let (records, skipped) = self.prepare(records, sanitize::graphite_record);
                let mut transport =
                    TcpLineTransport::new(name, &c.peer, GraphiteLineFormat::default(), timeouts);
                let report =
                    deliver(name, &mut transport, &records, batch_size, retry_attempts).await;
                transport.shutdown().await;
                (report, skipped)
            }
            AnyDestinationConfig::OpentsdbTelnet(c) => {
                let (records, skipped) = self.prepare(records, sanitize::opentsdb_record);
                let format = OpentsdbTelnetFormat::with_host_tag(&c.host_tag, &self.hostname);
                let mut transport = TcpLineTransport::new(name, &c.peer, format, timeouts);
                let report =
                    deliver(name, &mut transport, &records, batch_size, retry_attempts).await;
                transport.shutdown().await;
                (report, skipped)
            }
            AnyDestinationConfig::OpentsdbHttp(c) => {
                let (records, skipped) = self.prepare(records, sanitize::opentsdb_record);
                let mut transport = OpentsdbHttpTransport::new(c, name, &self.hostname, timeouts);
                let report =
                    deliver(name, &mut transport, &records, batch_size, retry_attempts).await;
                (report, skipped)
            }
        };

        DeliveryReport {
            records_skipped: skipped,
            ..report
        }
    }
}

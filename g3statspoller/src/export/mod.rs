/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

use log::{debug, warn};

use crate::types::MetricRecord;

mod error;
pub(crate) use error::SendError;

pub(crate) mod format;
mod http;
pub(crate) mod sanitize;
mod tcp;

mod sender;
pub(crate) use sender::Sender;

/// Per destination network timeouts for one output cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct IoTimeouts {
    pub(crate) connect: Duration,
    pub(crate) io: Duration,
}

/// Sends one chunk of records with the framing of a wire protocol.
pub(crate) trait ChunkTransport {
    fn send_chunk(
        &mut self,
        chunk: &[MetricRecord],
    ) -> impl Future<Output = Result<(), SendError>> + Send;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct DeliveryReport {
    pub(crate) records_sent: usize,
    pub(crate) records_dropped: usize,
    pub(crate) records_skipped: usize,
    pub(crate) chunks_sent: usize,
    pub(crate) chunks_dropped: usize,
    pub(crate) attempts: usize,
}

impl DeliveryReport {
    pub(crate) fn has_error(&self) -> bool {
        self.chunks_dropped > 0
    }
}

/// Split `records` into chunks of at most `batch_size` and send each chunk
/// with up to `retry_attempts` retries.
pub(crate) async fn deliver<T>(
    destination: &str,
    transport: &mut T,
    records: &[MetricRecord],
    batch_size: usize,
    retry_attempts: usize,
) -> DeliveryReport
where
    T: ChunkTransport,
{
    let mut report = DeliveryReport::default();
    for (index, chunk) in records.chunks(batch_size.max(1)).enumerate() {
        let mut last_error = None;
        for attempt in 0..=retry_attempts {
            report.attempts += 1;
            match transport.send_chunk(chunk).await {
                Ok(_) => {
                    last_error = None;
                    break;
                }
                Err(e) => {
                    debug!(
                        "destination {destination}: attempt {} to send chunk {index} failed: {e}",
                        attempt + 1
                    );
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) => {
                warn!(
                    "destination {destination}: dropped chunk {index} with {} records after {} attempts: {e}",
                    chunk.len(),
                    retry_attempts + 1
                );
                report.chunks_dropped += 1;
                report.records_dropped += chunk.len();
            }
            None => {
                report.chunks_sent += 1;
                report.records_sent += chunk.len();
            }
        }
    }
    report
}

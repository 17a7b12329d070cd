/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use log::{debug, warn};

use crate::export::format::{FileLineFormat, LineFormat};
use crate::types::MetricRecord;

const WRITE_RETRIES: usize = 3;
const WRITE_RETRY_WAIT: Duration = Duration::from_millis(100);

async fn write_once(path: &Path, content: &[u8]) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            tokio::fs::create_dir_all(dir)
                .await
                .context(format!("failed to create directory {}", dir.display()))?;
        }
    }
    tokio::fs::write(path, content)
        .await
        .context(format!("failed to write file {}", path.display()))
}

/// Overwrite `path` with the line text of `records`.
///
/// Returns false after the last retry failed, the error is logged here.
/// An empty collection leaves the file untouched.
pub(crate) async fn write_file(collector: &str, path: &Path, records: &[MetricRecord]) -> bool {
    if records.is_empty() {
        debug!("collector {collector}: no records, skip output file");
        return true;
    }

    let format = FileLineFormat::default();
    let mut content = Vec::with_capacity(records.len() * 64);
    for record in records {
        format.serialize(record, &mut content);
    }

    let mut attempt = 0;
    loop {
        match write_once(path, &content).await {
            Ok(_) => return true,
            Err(e) if attempt < WRITE_RETRIES => {
                attempt += 1;
                debug!("collector {collector}: output file attempt {attempt} failed: {e:?}");
                tokio::time::sleep(WRITE_RETRY_WAIT).await;
            }
            Err(e) => {
                warn!(
                    "collector {collector}: failed to write output file after {} attempts: {e:?}",
                    attempt + 1
                );
                return false;
            }
        }
    }
}

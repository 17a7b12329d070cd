/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, anyhow};
use foldhash::fast::RandomState;
use log::{debug, info, warn};
use tokio::process::Command;

use super::Collect;
use crate::config::collector::external::ExternalCollectorConfig;
use crate::types::{MetricRecord, MetricTagMap, MetricValue, unix_timestamp};

const READ_RETRIES: usize = 3;
const READ_RETRY_WAIT: Duration = Duration::from_millis(100);

type MetricKey = (String, MetricTagMap);

/// Parse one line of graphite (`path value timestamp`) or opentsdb
/// (`[put] metric timestamp value k=v ...`) text.
fn parse_line(line: &str) -> anyhow::Result<MetricRecord> {
    let fields: Vec<&str> = line.split_ascii_whitespace().collect();
    match fields.as_slice() {
        [path, value, ts] => {
            let value = MetricValue::from_str(value)?;
            let ts = u64::from_str(ts).map_err(|e| anyhow!("invalid timestamp {ts}: {e}"))?;
            Ok(MetricRecord::new(*path, value, ts))
        }
        ["put", metric, ts, value, tags @ ..] | [metric, ts, value, tags @ ..] => {
            let value = MetricValue::from_str(value)?;
            let ts = u64::from_str(ts).map_err(|e| anyhow!("invalid timestamp {ts}: {e}"))?;
            let mut tag_map = MetricTagMap::new();
            for tag in tags {
                let Some((k, v)) = tag.split_once('=') else {
                    return Err(anyhow!("invalid tag {tag}"));
                };
                if k.is_empty() || v.is_empty() {
                    return Err(anyhow!("invalid tag {tag}"));
                }
                tag_map.insert(k.to_string(), v.to_string());
            }
            Ok(MetricRecord::with_tags(*metric, value, ts, tag_map))
        }
        _ => Err(anyhow!("unrecognized format")),
    }
}

fn unix_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Runs an optional external program, then reads the metric lines it left
/// in the metrics file.
pub(crate) struct ExternalCollector {
    name: String,
    program: Vec<String>,
    program_timeout: Duration,
    metrics_file: PathBuf,
    max_metric_age: Duration,
    always_check_file: bool,
    started_at: u64,
    file_mtime: Option<SystemTime>,
    newest: HashMap<MetricKey, u64, RandomState>,
}

impl ExternalCollector {
    pub(crate) fn new(name: String, config: &ExternalCollectorConfig) -> Self {
        ExternalCollector {
            name,
            program: config.program.clone(),
            program_timeout: config.base.interval,
            metrics_file: config.metrics_file.clone(),
            max_metric_age: config.max_metric_age,
            always_check_file: config.always_check_file,
            started_at: unix_timestamp(),
            file_mtime: None,
            newest: HashMap::with_hasher(RandomState::default()),
        }
    }

    async fn run_program(&self) -> anyhow::Result<()> {
        let Some((program, args)) = self.program.split_first() else {
            return Ok(());
        };
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .context(format!("failed to spawn program {program}"))?;
        match tokio::time::timeout(self.program_timeout, child.wait()).await {
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(Ok(status)) => Err(anyhow!("program {program} exited with {status}")),
            Ok(Err(e)) => Err(anyhow!("failed to wait program {program}: {e}")),
            Err(_) => {
                let _ = child.kill().await;
                Err(anyhow!(
                    "program {program} killed after running for {:?}",
                    self.program_timeout
                ))
            }
        }
    }

    /// Returns the file content only when it changed since the last read,
    /// or on every call with `always_check_file`.
    async fn read_file(&mut self) -> anyhow::Result<Option<String>> {
        let meta = match tokio::fs::metadata(&self.metrics_file).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow!(
                    "failed to stat {}: {e}",
                    self.metrics_file.display()
                ));
            }
        };
        let mtime = meta
            .modified()
            .context(format!("no mtime for {}", self.metrics_file.display()))?;
        // left over from a previous run of this process
        if unix_secs(mtime) < self.started_at {
            return Ok(None);
        }
        let changed = match self.file_mtime {
            None => true,
            Some(prev) => prev < mtime,
        };
        if !changed && !self.always_check_file {
            return Ok(None);
        }

        let mut attempt = 0;
        let content = loop {
            match tokio::fs::read_to_string(&self.metrics_file).await {
                Ok(s) => break s,
                Err(e) if attempt < READ_RETRIES => {
                    attempt += 1;
                    debug!(
                        "collector {}: read attempt {attempt} failed: {e}",
                        self.name
                    );
                    tokio::time::sleep(READ_RETRY_WAIT).await;
                }
                Err(e) => {
                    return Err(anyhow!(
                        "failed to read {} after {} attempts: {e}",
                        self.metrics_file.display(),
                        attempt + 1
                    ));
                }
            }
        };
        self.file_mtime = Some(mtime);
        Ok(Some(content))
    }

    fn parse_content(&self, content: &str, oldest: u64) -> Vec<MetricRecord> {
        let mut records = Vec::new();
        let mut invalid = 0;
        for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match parse_line(line) {
                Ok(r) if r.timestamp >= oldest => records.push(r),
                Ok(_) => {}
                Err(e) => {
                    debug!("collector {}: invalid metric line {line:?}: {e}", self.name);
                    invalid += 1;
                }
            }
        }
        if invalid > 0 {
            warn!(
                "collector {}: {invalid} invalid lines in {}",
                self.name,
                self.metrics_file.display()
            );
        }
        records
    }

    /// Keep only records newer than the last one seen with the same key.
    fn select_new(&mut self, records: Vec<MetricRecord>) -> Vec<MetricRecord> {
        let mut selected = Vec::with_capacity(records.len());
        for record in records {
            let key = (record.path.clone(), record.tags.clone());
            match self.newest.get_mut(&key) {
                Some(ts) if *ts >= record.timestamp => {}
                Some(ts) => {
                    *ts = record.timestamp;
                    selected.push(record);
                }
                None => {
                    self.newest.insert(key, record.timestamp);
                    selected.push(record);
                }
            }
        }
        selected
    }

    fn forget_expired(&mut self, oldest: u64) {
        self.newest.retain(|_, ts| *ts >= oldest);
    }
}

impl Collect for ExternalCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&mut self) -> anyhow::Result<Vec<MetricRecord>> {
        if let Err(e) = self.run_program().await {
            warn!("collector {}: {e:?}", self.name);
        }

        let oldest = unix_timestamp().saturating_sub(self.max_metric_age.as_secs());
        let records = match self.read_file().await? {
            Some(content) => {
                let parsed = self.parse_content(&content, oldest);
                self.select_new(parsed)
            }
            None => Vec::new(),
        };
        self.forget_expired(oldest);

        if records.is_empty() {
            debug!(
                "collector {}: no new metrics in {}",
                self.name,
                self.metrics_file.display()
            );
        } else {
            info!(
                "collector {}: {} new metrics in {}",
                self.name,
                records.len(),
                self.metrics_file.display()
            );
        }
        Ok(records)
    }
}

/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};

use super::Collect;
use crate::config::collector::file_counter::FileCounterCollectorConfig;
use crate::export::sanitize;
use crate::types::{MetricRecord, MetricValue, unix_timestamp};

const FILE_COUNT_METRIC: &str = "filecount";

pub(crate) struct FileCounterCollector {
    name: String,
    root_dir: Option<PathBuf>,
    recursive: bool,
}

impl FileCounterCollector {
    pub(crate) fn new(name: String, config: &FileCounterCollectorConfig) -> Self {
        FileCounterCollector {
            name,
            root_dir: config.root_dir.clone(),
            recursive: config.count_subdirectories,
        }
    }
}

/// Count the regular files directly inside `dir`, also returning its subdirectories.
fn scan_dir(dir: &Path) -> io::Result<(usize, Vec<PathBuf>)> {
    let mut files = 0;
    let mut subdirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            subdirs.push(entry.path());
        } else if file_type.is_file() {
            files += 1;
        } else if file_type.is_symlink() {
            if let Ok(meta) = std::fs::metadata(entry.path()) {
                if meta.is_file() {
                    files += 1;
                }
            }
        }
    }
    Ok((files, subdirs))
}

fn metric_path(root: &Path, dir: &Path) -> String {
    let relative = dir.strip_prefix(root).unwrap_or(dir);
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join(".");
    let path = sanitize::graphite_path(&joined, true, true);
    if path.is_empty() {
        FILE_COUNT_METRIC.to_string()
    } else {
        format!("{path}.{FILE_COUNT_METRIC}")
    }
}

/// File count of `root`, and of every directory below it if `recursive`.
pub(crate) fn count_files(root: &Path, recursive: bool) -> io::Result<Vec<(String, usize)>> {
    let mut counts = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let (files, mut subdirs) = match scan_dir(&dir) {
            Ok(r) => r,
            // the root must be readable, a vanished subdirectory is skipped
            Err(e) if dir == root => return Err(e),
            Err(_) => continue,
        };
        counts.push((metric_path(root, &dir), files));
        if recursive {
            subdirs.sort();
            pending.extend(subdirs.into_iter().rev());
        }
    }
    Ok(counts)
}

impl Collect for FileCounterCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&mut self) -> anyhow::Result<Vec<MetricRecord>> {
        let Some(root) = self.root_dir.clone() else {
            return Ok(Vec::new());
        };
        let recursive = self.recursive;
        let display = root.display().to_string();
        let counts = tokio::task::spawn_blocking(move || count_files(&root, recursive))
            .await
            .map_err(|e| anyhow!("file count task failed: {e}"))?
            .context(format!("failed to count files in {display}"))?;

        let timestamp = unix_timestamp();
        Ok(counts
            .into_iter()
            .map(|(path, n)| MetricRecord::new(path, MetricValue::from(n), timestamp))
            .collect())
    }
}

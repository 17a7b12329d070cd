/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};

use super::Collect;
use crate::config::collector::process_counter::{
    ProcessCounterCollectorConfig, ProcessCounterRule,
};
use crate::export::sanitize;
use crate::types::{MetricRecord, MetricValue, unix_timestamp};

pub(crate) struct ProcessCounterCollector {
    name: String,
    proc_dir: PathBuf,
    rules: Vec<ProcessCounterRule>,
}

impl ProcessCounterCollector {
    pub(crate) fn new(name: String, config: &ProcessCounterCollectorConfig) -> Self {
        ProcessCounterCollector {
            name,
            proc_dir: config.proc_dir.clone(),
            rules: config.rules.clone(),
        }
    }
}

fn normalize_cmdline(raw: &[u8]) -> String {
    let s = String::from_utf8_lossy(raw);
    s.replace('\0', " ").trim().to_string()
}

/// Match the command line of every process below `proc_dir` against each rule.
///
/// All rules are counted, zero included, and a process may match many rules.
fn count_processes(proc_dir: &Path, rules: &[ProcessCounterRule]) -> std::io::Result<Vec<usize>> {
    let mut counts = vec![0; rules.len()];
    if rules.is_empty() {
        return Ok(counts);
    }
    for entry in std::fs::read_dir(proc_dir)? {
        let Ok(entry) = entry else {
            continue;
        };
        let file_name = entry.file_name();
        let Some(pid) = file_name.to_str() else {
            continue;
        };
        if pid.is_empty() || !pid.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        // the process may exit before we read it
        let Ok(raw) = std::fs::read(entry.path().join("cmdline")) else {
            continue;
        };
        let cmdline = normalize_cmdline(&raw);
        if cmdline.is_empty() {
            continue;
        }
        for (rule, count) in rules.iter().zip(counts.iter_mut()) {
            if rule.regex.find(&cmdline).is_some() {
                *count += 1;
            }
        }
    }
    Ok(counts)
}

impl Collect for ProcessCounterCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&mut self) -> anyhow::Result<Vec<MetricRecord>> {
        let proc_dir = self.proc_dir.clone();
        let rules = self.rules.clone();
        let counts = tokio::task::spawn_blocking(move || count_processes(&proc_dir, &rules))
            .await
            .map_err(|e| anyhow!("process count task failed: {e}"))?
            .context(format!("failed to list {}", self.proc_dir.display()))?;

        let timestamp = unix_timestamp();
        Ok(self
            .rules
            .iter()
            .zip(counts)
            .map(|(rule, n)| {
                let path = sanitize::graphite_path(&rule.identifier, true, true);
                MetricRecord::new(path, MetricValue::from(n), timestamp)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn rule(identifier: &str, regex: &str) -> ProcessCounterRule {
        ProcessCounterRule {
            identifier: identifier.to_string(),
            regex: Regex::new(regex).unwrap(),
        }
    }

    fn fake_proc(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("g3statspoller-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        for (pid, cmdline) in [
            ("1", "/sbin/init\0splash\0"),
            ("100", "nginx: master process /usr/sbin/nginx\0"),
            ("101", "nginx: worker process\0"),
            ("102", "nginx: worker process\0"),
            ("200", ""),
            ("self", "nginx: worker process\0"),
        ] {
            std::fs::create_dir_all(dir.join(pid)).unwrap();
            std::fs::write(dir.join(pid).join("cmdline"), cmdline).unwrap();
        }
        dir
    }

    #[test]
    fn cmdline() {
        assert_eq!(normalize_cmdline(b"/sbin/init\0splash\0"), "/sbin/init splash");
        assert_eq!(normalize_cmdline(b"\0\0"), "");
    }

    #[test]
    fn count() {
        let dir = fake_proc("proc-count");
        let rules = vec![
            rule("nginx", "nginx: (master|worker)"),
            rule("nginx-workers", "worker"),
            rule("init", "^/sbin/init splash$"),
            rule("sshd", "sshd"),
        ];
        let counts = count_processes(&dir, &rules).unwrap();
        assert_eq!(counts, vec![3, 2, 1, 0]);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn collect() {
        let dir = fake_proc("proc-collect");
        let config = ProcessCounterCollectorConfig {
            base: crate::config::collector::CollectorBaseConfig::new("ProcessCounter"),
            proc_dir: dir.clone(),
            rules: vec![rule("nginx worker", "worker"), rule("sshd", "sshd")],
        };
        let mut collector = ProcessCounterCollector::new("pc".to_string(), &config);
        let records = collector.collect().await.unwrap();
        let lines: Vec<String> = records
            .iter()
            .map(|r| format!("{} {}", r.path, r.value))
            .collect();
        assert_eq!(lines, vec!["nginx_worker 2", "sshd 0"]);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}

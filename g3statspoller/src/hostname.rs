/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::OnceLock;

const UNKNOWN_HOST: &str = "UNKNOWN-HOST";

static HOSTNAME: OnceLock<String> = OnceLock::new();

#[cfg(unix)]
fn system_hostname() -> Option<String> {
    let uname = rustix::system::uname();
    let name = uname.nodename().to_str().ok()?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(not(unix))]
fn system_hostname() -> Option<String> {
    None
}

fn env_hostname() -> Option<String> {
    ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .filter_map(|k| std::env::var(k).ok())
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

pub fn get() -> &'static str {
    HOSTNAME.get_or_init(|| {
        system_hostname()
            .or_else(env_hostname)
            .unwrap_or_else(|| UNKNOWN_HOST.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_empty() {
        let name = get();
        assert!(!name.is_empty());
        assert_eq!(name, get());
    }
}

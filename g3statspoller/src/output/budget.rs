/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

use crate::config::destination::AnyDestinationConfig;
use crate::config::output::OutputConfig;
use crate::export::IoTimeouts;

const MIN_CYCLE_TIME: Duration = Duration::from_millis(2500);
const MIN_IO_TIMEOUT: Duration = Duration::from_secs(1);

/// Time limits of one output cycle, all derived from the output interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct CycleBudget {
    pub(crate) max_cycle: Duration,
    pub(crate) tcp_connect: Duration,
    pub(crate) tcp_write: Duration,
    pub(crate) http_connect: Duration,
    pub(crate) http_read: Duration,
}

impl CycleBudget {
    pub(crate) fn derive(
        interval: Duration,
        cycle_margin: Duration,
        timeout_margin: Duration,
    ) -> Self {
        let max_cycle = interval.saturating_sub(cycle_margin).max(MIN_CYCLE_TIME);
        let base = interval.saturating_sub(timeout_margin);
        CycleBudget {
            max_cycle,
            tcp_connect: (base / 2).max(MIN_IO_TIMEOUT),
            tcp_write: (base / 2).max(MIN_IO_TIMEOUT),
            http_connect: (base / 4).max(MIN_IO_TIMEOUT),
            http_read: (base / 2).max(MIN_IO_TIMEOUT),
        }
    }

    pub(crate) fn from_config(config: &OutputConfig) -> Self {
        CycleBudget::derive(config.interval, config.cycle_safety_margin, config.timeout_margin)
    }

    pub(crate) fn timeouts_for(&self, destination: &AnyDestinationConfig) -> IoTimeouts {
        let (connect, io) = match destination {
            AnyDestinationConfig::Graphite(_) | AnyDestinationConfig::OpentsdbTelnet(_) => {
                (self.tcp_connect, self.tcp_write)
            }
            AnyDestinationConfig::OpentsdbHttp(_) => (self.http_connect, self.http_read),
        };
        let delivery = destination.delivery();
        IoTimeouts {
            connect: cap(connect, delivery.connect_timeout),
            io: cap(io, delivery.read_timeout),
        }
    }
}

fn cap(derived: Duration, configured: Option<Duration>) -> Duration {
    match configured {
        Some(c) => c.min(derived),
        None => derived,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::destination::load_all;
    use crate::config::yaml::load_test_doc;

    #[test]
    fn default_interval() {
        let budget = CycleBudget::from_config(&OutputConfig::default());
        assert_eq!(budget.max_cycle, Duration::from_secs(29));
        assert_eq!(budget.tcp_connect, Duration::from_millis(14500));
        assert_eq!(budget.http_connect, Duration::from_millis(7250));
        assert_eq!(budget.http_read, Duration::from_millis(14500));
    }

    #[test]
    fn floors() {
        let budget = CycleBudget::derive(
            Duration::from_millis(2000),
            Duration::from_secs(5),
            Duration::from_secs(5),
        );
        assert_eq!(budget.max_cycle, MIN_CYCLE_TIME);
        assert_eq!(budget.tcp_connect, MIN_IO_TIMEOUT);
        assert_eq!(budget.tcp_write, MIN_IO_TIMEOUT);
        assert_eq!(budget.http_connect, MIN_IO_TIMEOUT);
        assert_eq!(budget.http_read, MIN_IO_TIMEOUT);

        let budget =
            CycleBudget::derive(Duration::from_millis(2000), Duration::ZERO, Duration::ZERO);
        assert_eq!(budget.max_cycle, MIN_CYCLE_TIME);
        assert_eq!(budget.tcp_connect, MIN_IO_TIMEOUT);
        assert_eq!(budget.http_connect, MIN_IO_TIMEOUT);
    }

    #[test]
    fn configured_caps() {
        let budget = CycleBudget::from_config(&OutputConfig::default());
        let doc = load_test_doc(
            r#"
- type: graphite
  name: g1
  host: 127.0.0.1
  connect_timeout: 3s
  read_timeout: 60s
- type: opentsdb_http
  name: h1
  url: http://127.0.0.1:4242
  read_timeout: 2s
"#,
        );
        let all = load_all(&doc).unwrap();

        let t = budget.timeouts_for(&all[0]);
        assert_eq!(t.connect, Duration::from_secs(3));
        assert_eq!(t.io, Duration::from_millis(14500));

        let t = budget.timeouts_for(&all[1]);
        assert_eq!(t.connect, Duration::from_millis(7250));
        assert_eq!(t.io, Duration::from_secs(2));
    }
}

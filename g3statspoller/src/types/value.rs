/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use rust_decimal::Decimal;
use serde_json::Number;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricValue(Decimal);

impl MetricValue {
    pub const ZERO: MetricValue = MetricValue(Decimal::ZERO);
    pub const ONE: MetricValue = MetricValue(Decimal::ONE);

    pub(crate) fn new(d: Decimal) -> Self {
        MetricValue(d.normalize())
    }

    pub(crate) fn as_json_number(&self) -> Number {
        // arbitrary_precision keeps the decimal text as-is
        Number::from_str(&self.to_string()).unwrap_or_else(|_| Number::from(0))
    }
}

impl From<u64> for MetricValue {
    fn from(value: u64) -> Self {
        MetricValue(Decimal::from(value))
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        MetricValue(Decimal::from(value))
    }
}

impl From<usize> for MetricValue {
    fn from(value: usize) -> Self {
        MetricValue(Decimal::from(value))
    }
}

impl FromStr for MetricValue {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(anyhow!("empty string"));
        }
        let d = Decimal::from_str(s)
            .or_else(|_| Decimal::from_scientific(s))
            .map_err(|e| anyhow!("invalid decimal string: {e}"))?;
        Ok(MetricValue::new(d))
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.0.normalize();
        if d.scale() == 0 {
            if let Ok(i) = i64::try_from(d) {
                return itoa::Buffer::new().format(i).fmt(f);
            }
        }
        fmt::Display::fmt(&d, f)
    }
}

/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::Write;

use serde_json::{Map, Number, Value};

use crate::types::{MetricFamily, MetricRecord};

pub(crate) trait LineFormat {
    fn serialize(&self, record: &MetricRecord, buf: &mut Vec<u8>);
}

/// `<path> <value> <timestamp>\n`
#[derive(Clone, Copy, Default)]
pub(crate) struct GraphiteLineFormat {}

impl LineFormat for GraphiteLineFormat {
    fn serialize(&self, record: &MetricRecord, buf: &mut Vec<u8>) {
        let _ = writeln!(buf, "{} {} {}", record.path, record.value, record.timestamp);
    }
}

/// `put <path> <timestamp> <value> <k=v>...\n`
#[derive(Clone, Default)]
pub(crate) struct OpentsdbTelnetFormat {
    host_tag: Option<(String, String)>,
}

impl OpentsdbTelnetFormat {
    pub(crate) fn with_host_tag(tag: &str, hostname: &str) -> Self {
        OpentsdbTelnetFormat {
            host_tag: Some((tag.to_string(), hostname.to_string())),
        }
    }
}

impl LineFormat for OpentsdbTelnetFormat {
    fn serialize(&self, record: &MetricRecord, buf: &mut Vec<u8>) {
        let _ = write!(buf, "put {} {} {}", record.path, record.timestamp, record.value);
        for (k, v) in &record.tags {
            let _ = write!(buf, " {k}={v}");
        }
        if let Some((k, v)) = &self.host_tag {
            if !record.tags.contains_key(k) {
                let _ = write!(buf, " {k}={v}");
            }
        }
        buf.push(b'\n');
    }
}

/// Line format for the local file sink, chosen by the record family.
#[derive(Clone, Default)]
pub(crate) struct FileLineFormat {
    graphite: GraphiteLineFormat,
    opentsdb: OpentsdbTelnetFormat,
}

impl LineFormat for FileLineFormat {
    fn serialize(&self, record: &MetricRecord, buf: &mut Vec<u8>) {
        match record.family() {
            MetricFamily::Graphite => self.graphite.serialize(record, buf),
            MetricFamily::OpenTsdb => self.opentsdb.serialize(record, buf),
        }
    }
}

// https://opentsdb.net/docs/build/html/api_http/put.html
pub(crate) struct OpentsdbJsonFormat {
    host_tag: String,
    hostname: String,
}

impl OpentsdbJsonFormat {
    pub(crate) fn new(host_tag: &str, hostname: &str) -> Self {
        OpentsdbJsonFormat {
            host_tag: host_tag.to_string(),
            hostname: hostname.to_string(),
        }
    }

    fn record_to_json(&self, record: &MetricRecord) -> Value {
        let mut map = Map::with_capacity(4);
        map.insert("metric".to_string(), Value::String(record.path.clone()));
        map.insert(
            "timestamp".to_string(),
            Value::Number(Number::from(record.timestamp)),
        );
        map.insert("value".to_string(), Value::Number(record.value.as_json_number()));
        let mut tag_map = Map::with_capacity(record.tags.len() + 1);
        for (name, value) in record.tags.iter() {
            tag_map.insert(name.to_string(), Value::String(value.to_string()));
        }
        if !tag_map.contains_key(&self.host_tag) {
            tag_map.insert(self.host_tag.clone(), Value::String(self.hostname.clone()));
        }
        map.insert("tags".to_string(), Value::Object(tag_map));
        Value::Object(map)
    }

    pub(crate) fn fill_body(&self, records: &[MetricRecord], body_buf: &mut Vec<u8>) {
        body_buf.push(b'[');

        let mut iter = records.iter();
        let Some(record) = iter.next() else {
            body_buf.push(b']');
            return;
        };

        let first_v = self.record_to_json(record);
        let _ = write!(body_buf, "{first_v}");

        for record in iter {
            body_buf.push(b',');
            let v = self.record_to_json(record);
            let _ = write!(body_buf, "{v}");
        }

        body_buf.push(b']');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MetricTagMap, MetricValue};

    fn tagged() -> MetricRecord {
        let mut tags = MetricTagMap::new();
        tags.insert("db".to_string(), "main".to_string());
        MetricRecord::with_tags(
            "mysql.Queries",
            "12.50".parse::<MetricValue>().unwrap(),
            1700000000,
            tags,
        )
    }

    #[test]
    fn graphite_line() {
        let record = MetricRecord::new(
            "host1.Linux.Uptime.OS_Uptime-Seconds",
            42u64.into(),
            1700000000,
        );
        let mut buf = Vec::new();
        GraphiteLineFormat::default().serialize(&record, &mut buf);
        assert_eq!(
            buf.as_slice(),
            b"host1.Linux.Uptime.OS_Uptime-Seconds 42 1700000000\n"
        );
    }

    #[test]
    fn telnet_line() {
        let format = OpentsdbTelnetFormat::with_host_tag("SP_Host", "host1");
        let mut buf = Vec::new();
        format.serialize(&tagged(), &mut buf);
        assert_eq!(
            buf.as_slice(),
            b"put mysql.Queries 1700000000 12.5 db=main SP_Host=host1\n"
        );

        buf.clear();
        let record = MetricRecord::new("a.b", MetricValue::ZERO, 1);
        format.serialize(&record, &mut buf);
        assert_eq!(buf.as_slice(), b"put a.b 1 0 SP_Host=host1\n");
    }

    #[test]
    fn file_line() {
        let format = FileLineFormat::default();
        let mut buf = Vec::new();
        format.serialize(&MetricRecord::new("a.b", MetricValue::ONE, 7), &mut buf);
        format.serialize(&tagged(), &mut buf);
        assert_eq!(
            std::str::from_utf8(&buf).unwrap(),
            "a.b 1 7\nput mysql.Queries 1700000000 12.5 db=main\n"
        );
    }

    #[test]
    fn json_body() {
        let format = OpentsdbJsonFormat::new("SP_Host", "host1");
        let mut buf = Vec::new();
        format.fill_body(&[], &mut buf);
        assert_eq!(buf.as_slice(), b"[]");

        buf.clear();
        let records = vec![tagged(), MetricRecord::new("x", MetricValue::ONE, 2)];
        format.fill_body(&records, &mut buf);
        let v: Value = serde_json::from_slice(&buf).unwrap();
        let array = v.as_array().unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array[0]["metric"], "mysql.Queries");
        assert_eq!(array[0]["timestamp"], 1700000000);
        assert_eq!(array[0]["value"].to_string(), "12.5");
        assert_eq!(array[0]["tags"]["db"], "main");
        assert_eq!(array[0]["tags"]["SP_Host"], "host1");
        assert_eq!(array[1]["tags"]["SP_Host"], "host1");
    }
}

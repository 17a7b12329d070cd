/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::Write;
use std::str::FromStr;

use http::uri::PathAndQuery;
use http::{HeaderMap, HeaderValue, header};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use super::format::OpentsdbJsonFormat;
use super::tcp::PeerConnector;
use super::{ChunkTransport, IoTimeouts, SendError};
use crate::config::destination::opentsdb_http::OpentsdbHttpDestinationConfig;
use crate::types::MetricRecord;

const RSP_BODY_MAX_SIZE: u64 = 64 * 1024;
const RSP_DETAIL_MAX_LEN: usize = 1024;

#[derive(Debug)]
struct HttpResponse {
    code: u16,
    keep_alive: bool,
    content_length: Option<u64>,
    chunked: bool,
}

impl HttpResponse {
    fn parse_status_line(line: &[u8]) -> Result<Self, SendError> {
        let Some(p) = memchr::memchr(b' ', line) else {
            return Err(SendError::InvalidResponse("no delimiter in status line"));
        };
        let keep_alive = match &line[0..p] {
            b"HTTP/1.1" => true,
            b"HTTP/1.0" => false,
            _ => return Err(SendError::InvalidResponse("unsupported http version")),
        };
        let left = &line[p + 1..];
        if left.len() < 3 {
            return Err(SendError::InvalidResponse("status line not long enough"));
        }
        let code = std::str::from_utf8(&left[0..3])
            .ok()
            .and_then(|s| u16::from_str(s).ok())
            .ok_or(SendError::InvalidResponse("invalid status code"))?;
        Ok(HttpResponse {
            code,
            keep_alive,
            content_length: None,
            chunked: false,
        })
    }

    fn parse_header_line(&mut self, line: &[u8]) -> Result<(), SendError> {
        let Some(p) = memchr::memchr(b':', line) else {
            return Err(SendError::InvalidResponse("no delimiter in header line"));
        };
        let name = std::str::from_utf8(&line[0..p])
            .map_err(|_| SendError::InvalidResponse("invalid header name"))?
            .trim();
        let value = std::str::from_utf8(&line[p + 1..])
            .map_err(|_| SendError::InvalidResponse("invalid header value"))?
            .trim();

        if name.eq_ignore_ascii_case("connection") {
            if value.eq_ignore_ascii_case("close") {
                self.keep_alive = false;
            } else if value.eq_ignore_ascii_case("keep-alive") {
                self.keep_alive = true;
            }
        } else if name.eq_ignore_ascii_case("transfer-encoding") {
            let v = value.to_lowercase();
            if v.ends_with("chunked") {
                self.chunked = true;
                self.content_length = None;
            } else if v.contains("chunked") {
                return Err(SendError::InvalidResponse("invalid chunked transfer-encoding"));
            }
        } else if name.eq_ignore_ascii_case("content-length") && !self.chunked {
            let len = u64::from_str(value)
                .map_err(|_| SendError::InvalidResponse("invalid content length"))?;
            self.content_length = Some(len);
        }
        Ok(())
    }

    async fn parse<R>(reader: &mut R, max_header_size: usize) -> Result<Self, SendError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut line_buf = Vec::<u8>::with_capacity(256);
        let mut header_size = 0usize;

        let nr = read_line(reader, max_header_size, &mut line_buf).await?;
        header_size += nr;
        let mut rsp = HttpResponse::parse_status_line(&line_buf)?;

        loop {
            if header_size >= max_header_size {
                return Err(SendError::TooLargeHeader(max_header_size));
            }
            line_buf.clear();
            let nr = read_line(reader, max_header_size - header_size, &mut line_buf).await?;
            header_size += nr;
            if line_buf == b"\n" || line_buf == b"\r\n" {
                break;
            }
            rsp.parse_header_line(&line_buf)?;
        }

        Ok(rsp)
    }

    async fn recv_body<R>(&self, reader: &mut R) -> Result<Vec<u8>, SendError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut body = Vec::new();
        if self.chunked {
            read_chunked_body(reader, &mut body).await?;
        } else if let Some(len) = self.content_length {
            if len > RSP_BODY_MAX_SIZE {
                return Err(SendError::InvalidResponse("too large response body"));
            }
            let nr = (&mut *reader)
                .take(len)
                .read_to_end(&mut body)
                .await
                .map_err(SendError::ReadFailed)?;
            if (nr as u64) < len {
                return Err(SendError::RemoteClosed);
            }
        } else if !self.keep_alive && self.code != 204 && self.code != 304 {
            (&mut *reader)
                .take(RSP_BODY_MAX_SIZE)
                .read_to_end(&mut body)
                .await
                .map_err(SendError::ReadFailed)?;
        }
        Ok(body)
    }
}

async fn read_line<R>(
    reader: &mut R,
    max_len: usize,
    buf: &mut Vec<u8>,
) -> Result<usize, SendError>
where
    R: AsyncBufRead + Unpin,
{
    let nr = (&mut *reader)
        .take(max_len as u64)
        .read_until(b'\n', buf)
        .await
        .map_err(SendError::ReadFailed)?;
    if nr == 0 {
        return Err(SendError::RemoteClosed);
    }
    if buf.last() != Some(&b'\n') {
        return if nr < max_len {
            Err(SendError::RemoteClosed)
        } else {
            Err(SendError::TooLargeHeader(max_len))
        };
    }
    Ok(nr)
}

async fn read_chunked_body<R>(reader: &mut R, body: &mut Vec<u8>) -> Result<(), SendError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line_buf = Vec::with_capacity(32);
    loop {
        line_buf.clear();
        read_line(reader, 1024, &mut line_buf).await?;
        let line = std::str::from_utf8(&line_buf)
            .map_err(|_| SendError::InvalidResponse("invalid chunk size line"))?;
        let size_s = line.split(';').next().unwrap_or_default().trim();
        let size = u64::from_str_radix(size_s, 16)
            .map_err(|_| SendError::InvalidResponse("invalid chunk size"))?;
        if size == 0 {
            // trailer
            loop {
                line_buf.clear();
                read_line(reader, 1024, &mut line_buf).await?;
                if line_buf == b"\n" || line_buf == b"\r\n" {
                    return Ok(());
                }
            }
        }
        if size > RSP_BODY_MAX_SIZE.saturating_sub(body.len() as u64) {
            return Err(SendError::InvalidResponse("too large response body"));
        }
        let nr = (&mut *reader)
            .take(size)
            .read_to_end(body)
            .await
            .map_err(SendError::ReadFailed)?;
        if (nr as u64) < size {
            return Err(SendError::RemoteClosed);
        }
        line_buf.clear();
        read_line(reader, 2, &mut line_buf).await?;
    }
}

/// One POST per chunk to the opentsdb `/api/put` endpoint.
pub(super) struct OpentsdbHttpTransport {
    connector: PeerConnector,
    formatter: OpentsdbJsonFormat,
    api_path: PathAndQuery,
    host_header: String,
    static_headers: HeaderMap,
    rsp_head_max_size: usize,
    timeouts: IoTimeouts,
    stream: Option<BufReader<TcpStream>>,
    header_buf: Vec<u8>,
    body_buf: Vec<u8>,
}

impl OpentsdbHttpTransport {
    pub(super) fn new(
        config: &OpentsdbHttpDestinationConfig,
        name: &str,
        hostname: &str,
        timeouts: IoTimeouts,
    ) -> Self {
        let mut static_headers = HeaderMap::new();
        static_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        static_headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        OpentsdbHttpTransport {
            connector: PeerConnector::new(name, &config.peer),
            formatter: OpentsdbJsonFormat::new(&config.host_tag, hostname),
            api_path: config.api_path.clone(),
            host_header: config.host_header(),
            static_headers,
            rsp_head_max_size: config.rsp_head_max_size,
            timeouts,
            stream: None,
            header_buf: Vec::with_capacity(256),
            body_buf: Vec::with_capacity(4096),
        }
    }

    fn write_fixed_header(&mut self) {
        let header_buf = &mut self.header_buf;
        header_buf.clear();
        header_buf.extend_from_slice(b"POST ");
        header_buf.extend_from_slice(self.api_path.as_str().as_bytes());
        header_buf.extend_from_slice(b" HTTP/1.1\r\n");
        header_buf.extend_from_slice(b"Host: ");
        header_buf.extend_from_slice(self.host_header.as_bytes());
        header_buf.extend_from_slice(b"\r\n");
        header_buf.extend_from_slice(b"Connection: keep-alive\r\n");
        for (header, value) in &self.static_headers {
            header_buf.extend_from_slice(header.as_str().as_bytes());
            header_buf.extend_from_slice(b": ");
            header_buf.extend_from_slice(value.as_bytes());
            header_buf.extend_from_slice(b"\r\n");
        }
        let _ = write!(header_buf, "Content-Length: {}\r\n\r\n", self.body_buf.len());
    }

    async fn send_request(
        &self,
        stream: &mut BufReader<TcpStream>,
    ) -> Result<HttpResponse, SendError> {
        let write = async {
            stream.write_all(&self.header_buf).await?;
            stream.write_all(&self.body_buf).await?;
            stream.flush().await
        };
        match tokio::time::timeout(self.timeouts.io, write).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(SendError::WriteFailed(e)),
            Err(_) => return Err(SendError::WriteTimeout),
        }

        let read = async {
            let rsp = HttpResponse::parse(stream, self.rsp_head_max_size).await?;
            let body = rsp.recv_body(stream).await?;
            Ok::<_, SendError>((rsp, body))
        };
        let (rsp, body) = match tokio::time::timeout(self.timeouts.io, read).await {
            Ok(r) => r?,
            Err(_) => return Err(SendError::ReadTimeout),
        };

        if (200..300).contains(&rsp.code) {
            Ok(rsp)
        } else {
            let detail = String::from_utf8_lossy(&body);
            let mut detail = detail.trim().to_string();
            if detail.len() > RSP_DETAIL_MAX_LEN {
                let mut end = RSP_DETAIL_MAX_LEN;
                while !detail.is_char_boundary(end) {
                    end -= 1;
                }
                detail.truncate(end);
            }
            Err(SendError::ErrorResponse(rsp.code, detail))
        }
    }
}

impl ChunkTransport for OpentsdbHttpTransport {
    async fn send_chunk(&mut self, chunk: &[MetricRecord]) -> Result<(), SendError> {
        self.body_buf.clear();
        self.formatter.fill_body(chunk, &mut self.body_buf);
        self.write_fixed_header();

        let mut stream = match self.stream.take() {
            Some(stream) => stream,
            None => {
                let stream = self.connector.connect(self.timeouts.connect).await?;
                BufReader::new(stream)
            }
        };
        let rsp = self.send_request(&mut stream).await?;
        if rsp.keep_alive {
            self.stream = Some(stream);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::destination::AnyDestinationConfig;
    use crate::config::destination::load_all;
    use crate::config::yaml::load_test_doc;
    use crate::types::MetricValue;
    use std::time::Duration;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn parse_response() {
        let mut r: &[u8] = b"HTTP/1.1 400 Bad Request\r\nContent-Type: application/json\r\nContent-Length: 11\r\n\r\n{\"error\":1}";
        let rsp = HttpResponse::parse(&mut r, 8192).await.unwrap();
        assert_eq!(rsp.code, 400);
        assert!(rsp.keep_alive);
        assert_eq!(rsp.content_length, Some(11));
        let body = rsp.recv_body(&mut r).await.unwrap();
        assert_eq!(body.as_slice(), b"{\"error\":1}");

        let mut r: &[u8] = b"HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n";
        let rsp = HttpResponse::parse(&mut r, 8192).await.unwrap();
        assert_eq!(rsp.code, 204);
        assert!(!rsp.keep_alive);
        assert!(rsp.recv_body(&mut r).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn parse_chunked() {
        let mut r: &[u8] =
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n6;x=y\r\n world\r\n0\r\n\r\n";
        let rsp = HttpResponse::parse(&mut r, 8192).await.unwrap();
        assert!(rsp.chunked);
        let body = rsp.recv_body(&mut r).await.unwrap();
        assert_eq!(body.as_slice(), b"hello world");
        assert!(r.is_empty());

        let mut r: &[u8] = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n1\r\nA\r\nffffffffffffffff\r\nB\r\n0\r\n\r\n";
        let rsp = HttpResponse::parse(&mut r, 8192).await.unwrap();
        assert!(matches!(
            rsp.recv_body(&mut r).await,
            Err(SendError::InvalidResponse("too large response body"))
        ));
    }

    #[tokio::test]
    async fn parse_invalid() {
        let mut r: &[u8] = b"SSH-2.0-OpenSSH\r\n\r\n";
        assert!(HttpResponse::parse(&mut r, 8192).await.is_err());

        let mut r: &[u8] = b"HTTP/1.1 200 OK\r\nX-Long: aaaaaaaaaaaaaaaaaaaaaaaa\r\n\r\n";
        assert!(matches!(
            HttpResponse::parse(&mut r, 24).await,
            Err(SendError::TooLargeHeader(_))
        ));

        let mut r: &[u8] = b"HTTP/1.1 200 OK\r\n";
        assert!(matches!(
            HttpResponse::parse(&mut r, 8192).await,
            Err(SendError::RemoteClosed)
        ));
    }

    async fn read_request(stream: &mut BufReader<TcpStream>) -> Option<(String, Vec<u8>)> {
        let mut head = String::new();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            if stream.read_line(&mut line).await.ok()? == 0 {
                return None;
            }
            if line == "\r\n" {
                break;
            }
            if let Some(v) = line.strip_prefix("Content-Length: ") {
                content_length = v.trim().parse().ok()?;
            }
            head.push_str(&line);
        }
        let mut body = vec![0u8; content_length];
        stream.read_exact(&mut body).await.ok()?;
        Some((head, body))
    }

    async fn run_server(
        listener: TcpListener,
        response: &'static [u8],
    ) -> Vec<(String, Vec<u8>)> {
        let (stream, _) = listener.accept().await.unwrap();
        let mut stream = BufReader::new(stream);
        let mut requests = Vec::new();
        while let Some(req) = read_request(&mut stream).await {
            requests.push(req);
            stream.write_all(response).await.unwrap();
        }
        requests
    }

    fn transport(port: u16) -> OpentsdbHttpTransport {
        let doc = load_test_doc(&format!(
            "type: opentsdb_http\nname: h1\nurl: http://127.0.0.1:{port}/api/put?details"
        ));
        let mut all = load_all(&doc).unwrap();
        let Some(AnyDestinationConfig::OpentsdbHttp(config)) = all.pop() else {
            panic!("unexpected destination type");
        };
        let timeouts = IoTimeouts {
            connect: Duration::from_secs(2),
            io: Duration::from_secs(2),
        };
        OpentsdbHttpTransport::new(&config, "h1", "host1", timeouts)
    }

    #[tokio::test]
    async fn post_chunks() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(run_server(listener, b"HTTP/1.1 204 No Content\r\n\r\n"));

        let mut transport = transport(port);
        let records = vec![
            MetricRecord::new("a.b", MetricValue::ONE, 10),
            MetricRecord::new("a.c", MetricValue::ZERO, 10),
        ];
        transport.send_chunk(&records[..1]).await.unwrap();
        transport.send_chunk(&records[1..]).await.unwrap();
        drop(transport);

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 2);
        let (head, body) = &requests[0];
        assert!(head.starts_with("POST /api/put?details HTTP/1.1\r\n"));
        assert!(head.contains(&format!("Host: 127.0.0.1:{port}\r\n")));
        assert!(head.contains("content-type: application/json\r\n"));
        let v: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(v[0]["metric"], "a.b");
        assert_eq!(v[0]["tags"]["SP_Host"], "host1");
        let v: serde_json::Value = serde_json::from_slice(&requests[1].1).unwrap();
        assert_eq!(v[0]["metric"], "a.c");
    }

    #[tokio::test]
    async fn error_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(run_server(
            listener,
            b"HTTP/1.1 400 Bad Request\r\nContent-Length: 3\r\n\r\nbad",
        ));

        let mut transport = transport(port);
        let records = vec![MetricRecord::new("a.b", MetricValue::ONE, 10)];
        let r = transport.send_chunk(&records).await;
        match r {
            Err(SendError::ErrorResponse(code, detail)) => {
                assert_eq!(code, 400);
                assert_eq!(detail, "bad");
            }
            r => panic!("unexpected result {r:?}"),
        }
        drop(transport);
        assert_eq!(server.await.unwrap().len(), 1);
    }
}

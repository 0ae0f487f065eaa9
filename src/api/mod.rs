//! Ingestion HTTP service.
//!
//! A small hand-rolled HTTP front end over the event store:
//!
//! - `POST /events` appends the JSON body for its `device_id` (defaulting to
//!   "unknown" when absent) and acknowledges without echoing the event.
//! - `GET /events?device_id=...&limit=...` returns the newest-first recent
//!   events for a device. `device_id` is required; `limit` defaults to 50.
//! - `GET /health` reports liveness.
//!
//! Each accepted connection is handled on its own thread so requests for
//! different devices are served in parallel; per-device atomicity lives in
//! the store, not here.

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::store::{EventStore, DEFAULT_READ_LIMIT};
use crate::Event;

const MAX_REQUEST_BYTES: usize = 64 * 1024;
const IO_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub addr: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8787".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct ApiHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ApiHandle {
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("api server thread panicked"))?;
        }
        Ok(())
    }
}

pub struct ApiServer {
    cfg: ApiConfig,
    store: Arc<dyn EventStore>,
}

impl ApiServer {
    pub fn new(cfg: ApiConfig, store: Arc<dyn EventStore>) -> Self {
        Self { cfg, store }
    }

    pub fn spawn(self) -> Result<ApiHandle> {
        let configured_addr: SocketAddr = self.cfg.addr.parse()?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let store = self.store.clone();
        let join = std::thread::spawn(move || {
            run_api(listener, store, shutdown_thread);
        });

        Ok(ApiHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_api(listener: TcpListener, store: Arc<dyn EventStore>, shutdown: Arc<AtomicBool>) {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, _)) => {
                let store = store.clone();
                std::thread::spawn(move || {
                    if let Err(err) = handle_connection(stream, store.as_ref()) {
                        log::warn!("ingest api request rejected: {}", err);
                    }
                });
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
                continue;
            }
            Err(err) => {
                log::error!("ingest api accept failed: {}", err);
                break;
            }
        }
    }
}

fn handle_connection(mut stream: TcpStream, store: &dyn EventStore) -> Result<()> {
    stream.set_nonblocking(false)?;
    let request = read_request(&mut stream)?;

    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/health") => write_json_response(&mut stream, 200, r#"{"status":"ok"}"#),
        ("POST", "/events") => handle_append(&mut stream, store, &request),
        ("GET", "/events") => handle_read(&mut stream, store, &request),
        ("POST", _) | ("GET", _) => {
            write_json_response(&mut stream, 404, r#"{"error":"not_found"}"#)
        }
        _ => write_json_response(&mut stream, 405, r#"{"error":"method_not_allowed"}"#),
    }
}

fn handle_append(stream: &mut TcpStream, store: &dyn EventStore, request: &HttpRequest) -> Result<()> {
    let event: Event = match serde_json::from_slice(&request.body) {
        Ok(event) => event,
        Err(err) => {
            log::debug!("rejecting unparseable event body: {}", err);
            return write_json_response(stream, 400, r#"{"error":"invalid_json"}"#);
        }
    };

    let device_id = event.device_id.clone();
    if let Err(err) = store.append(&device_id, event) {
        log::error!("append failed for device '{}': {}", device_id, err);
        return write_json_response(stream, 503, r#"{"error":"store_unavailable"}"#);
    }
    write_json_response(stream, 200, r#"{"ok":true}"#)
}

fn handle_read(stream: &mut TcpStream, store: &dyn EventStore, request: &HttpRequest) -> Result<()> {
    let Some(device_id) = request.query.get("device_id") else {
        return write_json_response(stream, 400, r#"{"error":"missing_device_id"}"#);
    };

    let limit = match request.query.get("limit") {
        None => DEFAULT_READ_LIMIT,
        Some(raw) => match raw.parse::<usize>() {
            Ok(limit) if limit > 0 => limit,
            _ => return write_json_response(stream, 400, r#"{"error":"invalid_limit"}"#),
        },
    };

    match store.read(device_id, limit) {
        Ok(events) => {
            let payload = serde_json::to_vec(&events)?;
            write_response(stream, 200, "application/json", &payload)
        }
        Err(err) => {
            log::error!("read failed for device '{}': {}", device_id, err);
            write_json_response(stream, 503, r#"{"error":"store_unavailable"}"#)
        }
    }
}

fn read_request(stream: &mut TcpStream) -> Result<HttpRequest> {
    stream.set_read_timeout(Some(IO_TIMEOUT))?;
    let mut buf = [0u8; 1024];
    let mut data = Vec::new();
    let header_end = loop {
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(anyhow!("connection closed before headers completed"));
        }
        data.extend_from_slice(&buf[..n]);
        if data.len() > MAX_REQUEST_BYTES {
            return Err(anyhow!("request too large"));
        }
    };

    let text = String::from_utf8_lossy(&data[..header_end]).into_owned();
    let mut lines = text.split("\r\n");
    let request_line = lines.next().ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or_else(|| anyhow!("missing method"))?;
    let raw_path = parts.next().ok_or_else(|| anyhow!("missing path"))?;

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
    }

    let content_length: usize = headers
        .get("content-length")
        .map(|v| v.parse())
        .transpose()
        .map_err(|_| anyhow!("invalid content-length header"))?
        .unwrap_or(0);
    if content_length > MAX_REQUEST_BYTES {
        return Err(anyhow!("request body too large"));
    }

    let mut body = data[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(anyhow!("connection closed before body completed"));
        }
        body.extend_from_slice(&buf[..n]);
    }
    body.truncate(content_length);

    let (path, query) = split_path_query(raw_path);
    Ok(HttpRequest {
        method: method.to_string(),
        path,
        query,
        body,
    })
}

fn split_path_query(raw_path: &str) -> (String, HashMap<String, String>) {
    let mut parts = raw_path.splitn(2, '?');
    let path = parts.next().unwrap_or(raw_path).to_string();
    let mut query = HashMap::new();
    if let Some(raw_query) = parts.next() {
        for pair in raw_query.split('&') {
            if let Some((k, v)) = pair.split_once('=') {
                query.insert(k.to_string(), v.to_string());
            } else if !pair.is_empty() {
                query.insert(pair.to_string(), String::new());
            }
        }
    }
    (path, query)
}

fn write_json_response(stream: &mut TcpStream, status: u16, body: &str) -> Result<()> {
    write_response(stream, status, "application/json", body.as_bytes())
}

fn write_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &[u8],
) -> Result<()> {
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        400 => "HTTP/1.1 400 Bad Request",
        404 => "HTTP/1.1 404 Not Found",
        405 => "HTTP/1.1 405 Method Not Allowed",
        503 => "HTTP/1.1 503 Service Unavailable",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let header = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nCache-Control: no-store\r\n\r\n",
        status_line = status_line,
        content_type = content_type,
        len = body.len()
    );
    stream.set_write_timeout(Some(IO_TIMEOUT))?;
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    Ok(())
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    query: HashMap<String, String>,
    body: Vec<u8>,
}

use anyhow::Result;
use serde_json::Value;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

use edgewatch::api::{ApiConfig, ApiHandle, ApiServer};
use edgewatch::store::EventStore;
use edgewatch::{Event, MemoryEventStore};

struct TestApi {
    api_handle: Option<ApiHandle>,
}

impl TestApi {
    fn new(store: Arc<dyn EventStore>) -> Result<Self> {
        let api_config = ApiConfig {
            addr: "127.0.0.1:0".to_string(),
        };
        let api_handle = ApiServer::new(api_config, store).spawn()?;
        Ok(Self {
            api_handle: Some(api_handle),
        })
    }

    fn handle(&self) -> &ApiHandle {
        self.api_handle
            .as_ref()
            .expect("test API handle should be initialized")
    }
}

impl Drop for TestApi {
    fn drop(&mut self) {
        if let Some(handle) = self.api_handle.take() {
            handle.stop().expect("failed to stop API server");
        }
    }
}

fn send_request(api: &TestApi, request: &str) -> Result<(String, String)> {
    let mut stream = TcpStream::connect(api.handle().addr)?;
    stream.write_all(request.as_bytes())?;
    stream.shutdown(std::net::Shutdown::Write)?;

    let mut response = String::new();
    stream.read_to_string(&mut response)?;
    let mut parts = response.splitn(2, "\r\n\r\n");
    let headers = parts.next().unwrap_or("").to_string();
    let body = parts.next().unwrap_or("").to_string();
    Ok((headers, body))
}

fn post_event(api: &TestApi, body: &str) -> Result<(String, String)> {
    let request = format!(
        "POST /events HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    send_request(api, &request)
}

fn get(api: &TestApi, path_and_query: &str) -> Result<(String, String)> {
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n",
        path_and_query
    );
    send_request(api, &request)
}

#[test]
fn post_then_get_round_trip_newest_first() -> Result<()> {
    let api = TestApi::new(Arc::new(MemoryEventStore::new()))?;

    for ts in [1, 2, 3] {
        let body = format!(
            r#"{{"device_id":"cam-1","ts":{},"event":"person_detected","person_count":1,"top_confidence":0.9,"model":"stub","image_tag":"test"}}"#,
            ts
        );
        let (headers, body) = post_event(&api, &body)?;
        assert!(headers.contains("200 OK"));
        // Acknowledgement only; the event is not echoed back.
        assert_eq!(body, r#"{"ok":true}"#);
    }

    let (headers, body) = get(&api, "/events?device_id=cam-1&limit=2")?;
    assert!(headers.contains("200 OK"));
    let value: Value = serde_json::from_str(&body)?;
    let timestamps: Vec<i64> = value
        .as_array()
        .expect("json array")
        .iter()
        .map(|ev| ev["ts"].as_i64().unwrap())
        .collect();
    assert_eq!(timestamps, vec![3, 2]);
    Ok(())
}

#[test]
fn missing_device_id_is_a_client_error() -> Result<()> {
    let api = TestApi::new(Arc::new(MemoryEventStore::new()))?;

    let (headers, body) = get(&api, "/events")?;
    assert!(headers.contains("400 Bad Request"));
    assert!(body.contains("missing_device_id"));
    Ok(())
}

#[test]
fn invalid_limit_is_a_client_error() -> Result<()> {
    let api = TestApi::new(Arc::new(MemoryEventStore::new()))?;

    for query in ["limit=0", "limit=-3", "limit=abc"] {
        let (headers, body) = get(&api, &format!("/events?device_id=cam-1&{}", query))?;
        assert!(headers.contains("400 Bad Request"), "query {}", query);
        assert!(body.contains("invalid_limit"));
    }
    Ok(())
}

#[test]
fn unknown_device_reads_empty_list() -> Result<()> {
    let api = TestApi::new(Arc::new(MemoryEventStore::new()))?;

    let (headers, body) = get(&api, "/events?device_id=no-such-device")?;
    assert!(headers.contains("200 OK"));
    let value: Value = serde_json::from_str(&body)?;
    assert_eq!(value, serde_json::json!([]));
    Ok(())
}

#[test]
fn post_without_device_id_defaults_to_unknown() -> Result<()> {
    let api = TestApi::new(Arc::new(MemoryEventStore::new()))?;

    let (headers, _) = post_event(&api, r#"{"ts":5,"event":"person_detected"}"#)?;
    assert!(headers.contains("200 OK"));

    let (_, body) = get(&api, "/events?device_id=unknown")?;
    let value: Value = serde_json::from_str(&body)?;
    assert_eq!(value.as_array().unwrap().len(), 1);
    assert_eq!(value[0]["device_id"], "unknown");
    Ok(())
}

#[test]
fn post_twice_appends_twice() -> Result<()> {
    let api = TestApi::new(Arc::new(MemoryEventStore::new()))?;

    let body = r#"{"device_id":"cam-1","ts":9,"event":"person_detected"}"#;
    post_event(&api, body)?;
    post_event(&api, body)?;

    let (_, body) = get(&api, "/events?device_id=cam-1")?;
    let value: Value = serde_json::from_str(&body)?;
    assert_eq!(value.as_array().unwrap().len(), 2);
    Ok(())
}

#[test]
fn malformed_body_is_a_client_error() -> Result<()> {
    let api = TestApi::new(Arc::new(MemoryEventStore::new()))?;

    let (headers, body) = post_event(&api, "{not json")?;
    assert!(headers.contains("400 Bad Request"));
    assert!(body.contains("invalid_json"));
    Ok(())
}

#[test]
fn unknown_path_is_not_found_and_other_methods_rejected() -> Result<()> {
    let api = TestApi::new(Arc::new(MemoryEventStore::new()))?;

    let (headers, _) = get(&api, "/nope")?;
    assert!(headers.contains("404 Not Found"));

    let (headers, _) = send_request(&api, "DELETE /events HTTP/1.1\r\nHost: localhost\r\n\r\n")?;
    assert!(headers.contains("405 Method Not Allowed"));
    Ok(())
}

#[test]
fn health_endpoint_reports_ok() -> Result<()> {
    let api = TestApi::new(Arc::new(MemoryEventStore::new()))?;

    let (headers, body) = get(&api, "/health")?;
    assert!(headers.contains("200 OK"));
    assert!(body.contains(r#""status":"ok""#));
    Ok(())
}

/// Store that always fails, for exercising the unavailable path.
struct BrokenStore;

impl EventStore for BrokenStore {
    fn append(&self, _device_id: &str, _event: Event) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("backend unreachable"))
    }

    fn read(&self, _device_id: &str, _limit: usize) -> anyhow::Result<Vec<Event>> {
        Err(anyhow::anyhow!("backend unreachable"))
    }
}

#[test]
fn store_failures_surface_as_server_errors() -> Result<()> {
    let api = TestApi::new(Arc::new(BrokenStore))?;

    let (headers, body) = get(&api, "/events?device_id=cam-1")?;
    assert!(headers.contains("503 Service Unavailable"));
    assert!(body.contains("store_unavailable"));

    let (headers, body) = post_event(&api, r#"{"device_id":"cam-1","ts":1}"#)?;
    assert!(headers.contains("503 Service Unavailable"));
    assert!(body.contains("store_unavailable"));
    Ok(())
}

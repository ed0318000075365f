//! HTTP server for the intake gateway.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::keys;
use super::types::{
    AssignRequest, GatewayApiResponse, HealthResponse, IntakeRequest, StageCount, StatusRequest,
};
use crate::config::LeadConfig;
use crate::db::api_keys::ApiKey;
use crate::db::Database;
use crate::error::{CrmError, CrmResult};
use crate::models::LeadSource;
use crate::pipeline::{NotificationRelay, Pipeline};

/// Header carrying the intake API key.
pub const KEY_HEADER: &str = "x-intake-key";

/// Largest request body accepted.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// A parsed HTTP request.
#[derive(Debug, Default)]
pub struct Request {
    pub method: String,
    pub path: String,
    /// Header names lower-cased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    fn json<T: Serialize>(status: u16, body: &T) -> Self {
        match serde_json::to_string(body) {
            Ok(body) => Self { status, body },
            Err(e) => Self {
                status: 500,
                body: format!(r#"{{"success":false,"error":"serialization failed: {}"}}"#, e),
            },
        }
    }

    fn ok<T: Serialize>(data: T) -> Self {
        Self::json(200, &GatewayApiResponse::ok(data))
    }

    fn error(status: u16, msg: impl Into<String>) -> Self {
        Self::json(status, &GatewayApiResponse::<()>::err(msg))
    }

    /// Validation errors are the caller's fault; retryable ones tell the
    /// caller to come back later.
    fn from_error(err: &CrmError) -> Self {
        let status = match err {
            CrmError::LeadNotFound(_) | CrmError::ReminderNotFound(_) => 404,
            e if e.is_validation() => 400,
            e if e.is_retryable() => 503,
            _ => 500,
        };
        Self::error(status, err.to_string())
    }
}

/// HTTP server for the intake gateway.
pub struct GatewayServer {
    port: u16,
    db_path: PathBuf,
    busy_timeout: Duration,
    relay: Option<NotificationRelay>,
    start_time: Instant,
}

impl GatewayServer {
    pub fn new(port: u16, db: &Database, config: &LeadConfig) -> Result<Self> {
        // Each request opens its own connection to the same file.
        let db_path = db
            .path()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| anyhow!("The gateway needs a file-backed database"))?;

        // Verify DB is accessible
        let _ = db.count_leads()?;

        let relay = config
            .notify_webhook
            .as_deref()
            .map(NotificationRelay::new)
            .transpose()
            .map_err(|e| anyhow!(e))?;

        Ok(Self {
            port,
            db_path,
            busy_timeout: config.busy_timeout,
            relay,
            start_time: Instant::now(),
        })
    }

    /// Start the server (blocking) until `shutdown` is set.
    pub fn start(&self, shutdown: Arc<AtomicBool>) -> Result<()> {
        let listener = TcpListener::bind(format!("0.0.0.0:{}", self.port))?;
        listener.set_nonblocking(true)?;

        info!(port = self.port, "intake gateway listening");

        while !shutdown.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, peer_addr)) => {
                    if let Err(e) = self.handle_connection(stream, peer_addr) {
                        warn!(peer = %peer_addr, error = %e, "request error");
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    warn!(error = %e, "accept error");
                }
            }
        }

        info!("intake gateway stopped");
        Ok(())
    }

    fn handle_connection(&self, mut stream: TcpStream, peer_addr: SocketAddr) -> Result<()> {
        // The listener is nonblocking; the accepted stream must not be.
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(Duration::from_secs(30)))?;
        stream.set_write_timeout(Some(Duration::from_secs(30)))?;

        let request = match read_request(&stream)? {
            Ok(request) => request,
            Err(response) => {
                warn!(peer = %peer_addr, status = response.status, "rejected request");
                return write_response(&mut stream, &response);
            }
        };

        debug!(peer = %peer_addr, method = %request.method, path = %request.path, "request");
        let response = self.route(&request);
        write_response(&mut stream, &response)
    }

    /// Dispatch a request to its handler.
    pub fn route(&self, request: &Request) -> Response {
        let path = request.path.split('?').next().unwrap_or("");
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        if request.method == "GET" && path == "/health" {
            return self.handle_health();
        }

        let db = match self.open_db() {
            Ok(db) => db,
            Err(e) => return Response::from_error(&e),
        };

        if let Err(e) = authenticate(&db, &request.headers) {
            return Response::error(401, e.to_string());
        }

        let pipeline = Pipeline::new(&db).with_relay(self.relay.clone());

        match (request.method.as_str(), segments.as_slice()) {
            ("POST", ["intake", source]) => handle_intake(&pipeline, source, &request.body),
            ("POST", ["leads", id, "status"]) => handle_status(&pipeline, id, &request.body),
            ("POST", ["leads", id, "assign"]) => handle_assign(&pipeline, id, &request.body),
            ("GET", ["pipeline"]) => handle_pipeline(&db),
            _ => Response::error(404, "Not Found"),
        }
    }

    fn handle_health(&self) -> Response {
        let lead_count = self
            .open_db()
            .and_then(|db| db.count_leads())
            .unwrap_or(0);

        Response::ok(HealthResponse {
            status: "ok".to_string(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            lead_count,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    fn open_db(&self) -> CrmResult<Database> {
        let db = Database::open_at(self.db_path.clone())?;
        db.set_busy_timeout(self.busy_timeout)?;
        Ok(db)
    }
}

fn authenticate(db: &Database, headers: &HashMap<String, String>) -> Result<ApiKey> {
    let key = headers
        .get(KEY_HEADER)
        .ok_or_else(|| anyhow!("Missing X-Intake-Key header"))?;

    keys::validate_key_format(key)?;

    match db.find_api_key_by_hash(&keys::hash_key(key))? {
        Some(api_key) if api_key.is_revoked() => Err(anyhow!("API key has been revoked")),
        Some(api_key) => {
            db.touch_api_key(&api_key.id)?;
            Ok(api_key)
        }
        None => Err(anyhow!("Invalid API key")),
    }
}

fn parse_body<'de, T: serde::Deserialize<'de>>(body: &'de [u8]) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|e| Response::error(400, format!("Invalid request: {}", e)))
}

fn parse_lead_id(id: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(id).map_err(|_| Response::error(400, format!("Invalid lead id '{}'", id)))
}

fn handle_intake(pipeline: &Pipeline, source: &str, body: &[u8]) -> Response {
    let Some(source) = intake_source(source) else {
        return Response::error(404, format!("Unknown intake source '{}'", source));
    };
    let req: IntakeRequest = match parse_body(body) {
        Ok(req) => req,
        Err(response) => return response,
    };
    Response::ok(pipeline.ingest_batch(&req.leads, source))
}

/// Sources that deliver through the gateway. Manual entry never does.
fn intake_source(segment: &str) -> Option<LeadSource> {
    match segment {
        "facebook" => Some(LeadSource::Facebook),
        "google" => Some(LeadSource::Google),
        "referral" => Some(LeadSource::Referral),
        "other" => Some(LeadSource::Other),
        _ => None,
    }
}

fn handle_status(pipeline: &Pipeline, id: &str, body: &[u8]) -> Response {
    let (lead_id, req) = match parse_lead_id(id).and_then(|id| Ok((id, parse_body::<StatusRequest>(body)?))) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };
    match pipeline.transition(lead_id, &req.status, req.actor) {
        Ok(lead) => Response::ok(lead),
        Err(e) => Response::from_error(&e),
    }
}

fn handle_assign(pipeline: &Pipeline, id: &str, body: &[u8]) -> Response {
    let (lead_id, req) = match parse_lead_id(id).and_then(|id| Ok((id, parse_body::<AssignRequest>(body)?))) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };
    match pipeline.reassign(lead_id, req.agent_id, req.actor) {
        Ok(lead) => Response::ok(lead),
        Err(e) => Response::from_error(&e),
    }
}

fn handle_pipeline(db: &Database) -> Response {
    match db.count_leads_by_status() {
        Ok(counts) => Response::ok(
            counts
                .into_iter()
                .map(|(status, count)| StageCount {
                    status,
                    label: status.label().to_string(),
                    count,
                })
                .collect::<Vec<_>>(),
        ),
        Err(e) => Response::from_error(&e),
    }
}

fn read_request(stream: &TcpStream) -> Result<Result<Request, Response>> {
    parse_request(BufReader::new(stream.try_clone()?))
}

/// Read request line, headers and body.
///
/// The inner error is the response owed to a request that cannot be served:
/// 400 for a malformed request line, 413 for a body over `MAX_BODY_BYTES`.
fn parse_request<R: BufRead>(mut reader: R) -> Result<Result<Request, Response>> {
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;

    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return Ok(Err(Response::error(400, "Bad Request")));
    }

    let mut request = Request {
        method: parts[0].to_string(),
        path: parts[1].to_string(),
        ..Default::default()
    };

    let mut content_length = 0usize;
    loop {
        let mut header_line = String::new();
        reader.read_line(&mut header_line)?;
        let header_line = header_line.trim();
        if header_line.is_empty() {
            break;
        }
        if let Some((key, value)) = header_line.split_once(':') {
            let key = key.trim().to_lowercase();
            let value = value.trim().to_string();
            if key == "content-length" {
                content_length = value.parse().unwrap_or(0);
            }
            request.headers.insert(key, value);
        }
    }

    if content_length > MAX_BODY_BYTES {
        return Ok(Err(Response::error(
            413,
            format!(
                "Request body too large ({} bytes, limit {})",
                content_length, MAX_BODY_BYTES
            ),
        )));
    }
    request.body = vec![0u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut request.body)?;
    }

    Ok(Ok(request))
}

fn write_response(stream: &mut TcpStream, response: &Response) -> Result<()> {
    let status_text = match response.status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    };

    let raw = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        status_text,
        response.body.len(),
        response.body
    );

    stream.write_all(raw.as_bytes())?;
    stream.flush()?;
    Ok(())
}

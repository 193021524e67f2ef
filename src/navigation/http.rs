use std::time::Duration;

use log::{debug, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ConsoleConfig;
use crate::errors::ConsoleError;
use crate::grid::Cell;

use super::NavigationBackend;

pub(crate) const START_FALLBACK_MESSAGE: &str = "Could not start navigation. Check the backend!";
pub(crate) const STOP_FALLBACK_MESSAGE: &str = "Could not stop the robot. Check the backend!";

#[derive(Serialize, Debug)]
struct StartNavigationRequest {
    start: Cell,
    end: Cell,
}

#[derive(Deserialize, Debug, Default)]
struct StartNavigationResponse {
    #[serde(default)]
    path: Option<Vec<Cell>>,
}

#[derive(Deserialize, Debug, Default)]
struct ErrorPayload {
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    detail: Option<Value>,
}

/// Operator-facing message from an error body: `message`, else a string
/// `detail`, else nothing.
pub(crate) fn backend_message(body: &str) -> Option<String> {
    let payload: ErrorPayload = serde_json::from_str(body).ok()?;
    [payload.message, payload.detail]
        .into_iter()
        .flatten()
        .find_map(|value| match value {
            Value::String(text) if !text.trim().is_empty() => Some(text),
            _ => None,
        })
}

/// Path from a successful start response. A missing `path`, or a body that
/// is not a JSON object, counts as an empty path.
pub(crate) fn parse_start_response(body: &str) -> Vec<Cell> {
    match serde_json::from_str::<StartNavigationResponse>(body) {
        Ok(response) => response.path.unwrap_or_default(),
        Err(e) => {
            warn!("Start navigation response has no readable path: {}", e);
            Vec::new()
        }
    }
}

/// Talks to the navigation service over its REST endpoints.
pub struct HttpNavigationBackend {
    client: Client,
    start_url: String,
    stop_url: String,
}

impl HttpNavigationBackend {
    pub fn new(config: &ConsoleConfig) -> Result<Self, ConsoleError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| ConsoleError::HttpClient { source: e })?;

        Ok(Self {
            client,
            start_url: config.start_navigation_url(),
            stop_url: config.stop_navigation_url(),
        })
    }

    /// POSTs to `url` and returns the body of a 2xx response. Any failure
    /// becomes a transport error with the backend's message or `fallback`.
    fn post(
        &self,
        url: &str,
        body: Option<&StartNavigationRequest>,
        fallback: &str,
    ) -> Result<String, ConsoleError> {
        let request = match body {
            Some(body) => self.client.post(url).json(body),
            None => self.client.post(url),
        };

        let response = request.send().map_err(|e| {
            warn!("Request to {} failed: {}", url, e);
            ConsoleError::Transport {
                message: fallback.to_string(),
            }
        })?;

        let status = response.status();
        let text = response.text().map_err(|e| {
            warn!("Could not read response from {}: {}", url, e);
            ConsoleError::Transport {
                message: fallback.to_string(),
            }
        })?;

        if !status.is_success() {
            warn!("{} answered {}: {}", url, status, text);
            return Err(ConsoleError::Transport {
                message: backend_message(&text).unwrap_or_else(|| fallback.to_string()),
            });
        }

        debug!("{} answered {}", url, status);
        Ok(text)
    }
}

impl NavigationBackend for HttpNavigationBackend {
    fn start_navigation(
        &mut self,
        origin: Cell,
        destination: Cell,
    ) -> Result<Vec<Cell>, ConsoleError> {
        let request = StartNavigationRequest {
            start: origin,
            end: destination,
        };
        let body = self.post(&self.start_url, Some(&request), START_FALLBACK_MESSAGE)?;
        Ok(parse_start_response(&body))
    }

    fn stop_navigation(&mut self) -> Result<(), ConsoleError> {
        self.post(&self.stop_url, None, STOP_FALLBACK_MESSAGE)
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// What the responder saw: request line and body.
    type Recorded = (String, String);

    /// Answers one request on a local port with `status` and `body`, then
    /// hands back what was received.
    fn respond_once(status: &'static str, body: &'static str) -> (String, JoinHandle<Recorded>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut content_length = 0;
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).unwrap();
                let header = header.trim_end();
                if header.is_empty() {
                    break;
                }
                if let Some((name, value)) = header.split_once(':')
                    && name.eq_ignore_ascii_case("content-length")
                {
                    content_length = value.trim().parse().unwrap();
                }
            }
            let mut request_body = vec![0; content_length];
            reader.read_exact(&mut request_body).unwrap();

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let mut stream = reader.into_inner();
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();

            (
                request_line.trim_end().to_string(),
                String::from_utf8(request_body).unwrap(),
            )
        });

        (url, handle)
    }

    fn backend_for(url: String) -> HttpNavigationBackend {
        let config = ConsoleConfig {
            backend_url: url,
            request_timeout_ms: 5_000,
            ..Default::default()
        };
        HttpNavigationBackend::new(&config).unwrap()
    }

    #[test]
    fn test_request_wire_format() {
        let request = StartNavigationRequest {
            start: Cell::new(2, 2),
            end: Cell::new(2, 5),
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"start":[2,2],"end":[2,5]}"#
        );
    }

    #[test]
    fn test_parse_path_keeps_order() {
        let path = parse_start_response(
            r#"{"path": [[2, 2], [2, 3], [2, 5]], "status": "navigation_started"}"#,
        );
        assert_eq!(path, vec![Cell::new(2, 2), Cell::new(2, 3), Cell::new(2, 5)]);
    }

    #[test]
    fn test_missing_path_is_empty() {
        assert!(parse_start_response(r#"{"status": "navigation_started"}"#).is_empty());
        assert!(parse_start_response(r#"{"path": null}"#).is_empty());
        assert!(parse_start_response("").is_empty());
    }

    #[test]
    fn test_backend_message_preference() {
        assert_eq!(
            backend_message(r#"{"message": "Robot busy", "detail": "ignored"}"#),
            Some("Robot busy".to_string())
        );
        assert_eq!(
            backend_message(r#"{"detail": "Invalid start position!"}"#),
            Some("Invalid start position!".to_string())
        );
        // validation errors come back as a list, not a message
        assert_eq!(backend_message(r#"{"detail": [{"loc": ["body"]}]}"#), None);
        assert_eq!(backend_message(r#"{"message": ""}"#), None);
        assert_eq!(backend_message("Internal Server Error"), None);
    }

    #[test]
    fn test_unreachable_backend_uses_fallback_message() {
        // nothing listens on port 9 on a test machine
        let config = ConsoleConfig {
            backend_url: "http://127.0.0.1:9".to_string(),
            request_timeout_ms: 2_000,
            ..Default::default()
        };
        let mut backend = HttpNavigationBackend::new(&config).unwrap();

        let error = backend
            .start_navigation(Cell::new(2, 2), Cell::new(2, 5))
            .unwrap_err();
        assert_eq!(error.to_string(), START_FALLBACK_MESSAGE);

        let error = backend.stop_navigation().unwrap_err();
        assert_eq!(error.to_string(), STOP_FALLBACK_MESSAGE);
    }

    #[test]
    fn test_rejected_start_surfaces_backend_detail() {
        let (url, server) = respond_once("400 Bad Request", r#"{"detail": "Invalid start position!"}"#);
        let mut backend = backend_for(url);

        let error = backend
            .start_navigation(Cell::new(2, 2), Cell::new(2, 5))
            .unwrap_err();

        assert_eq!(error.to_string(), "Invalid start position!");
        let (request_line, body) = server.join().unwrap();
        assert_eq!(request_line, "POST /start-navigation HTTP/1.1");
        assert_eq!(body, r#"{"start":[2,2],"end":[2,5]}"#);
    }

    #[test]
    fn test_accepted_start_returns_path() {
        let (url, server) = respond_once(
            "200 OK",
            r#"{"status": "navigation_started", "path": [[2, 2], [1, 2], [2, 5]]}"#,
        );
        let mut backend = backend_for(url);

        let path = backend
            .start_navigation(Cell::new(2, 2), Cell::new(2, 5))
            .unwrap();

        assert_eq!(path, vec![Cell::new(2, 2), Cell::new(1, 2), Cell::new(2, 5)]);
        server.join().unwrap();
    }

    #[test]
    fn test_failed_stop_without_message_uses_fallback() {
        let (url, server) = respond_once("500 Internal Server Error", "{}");
        let mut backend = backend_for(url);

        let error = backend.stop_navigation().unwrap_err();

        assert_eq!(error.to_string(), STOP_FALLBACK_MESSAGE);
        let (request_line, body) = server.join().unwrap();
        assert_eq!(request_line, "POST /stop-navigation HTTP/1.1");
        assert!(body.is_empty());
    }
}

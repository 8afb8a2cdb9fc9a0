// HTTP adapter for the session backend
//
// Prompt replies arrive as newline-delimited JSON, one `SessionEvent` per
// line, on the response body of the send request.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Response};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::agents::errors::{SquadError, SquadResult};
use crate::agents::messages::{
    CreateSessionRequest, CreateSessionResponse, SendPromptRequest, SessionEvent,
};
use crate::agents::remote::SessionTransport;

const EVENT_CHANNEL_CAPACITY: usize = 64;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// reqwest-backed `SessionTransport`
pub struct HttpSessionTransport {
    client: Client,
    base_url: String,
}

impl HttpSessionTransport {
    pub fn new(base_url: &str) -> SquadResult<Self> {
        let client = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(response: Response) -> SquadResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SquadError::Backend(format!("HTTP {}: {}", status, body.trim())))
    }
}

/// Parse one NDJSON line; blank lines yield nothing
fn parse_line(line: &[u8]) -> Option<SquadResult<SessionEvent>> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(serde_json::from_str(line).map_err(SquadError::from))
}

/// Forward parsed events until the body ends or the receiver goes away
async fn pump_events(response: Response, tx: mpsc::Sender<SessionEvent>) {
    let mut body = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                let _ = tx
                    .send(SessionEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                return;
            }
        };
        buffer.extend_from_slice(&chunk);

        while let Some(newline) = buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=newline).collect();
            match parse_line(&line) {
                Some(Ok(event)) => {
                    if tx.send(event).await.is_err() {
                        debug!("Session event receiver dropped");
                        return;
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Malformed session event");
                    let _ = tx
                        .send(SessionEvent::Error {
                            message: e.to_string(),
                        })
                        .await;
                    return;
                }
                None => {}
            }
        }
    }

    if let Some(Ok(event)) = parse_line(&buffer) {
        let _ = tx.send(event).await;
    }
}

#[async_trait]
impl SessionTransport for HttpSessionTransport {
    async fn ping(&self) -> SquadResult<()> {
        let response = self.client.get(self.url("/health")).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn create_session(&self, system_prompt: &str) -> SquadResult<String> {
        let response = self
            .client
            .post(self.url("/sessions"))
            .json(&CreateSessionRequest {
                system_prompt: system_prompt.to_string(),
            })
            .send()
            .await?;
        let created: CreateSessionResponse = Self::check(response).await?.json().await?;
        Ok(created.session_id)
    }

    async fn send(
        &self,
        session_id: &str,
        prompt: &str,
    ) -> SquadResult<mpsc::Receiver<SessionEvent>> {
        let response = self
            .client
            .post(self.url(&format!("/sessions/{}/messages", session_id)))
            .json(&SendPromptRequest {
                prompt: prompt.to_string(),
            })
            .send()
            .await?;
        let response = Self::check(response).await?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(pump_events(response, tx));
        Ok(rx)
    }

    async fn destroy_session(&self, session_id: &str) -> SquadResult<()> {
        let response = self
            .client
            .delete(self.url(&format!("/sessions/{}", session_id)))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

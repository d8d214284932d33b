//! Scripted transport shared by the client tests.

use super::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub url: String,
    pub authorization: Option<String>,
    pub tenant: Option<String>,
    pub body: Option<serde_json::Value>,
}

pub(crate) type Reply = Result<HttpResponse, TransportError>;

/// Answers requests from per-URL-suffix queues and records what was sent.
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    routes: Arc<Mutex<Vec<(String, VecDeque<Reply>)>>>,
    sent: Arc<Mutex<Vec<Recorded>>>,
}

pub(crate) fn reply(status: u16, body: &str) -> Reply {
    Ok(HttpResponse {
        status,
        body: body.to_string(),
    })
}

pub(crate) fn unreachable_backend() -> Reply {
    Err(TransportError("connection refused".to_string()))
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `replies` for URLs ending in `suffix`, answered in order.
    pub fn on(self, suffix: &str, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .push((suffix.to_string(), replies.into_iter().collect()));
        self
    }

    pub fn sent(&self) -> Vec<Recorded> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, suffix: &str) -> Vec<Recorded> {
        self.sent()
            .into_iter()
            .filter(|r| r.url.ends_with(suffix))
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let header = |name: &str| {
            request
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.sent.lock().unwrap().push(Recorded {
            url: request.url.clone(),
            authorization: header(AUTHORIZATION.as_str()),
            tenant: header("x-clinic-id"),
            body: request
                .body
                .as_deref()
                .and_then(|b| serde_json::from_slice(b).ok()),
        });

        // Yield so concurrent requests interleave like real I/O.
        tokio::task::yield_now().await;

        let mut routes = self.routes.lock().unwrap();
        let queue = routes
            .iter_mut()
            .find(|(suffix, _)| request.url.ends_with(suffix.as_str()))
            .map(|(_, queue)| queue);
        match queue.and_then(|q| q.pop_front()) {
            Some(reply) => reply,
            None => Err(TransportError(format!("no scripted reply for {}", request.url))),
        }
    }
}

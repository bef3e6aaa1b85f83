//! In-process [`LlmClient`] for tests.
//!
//! Replies come from a closure over the incoming request, so a test can
//! answer the router, the specialists and the writer differently by looking
//! at the system prompt. Every request is recorded for later assertions.
//! An optional latency makes a call wait before it answers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use conclave_common::Result;

use crate::client::{LlmClient, LlmRequest, LlmResponse};

type Responder = dyn Fn(&LlmRequest) -> Result<String> + Send + Sync;
type Latency = dyn Fn(&LlmRequest) -> Duration + Send + Sync;

#[derive(Clone)]
pub struct ScriptedClient {
    responder: Arc<Responder>,
    latency: Option<Arc<Latency>>,
    requests: Arc<Mutex<Vec<LlmRequest>>>,
    completed: Arc<AtomicUsize>,
}

impl ScriptedClient {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&LlmRequest) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            latency: None,
            requests: Arc::new(Mutex::new(Vec::new())),
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sleep for `latency(request)` before answering each call.
    pub fn with_latency<F>(mut self, latency: F) -> Self
    where
        F: Fn(&LlmRequest) -> Duration + Send + Sync + 'static,
    {
        self.latency = Some(Arc::new(latency));
        self
    }

    /// Always answers with the same text.
    pub fn fixed(reply: impl Into<String>) -> Self {
        let reply = reply.into();
        Self::new(move |_| Ok(reply.clone()))
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    /// Calls that ran to the end, including ones that returned an error.
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Requests whose system prompt contains `needle`.
    pub fn requests_matching(&self, needle: &str) -> Vec<LlmRequest> {
        self.requests()
            .into_iter()
            .filter(|r| {
                r.system_prompt
                    .as_deref()
                    .is_some_and(|s| s.contains(needle))
            })
            .collect()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }
        if let Some(latency) = &self.latency {
            tokio::time::sleep(latency(&request)).await;
        }
        let reply = (self.responder)(&request);
        self.completed.fetch_add(1, Ordering::SeqCst);
        let content = reply?;
        Ok(LlmResponse {
            content,
            model: request.model,
            usage: None,
            finish_reason: Some("STOP".to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }
}

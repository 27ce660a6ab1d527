// Copyright 2026 The Thinkrelay Project
// SPDX-License-Identifier: Apache-2.0

// Relay orchestrator
//
// Responsibilities:
// - Dispatch one client request upstream and register its abortable stream
// - Drive each upstream event through the classifier into SSE frames
// - End in exactly one of Completed, Cancelled or Failed, with the registry
//   entry released on every path
// - Notice client disconnect even while the upstream is silent

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::{AbortHandle, Abortable};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, warn};

use crate::message::{ChatRequest, PromptTemplate};
use crate::registry::RequestRegistry;
use crate::sse::Frame;
use crate::thinking::{StreamState, ThinkingClassifier};
use crate::upstream::{EventStream, GenerationBackend, GenerationEvent, UpstreamError};

/// Outbound frames buffered per request before the relay waits on the client.
const FRAME_BUFFER: usize = 64;

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// Lifecycle of one relayed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayPhase {
    Idle,
    Dispatched,
    Streaming,
    Completed,
    Cancelled,
    Failed,
}

impl RelayPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RelayPhase::Completed | RelayPhase::Cancelled | RelayPhase::Failed
        )
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: RelayPhase) -> bool {
        use RelayPhase::*;
        matches!(
            (self, next),
            (Idle, Dispatched)
                | (Dispatched, Streaming)
                | (Dispatched, Failed)
                | (Dispatched, Cancelled)
                | (Streaming, Completed)
                | (Streaming, Cancelled)
                | (Streaming, Failed)
        )
    }
}

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

/// A started relay: the outbound SSE byte stream and the task driving it.
pub struct RelaySession {
    pub request_id: String,
    pub frames: ReceiverStream<Bytes>,
    /// Resolves to the terminal phase once the relay task ends.
    pub outcome: JoinHandle<RelayPhase>,
}

/// Wires client requests to the generation backend.
///
/// Cheap to clone; every request runs in its own spawned task.
#[derive(Clone)]
pub struct Relay {
    backend: Arc<dyn GenerationBackend>,
    registry: Arc<RequestRegistry>,
    classifier: ThinkingClassifier,
    template: PromptTemplate,
    default_model: String,
    idle_timeout: Option<Duration>,
}

impl Relay {
    pub fn new(backend: Arc<dyn GenerationBackend>, registry: Arc<RequestRegistry>) -> Self {
        Self {
            backend,
            registry,
            classifier: ThinkingClassifier::default(),
            template: PromptTemplate::default(),
            default_model: crate::config::DEFAULT_MODEL.to_string(),
            idle_timeout: None,
        }
    }

    pub fn with_classifier(mut self, classifier: ThinkingClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<RequestRegistry> {
        &self.registry
    }

    pub fn backend(&self) -> &Arc<dyn GenerationBackend> {
        &self.backend
    }

    /// Start relaying `request` under a fresh request id.
    pub fn start(&self, request: ChatRequest) -> RelaySession {
        self.start_with_id(uuid::Uuid::new_v4().to_string(), request)
    }

    /// Start relaying `request` under `request_id`.
    pub fn start_with_id(
        &self,
        request_id: impl Into<String>,
        request: ChatRequest,
    ) -> RelaySession {
        let request_id = request_id.into();
        let (tx, rx) = mpsc::channel(FRAME_BUFFER);
        let task = RelayTask {
            relay: self.clone(),
            request_id: request_id.clone(),
            tx,
            phase: RelayPhase::Idle,
        };
        RelaySession {
            request_id,
            frames: ReceiverStream::new(rx),
            outcome: tokio::spawn(task.run(request)),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-request task
// ---------------------------------------------------------------------------

struct RelayTask {
    relay: Relay,
    request_id: String,
    tx: mpsc::Sender<Bytes>,
    phase: RelayPhase,
}

/// What a single streaming step produced.
enum Step {
    Event(Result<GenerationEvent, UpstreamError>),
    Ended,
    IdleTimeout,
    ClientGone,
}

impl RelayTask {
    async fn run(mut self, request: ChatRequest) -> RelayPhase {
        let upstream_request =
            request.to_generate_request(&self.relay.template, &self.relay.default_model);
        let model = upstream_request.model.clone();

        self.advance(RelayPhase::Dispatched);
        info!(request_id = %self.request_id, %model, "dispatching generation");

        let backend = Arc::clone(&self.relay.backend);
        let dispatched = tokio::select! {
            biased;
            _ = self.tx.closed() => None,
            result = backend.generate(upstream_request) => Some(result),
        };

        let events = match dispatched {
            None => {
                info!(request_id = %self.request_id, %model, "client left during dispatch");
                return self.advance(RelayPhase::Cancelled);
            }
            Some(Err(e)) => {
                warn!(request_id = %self.request_id, %model, error = %e, "dispatch failed");
                self.send(Frame::Error(e.to_string())).await;
                return self.advance(RelayPhase::Failed);
            }
            Some(Ok(events)) => events,
        };

        let (handle, registration) = AbortHandle::new_pair();
        if let Err(e) = self
            .relay
            .registry
            .register(self.request_id.clone(), Box::new(handle))
        {
            error!(request_id = %self.request_id, %model, error = %e, "registration failed");
            drop(events);
            self.send(Frame::Error(e.to_string())).await;
            return self.advance(RelayPhase::Failed);
        }
        info!(request_id = %self.request_id, %model, "generation registered");

        self.advance(RelayPhase::Streaming);
        if !self.send(Frame::RequestId(self.request_id.clone())).await {
            return self.cancel(&model, "client left before first frame");
        }

        self.stream(Abortable::new(events, registration), &model).await
    }

    async fn stream(&mut self, mut events: Abortable<EventStream>, model: &str) -> RelayPhase {
        let mut state = StreamState::default();
        let idle_timeout = self.relay.idle_timeout;

        loop {
            let step = {
                let next = async {
                    match idle_timeout {
                        Some(limit) => match tokio::time::timeout(limit, events.next()).await {
                            Ok(Some(item)) => Step::Event(item),
                            Ok(None) => Step::Ended,
                            Err(_) => Step::IdleTimeout,
                        },
                        None => match events.next().await {
                            Some(item) => Step::Event(item),
                            None => Step::Ended,
                        },
                    }
                };
                tokio::select! {
                    biased;
                    _ = self.tx.closed() => Step::ClientGone,
                    step = next => step,
                }
            };

            match step {
                Step::ClientGone => return self.cancel(model, "client disconnected"),
                Step::Ended if events.is_aborted() => {
                    info!(request_id = %self.request_id, %model, "generation cancelled");
                    return self.advance(RelayPhase::Cancelled);
                }
                Step::Ended => {
                    return self
                        .complete(model, "upstream stream ended", &state)
                        .await
                }
                Step::IdleTimeout => {
                    let limit = idle_timeout.unwrap_or_default();
                    return self
                        .fail(model, format!("upstream idle for {}ms", limit.as_millis()))
                        .await;
                }
                Step::Event(Err(e)) => return self.fail(model, e.to_string()).await,
                Step::Event(Ok(event)) => {
                    let (next, records) = self.relay.classifier.classify(state, &event.response);
                    state = next;
                    for record in records {
                        if !self.send(Frame::Record(record)).await {
                            return self.cancel(model, "client disconnected");
                        }
                    }
                    if event.done {
                        return self
                            .complete(model, "upstream reported done", &state)
                            .await;
                    }
                }
            }
        }
    }

    async fn complete(&mut self, model: &str, reason: &str, state: &StreamState) -> RelayPhase {
        self.relay.registry.remove(&self.request_id);
        if let Some(record) = self.relay.classifier.finish(state) {
            self.send(Frame::Record(record)).await;
        }
        self.send(Frame::Done).await;
        info!(request_id = %self.request_id, %model, reason, "generation completed");
        self.advance(RelayPhase::Completed)
    }

    async fn fail(&mut self, model: &str, message: String) -> RelayPhase {
        self.relay.registry.remove(&self.request_id);
        info!(request_id = %self.request_id, %model, error = %message, "generation failed");
        self.send(Frame::Error(message)).await;
        self.advance(RelayPhase::Failed)
    }

    fn cancel(&mut self, model: &str, reason: &str) -> RelayPhase {
        self.relay.registry.cancel(&self.request_id);
        info!(request_id = %self.request_id, %model, reason, "generation cancelled");
        self.advance(RelayPhase::Cancelled)
    }

    /// Send one frame. Returns false once the client is gone.
    async fn send(&self, frame: Frame) -> bool {
        self.tx.send(frame.encode()).await.is_ok()
    }

    fn advance(&mut self, next: RelayPhase) -> RelayPhase {
        if self.phase.can_advance_to(next) {
            self.phase = next;
        } else {
            error!(
                request_id = %self.request_id,
                from = ?self.phase,
                to = ?next,
                "illegal relay phase transition ignored"
            );
        }
        self.phase
    }
}

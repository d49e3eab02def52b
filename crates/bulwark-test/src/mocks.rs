//! Mock implementations for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

use bulwark_approval::{ApprovalPresenter, ApprovalRequest, PresenterResponse};

/// Mock implementation of [`ApprovalPresenter`] for testing.
///
/// Answers from a queue of scripted responses, falling back to a default
/// (deny) once the queue is empty, and records every request it is shown.
/// A gated presenter holds each prompt open until the test calls
/// [`release`](Self::release), which makes concurrent requests observable.
#[derive(Debug, Clone)]
pub struct MockPresenter {
    /// Queued responses.
    responses: Arc<Mutex<VecDeque<PresenterResponse>>>,
    /// Every request presented, in order.
    requests: Arc<Mutex<Vec<ApprovalRequest>>>,
    /// Response when the queue is empty.
    default_response: PresenterResponse,
    /// Holds prompts until permits are added.
    gate: Option<Arc<Semaphore>>,
}

impl MockPresenter {
    /// Create a presenter that denies everything not scripted.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::unshared())
    }

    /// Create a presenter whose prompts wait for [`release`](Self::release).
    #[must_use]
    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::unshared()
        })
    }

    fn unshared() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            default_response: PresenterResponse::Deny,
            gate: None,
        }
    }

    /// Queue a response.
    #[must_use]
    pub fn with_response(self: Arc<Self>, response: PresenterResponse) -> Arc<Self> {
        self.queue_response(response);
        self
    }

    /// Set the response used once the queue is empty.
    #[must_use]
    pub fn with_default_response(self: Arc<Self>, response: PresenterResponse) -> Arc<Self> {
        let mut presenter = Arc::unwrap_or_clone(self);
        presenter.default_response = response;
        Arc::new(presenter)
    }

    /// Queue a response.
    pub fn queue_response(&self, response: PresenterResponse) {
        if let Ok(mut guard) = self.responses.lock() {
            guard.push_back(response);
        }
    }

    /// Let `n` held prompts answer.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Number of prompts shown so far.
    #[must_use]
    pub fn prompt_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Every request shown so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ApprovalRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// The most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<ApprovalRequest> {
        self.requests.lock().ok().and_then(|r| r.last().cloned())
    }

    /// Wait until at least `n` prompts have been shown.
    pub async fn wait_for_prompts(&self, n: usize) {
        while self.prompt_count() < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl ApprovalPresenter for MockPresenter {
    async fn present(&self, request: ApprovalRequest) -> PresenterResponse {
        tracing::debug!(request_id = %request.id, "mock presenter shown request");
        if let Ok(mut guard) = self.requests.lock() {
            guard.push(request);
        }
        if let Some(gate) = &self.gate
            && let Ok(permit) = gate.acquire().await
        {
            permit.forget();
        }
        self.responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or_else(|| self.default_response.clone())
    }
}

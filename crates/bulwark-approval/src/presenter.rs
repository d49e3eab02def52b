//! The presentation boundary and the prompt queue in front of it.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::request::{ApprovalRequest, PresenterResponse};

/// Front end that shows approval requests to a human.
///
/// Implementations decide how a prompt is rendered and whether it times
/// out; the coordinator only awaits the response. Dropping the returned
/// future must withdraw the prompt.
///
/// # Example
///
/// ```rust,ignore
/// use bulwark_approval::{ApprovalPresenter, ApprovalRequest, PresenterResponse};
///
/// struct Terminal;
///
/// #[async_trait::async_trait]
/// impl ApprovalPresenter for Terminal {
///     async fn present(&self, request: ApprovalRequest) -> PresenterResponse {
///         println!("{request}");
///         // read a key...
///         PresenterResponse::Deny
///     }
/// }
/// ```
#[async_trait]
pub trait ApprovalPresenter: Send + Sync {
    /// Show `request` and wait for the human's answer.
    async fn present(&self, request: ApprovalRequest) -> PresenterResponse;
}

/// Serializes prompts so that at most one is visible at a time.
///
/// Waiters are served in arrival order. A waiter whose future is dropped
/// (cancelled) leaves the queue without ever reaching the presenter.
pub struct PromptQueue {
    presenter: Arc<dyn ApprovalPresenter>,
    turn: Mutex<()>,
}

impl PromptQueue {
    /// Queue in front of `presenter`.
    #[must_use]
    pub fn new(presenter: Arc<dyn ApprovalPresenter>) -> Self {
        Self {
            presenter,
            turn: Mutex::new(()),
        }
    }

    /// Wait for the queue, then present `request`.
    pub async fn present(&self, request: ApprovalRequest) -> PresenterResponse {
        debug!(request_id = %request.id, "waiting for prompt slot");
        let _turn = self.turn.lock().await;
        info!(
            request_id = %request.id,
            class = %request.class,
            scope = %request.scope,
            "presenting approval request"
        );
        self.presenter.present(request).await
    }
}

impl fmt::Debug for PromptQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptQueue").finish_non_exhaustive()
    }
}

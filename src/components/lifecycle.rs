// Invocation lifecycle management
// One invocation per push; exactly one of completion or expiry finalizes it

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use super::InvocationId;
use super::content::NotificationContent;

/// Host completion handler; called with the content to display
pub type ContentHandler = Box<dyn FnOnce(NotificationContent) + Send + 'static>;

/// `Idle → Enriching → Finalized`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum InvocationState {
    /// Created, enrichment not yet started
    #[default]
    Idle,
    /// Normalizing, deriving fields, fetching the avatar
    Enriching,
    /// Content handed to the host
    Finalized(FinalizePath),
}

/// Which path delivered the content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FinalizePath {
    /// Enrichment ran to the end and completed explicitly
    Completed,
    /// Host signalled its time budget ran out
    Expired,
}

impl InvocationState {
    pub fn can_transition_to(&self, target: &InvocationState) -> bool {
        use InvocationState::*;

        match (self, target) {
            (Idle, Enriching) => true,
            // Expiry may arrive before enrichment starts
            (Idle, Finalized(_)) => true,
            (Enriching, Finalized(_)) => true,
            (Finalized(_), _) => false,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InvocationState::Finalized(_))
    }
}

/// One-shot wrapper around the host's completion handler.
///
/// The first `claim` wins the handler; every later call sees `None`.
pub struct CompletionGuard {
    finalized: AtomicBool,
    handler: Mutex<Option<ContentHandler>>,
}

impl CompletionGuard {
    pub fn new<F>(handler: F) -> Self
    where
        F: FnOnce(NotificationContent) + Send + 'static,
    {
        Self {
            finalized: AtomicBool::new(false),
            handler: Mutex::new(Some(Box::new(handler))),
        }
    }

    /// Take the handler if nobody has yet
    pub fn claim(&self) -> Option<ContentHandler> {
        if self
            .finalized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        self.handler.lock().take()
    }

    /// Deliver `content` unless already finalized. Returns whether it was delivered.
    pub fn complete(&self, content: NotificationContent) -> bool {
        match self.claim() {
            Some(handler) => {
                handler(content);
                true
            },
            None => false,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for CompletionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionGuard")
            .field("finalized", &self.is_finalized())
            .finish()
    }
}

/// State shared between the enrichment task and the host's expiry callback
#[derive(Debug)]
pub struct Invocation {
    id: InvocationId,
    started_at: Instant,
    state: Mutex<InvocationState>,
    /// Best content so far; what expiry delivers
    best_attempt: Mutex<NotificationContent>,
    guard: CompletionGuard,
    expired: Notify,
}

impl Invocation {
    pub fn new<F>(content: NotificationContent, handler: F) -> Self
    where
        F: FnOnce(NotificationContent) + Send + 'static,
    {
        Self {
            id: InvocationId::generate(),
            started_at: Instant::now(),
            state: Mutex::new(InvocationState::Idle),
            best_attempt: Mutex::new(content),
            guard: CompletionGuard::new(handler),
            expired: Notify::new(),
        }
    }

    pub fn id(&self) -> InvocationId {
        self.id
    }

    pub fn state(&self) -> InvocationState {
        *self.state.lock()
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn is_finalized(&self) -> bool {
        self.guard.is_finalized()
    }

    /// Move `Idle → Enriching`. Returns false if the invocation is already finalized.
    pub fn begin(&self) -> bool {
        let mut state = self.state.lock();
        if !state.can_transition_to(&InvocationState::Enriching) {
            tracing::debug!("Invocation {} cannot begin from {:?}", self.id, *state);
            return false;
        }
        *state = InvocationState::Enriching;
        true
    }

    /// Mutate the best-attempt content in place
    pub fn update_content(&self, update: impl FnOnce(&mut NotificationContent)) {
        update(&mut *self.best_attempt.lock());
    }

    pub fn best_attempt(&self) -> NotificationContent {
        self.best_attempt.lock().clone()
    }

    /// Deliver `content` through `path` if no other path has. Returns whether this call won.
    pub fn finalize(&self, path: FinalizePath, content: NotificationContent) -> bool {
        let Some(handler) = self.guard.claim() else {
            tracing::debug!(
                "Invocation {} already finalized, ignoring {:?}",
                self.id,
                path
            );
            return false;
        };

        {
            let mut state = self.state.lock();
            let target = InvocationState::Finalized(path);
            if !state.can_transition_to(&target) {
                tracing::warn!(
                    "Unexpected transition from {:?} to {:?}",
                    *state,
                    target
                );
            }
            *state = target;
        }

        handler(content);
        true
    }

    /// Host ran out of time: deliver the best attempt and wake any pending fetch
    pub fn expire(&self) -> bool {
        let content = self.best_attempt();
        let won = self.finalize(FinalizePath::Expired, content);
        self.expired.notify_one();
        won
    }

    /// Resolves once `expire` has been called
    pub async fn expired(&self) {
        self.expired.notified().await;
    }
}

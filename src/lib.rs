//! Notification service extension core
//!
//! Enriches an incoming push notification before the host displays it:
//! the payload is normalized, display fields are derived, the sender's
//! avatar is fetched on a best-effort basis and the content is rendered
//! communication-style. The host gets exactly one completion, either when
//! enrichment finishes or when it signals that its time budget ran out.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

pub mod backends;
pub mod components;

pub use backends::*;
pub use components::*;

/// A push delivered to the extension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    /// Host-assigned request identifier
    pub identifier: String,
    /// Content as the host decoded it, raw payload in `user_info`
    pub content: NotificationContent,
}

impl NotificationRequest {
    pub fn new(identifier: impl Into<String>, content: NotificationContent) -> Self {
        Self {
            identifier: identifier.into(),
            content,
        }
    }

    pub fn from_payload(identifier: impl Into<String>, payload: RawPayload) -> Self {
        Self::new(identifier, NotificationContent::from_payload(payload))
    }
}

/// Outcome of one invocation, returned to the embedding code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizeReport {
    pub invocation_id: InvocationId,
    pub path: FinalizePath,
    /// Communication-style metadata reached the host
    pub communication: bool,
    /// An avatar file reached the host
    pub avatar: bool,
    pub elapsed: Duration,
    pub finalized_at: DateTime<Utc>,
}

/// The enrichment handler the host invokes once per push.
///
/// `handle` runs an invocation to completion; `on_expire` may be called
/// from any thread while it runs and finalizes it with the best content so
/// far. Whichever gets there first delivers, the other is a no-op.
pub struct NotificationService<R = CommunicationStyleRenderer> {
    config: EnrichmentConfig,
    fetcher: AvatarFetcher,
    renderer: R,
    active: Mutex<Vec<Arc<Invocation>>>,
}

impl NotificationService<CommunicationStyleRenderer> {
    pub fn new(config: EnrichmentConfig) -> EnrichmentResult<Self> {
        let renderer = CommunicationStyleRenderer::from_config(&config);
        Self::with_renderer(config, renderer)
    }
}

impl<R: CommunicationRenderer> NotificationService<R> {
    pub fn with_renderer(config: EnrichmentConfig, renderer: R) -> EnrichmentResult<Self> {
        config.validate()?;
        let fetcher = AvatarFetcher::new(&config)?;
        Ok(Self {
            config,
            fetcher,
            renderer,
            active: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &EnrichmentConfig {
        &self.config
    }

    /// Number of invocations not yet returned from `handle`
    pub fn active_invocations(&self) -> usize {
        self.active.lock().len()
    }

    /// Enrich `request` and call `on_complete` exactly once
    pub async fn handle<F>(&self, request: NotificationRequest, on_complete: F) -> FinalizeReport
    where
        F: FnOnce(NotificationContent) + Send + 'static,
    {
        self.drive(request, on_complete, None).await
    }

    /// Host time budget ran out: finalize every running invocation now.
    /// Returns whether any invocation was finalized by this call.
    pub fn on_expire(&self) -> bool {
        let active: Vec<Arc<Invocation>> = self.active.lock().clone();
        if active.is_empty() {
            tracing::debug!("Expiry signalled with no running invocation");
            return false;
        }

        let mut finalized = false;
        for invocation in active {
            if invocation.expire() {
                tracing::info!(
                    invocation_id = %invocation.id(),
                    elapsed_ms = invocation.elapsed().as_millis() as u64,
                    "Time budget expired, delivered best attempt"
                );
                finalized = true;
            }
        }
        finalized
    }

    /// Run `handle` under the configured time budget. Only this call's
    /// invocation is expired when the budget elapses.
    pub async fn run_with_budget<F>(
        &self,
        request: NotificationRequest,
        on_complete: F,
    ) -> FinalizeReport
    where
        F: FnOnce(NotificationContent) + Send + 'static,
    {
        let budget = self.config.time_budget();
        self.drive(request, on_complete, Some(budget)).await
    }

    async fn drive<F>(
        &self,
        request: NotificationRequest,
        on_complete: F,
        budget: Option<Duration>,
    ) -> FinalizeReport
    where
        F: FnOnce(NotificationContent) + Send + 'static,
    {
        let entry = ActiveInvocation::register(
            &self.active,
            Arc::new(Invocation::new(request.content.clone(), on_complete)),
        );
        let invocation = &entry.invocation;

        let span = tracing::info_span!(
            "enrich",
            invocation_id = %invocation.id(),
            request = %request.identifier
        );
        let enrichment = self.enrich(invocation, request.content).instrument(span);

        let Some(budget) = budget else {
            return enrichment.await;
        };

        tokio::pin!(enrichment);
        tokio::select! {
            report = &mut enrichment => report,
            _ = tokio::time::sleep(budget) => {
                tracing::warn!(
                    invocation_id = %invocation.id(),
                    "Enrichment exceeded {:?} budget", budget
                );
                invocation.expire();
                enrichment.await
            }
        }
    }

    async fn enrich(&self, invocation: &Invocation, original: NotificationContent) -> FinalizeReport {
        if !invocation.begin() {
            return self.report(invocation, None);
        }

        if !original.mutable_content {
            tracing::debug!("Payload has no mutable-content flag, enriching anyway");
        }

        let normalized = normalize(&original.user_info);
        let fields = DisplayFields::derive(&normalized, &original, &self.config);
        invocation.update_content(|content| content.apply_fields(&fields));
        tracing::debug!(
            "Derived fields: sender={} thread={:?} avatar_url={}",
            fields.from_uid,
            fields.thread_id,
            fields.sender_photo_url.is_some()
        );

        let avatar = tokio::select! {
            biased;
            _ = invocation.expired() => {
                tracing::debug!("Abandoning avatar fetch after expiry");
                return self.report(invocation, None);
            }
            avatar = self.fetcher.fetch(fields.sender_photo_url.as_deref()) => avatar,
        };

        let best = invocation.best_attempt();
        let content = match MessageIntent::from_fields(&fields, avatar.as_ref().map(|a| a.path.as_path()))
            .and_then(|intent| self.renderer.render(&best, intent))
        {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::warn!("Delivering without communication style: {}", e);
                best
            },
        };

        let delivered = content.clone();
        if invocation.finalize(FinalizePath::Completed, content) {
            tracing::info!(
                elapsed_ms = invocation.elapsed().as_millis() as u64,
                communication = delivered.is_communication(),
                avatar = delivered.has_avatar(),
                "Notification enriched"
            );
            self.report(invocation, Some(&delivered))
        } else {
            self.report(invocation, None)
        }
    }

    /// `delivered` is the content this path handed over; `None` means expiry won
    fn report(&self, invocation: &Invocation, delivered: Option<&NotificationContent>) -> FinalizeReport {
        FinalizeReport {
            invocation_id: invocation.id(),
            path: if delivered.is_some() {
                FinalizePath::Completed
            } else {
                FinalizePath::Expired
            },
            communication: delivered.is_some_and(NotificationContent::is_communication),
            avatar: delivered.is_some_and(NotificationContent::has_avatar),
            elapsed: invocation.elapsed(),
            finalized_at: Utc::now(),
        }
    }
}

/// Registration of a running invocation in the service's active list.
///
/// Dropping it deregisters the invocation. When the owning future is
/// dropped before the invocation finalized, the best attempt is delivered
/// as an expiry so `on_complete` still runs exactly once.
struct ActiveInvocation<'a> {
    registry: &'a Mutex<Vec<Arc<Invocation>>>,
    invocation: Arc<Invocation>,
}

impl<'a> ActiveInvocation<'a> {
    fn register(registry: &'a Mutex<Vec<Arc<Invocation>>>, invocation: Arc<Invocation>) -> Self {
        registry.lock().push(Arc::clone(&invocation));
        Self {
            registry,
            invocation,
        }
    }
}

impl Drop for ActiveInvocation<'_> {
    fn drop(&mut self) {
        self.registry
            .lock()
            .retain(|active| !Arc::ptr_eq(active, &self.invocation));

        if !self.invocation.is_finalized() && self.invocation.expire() {
            tracing::warn!(
                invocation_id = %self.invocation.id(),
                "Handler dropped before finalizing, delivered best attempt"
            );
        }
    }
}

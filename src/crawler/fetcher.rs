//! Fetch controller for catalog pages
//!
//! Every target goes through the same retry state machine:
//!
//! ```text
//! Attempting ──► Success | Empty
//!     │
//!     ├──► Fatal ─────────────────────────► Failed
//!     │
//!     └──► Retryable ──(attempt < max)──► sleep(initial * 2^(attempt-1)) ──► Attempting
//!                    └─(attempt = max)──► Failed, or Empty if the page identified itself
//! ```
//!
//! # Failure classification
//!
//! | Condition | Kind | Retried |
//! |-----------|------|---------|
//! | Navigation/wait timeout, connection error, HTTP 429/5xx | TransientNetwork | yes |
//! | Title rendered but the trims list never did | TransientNetwork | yes |
//! | Challenge phrase in content or challenge URL | DetectionSuspected | yes |
//! | Page rendered without its title element | StructuralMismatch | no |
//! | Any other renderer error | UnexpectedFault | no |
//!
//! A shutdown request that arrives during a backoff sleep ends the target as
//! `Interrupted`.

use crate::config::{CatalogConfig, HarvestConfig, RetryConfig, Viewport};
use crate::crawler::{DetectionRules, Pacing, ShutdownSignal};
use crate::extract::{Extractor, PageIdentity};
use crate::renderer::{RenderError, Renderer, WaitStrategy};
use crate::state::{AttemptOutcome, FailureKind, FetchOutcome, Target};
use std::time::Duration;
use url::Url;

/// Selector that signals the trims list has rendered
pub const TRIMS_READY: &str = ".trims-list .panel";

/// Attempt budget and backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
        }
    }

    /// Delay before the attempt following attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_delay.saturating_mul(1u32 << exponent)
    }

    /// Returns true if another attempt is allowed after `attempt` attempts
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Sleeps out the backoff after attempt number `attempt`
    ///
    /// Returns false if shutdown was requested before the delay elapsed.
    pub async fn backoff(&self, attempt: u32, shutdown: &ShutdownSignal) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.delay_for(attempt)) => true,
            _ = shutdown.triggered() => false,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.initial_backoff_ms),
        )
    }
}

/// Terminal outcome of one target plus the identity the page declared, if any
#[derive(Debug)]
pub struct FetchReport {
    pub outcome: FetchOutcome,
    pub identity: Option<PageIdentity>,
}

impl FetchReport {
    fn new(outcome: FetchOutcome, identity: Option<PageIdentity>) -> Self {
        Self { outcome, identity }
    }

    /// Returns true if the page declared an identity other than `target`
    pub fn identity_mismatch(&self, target: &Target) -> bool {
        self.identity
            .as_ref()
            .map(|identity| !identity.matches(target))
            .unwrap_or(false)
    }
}

/// Drives one rendering session through a target page with retries
#[derive(Debug, Clone)]
pub struct FetchController {
    base_url: Url,
    navigation_timeout: Duration,
    selector_timeout: Duration,
    policy: RetryPolicy,
    pacing: Pacing,
    detection: DetectionRules,
    extractor: Extractor,
}

impl FetchController {
    pub fn new(
        base_url: Url,
        catalog: &CatalogConfig,
        policy: RetryPolicy,
        pacing: Pacing,
        detection: DetectionRules,
        extractor: Extractor,
    ) -> Self {
        Self {
            base_url,
            navigation_timeout: catalog.navigation_timeout(),
            selector_timeout: catalog.selector_timeout(),
            policy,
            pacing,
            detection,
            extractor,
        }
    }

    /// Builds a controller from the full harvest configuration
    pub fn from_config(base_url: Url, config: &HarvestConfig) -> Self {
        Self::new(
            base_url,
            &config.catalog,
            RetryPolicy::from(&config.retry),
            Pacing::new(config.pacing.clone()),
            DetectionRules::from(&config.detection),
            Extractor::new(config.extraction.clone()),
        )
    }

    /// Fetches and extracts one target
    ///
    /// # Arguments
    ///
    /// * `session` - The worker's rendering session
    /// * `target` - The page to fetch
    /// * `viewport` - Viewport of the session's identity, used for activity simulation
    /// * `shutdown` - Cuts backoff sleeps short
    pub async fn fetch<R: Renderer + ?Sized>(
        &self,
        session: &mut R,
        target: &Target,
        viewport: Viewport,
        shutdown: &ShutdownSignal,
    ) -> FetchReport {
        let url = match target.url(&self.base_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Cannot build URL for {}: {}", target, e);
                return FetchReport::new(
                    FetchOutcome::Failed {
                        kind: FailureKind::UnexpectedFault,
                        attempts: 0,
                        reason: e.to_string(),
                    },
                    None,
                );
            }
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            tracing::debug!("{}: attempt {}/{}", target, attempt, self.policy.max_attempts);

            let (outcome, identity) = self.attempt(session, &url, viewport).await;
            match outcome {
                AttemptOutcome::Success(records) => {
                    return FetchReport::new(FetchOutcome::Records(records), identity);
                }
                AttemptOutcome::Empty => {
                    return FetchReport::new(FetchOutcome::Empty, identity);
                }
                AttemptOutcome::Fatal { kind, reason } => {
                    if kind == FailureKind::StructuralMismatch {
                        tracing::warn!("{}: {} ({}), treating as no data", target, reason, kind);
                    } else {
                        tracing::error!(
                            "{}: fatal {} on attempt {} at {}: {}",
                            target,
                            kind,
                            attempt,
                            url,
                            reason
                        );
                    }
                    return FetchReport::new(
                        FetchOutcome::Failed {
                            kind,
                            attempts: attempt,
                            reason,
                        },
                        identity,
                    );
                }
                AttemptOutcome::Retryable { kind, reason } => {
                    if !self.policy.should_retry(attempt) && identity.is_some() {
                        tracing::warn!(
                            "{}: trims list never rendered after {} attempts ({}), treating as no data",
                            target,
                            attempt,
                            reason
                        );
                        return FetchReport::new(FetchOutcome::Empty, identity);
                    }
                    if !self.policy.should_retry(attempt) {
                        tracing::error!(
                            "{}: giving up after {} attempts ({}): {}",
                            target,
                            attempt,
                            kind,
                            reason
                        );
                        return FetchReport::new(
                            FetchOutcome::Failed {
                                kind,
                                attempts: attempt,
                                reason,
                            },
                            identity,
                        );
                    }

                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        "{}: attempt {}/{} failed ({}): {}; retrying in {:?}",
                        target,
                        attempt,
                        self.policy.max_attempts,
                        kind,
                        reason,
                        delay
                    );

                    if !self.policy.backoff(attempt, shutdown).await {
                        tracing::info!("{}: shutdown requested during backoff", target);
                        return FetchReport::new(FetchOutcome::Interrupted, identity);
                    }
                }
            }
        }
    }

    /// One pass through navigate, detection check, selector wait and extraction
    async fn attempt<R: Renderer + ?Sized>(
        &self,
        session: &mut R,
        url: &Url,
        viewport: Viewport,
    ) -> (AttemptOutcome, Option<PageIdentity>) {
        self.pacing.pause_step().await;

        if let Err(e) = session
            .navigate(url.as_str(), WaitStrategy::NetworkIdle, self.navigation_timeout)
            .await
        {
            return (render_failure(e), None);
        }

        let landed = match session.content().await {
            Ok(content) => content,
            Err(e) => return (render_failure(e), None),
        };
        let current_url = session.current_url();
        if let Some(reason) = self.detection.check(&landed, current_url.as_deref()) {
            return (
                AttemptOutcome::failure(FailureKind::DetectionSuspected, reason),
                None,
            );
        }

        self.pacing.simulate_activity(session, viewport).await;

        let waited = session
            .wait_for_selector(TRIMS_READY, self.selector_timeout)
            .await;
        if let Err(e) = &waited {
            if !matches!(e, RenderError::Timeout { .. }) {
                return (render_failure_ref(e), None);
            }
        }

        let markup = match session.content().await {
            Ok(markup) => markup,
            Err(e) => return (render_failure(e), None),
        };
        let page = self.extractor.extract_page(&markup);

        match (waited, page.identity) {
            // A slow trims list is retried; the identity decides what exhaustion means.
            (Err(e), identity) => (render_failure(e), identity),
            (Ok(()), None) => (
                AttemptOutcome::failure(
                    FailureKind::StructuralMismatch,
                    "page has no title element",
                ),
                None,
            ),
            (Ok(()), Some(identity)) if page.records.is_empty() => {
                (AttemptOutcome::Empty, Some(identity))
            }
            (Ok(()), Some(identity)) => (AttemptOutcome::Success(page.records), Some(identity)),
        }
    }
}

fn render_failure(error: RenderError) -> AttemptOutcome {
    render_failure_ref(&error)
}

fn render_failure_ref(error: &RenderError) -> AttemptOutcome {
    let kind = if error.is_transient() {
        FailureKind::TransientNetwork
    } else {
        FailureKind::UnexpectedFault
    };
    AttemptOutcome::failure(kind, error.to_string())
}

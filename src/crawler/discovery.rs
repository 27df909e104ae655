//! Model discovery through the catalog's vehicle filter form
//!
//! The form walk shares the fetch controller's retry policy: transient
//! render failures and challenge pages are retried with backoff, anything
//! else ends discovery with an empty model list.

use crate::config::{CatalogConfig, HarvestConfig, Viewport};
use crate::crawler::{DetectionRules, Pacing, RetryPolicy, ShutdownSignal};
use crate::extract::slugify;
use crate::renderer::{RenderError, Renderer, WaitStrategy};
use crate::state::Task;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

const VEHICLE_FORM: &str = "#vehicle_form";
const MAKE_SELECT: &str = "select#auto_vendor";
const YEAR_SELECT: &str = "select#auto_year";
const YEAR_READY: &str = "select#auto_year:not([disabled])";
const MODEL_READY: &str = "select#auto_model:not([disabled])";
const MODEL_WIDGET: &str = r#"span[aria-labelledby="select2-auto_model-container"]"#;
const MODEL_LIST: &str = "ul.select2-results__options";
const MODEL_OPTIONS: &str = "ul.select2-results__options li.select2-results__option--selectable";

/// Label of the placeholder entry in the model list
const PLACEHOLDER: &str = "Model";

/// Why discovery stopped early
#[derive(Debug)]
enum DiscoveryError {
    Render(RenderError),
    Detection(String),
}

impl DiscoveryError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Render(e) => e.is_transient(),
            Self::Detection(_) => true,
        }
    }
}

impl From<RenderError> for DiscoveryError {
    fn from(e: RenderError) -> Self {
        Self::Render(e)
    }
}

impl std::fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Render(e) => write!(f, "{}", e),
            Self::Detection(reason) => write!(f, "detection suspected: {}", reason),
        }
    }
}

/// How discovery for one task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// Model slugs in catalog order; empty if the form could not be driven
    Models(Vec<String>),

    /// Shutdown arrived during a backoff sleep
    Interrupted,
}

/// Enumerates the models the catalog lists for a (make, year) pair
#[derive(Debug, Clone)]
pub struct ModelDiscovery {
    root: Url,
    navigation_timeout: Duration,
    selector_timeout: Duration,
    policy: RetryPolicy,
    pacing: Pacing,
    detection: DetectionRules,
}

impl ModelDiscovery {
    pub fn new(
        root: Url,
        catalog: &CatalogConfig,
        policy: RetryPolicy,
        pacing: Pacing,
        detection: DetectionRules,
    ) -> Self {
        Self {
            root,
            navigation_timeout: catalog.navigation_timeout(),
            selector_timeout: catalog.selector_timeout(),
            policy,
            pacing,
            detection,
        }
    }

    pub fn from_config(root: Url, config: &HarvestConfig) -> Self {
        Self::new(
            root,
            &config.catalog,
            RetryPolicy::from(&config.retry),
            Pacing::new(config.pacing.clone()),
            DetectionRules::from(&config.detection),
        )
    }

    /// Returns the model slugs for `task`
    ///
    /// A make/year combination the catalog does not carry looks the same as a
    /// walk that failed for good, so both end up as an empty list.
    ///
    /// # Arguments
    ///
    /// * `session` - The task's rendering session
    /// * `task` - The (make, year) pair to select in the form
    /// * `viewport` - Viewport of the session's identity, used for activity simulation
    /// * `shutdown` - Cuts backoff sleeps short
    pub async fn discover<R: Renderer + ?Sized>(
        &self,
        session: &mut R,
        task: &Task,
        viewport: Viewport,
        shutdown: &ShutdownSignal,
    ) -> DiscoveryOutcome {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let error = match self.walk_form(session, task, viewport).await {
                Ok(models) => {
                    tracing::info!("Found {} models for {}", models.len(), task);
                    return DiscoveryOutcome::Models(models);
                }
                Err(e) => e,
            };

            if !error.is_retryable() {
                tracing::warn!("Model discovery failed for {}: {}", task, error);
                return DiscoveryOutcome::Models(Vec::new());
            }
            if !self.policy.should_retry(attempt) {
                tracing::warn!(
                    "Model discovery for {} gave up after {} attempts: {}",
                    task,
                    attempt,
                    error
                );
                return DiscoveryOutcome::Models(Vec::new());
            }

            tracing::warn!(
                "Model discovery for {}: attempt {}/{} failed: {}; retrying in {:?}",
                task,
                attempt,
                self.policy.max_attempts,
                error,
                self.policy.delay_for(attempt)
            );
            if !self.policy.backoff(attempt, shutdown).await {
                tracing::info!("{}: shutdown requested during discovery backoff", task);
                return DiscoveryOutcome::Interrupted;
            }
        }
    }

    async fn walk_form<R: Renderer + ?Sized>(
        &self,
        session: &mut R,
        task: &Task,
        viewport: Viewport,
    ) -> Result<Vec<String>, DiscoveryError> {
        session
            .navigate(self.root.as_str(), WaitStrategy::ContentLoaded, self.navigation_timeout)
            .await?;

        let landed = session.content().await?;
        let current_url = session.current_url();
        if let Some(reason) = self.detection.check(&landed, current_url.as_deref()) {
            return Err(DiscoveryError::Detection(reason));
        }

        self.pacing.simulate_activity(session, viewport).await;

        session
            .wait_for_selector(VEHICLE_FORM, self.selector_timeout)
            .await?;
        self.pacing.pause_step().await;

        session.select_option(MAKE_SELECT, &task.make).await?;
        self.pacing.pause_step().await;

        session
            .wait_for_selector(YEAR_READY, self.selector_timeout)
            .await?;
        session
            .select_option(YEAR_SELECT, &task.year.to_string())
            .await?;
        self.pacing.pause_step().await;

        session
            .wait_for_selector(MODEL_READY, self.selector_timeout)
            .await?;
        session.hover(MODEL_WIDGET).await?;
        self.pacing.pause_step().await;
        session.click(MODEL_WIDGET).await?;

        session
            .wait_for_selector(MODEL_LIST, self.selector_timeout)
            .await?;
        self.pacing.pause_step().await;

        let labels = session.option_labels(MODEL_OPTIONS).await?;
        Ok(model_slugs(&labels))
    }
}

/// Turns model list labels into target slugs, dropping the placeholder and repeats
pub fn model_slugs(labels: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    labels
        .iter()
        .map(|label| label.trim())
        .filter(|label| !label.is_empty() && *label != PLACEHOLDER)
        .map(slugify)
        .filter(|slug| seen.insert(slug.clone()))
        .collect()
}

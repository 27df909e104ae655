//! Harvest orchestration
//!
//! This module owns the main harvest loop, including:
//! - Building the (make, year) task list minus tasks already marked complete
//! - Running a fixed pool of workers over one shared FIFO queue
//! - Opening a fresh rendering session per task
//! - Persisting each target's records and the task's completion marker
//! - Stopping cleanly on shutdown

use crate::config::{validate, HarvestConfig};
use crate::crawler::{DiscoveryOutcome, FetchController, ModelDiscovery, Pacing, ShutdownSignal};
use crate::extract::TrimRecord;
use crate::output::{RunStats, RunSummary};
use crate::renderer::{IdentityProfile, Renderer, SessionFactory};
use crate::state::{FetchOutcome, Target, Task};
use crate::storage::{FsStore, Store};
use crate::Result;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use url::Url;

type TaskQueue = Arc<Mutex<VecDeque<Task>>>;

/// How a task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskOutcome {
    /// Every discovered model was processed; the task is retired
    Completed,

    /// Shutdown arrived first; the task stays pending for the next run
    Interrupted,
}

/// State shared by every worker
struct Harvest<F: SessionFactory> {
    config: HarvestConfig,
    factory: F,
    store: Arc<dyn Store>,
    controller: FetchController,
    discovery: ModelDiscovery,
    pacing: Pacing,
}

/// Runs the harvest over the configured cross-product
pub struct Orchestrator<F: SessionFactory> {
    harvest: Arc<Harvest<F>>,
}

impl<F: SessionFactory> Orchestrator<F> {
    /// Creates an orchestrator persisting to the configured results directory
    ///
    /// # Arguments
    ///
    /// * `config` - Validated again here; the orchestrator never sees an invalid config
    /// * `factory` - Opens one rendering session per task
    ///
    /// # Returns
    ///
    /// * `Ok(Orchestrator)` - Ready to run
    /// * `Err(HarvestError)` - Invalid configuration
    pub fn new(config: HarvestConfig, factory: F) -> Result<Self> {
        let store = Arc::new(FsStore::new(&config.output.results_dir));
        Self::with_store(config, factory, store)
    }

    /// Creates an orchestrator persisting to an arbitrary store
    pub fn with_store(config: HarvestConfig, factory: F, store: Arc<dyn Store>) -> Result<Self> {
        validate(&config)?;
        let base_url = Url::parse(&config.catalog.base_url)?;

        let controller = FetchController::from_config(base_url.clone(), &config);
        let discovery = ModelDiscovery::from_config(base_url, &config);
        let pacing = Pacing::new(config.pacing.clone());

        Ok(Self {
            harvest: Arc::new(Harvest {
                config,
                factory,
                store,
                controller,
                discovery,
                pacing,
            }),
        })
    }

    /// Number of tasks in the full cross-product
    pub fn total_tasks(&self) -> usize {
        let targets = &self.harvest.config.targets;
        let years = usize::from(targets.last_year.saturating_sub(targets.first_year)) + 1;
        targets.makes.len() * years
    }

    /// Tasks without a completion marker, make by make, newest year first
    pub fn pending_tasks(&self) -> Vec<Task> {
        let targets = &self.harvest.config.targets;
        let mut tasks = Vec::new();

        for make in &targets.makes {
            for year in (targets.first_year..=targets.last_year).rev() {
                let task = Task::new(make.clone(), year);
                if self.harvest.store.is_complete(&task) {
                    tracing::debug!("Skipping {}: already complete", task);
                    continue;
                }
                tasks.push(task);
            }
        }

        tasks
    }

    /// Runs every pending task to completion or until shutdown
    ///
    /// Individual task failures never fail the run; they are logged and
    /// counted in the returned summary.
    pub async fn run(&self, shutdown: ShutdownSignal) -> Result<RunSummary> {
        let started_at = Utc::now();
        let tasks = self.pending_tasks();
        let pending = tasks.len();

        let worker_count = (self.harvest.config.harvest.workers as usize).min(pending);
        tracing::info!(
            "Starting harvest: {} of {} tasks pending, {} workers, results in {}",
            pending,
            self.total_tasks(),
            worker_count,
            self.harvest.store.results_dir().display()
        );

        let queue: TaskQueue = Arc::new(Mutex::new(VecDeque::from(tasks)));
        let stats = Arc::new(RunStats::new());
        let mut workers = JoinSet::new();
        for id in 0..worker_count {
            workers.spawn(run_worker(
                id,
                Arc::clone(&self.harvest),
                Arc::clone(&queue),
                Arc::clone(&stats),
                shutdown.clone(),
            ));
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker terminated abnormally: {}", e);
            }
        }

        let interrupted = shutdown.is_triggered();
        let summary = stats.summary(pending, started_at, Utc::now(), interrupted);

        tracing::info!(
            "Harvest {}: {} tasks completed, {} targets fetched, {} failed in {}s",
            if interrupted { "interrupted" } else { "finished" },
            summary.tasks_completed,
            summary.targets_fetched(),
            summary.targets_failed,
            summary.duration_seconds()
        );

        Ok(summary)
    }
}

/// Pulls tasks off the shared queue until it is empty or shutdown is requested
async fn run_worker<F: SessionFactory>(
    id: usize,
    harvest: Arc<Harvest<F>>,
    queue: TaskQueue,
    stats: Arc<RunStats>,
    shutdown: ShutdownSignal,
) {
    tracing::debug!("Worker {} started", id);

    loop {
        if shutdown.is_triggered() {
            break;
        }

        let next = queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let Some(task) = next else {
            break;
        };

        // A separate task so a panic inside one task cannot take the worker down.
        let handle = tokio::spawn({
            let harvest = Arc::clone(&harvest);
            let stats = Arc::clone(&stats);
            let task = task.clone();
            let shutdown = shutdown.clone();
            async move { harvest.process_task(&task, &stats, &shutdown).await }
        });

        match handle.await {
            Ok(Ok(TaskOutcome::Completed)) => stats.task_completed(),
            Ok(Ok(TaskOutcome::Interrupted)) => {
                stats.task_interrupted();
                break;
            }
            Ok(Err(e)) => {
                tracing::error!("Worker {}: task {} failed: {}", id, task, e);
                stats.task_failed();
            }
            Err(e) => {
                tracing::error!("Worker {}: task {} aborted: {}", id, task, e);
                stats.task_failed();
            }
        }
    }

    tracing::debug!("Worker {} exiting", id);
}

impl<F: SessionFactory> Harvest<F> {
    /// Processes one task inside a fresh session
    async fn process_task(
        &self,
        task: &Task,
        stats: &RunStats,
        shutdown: &ShutdownSignal,
    ) -> Result<TaskOutcome> {
        tracing::info!("Starting task {}", task);

        let profile = IdentityProfile::random(&self.config.identity);
        let mut session = self.factory.open(&profile).await?;

        let outcome = self
            .harvest_models(&mut session, task, &profile, stats, shutdown)
            .await;

        if let Err(e) = session.close().await {
            tracing::debug!("Failed to close session for {}: {}", task, e);
        }

        if outcome == TaskOutcome::Completed {
            self.store.mark_complete(task)?;
            tracing::info!("Task {} complete", task);
        }

        Ok(outcome)
    }

    async fn harvest_models<R: Renderer + ?Sized>(
        &self,
        session: &mut R,
        task: &Task,
        profile: &IdentityProfile,
        stats: &RunStats,
        shutdown: &ShutdownSignal,
    ) -> TaskOutcome {
        let models = match self
            .discovery
            .discover(session, task, profile.viewport, shutdown)
            .await
        {
            DiscoveryOutcome::Models(models) => models,
            DiscoveryOutcome::Interrupted => return TaskOutcome::Interrupted,
        };
        stats.models_discovered(models.len());

        let mut fetched_any = false;
        for model in models {
            if shutdown.is_triggered() {
                tracing::info!("Stopping {} before {}: shutdown requested", task, model);
                return TaskOutcome::Interrupted;
            }

            let target = task.target(model);
            if self.store.is_saved(&target) {
                tracing::info!("Skipping {}: already saved", target);
                stats.target_skipped();
                continue;
            }

            if fetched_any {
                self.pacing.pause_between_targets().await;
            }
            fetched_any = true;

            let report = self
                .controller
                .fetch(session, &target, profile.viewport, shutdown)
                .await;

            if report.identity_mismatch(&target) {
                if let Some(identity) = &report.identity {
                    tracing::warn!(
                        "{}: page declares {} {} {}; keeping records for review",
                        target,
                        identity.make,
                        identity.model,
                        identity.year
                    );
                }
                stats.identity_mismatch();
            }

            match report.outcome {
                FetchOutcome::Records(records) => self.persist(&target, &records, stats),
                FetchOutcome::Empty => {
                    tracing::info!("{}: no qualifying trims", target);
                    self.persist(&target, &[], stats);
                }
                FetchOutcome::Failed { kind, .. } => stats.target_failed(Some(kind)),
                FetchOutcome::Interrupted => return TaskOutcome::Interrupted,
            }
        }

        TaskOutcome::Completed
    }

    /// Writes a target's records; a failed write leaves the target pending
    fn persist(&self, target: &Target, records: &[TrimRecord], stats: &RunStats) {
        match self.store.save(target, records) {
            Ok(path) => {
                tracing::info!(
                    "Saved {} trims for {} to {}",
                    records.len(),
                    target,
                    path.display()
                );
                if records.is_empty() {
                    stats.target_empty();
                } else {
                    stats.target_saved();
                }
            }
            Err(e) => {
                tracing::error!("Failed to save {}: {}", target, e);
                stats.target_failed(None);
            }
        }
    }
}

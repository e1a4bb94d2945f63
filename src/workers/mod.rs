pub mod email_token_cleanup;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::config::WorkerConfig;
use crate::state::Repositories;

/// Timeout for individual worker invocations (5 minutes).
const WORKER_TIMEOUT: Duration = Duration::from_secs(300);

/// Drain period before scheduler shutdown to let in-flight tasks complete.
#[cfg(test)]
const DRAIN_TIMEOUT: Duration = Duration::from_millis(10);
#[cfg(not(test))]
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerName {
    EmailTokenCleanup,
}

impl WorkerName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmailTokenCleanup => "email_token_cleanup",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub name: WorkerName,
    pub cron: &'static str,
}

pub struct WorkerManager {
    repos: Repositories,
    shutdown_rx: broadcast::Receiver<()>,
    config: WorkerConfig,
}

impl WorkerManager {
    pub fn new(
        repos: Repositories,
        shutdown_rx: broadcast::Receiver<()>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            repos,
            shutdown_rx,
            config: config.clone(),
        }
    }

    /// Single source of truth for all planned jobs and their cron schedules.
    pub fn planned_jobs(&self) -> Vec<JobSpec> {
        if !self.config.is_leader {
            return Vec::new();
        }

        vec![JobSpec {
            name: WorkerName::EmailTokenCleanup,
            cron: "0 0 * * * *",
        }]
    }

    /// Start the worker scheduler. Returns an error if the scheduler cannot be created or started.
    pub async fn start(mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !self.config.is_leader {
            tracing::info!("Worker leader disabled; skipping worker startup");
            return Ok(());
        }

        let mut scheduler = JobScheduler::new().await?;

        self.register_jobs(&scheduler).await;

        scheduler.start().await?;

        tracing::info!("Worker manager started");
        let _ = self.shutdown_rx.recv().await;

        tracing::info!(
            "Worker manager shutting down, draining for {}s",
            DRAIN_TIMEOUT.as_secs()
        );
        tokio::time::sleep(DRAIN_TIMEOUT).await;
        let _ = scheduler.shutdown().await;
        Ok(())
    }

    async fn register_jobs(&self, scheduler: &JobScheduler) {
        for spec in self.planned_jobs() {
            let name_str = spec.name.as_str();
            match spec.name {
                WorkerName::EmailTokenCleanup => {
                    let tokens = self.repos.email_tokens.clone();
                    add_job(scheduler, spec.cron, name_str, move || {
                        let tokens = tokens.clone();
                        async move {
                            email_token_cleanup::run(tokens.as_ref()).await;
                        }
                    })
                    .await;
                }
            }
            tracing::info!(name = name_str, cron = spec.cron, "Registered worker");
        }
    }
}

/// Add a job to the scheduler with an overlap guard and timeout wrapper.
async fn add_job<Fut, F>(scheduler: &JobScheduler, cron: &str, name: &'static str, mut run: F)
where
    F: FnMut() -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let running = Arc::new(AtomicBool::new(false));

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let guard = running.clone();

        if guard
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!(
                worker = name,
                "Skipping worker invocation: previous run still in progress"
            );
            return Box::pin(async {});
        }

        let fut = run();
        Box::pin(async move {
            if tokio::time::timeout(WORKER_TIMEOUT, fut).await.is_err() {
                tracing::error!(
                    worker = name,
                    timeout_secs = WORKER_TIMEOUT.as_secs(),
                    "Worker timed out"
                );
            }
            guard.store(false, Ordering::SeqCst);
        })
    });

    match job {
        Ok(job) => {
            if let Err(err) = scheduler.add(job).await {
                tracing::error!(error = %err, cron, worker = name, "Failed to add worker job");
            }
        }
        Err(err) => tracing::error!(error = %err, cron, worker = name, "Failed to create worker job"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::broadcast;

    use super::*;
    use crate::store::memory::MemoryStore;

    fn manager(is_leader: bool) -> (WorkerManager, broadcast::Sender<()>) {
        let repos = Repositories::in_memory(Arc::new(MemoryStore::new()));
        let (tx, _) = broadcast::channel(2);
        let manager = WorkerManager::new(repos, tx.subscribe(), &WorkerConfig { is_leader });
        (manager, tx)
    }

    #[test]
    fn leader_switch_controls_job_registration() {
        let (follower, _tx) = manager(false);
        assert!(follower.planned_jobs().is_empty());

        let (leader, _tx) = manager(true);
        let jobs = leader.planned_jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, WorkerName::EmailTokenCleanup);
        assert_eq!(jobs[0].cron, "0 0 * * * *");
    }

    #[tokio::test]
    async fn non_leader_start_returns_immediately() {
        let (follower, _tx) = manager(false);
        follower
            .start()
            .await
            .expect("non-leader start should succeed");
    }

    #[tokio::test]
    async fn leader_stops_on_shutdown_signal() {
        let (leader, tx) = manager(true);
        let handle = tokio::spawn(leader.start());
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(()).expect("receiver alive");

        let result = tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .expect("worker manager exits")
            .expect("task joins");
        assert!(result.is_ok());
    }
}

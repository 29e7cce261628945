//! # Periodic Scheduler
//!
//! A single cooperative loop drives every periodic job. Each job has its
//! own interval and its own next-due instant. A due job runs in its own task,
//! so an error or a panic is logged and counted without touching the other
//! jobs or the next tick.

pub mod jobs;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pk_telemetry::JOB_FAILURES;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::errors::CoordinationError;

pub use jobs::{
    BindingReconcile, CachePurge, MetricsCollection, ScheduleTick, SessionSweep, SnapshotRefresh,
};

#[async_trait]
pub trait PeriodicJob: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self) -> Result<(), CoordinationError>;
}

struct Entry {
    job: Arc<dyn PeriodicJob>,
    every: Duration,
    next_due: Instant,
}

#[derive(Default)]
pub struct Scheduler {
    entries: Vec<Entry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `job`, first due one interval from now.
    #[must_use]
    pub fn every(mut self, every: Duration, job: Arc<dyn PeriodicJob>) -> Self {
        self.entries.push(Entry {
            job,
            every,
            next_due: Instant::now() + every,
        });
        self
    }

    pub fn job_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.job.name()).collect()
    }

    /// Runs until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(jobs = ?self.job_names(), "[scheduler] Started");
        loop {
            let Some(next) = self.entries.iter().map(|e| e.next_due).min() else {
                let _ = shutdown.changed().await;
                break;
            };

            tokio::select! {
                _ = tokio::time::sleep_until(next) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            let now = Instant::now();
            for entry in self.entries.iter_mut().filter(|e| e.next_due <= now) {
                tokio::spawn(run_isolated(Arc::clone(&entry.job)));
                // Missed ticks are skipped, not replayed.
                while entry.next_due <= now {
                    entry.next_due += entry.every;
                }
            }
        }
        info!("[scheduler] Stopped");
    }
}

async fn run_isolated(job: Arc<dyn PeriodicJob>) {
    let name = job.name();
    match tokio::spawn(async move { job.run().await }).await {
        Ok(Ok(())) => debug!(job = name, "[scheduler] Job finished"),
        Ok(Err(e)) => {
            JOB_FAILURES.with_label_values(&[name]).inc();
            warn!(job = name, error = %e, "[scheduler] Job failed");
        }
        Err(join) => {
            JOB_FAILURES.with_label_values(&[name]).inc();
            error!(job = name, error = %join, "[scheduler] Job panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        name: &'static str,
        runs: AtomicUsize,
        fail: bool,
    }

    impl Counting {
        fn new(name: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                runs: AtomicUsize::new(0),
                fail,
            })
        }

        fn runs(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PeriodicJob for Counting {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn run(&self) -> Result<(), CoordinationError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CoordinationError::NoPendingExit("test".into()));
            }
            Ok(())
        }
    }

    struct Panicking;

    #[async_trait]
    impl PeriodicJob for Panicking {
        fn name(&self) -> &'static str {
            "scheduler_test_panicking"
        }

        async fn run(&self) -> Result<(), CoordinationError> {
            panic!("job blew up");
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_jobs_run_on_their_own_intervals() {
        let fast = Counting::new("scheduler_test_fast", false);
        let slow = Counting::new("scheduler_test_slow", false);
        let (tx, rx) = watch::channel(false);
        let scheduler = Scheduler::new()
            .every(Duration::from_secs(10), fast.clone())
            .every(Duration::from_secs(25), slow.clone());
        let handle = tokio::spawn(scheduler.run(rx));

        tokio::time::sleep(Duration::from_secs(51)).await;
        settle().await;
        assert_eq!(fast.runs(), 5);
        assert_eq!(slow.runs(), 2);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_isolated() {
        let failing = Counting::new("scheduler_test_failing", true);
        let healthy = Counting::new("scheduler_test_healthy", false);
        let before = JOB_FAILURES
            .with_label_values(&["scheduler_test_failing"])
            .get();
        let (tx, rx) = watch::channel(false);
        let scheduler = Scheduler::new()
            .every(Duration::from_secs(5), failing.clone())
            .every(Duration::from_secs(5), Arc::new(Panicking))
            .every(Duration::from_secs(5), healthy.clone());
        let handle = tokio::spawn(scheduler.run(rx));

        tokio::time::sleep(Duration::from_secs(16)).await;
        settle().await;
        assert_eq!(failing.runs(), 3);
        assert_eq!(healthy.runs(), 3);
        assert_eq!(
            JOB_FAILURES
                .with_label_values(&["scheduler_test_failing"])
                .get(),
            before + 3
        );
        assert_eq!(
            JOB_FAILURES
                .with_label_values(&["scheduler_test_panicking"])
                .get(),
            3
        );

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_scheduler_stops_on_shutdown() {
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(Scheduler::new().run(rx));
        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}

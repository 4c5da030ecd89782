//! Background simulation jobs.
//!
//! Runs a Monte Carlo simulation on tokio's blocking pool so an interactive
//! caller is never blocked, with cooperative cancellation via a shared flag
//! and progress published on a `watch` channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::simulation::{LossExposure, MonteCarloSimulator};
use crate::error::{EngineError, Result};

/// Trials completed so far out of those requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationProgress {
    pub completed: usize,
    pub requested: usize,
}

impl SimulationProgress {
    /// Completed share in [0, 1].
    pub fn fraction(&self) -> f64 {
        if self.requested == 0 {
            1.0
        } else {
            self.completed as f64 / self.requested as f64
        }
    }

    pub fn is_finished(&self) -> bool {
        self.completed >= self.requested
    }
}

/// Handle to a running simulation.
pub struct SimulationHandle<T> {
    cancel: Arc<AtomicBool>,
    progress: watch::Receiver<SimulationProgress>,
    task: JoinHandle<Result<T>>,
}

impl<T> SimulationHandle<T> {
    /// Ask the job to stop. It will finish with `SimulationCancelled`.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Latest reported progress.
    pub fn progress(&self) -> SimulationProgress {
        *self.progress.borrow()
    }

    /// A receiver that is notified on every progress report.
    pub fn subscribe(&self) -> watch::Receiver<SimulationProgress> {
        self.progress.clone()
    }

    /// Wait for the job to finish.
    pub async fn join(self) -> Result<T> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(EngineError::Worker(e.to_string())),
        }
    }
}

/// Spawns simulations onto the blocking pool.
pub struct SimulationJob;

impl SimulationJob {
    /// Start a simulation and summarize its sorted losses with `finish`.
    ///
    /// Fails with [`EngineError::Worker`] outside a tokio runtime.
    pub fn spawn<T, F>(
        simulator: MonteCarloSimulator,
        exposures: Vec<LossExposure>,
        finish: F,
    ) -> Result<SimulationHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce(Vec<f64>) -> T + Send + 'static,
    {
        let runtime = current_runtime()?;
        let requested = simulator.settings().iterations;
        let cancel = Arc::new(AtomicBool::new(false));
        let (progress_tx, progress_rx) = watch::channel(SimulationProgress {
            completed: 0,
            requested,
        });

        let cancel_flag = cancel.clone();
        let task = runtime.spawn_blocking(move || {
            info!(
                iterations = requested,
                risks = exposures.len(),
                "Simulation job started"
            );
            let outcome = simulator.run_with(&exposures, &cancel_flag, |completed| {
                progress_tx.send_replace(SimulationProgress {
                    completed,
                    requested,
                });
            });
            match outcome {
                Ok(losses) => {
                    info!(iterations = requested, "Simulation job finished");
                    Ok(finish(losses))
                }
                Err(e) => {
                    if e.is_cancelled() {
                        warn!(error = %e, "Simulation job cancelled");
                    }
                    Err(e)
                }
            }
        });

        Ok(SimulationHandle {
            cancel,
            progress: progress_rx,
            task,
        })
    }

    /// A handle that resolves to `value` without running any trials.
    pub fn ready<T>(value: T) -> Result<SimulationHandle<T>>
    where
        T: Send + 'static,
    {
        let runtime = current_runtime()?;
        let (_, progress_rx) = watch::channel(SimulationProgress {
            completed: 0,
            requested: 0,
        });
        Ok(SimulationHandle {
            cancel: Arc::new(AtomicBool::new(false)),
            progress: progress_rx,
            task: runtime.spawn(async move { Ok(value) }),
        })
    }
}

fn current_runtime() -> Result<Handle> {
    Handle::try_current()
        .map_err(|e| EngineError::Worker(format!("no tokio runtime available: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::simulation::SimulationSettings;

    fn simulator(iterations: usize) -> MonteCarloSimulator {
        MonteCarloSimulator::new(SimulationSettings {
            iterations,
            seed: Some(11),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_progress_fraction() {
        let p = SimulationProgress {
            completed: 2500,
            requested: 10_000,
        };
        assert_eq!(p.fraction(), 0.25);
        assert!(!p.is_finished());
    }

    #[tokio::test]
    async fn test_job_completes_and_reports_progress() {
        let handle = SimulationJob::spawn(
            simulator(5000),
            vec![LossExposure::new(0.5, 10.0)],
            |losses| losses.len(),
        )
        .unwrap();
        let mut rx = handle.subscribe();
        let count = handle.join().await.unwrap();
        assert_eq!(count, 5000);
        let last = *rx.borrow_and_update();
        assert_eq!(last.completed, 5000);
        assert!(last.is_finished());
    }

    #[tokio::test]
    async fn test_cancelled_job_returns_cancellation() {
        let exposures = vec![LossExposure::new(0.5, 10.0); 2000];
        let handle =
            SimulationJob::spawn(simulator(100_000), exposures, |losses| losses.len()).unwrap();
        handle.cancel();
        assert!(handle.is_cancelled());
        let err = handle.join().await.unwrap_err();
        assert!(err.is_cancelled(), "got {err:?}");
    }

    #[tokio::test]
    async fn test_concurrent_jobs_are_independent() {
        let exposures = vec![LossExposure::new(0.3, 100.0), LossExposure::new(0.6, 40.0)];
        let a = SimulationJob::spawn(simulator(4000), exposures.clone(), |l| l).unwrap();
        let b = SimulationJob::spawn(simulator(4000), exposures, |l| l).unwrap();
        let (a, b) = (a.join().await.unwrap(), b.join().await.unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn test_spawn_outside_runtime_is_an_error() {
        let result = SimulationJob::spawn(simulator(100), vec![LossExposure::new(0.5, 1.0)], |l| l);
        match result {
            Err(EngineError::Worker(msg)) => assert!(msg.contains("runtime")),
            Err(e) => panic!("unexpected error {e:?}"),
            Ok(_) => panic!("spawned without a runtime"),
        }
        assert!(matches!(
            SimulationJob::ready(1usize),
            Err(EngineError::Worker(_))
        ));
    }

    #[tokio::test]
    async fn test_ready_handle_resolves_immediately() {
        let handle = SimulationJob::ready(7usize).unwrap();
        assert!(handle.progress().is_finished());
        assert_eq!(handle.join().await.unwrap(), 7);
    }
}

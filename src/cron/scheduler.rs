use super::clock::Clock;
use super::runner::JobRunner;
use super::schedule::{RunTime, next_run, sleep_duration};
use crate::command::CuratorCommand;
use chrono::DateTime;
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerState {
    RunningBatch,
    Waiting {
        next_run: DateTime<Tz>,
        sleep: Duration,
    },
}

/// Per-batch tally, for logs and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Run every command in order. A failing job is logged and the batch moves on.
pub async fn run_batch(runner: &dyn JobRunner, commands: &[CuratorCommand]) -> BatchReport {
    let mut report = BatchReport::default();
    info!(jobs = commands.len(), "curator running jobs");

    for command in commands {
        debug!(job = %command.label, command = %command, "curator running job");
        match runner.run(command).await {
            Ok(outcome) if outcome.success => {
                report.succeeded += 1;
                if outcome.output.is_empty() {
                    debug!(job = %command.label, "curator job was successful");
                } else {
                    info!(job = %command.label, "{}", outcome.output);
                }
            }
            Ok(outcome) => {
                report.failed += 1;
                warn!(
                    job = %command.label,
                    status = ?outcome.status,
                    "curator job failed: {}",
                    outcome.output
                );
            }
            Err(e) => {
                report.failed += 1;
                error!(job = %command.label, "{e}");
            }
        }
    }

    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        "curator run finish"
    );
    report
}

/// Runs the job list immediately, then once a day at `run_at` in `timezone`.
pub struct Scheduler {
    commands: Vec<CuratorCommand>,
    run_at: RunTime,
    timezone: Tz,
    clock: Arc<dyn Clock>,
    runner: Arc<dyn JobRunner>,
    state: SchedulerState,
    batches: u64,
}

impl Scheduler {
    pub fn new(
        commands: Vec<CuratorCommand>,
        run_at: RunTime,
        timezone: Tz,
        clock: Arc<dyn Clock>,
        runner: Arc<dyn JobRunner>,
    ) -> Self {
        Self {
            commands,
            run_at,
            timezone,
            clock,
            runner,
            state: SchedulerState::RunningBatch,
            batches: 0,
        }
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn batches_completed(&self) -> u64 {
        self.batches
    }

    fn plan_wait(&self) -> SchedulerState {
        let now = self.clock.now().with_timezone(&self.timezone);
        let next = next_run(now, self.run_at);
        let sleep = sleep_duration(now, next);
        debug!(
            hour = %self.run_at.time().format("%H"),
            minute = %self.run_at.time().format("%M"),
            seconds = sleep.as_secs(),
            now = %now,
            "curator seconds until next runtime"
        );
        SchedulerState::Waiting {
            next_run: next,
            sleep,
        }
    }

    /// Perform one state transition. Returns `false` once `cancel` fires
    /// during a wait; a batch in progress always runs to completion.
    pub async fn step(&mut self, cancel: &CancellationToken) -> bool {
        match &self.state {
            SchedulerState::RunningBatch => {
                run_batch(self.runner.as_ref(), &self.commands).await;
                self.batches += 1;
                self.state = self.plan_wait();
                true
            }
            SchedulerState::Waiting { sleep, .. } => {
                let sleep = *sleep;
                // A zero wait still yields before the next batch.
                if sleep.is_zero() {
                    tokio::task::yield_now().await;
                }
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return false,
                    () = self.clock.sleep(sleep) => {}
                }
                self.state = SchedulerState::RunningBatch;
                true
            }
        }
    }

    /// Loop forever, or until `cancel` fires.
    pub async fn run(&mut self, cancel: CancellationToken) {
        while self.step(&cancel).await {}
        info!(batches = self.batches, "curator scheduler stopped");
    }
}

//! Daily execution of the compacted job list.
//!
//! The [`Scheduler`] alternates between running the whole batch and waiting
//! for the next configured wall-clock slot. Time comes from a [`Clock`] and
//! jobs go through a [`JobRunner`], so both can be replaced in tests.

pub mod clock;
pub mod runner;
pub mod schedule;
pub mod scheduler;

pub use clock::{Clock, SystemClock};
pub use runner::{JobOutcome, JobRunner, ProcessRunner};
pub use schedule::{RunTime, next_run, sleep_duration};
pub use scheduler::{BatchReport, Scheduler, SchedulerState, run_batch};

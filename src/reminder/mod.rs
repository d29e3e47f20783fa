pub mod clock;
pub mod reminder_evaluator;
pub mod reminder_handlers;
pub mod reminder_scheduler;
pub mod routes;

pub use clock::{Clock, SystemClock};
#[cfg(test)]
pub use clock::ManualClock;
pub use reminder_evaluator::{evaluate, ReminderState};
pub use reminder_scheduler::{ReminderScheduler, SchedulerError, SweepReport, SweepSettings, SweepState, Sweeper};

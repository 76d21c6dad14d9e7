//! Durable job queue (spec §4.C) and the reminder scheduler built on top of
//! it (spec §4.H).

pub mod backend;
pub mod dead_letter;
pub mod error;
pub mod queue;
pub mod scheduler;

pub use backend::{Backend, InMemoryBackend, RedisBackend};
pub use dead_letter::{DeadLetter, DeadLetterBuffer};
pub use error::{HandlerError, QueueError};
pub use queue::{JobHandler, JobQueue};
pub use scheduler::{cancel_reminders, schedule_reminders};

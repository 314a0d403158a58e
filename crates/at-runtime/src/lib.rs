//! The orchestration layer: the Schema Execution Pipeline, the Change
//! Management Loop, the Scheduler, and the Step/Condition/Action/Runner
//! vocabulary they share (spec.md §2 components F, G, I, J, K).

pub mod action;
pub mod condition;
pub mod error;
pub mod http;
pub mod manager;
pub mod pipeline;
pub mod runner;
pub mod schedule;
pub mod step;

pub use action::Action;
pub use condition::Condition;
pub use error::{RuntimeError, RuntimeReason, RuntimeResult};
pub use http::{HttpMethod, TemplatedHttp};
pub use manager::Manager;
pub use runner::{LocalRunner, RemoteRunner, Runner};
pub use schedule::{Repeats, Schedule, ScheduledSchema, Scheduler};
pub use step::Step;

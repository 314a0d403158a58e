//! Core value types shared by every AutoTransform engine crate: work items,
//! batches, the component bundle/factory contract, the process-wide event
//! sink, and the error taxonomy of spec.md §7.

pub mod batch;
pub mod bundle;
pub mod change;
pub mod error;
pub mod event;
pub mod item;
pub mod validation;

pub use batch::{Batch, BatchMetadata};
pub use bundle::{Bundle, Constructor, Factory};
pub use change::{ChangeState, ReviewState, TestState};
pub use error::{AtError, AtReason, AtResult};
pub use event::{Event, EventLevel, EventSink};
pub use item::{FileItem, Item};
pub use validation::{ValidationLevel, ValidationResult};

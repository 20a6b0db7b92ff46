//! Stage executor actors.
//!
//! One [`StageExecutor`] owns one plan entry. It turns a `START` into exactly
//! one external command run and reports the result back to the
//! orchestrator as a single message.

mod stage_executor;

pub use stage_executor::{spawn_executor, ExecutorState, StageExecutor};

//! Small helpers for run ids and timestamps.

mod timestamps;

pub use timestamps::{iso_timestamp, now_millis, now_utc, Timestamp};

use uuid::Uuid;

/// Generates a new time-ordered run id.
#[must_use]
pub fn generate_run_id() -> Uuid {
    Uuid::now_v7()
}

//! Classification of finished command runs.

use crate::core::Outcome;

/// Output fragments that indicate the automation tool could not reach a host.
pub const CONNECTION_MARKERS: &[&str] = &["unreachable", "failed to connect"];

/// Maps an exit code and captured output to an outcome.
#[must_use]
pub fn classify_exit(exit_code: i32, output: &str) -> Outcome {
    if exit_code == 0 {
        return Outcome::Success;
    }
    if has_connection_marker(output) {
        Outcome::ConnectionFailure
    } else {
        Outcome::ExecutionError
    }
}

/// Returns true if the output mentions a connectivity problem.
#[must_use]
pub fn has_connection_marker(output: &str) -> bool {
    let lower = output.to_lowercase();
    CONNECTION_MARKERS.iter().any(|m| lower.contains(m))
}

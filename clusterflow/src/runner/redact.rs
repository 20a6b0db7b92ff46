//! Masking of secrets in captured process output.

use regex::Regex;
use std::sync::LazyLock;

/// Replacement text for a masked value.
pub const MASK: &str = "***MASKED***";

static SECRET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(password|token|secret)[=:].*").expect("secret pattern is valid")
});

/// Masks everything after a `password`, `token` or `secret` key.
///
/// `password=hunter2` and `Token: abc` become `password=***MASKED***` and
/// `Token=***MASKED***`; lines without such a key are returned unchanged.
#[must_use]
pub fn redact_line(line: &str) -> String {
    SECRET_PATTERN
        .replace_all(line, format!("${{1}}={MASK}").as_str())
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks_password() {
        assert_eq!(redact_line("password=hunter2"), "password=***MASKED***");
    }

    #[test]
    fn test_masks_colon_form_case_insensitive() {
        assert_eq!(redact_line("API_TOKEN: abc123"), "API_TOKEN=***MASKED***");
        assert_eq!(redact_line("Secret:xyz"), "Secret=***MASKED***");
    }

    #[test]
    fn test_keeps_prefix() {
        assert_eq!(
            redact_line("ok: [node1] => db_password=s3cr3t"),
            "ok: [node1] => db_password=***MASKED***"
        );
    }

    #[test]
    fn test_passes_clean_lines_through() {
        let line = "TASK [containerd : Install packages] ****";
        assert_eq!(redact_line(line), line);
        assert_eq!(redact_line("password reset skipped"), "password reset skipped");
    }
}

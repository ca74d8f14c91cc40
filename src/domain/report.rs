//! Error reports routed through a single channel.

use super::errors::ApiError;

/// How loudly a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Logged only: poll ticks, mark-read, statistics.
    Silent,
    /// Shown to the operator as an alert.
    UserVisible,
}

/// A failure together with where it happened.
#[derive(Debug, Clone)]
pub struct Report {
    pub severity: Severity,
    /// Short operation name, e.g. `"send message"`.
    pub context: &'static str,
    pub error: ApiError,
}

impl Report {
    #[must_use]
    pub const fn silent(context: &'static str, error: ApiError) -> Self {
        Self {
            severity: Severity::Silent,
            context,
            error,
        }
    }

    #[must_use]
    pub const fn user_visible(context: &'static str, error: ApiError) -> Self {
        Self {
            severity: Severity::UserVisible,
            context,
            error,
        }
    }
}

//! Process-wide switch controlling whether responses carry a `traceback` field.
//!
//! The flag is read once per error occurrence. Toggling it while requests are
//! in flight is eventually consistent: a request may observe either value.

use std::backtrace::Backtrace;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

static TRACEBACK_ENABLED: AtomicBool = AtomicBool::new(false);

/// Attach tracebacks to every problem response from now on.
pub fn enable_traceback() {
    TRACEBACK_ENABLED.store(true, Ordering::SeqCst);
}

/// Stop attaching tracebacks to problem responses.
pub fn disable_traceback() {
    TRACEBACK_ENABLED.store(false, Ordering::SeqCst);
}

#[must_use]
pub fn traceback_enabled() -> bool {
    TRACEBACK_ENABLED.load(Ordering::SeqCst)
}

/// Formatted diagnostic text for one error occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Traceback(String);

impl Traceback {
    /// Capture the current stack unconditionally.
    #[must_use]
    pub fn capture() -> Self {
        Self(Backtrace::force_capture().to_string())
    }

    /// Capture the current stack only when the policy is on.
    #[must_use]
    pub fn capture_if_enabled() -> Option<Self> {
        traceback_enabled().then(Self::capture)
    }

    /// Render an `anyhow` chain: message, causes and its own backtrace if one was captured.
    ///
    /// Falls back to the current stack when the error carries no backtrace.
    #[must_use]
    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        use std::backtrace::BacktraceStatus;

        let chain = format!("{error:?}");
        if error.backtrace().status() == BacktraceStatus::Captured {
            return Self(chain);
        }
        Self(format!(
            "{chain}\n\nStack backtrace:\n{}",
            Backtrace::force_capture()
        ))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Traceback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//! Raised values: everything a handler can fail with.
//!
//! [`ApiError`] tags each failure with its category at the point where it is
//! first observed, so classification is a plain `match`.

use std::fmt;

use crate::http_error::HttpException;
use crate::problem::{ProblemDetails, ValidationFailure};
use crate::traceback::Traceback;

/// Wraps exactly one [`ProblemDetails`] that must be answered as-is.
#[derive(Debug, Clone)]
pub struct ProblemDetailsError {
    problem: ProblemDetails,
    pub(crate) traceback: Option<Traceback>,
}

impl ProblemDetailsError {
    #[must_use]
    pub fn new(problem: ProblemDetails) -> Self {
        Self {
            problem,
            traceback: Traceback::capture_if_enabled(),
        }
    }

    pub(crate) fn with_traceback(problem: ProblemDetails, traceback: Option<Traceback>) -> Self {
        Self { problem, traceback }
    }

    #[must_use]
    pub fn problem(&self) -> &ProblemDetails {
        &self.problem
    }

    pub fn into_problem(self) -> ProblemDetails {
        self.problem
    }
}

impl From<ProblemDetails> for ProblemDetailsError {
    fn from(problem: ProblemDetails) -> Self {
        Self::new(problem)
    }
}

impl fmt::Display for ProblemDetailsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {}",
            self.problem.status.as_u16(),
            self.problem.title,
            self.problem.detail
        )
    }
}

/// Signal raised by the schema-validation layer: one record per failing field.
#[derive(Debug, Clone)]
pub struct ValidationFailed {
    failures: Vec<ValidationFailure>,
    pub(crate) traceback: Option<Traceback>,
}

impl ValidationFailed {
    #[must_use]
    pub fn new(failures: Vec<ValidationFailure>) -> Self {
        Self {
            failures,
            traceback: Traceback::capture_if_enabled(),
        }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.failures.len()
    }

    #[must_use]
    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    #[must_use]
    pub fn into_failures(self) -> Vec<ValidationFailure> {
        self.failures
    }
}

impl fmt::Display for ValidationFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  {}: {}", failure.field, failure.message)?;
        }
        Ok(())
    }
}

/// Any failure a handler can return.
///
/// `?` converts [`ProblemDetailsError`], [`ProblemDetails`], [`HttpException`],
/// [`ValidationFailed`] into their own variants, and every other error
/// (anything `Into<anyhow::Error>`) into [`ApiError::Other`].
#[derive(Debug)]
pub enum ApiError {
    /// Explicit problem; passes through classification unchanged.
    Problem(ProblemDetailsError),
    /// Schema-validation failure.
    Validation(ValidationFailed),
    /// Structured HTTP error carrying its own status.
    Http(HttpException),
    /// Anything else. Answered as 500.
    Other(anyhow::Error),
}

/// Result type for handlers answering failures with problem details.
pub type ApiResult<T = ()> = Result<T, ApiError>;

impl ApiError {
    /// Traceback text for this occurrence, capturing one now if none was recorded.
    #[must_use]
    pub fn traceback(&self) -> Traceback {
        let recorded = match self {
            Self::Problem(err) => err.traceback.clone(),
            Self::Validation(err) => err.traceback.clone(),
            Self::Http(err) => err.traceback.clone(),
            Self::Other(err) => Some(Traceback::from_anyhow(err)),
        };
        recorded.unwrap_or_else(Traceback::capture)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Problem(err) => err.fmt(f),
            Self::Validation(err) => err.fmt(f),
            Self::Http(err) => err.fmt(f),
            Self::Other(err) => err.fmt(f),
        }
    }
}

impl From<ProblemDetailsError> for ApiError {
    fn from(err: ProblemDetailsError) -> Self {
        Self::Problem(err)
    }
}

impl From<ProblemDetails> for ApiError {
    fn from(problem: ProblemDetails) -> Self {
        Self::Problem(ProblemDetailsError::new(problem))
    }
}

impl From<ValidationFailed> for ApiError {
    fn from(err: ValidationFailed) -> Self {
        Self::Validation(err)
    }
}

impl From<HttpException> for ApiError {
    fn from(err: HttpException) -> Self {
        Self::Http(err)
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Other(err.into())
    }
}

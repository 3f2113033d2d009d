//! RFC 7807 problem details for axum services.
//!
//! Every error raised while handling a request is classified into exactly one
//! [`ProblemDetails`] and answered as `application/problem+json` with the
//! matching status code:
//! - explicit problems ([`ProblemDetailsError`]) pass through unchanged,
//! - schema-validation failures ([`ValidationFailed`]) become `400 BadRequest`,
//! - structured HTTP errors ([`HttpException`]) keep their status and description,
//! - anything else becomes `500 InternalServerError`.
//!
//! [`configure`] installs this as the catch-all error handling of a router;
//! [`enable_traceback`] / [`disable_traceback`] control the process-wide
//! `traceback` member.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod classify;
pub mod configure;
pub mod error;
pub mod http_error;
pub mod problem;
pub mod response;
pub mod traceback;
#[cfg(feature = "validation")]
pub mod validation;

// Re-export commonly used types
pub use classify::{classify, from_exception, from_exception_with_extras};
pub use configure::{AppArgs, AppSource, ProblemOptions, configure, map_error_responses};
pub use error::{ApiError, ApiResult, ProblemDetailsError, ValidationFailed};
pub use http_error::HttpException;
pub use problem::{
    ABOUT_BLANK, APPLICATION_PROBLEM_JSON, Extras, ProblemDetails, ProblemError,
    ValidationFailure,
};
pub use response::render;
pub use traceback::{disable_traceback, enable_traceback, traceback_enabled};
#[cfg(feature = "validation")]
pub use validation::{ValidatedJson, ValidatedQuery, ValidationInterceptor, validate_value};

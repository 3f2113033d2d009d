//! Classification: turn a raised value into exactly one [`ProblemDetails`].
//!
//! Priority is strict: explicit problem, then validation failure, then
//! structured HTTP error, then everything else as a 500.

use http::StatusCode;

use crate::error::{ApiError, ProblemDetailsError};
use crate::http_error::kind_name;
use crate::problem::{Extras, ProblemDetails};
use crate::traceback::traceback_enabled;

/// Map a raised value to the problem describing it.
pub fn classify(error: &ApiError) -> ProblemDetails {
    match error {
        ApiError::Problem(err) => err.problem().clone(),
        ApiError::Validation(err) => ProblemDetails::new(
            StatusCode::BAD_REQUEST,
            kind_name(StatusCode::BAD_REQUEST),
            format!("Validation Failed! Error count: {}", err.count()),
        )
        .with_errors(err.failures().to_vec()),
        ApiError::Http(err) => {
            ProblemDetails::new(err.status(), err.kind_name(), err.description())
        }
        ApiError::Other(err) => ProblemDetails::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            kind_name(StatusCode::INTERNAL_SERVER_ERROR),
            err.to_string(),
        ),
    }
}

/// Classify any error into a raisable [`ProblemDetailsError`].
///
/// ```ignore
/// async fn books() -> ApiResult<Json<Vec<Book>>> {
///     let books = load_books().await.map_err(from_exception)?;
///     Ok(Json(books))
/// }
/// ```
pub fn from_exception(error: impl Into<ApiError>) -> ProblemDetailsError {
    from_exception_with_extras(error, Extras::new())
}

/// Like [`from_exception`], additionally merging `extras` into the problem.
pub fn from_exception_with_extras(
    error: impl Into<ApiError>,
    extras: Extras,
) -> ProblemDetailsError {
    let error = error.into();
    let problem = classify(&error).with_extras(extras);
    let traceback = traceback_enabled().then(|| error.traceback());
    ProblemDetailsError::with_traceback(problem, traceback)
}

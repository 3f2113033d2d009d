//! Rendering problems into `application/problem+json` responses.

use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde_json::Value;

use crate::classify::classify;
use crate::error::{ApiError, ProblemDetailsError, ValidationFailed};
use crate::http_error::{HttpException, kind_name};
use crate::problem::{APPLICATION_PROBLEM_JSON, ProblemDetails, status_code_from_u16};
use crate::traceback::{Traceback, traceback_enabled};

/// Render a problem into its status and JSON body.
///
/// `traceback`, when given, is added as a `traceback` string member. The input is not modified.
///
/// A status outside `[100, 599]` cannot be answered as a problem; such a problem is
/// replaced by a `500 InternalServerError` naming the offending code.
#[must_use]
pub fn render(problem: &ProblemDetails, traceback: Option<&str>) -> (StatusCode, Value) {
    if let Err(err) = status_code_from_u16(problem.status.as_u16()) {
        tracing::warn!(
            status = problem.status.as_u16(),
            title = %problem.title,
            "problem status out of range, answering 500 instead"
        );
        let fallback = ProblemDetails::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            kind_name(StatusCode::INTERNAL_SERVER_ERROR),
            err.to_string(),
        );
        return render(&fallback, traceback);
    }

    let mut body = match serde_json::to_value(problem) {
        Ok(Value::Object(map)) => map,
        // A problem always serializes to an object; keep the three required members regardless.
        _ => {
            let mut map = serde_json::Map::new();
            map.insert("status".to_owned(), problem.status.as_u16().into());
            map.insert("title".to_owned(), problem.title.clone().into());
            map.insert("detail".to_owned(), problem.detail.clone().into());
            map
        }
    };
    if let Some(text) = traceback {
        body.insert("traceback".to_owned(), Value::String(text.to_owned()));
    }
    (problem.status, Value::Object(body))
}

/// Build the HTTP response, consulting the traceback policy once.
///
/// `recorded` supplies the traceback for this occurrence; it is only evaluated when the policy is on.
pub(crate) fn respond(problem: &ProblemDetails, recorded: impl FnOnce() -> Traceback) -> Response {
    let traceback = traceback_enabled().then(recorded);
    let (status, body) = render(problem, traceback.as_ref().map(Traceback::as_str));

    if status.is_server_error() {
        tracing::error!(
            status = status.as_u16(),
            title = %problem.title,
            detail = %problem.detail,
            "request failed"
        );
    } else {
        tracing::debug!(
            status = status.as_u16(),
            title = %problem.title,
            "request rejected"
        );
    }

    let mut resp = axum::Json(body).into_response();
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
    );
    resp
}

/// Check if a response is already a Problem+JSON response
pub(crate) fn is_problem_response(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains(APPLICATION_PROBLEM_JSON))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let problem = classify(&self);
        respond(&problem, || self.traceback())
    }
}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> Response {
        respond(&self, Traceback::capture)
    }
}

impl IntoResponse for ProblemDetailsError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

impl IntoResponse for HttpException {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

impl IntoResponse for ValidationFailed {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

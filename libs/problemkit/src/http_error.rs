//! Structured HTTP errors: a status code, a kind name and a description.
//!
//! These play the part of the framework's built-in HTTP exceptions. Axum's
//! extractor rejections convert into them so their status and text survive
//! classification.

use std::fmt;

use axum::extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection};
use http::StatusCode;

use crate::traceback::Traceback;

/// An HTTP error that already knows the status it should be answered with.
#[derive(Debug, Clone)]
#[must_use]
pub struct HttpException {
    status: StatusCode,
    description: Option<String>,
    pub(crate) traceback: Option<Traceback>,
}

impl HttpException {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            description: None,
            traceback: Traceback::capture_if_enabled(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// PascalCase name of the status, e.g. `BadRequest` or `NotImplemented`.
    #[must_use]
    pub fn kind_name(&self) -> String {
        kind_name(self.status)
    }

    /// The explicit description, or the default text for the status.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description
            .as_deref()
            .unwrap_or_else(|| default_description(self.status))
    }
}

impl fmt::Display for HttpException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {}",
            self.status.as_u16(),
            self.kind_name(),
            self.description()
        )
    }
}

impl From<StatusCode> for HttpException {
    fn from(status: StatusCode) -> Self {
        Self::new(status)
    }
}

macro_rules! impl_from_rejection {
    ($($rejection:ty),+ $(,)?) => {
        $(
            impl From<$rejection> for HttpException {
                fn from(rejection: $rejection) -> Self {
                    Self::new(rejection.status()).with_description(rejection.body_text())
                }
            }
        )+
    };
}

impl_from_rejection!(JsonRejection, QueryRejection, PathRejection, FormRejection);

/// Turn the canonical reason phrase into a PascalCase identifier.
///
/// `418 I'm a teapot` becomes `ImATeapot`. Codes without a reason phrase map to `HTTPException`.
#[must_use]
pub fn kind_name(status: StatusCode) -> String {
    let Some(reason) = status.canonical_reason() else {
        return "HTTPException".to_owned();
    };

    reason
        .split([' ', '-'])
        .map(|word| {
            let mut chars = word.chars().filter(char::is_ascii_alphanumeric);
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + &chars.collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

fn default_description(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => {
            "The browser (or proxy) sent a request that this server could not understand."
        }
        StatusCode::UNAUTHORIZED => {
            "The server could not verify that you are authorized to access the URL requested."
        }
        StatusCode::FORBIDDEN => {
            "You don't have the permission to access the requested resource."
        }
        StatusCode::NOT_FOUND => {
            "The requested URL was not found on the server. If you entered the URL manually please check your spelling and try again."
        }
        StatusCode::METHOD_NOT_ALLOWED => "The method is not allowed for the requested URL.",
        StatusCode::CONFLICT => {
            "A conflict happened while processing the request. The resource might have been modified while the request was being processed."
        }
        StatusCode::UNPROCESSABLE_ENTITY => {
            "The request was well-formed but was unable to be followed due to semantic errors."
        }
        StatusCode::INTERNAL_SERVER_ERROR => {
            "The server encountered an internal error and was unable to complete your request."
        }
        StatusCode::NOT_IMPLEMENTED => {
            "The server does not support the action requested by the browser."
        }
        other => other.canonical_reason().unwrap_or("Unknown error"),
    }
}

pub fn bad_request(description: impl Into<String>) -> HttpException {
    HttpException::new(StatusCode::BAD_REQUEST).with_description(description)
}

pub fn unauthorized(description: impl Into<String>) -> HttpException {
    HttpException::new(StatusCode::UNAUTHORIZED).with_description(description)
}

pub fn forbidden(description: impl Into<String>) -> HttpException {
    HttpException::new(StatusCode::FORBIDDEN).with_description(description)
}

pub fn not_found(description: impl Into<String>) -> HttpException {
    HttpException::new(StatusCode::NOT_FOUND).with_description(description)
}

pub fn method_not_allowed() -> HttpException {
    HttpException::new(StatusCode::METHOD_NOT_ALLOWED)
}

pub fn conflict(description: impl Into<String>) -> HttpException {
    HttpException::new(StatusCode::CONFLICT).with_description(description)
}

pub fn unprocessable_entity(description: impl Into<String>) -> HttpException {
    HttpException::new(StatusCode::UNPROCESSABLE_ENTITY).with_description(description)
}

pub fn internal_server_error() -> HttpException {
    HttpException::new(StatusCode::INTERNAL_SERVER_ERROR)
}

pub fn not_implemented() -> HttpException {
    HttpException::new(StatusCode::NOT_IMPLEMENTED)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn kind_names_follow_reason_phrases() {
        assert_eq!(kind_name(StatusCode::BAD_REQUEST), "BadRequest");
        assert_eq!(kind_name(StatusCode::NOT_IMPLEMENTED), "NotImplemented");
        assert_eq!(kind_name(StatusCode::INTERNAL_SERVER_ERROR), "InternalServerError");
        assert_eq!(kind_name(StatusCode::IM_A_TEAPOT), "ImATeapot");
        assert_eq!(
            kind_name(StatusCode::NON_AUTHORITATIVE_INFORMATION),
            "NonAuthoritativeInformation"
        );
        assert_eq!(
            kind_name(StatusCode::from_u16(599).unwrap()),
            "HTTPException"
        );
    }

    #[test]
    fn description_prefers_explicit_text() {
        let err = bad_request("This is a bad request");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.description(), "This is a bad request");
        assert_eq!(err.to_string(), "400 BadRequest: This is a bad request");
    }

    #[test]
    fn default_description_is_used_without_text() {
        let err = not_implemented();
        assert_eq!(err.kind_name(), "NotImplemented");
        assert_eq!(
            err.description(),
            "The server does not support the action requested by the browser."
        );

        let teapot = HttpException::from(StatusCode::IM_A_TEAPOT);
        assert_eq!(teapot.description(), "I'm a teapot");
    }
}

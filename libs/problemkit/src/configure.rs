//! Installing problem details as the catch-all error handling of an axum app.
//!
//! [`configure`] wires, from the inside out:
//! - a fallback answering unknown routes with a `NotFound` problem,
//! - [`map_error_responses`], rewriting every other error response the
//!   framework produced on its own (rejections, 405s, bare status codes),
//! - the validation interceptor for the schema-aware extractors,
//! - a panic catcher answering with a 500 problem.
//!
//! Errors returned by handlers as [`ApiError`] are problems already and pass
//! through untouched.

use std::any::Any;
use std::fmt;

use axum::Router;
use axum::body::Body;
use axum::extract::Request;
use axum::http::header;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::CatchPanicLayer;

use crate::error::ApiError;
use crate::http_error::HttpException;
use crate::response::is_problem_response;
use crate::traceback::enable_traceback;

/// Upper bound on the error body read back by [`map_error_responses`].
const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

/// Options recognised by [`configure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProblemOptions {
    /// Turn the process-wide traceback policy on while configuring.
    pub with_traceback: bool,
    /// Answer unknown routes with a `NotFound` problem.
    pub install_fallback: bool,
}

impl Default for ProblemOptions {
    fn default() -> Self {
        Self {
            with_traceback: false,
            install_fallback: true,
        }
    }
}

impl ProblemOptions {
    #[must_use]
    pub fn with_traceback(mut self, enabled: bool) -> Self {
        self.with_traceback = enabled;
        self
    }

    #[must_use]
    pub fn install_fallback(mut self, enabled: bool) -> Self {
        self.install_fallback = enabled;
        self
    }
}

/// What a one-argument builder receives.
#[derive(Debug, Clone)]
pub struct AppArgs {
    pub options: ProblemOptions,
}

type BuildFn<S> = Box<dyn FnOnce(AppArgs) -> Router<S> + Send>;

/// Either a ready router or a function that builds one.
pub enum AppSource<S = ()> {
    Instance(Router<S>),
    Builder(BuildFn<S>),
}

impl<S> AppSource<S> {
    /// Build the router during configuration, with access to the options in effect.
    pub fn builder<F>(build: F) -> Self
    where
        F: FnOnce(AppArgs) -> Router<S> + Send + 'static,
    {
        Self::Builder(Box::new(build))
    }

    /// Build the router during configuration from a zero-argument function.
    pub fn deferred<F>(build: F) -> Self
    where
        F: FnOnce() -> Router<S> + Send + 'static,
    {
        Self::Builder(Box::new(move |_| build()))
    }

    fn resolve(self, args: AppArgs) -> Router<S> {
        match self {
            Self::Instance(router) => router,
            Self::Builder(build) => build(args),
        }
    }
}

impl<S> From<Router<S>> for AppSource<S> {
    fn from(router: Router<S>) -> Self {
        Self::Instance(router)
    }
}

impl<S> fmt::Debug for AppSource<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(_) => f.write_str("AppSource::Instance"),
            Self::Builder(_) => f.write_str("AppSource::Builder"),
        }
    }
}

/// Make problem details the error handling of `app` and return the router.
///
/// The builder, if any, runs exactly once. Layers wrap the routes present once
/// the builder has run, so register routes inside the builder (or before
/// passing an instance).
///
/// Routes added to the returned router afterwards still get [`ApiError`]
/// conversion and the fallback, but neither [`map_error_responses`] nor the
/// panic catcher: their bare status codes and rejections keep axum's plain
/// responses, and a panic in them is not turned into a 500 problem.
pub fn configure<S>(app: impl Into<AppSource<S>>, options: ProblemOptions) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    if options.with_traceback {
        enable_traceback();
    }

    let install_fallback = options.install_fallback;
    let with_traceback = options.with_traceback;
    let mut router = app.into().resolve(AppArgs { options });

    if install_fallback {
        router = router.fallback(not_found);
    }
    router = router.layer(middleware::from_fn(map_error_responses));

    #[cfg(feature = "validation")]
    {
        router = router.layer(axum::Extension(
            crate::validation::ValidationInterceptor::problem_details(),
        ));
    }

    tracing::info!(
        with_traceback,
        install_fallback,
        validation = cfg!(feature = "validation"),
        "problem details error handling installed"
    );

    router.layer(CatchPanicLayer::custom(panic_response))
}

async fn not_found() -> ApiError {
    HttpException::new(StatusCode::NOT_FOUND).into()
}

/// Middleware rewriting error responses that are not problems yet.
///
/// Status is kept, the title becomes the status kind name and the original
/// body text (or the default description) becomes the detail.
pub async fn map_error_responses(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) || is_problem_response(&response) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let text = match axum::body::to_bytes(body, MAX_ERROR_BODY_BYTES).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).trim().to_owned(),
        Err(err) => {
            tracing::warn!(error = %err, "failed to read error response body");
            String::new()
        }
    };

    let exception = if text.is_empty() {
        HttpException::new(status)
    } else {
        HttpException::new(status).with_description(text)
    };

    let mut mapped = ApiError::from(exception).into_response();
    if let Some(allow) = parts.headers.get(header::ALLOW) {
        mapped.headers_mut().insert(header::ALLOW, allow.clone());
    }
    mapped
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let message = if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_owned()
    } else {
        "handler panicked".to_owned()
    };
    ApiError::Other(anyhow::Error::msg(message)).into_response()
}

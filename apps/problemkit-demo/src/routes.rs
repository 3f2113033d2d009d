//! Demo handlers, one per way of failing.

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use problemkit::http_error::not_implemented;
use problemkit::{
    ApiResult, AppArgs, AppSource, Extras, ProblemDetails, ProblemOptions, ValidatedQuery,
    configure, from_exception_with_extras,
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchQuery {
    pub id: i64,
}

async fn authors() -> ApiResult<&'static str> {
    Err(not_implemented().into())
}

async fn books() -> ApiResult<&'static str> {
    let mut extras = Extras::new();
    extras.insert("one".to_owned(), json!("extra value"));
    Err(from_exception_with_extras(anyhow::anyhow!("The method is not implemented"), extras).into())
}

async fn shelter() -> ApiResult<&'static str> {
    Err(ProblemDetails::new(StatusCode::PRECONDITION_FAILED, "No shelter", "")
        .with_type("uri:localhost:noshelter")
        .into())
}

async fn search(ValidatedQuery(query): ValidatedQuery<SearchQuery>) -> String {
    format!("found {}", query.id)
}

async fn panics() -> &'static str {
    panic!("the demo handler gave up")
}

fn routes(args: AppArgs) -> Router {
    tracing::debug!(
        with_traceback = args.options.with_traceback,
        "registering demo routes"
    );
    Router::new()
        .route("/authors", get(authors))
        .route("/books", get(books))
        .route("/shelter", get(shelter))
        .route("/search", get(search))
        .route("/panic", get(panics))
}

/// The demo router with problem details installed.
pub fn app(options: ProblemOptions) -> Router {
    configure(AppSource::builder(routes), options)
}

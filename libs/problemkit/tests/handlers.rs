#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end behaviour of a configured router with the traceback policy off.
//!
//! Nothing in this binary enables the traceback policy, so bodies are compared exactly.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use problemkit::http_error::{bad_request, not_implemented};
use problemkit::{
    APPLICATION_PROBLEM_JSON, ApiResult, AppSource, Extras, ProblemDetails, ProblemOptions,
    configure, from_exception, from_exception_with_extras,
};
use serde_json::{Value, json};

use common::{get as fetch, send};

fn configured(router: Router) -> Router {
    configure(router, ProblemOptions::default())
}

#[tokio::test]
async fn http_exception_without_traceback() {
    async fn handler() -> ApiResult<&'static str> {
        Err(bad_request("This is a bad request").into())
    }
    let app = configured(Router::new().route("/problem", get(handler)));

    let answer = fetch(app, "/problem").await;
    assert_eq!(answer.status, StatusCode::BAD_REQUEST);
    assert_eq!(answer.content_type, APPLICATION_PROBLEM_JSON);
    assert_eq!(
        answer.body,
        json!({"status": 400, "title": "BadRequest", "detail": "This is a bad request"})
    );
}

#[tokio::test]
async fn generic_error_without_traceback() {
    async fn handler() -> ApiResult<&'static str> {
        Err(anyhow::anyhow!("The method is not implemented").into())
    }
    let app = configured(Router::new().route("/problem", get(handler)));

    let answer = fetch(app, "/problem").await;
    assert_eq!(answer.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        answer.body,
        json!({"status": 500, "title": "InternalServerError", "detail": "The method is not implemented"})
    );
}

#[tokio::test]
async fn question_mark_on_std_error_is_generic() {
    async fn handler() -> ApiResult<String> {
        let port: u16 = "eighty".parse()?;
        Ok(port.to_string())
    }
    let app = configured(Router::new().route("/problem", get(handler)));

    let answer = fetch(app, "/problem").await;
    assert_eq!(answer.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(answer.body["title"], "InternalServerError");
    assert_eq!(answer.body["detail"], "invalid digit found in string");
}

#[tokio::test]
async fn problem_details_error_without_extras_without_traceback() {
    async fn handler() -> ApiResult<&'static str> {
        Err(from_exception(anyhow::anyhow!("The method is not implemented")).into())
    }
    let app = configured(Router::new().route("/problem", get(handler)));

    let answer = fetch(app, "/problem").await;
    assert_eq!(answer.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        answer.body,
        json!({"status": 500, "title": "InternalServerError", "detail": "The method is not implemented"})
    );
}

#[tokio::test]
async fn problem_details_error_with_extras_without_traceback() {
    async fn handler() -> ApiResult<&'static str> {
        let mut extras = Extras::new();
        extras.insert("custom_field".to_owned(), json!("custom_value"));
        Err(from_exception_with_extras(anyhow::anyhow!("The method is not implemented"), extras).into())
    }
    let app = configured(Router::new().route("/problem", get(handler)));

    let answer = fetch(app, "/problem").await;
    assert_eq!(answer.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        answer.body,
        json!({
            "status": 500,
            "title": "InternalServerError",
            "detail": "The method is not implemented",
            "custom_field": "custom_value"
        })
    );
}

#[tokio::test]
async fn from_exception_keeps_http_classification() {
    async fn handler() -> ApiResult<&'static str> {
        let mut extras = Extras::new();
        extras.insert("k".to_owned(), json!("v"));
        Err(from_exception_with_extras(bad_request("This is a bad request"), extras).into())
    }
    let app = configured(Router::new().route("/problem", get(handler)));

    let answer = fetch(app, "/problem").await;
    assert_eq!(answer.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        answer.body,
        json!({"status": 400, "title": "BadRequest", "detail": "This is a bad request", "k": "v"})
    );
}

#[tokio::test]
async fn explicit_problem_passes_through() {
    async fn handler() -> ApiResult<&'static str> {
        Err(ProblemDetails::new(StatusCode::PRECONDITION_FAILED, "No shelter", "")
            .with_type("uri:localhost:noshelter")
            .into())
    }
    let app = configured(Router::new().route("/problem", get(handler)));

    let answer = fetch(app, "/problem").await;
    assert_eq!(answer.status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(answer.body["status"], 412);
    assert_eq!(answer.body["title"], "No shelter");
    assert_eq!(answer.body["type"], "uri:localhost:noshelter");
    assert_eq!(answer.body["detail"], "");
}

#[tokio::test]
async fn body_round_trips_into_problem_details() {
    async fn handler() -> ApiResult<&'static str> {
        Err(ProblemDetails::new(StatusCode::CONFLICT, "Conflict", "taken")
            .with_extra("shelter", json!({"id": 7, "tags": ["dry"]}))
            .into())
    }
    let app = configured(Router::new().route("/problem", get(handler)));

    let answer = fetch(app, "/problem").await;
    let parsed: ProblemDetails = serde_json::from_value(answer.body.clone()).unwrap();
    assert_eq!(parsed.status, StatusCode::CONFLICT);
    assert_eq!(serde_json::to_value(&parsed).unwrap(), answer.body);
}

#[tokio::test]
async fn unknown_route_is_not_found_problem() {
    let app = configured(Router::new().route("/authors", get(|| async { "ok" })));

    let answer = fetch(app, "/nowhere").await;
    assert_eq!(answer.status, StatusCode::NOT_FOUND);
    assert_eq!(answer.content_type, APPLICATION_PROBLEM_JSON);
    assert_eq!(answer.body["title"], "NotFound");
    assert_eq!(answer.body["status"], 404);
}

#[tokio::test]
async fn wrong_method_is_mapped_to_problem() {
    let app = configured(Router::new().route("/authors", get(|| async { "ok" })));

    let request = Request::delete("/authors").body(Body::empty()).unwrap();
    let answer = send(app, request).await;
    assert_eq!(answer.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(answer.body["title"], "MethodNotAllowed");
    assert_eq!(
        answer.body["detail"],
        "The method is not allowed for the requested URL."
    );
}

#[tokio::test]
async fn framework_rejection_is_mapped_to_problem() {
    async fn create(Json(payload): Json<Value>) -> Json<Value> {
        Json(payload)
    }
    let app = configured(Router::new().route("/authors", post(create)));

    let request = Request::post("/authors")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let answer = send(app, request).await;
    assert_eq!(answer.status, StatusCode::BAD_REQUEST);
    assert_eq!(answer.content_type, APPLICATION_PROBLEM_JSON);
    assert_eq!(answer.body["title"], "BadRequest");
    assert!(!answer.body["detail"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn bare_status_code_is_mapped_to_problem() {
    let app = configured(Router::new().route(
        "/authors",
        get(|| async { StatusCode::NOT_IMPLEMENTED }),
    ));

    let answer = fetch(app, "/authors").await;
    assert_eq!(answer.status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(
        answer.body,
        json!({
            "status": 501,
            "title": "NotImplemented",
            "detail": "The server does not support the action requested by the browser."
        })
    );
}

#[tokio::test]
async fn successful_responses_are_untouched() {
    let app = configured(Router::new().route("/authors", get(|| async { Json(json!(["Le Guin"])) })));

    let answer = fetch(app, "/authors").await;
    assert_eq!(answer.status, StatusCode::OK);
    assert_eq!(answer.body, json!(["Le Guin"]));
}

#[tokio::test]
async fn panic_becomes_internal_server_error() {
    async fn handler() -> &'static str {
        panic!("shelter collapsed")
    }
    let app = configured(Router::new().route("/panic", get(handler)));

    let answer = fetch(app, "/panic").await;
    assert_eq!(answer.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(answer.content_type, APPLICATION_PROBLEM_JSON);
    assert_eq!(
        answer.body,
        json!({"status": 500, "title": "InternalServerError", "detail": "shelter collapsed"})
    );
}

async fn authors() -> ApiResult<&'static str> {
    Err(not_implemented().into())
}

#[tokio::test]
async fn builder_runs_exactly_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let app = configure(
        AppSource::builder(move |args| {
            counter.fetch_add(1, Ordering::SeqCst);
            assert!(!args.options.with_traceback);
            Router::new().route("/authors", get(authors))
        }),
        ProblemOptions::default(),
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let answer = fetch(app, "/authors").await;
    assert_eq!(answer.status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(answer.body["title"], "NotImplemented");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn deferred_builder_is_supported() {
    let app = configure(
        AppSource::deferred(|| Router::new().route("/ok", get(|| async { "fine" }))),
        ProblemOptions::default(),
    );

    let answer = fetch(app, "/missing").await;
    assert_eq!(answer.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn fallback_can_be_left_to_the_app() {
    let app = configure(
        Router::new().fallback(|| async { (StatusCode::IM_A_TEAPOT, "short and stout") }),
        ProblemOptions::default().install_fallback(false),
    );

    let answer = fetch(app, "/anything").await;
    assert_eq!(answer.status, StatusCode::IM_A_TEAPOT);
    assert_eq!(answer.body["title"], "ImATeapot");
    assert_eq!(answer.body["detail"], "short and stout");
}

#[tokio::test]
async fn out_of_range_status_answers_internal_server_error() {
    async fn handler() -> ApiResult<&'static str> {
        let weird = StatusCode::from_u16(700).unwrap();
        Err(ProblemDetails::new(weird, "Weird", "x").into())
    }
    let app = configured(Router::new().route("/weird", get(handler)));

    let answer = fetch(app, "/weird").await;
    assert_eq!(answer.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(answer.content_type, APPLICATION_PROBLEM_JSON);
    assert_eq!(answer.body["status"], 500);
    assert_eq!(answer.body["title"], "InternalServerError");

    let parsed: ProblemDetails = serde_json::from_value(answer.body).unwrap();
    assert_eq!(parsed.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn routes_added_after_configure_only_keep_api_error_rendering() {
    async fn late() -> ApiResult<&'static str> {
        Err(bad_request("too late").into())
    }
    let app = configured(Router::new())
        .route("/late", get(late))
        .route("/late-status", post(|| async { StatusCode::CONFLICT }));

    let answer = fetch(app.clone(), "/late").await;
    assert_eq!(answer.status, StatusCode::BAD_REQUEST);
    assert_eq!(answer.content_type, APPLICATION_PROBLEM_JSON);
    assert_eq!(answer.body["detail"], "too late");

    let request = Request::post("/late-status").body(Body::empty()).unwrap();
    let answer = send(app, request).await;
    assert_eq!(answer.status, StatusCode::CONFLICT);
    assert_ne!(answer.content_type, APPLICATION_PROBLEM_JSON);
    assert_eq!(answer.body, Value::Null);
}

//! Schema-driven request validation.
//!
//! The JSON Schema of the target type is generated with `schemars`, compiled
//! once per type and checked with `jsonschema`. Every failing field becomes one
//! [`ValidationFailure`], so a single request can report several of them.
//!
//! The extractors answer failures through the [`ValidationInterceptor`] found in
//! the request extensions (installed by [`configure`](crate::configure())). Without
//! one they fall back to a plain `422` with `{"detail": [...]}`.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::Extensions;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use http::StatusCode;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::error::{ApiError, ValidationFailed};
use crate::problem::ValidationFailure;

static SCHEMAS: LazyLock<DashMap<TypeId, Arc<CompiledSchema>>> = LazyLock::new(DashMap::new);

#[derive(thiserror::Error, Debug)]
pub enum SchemaError {
    #[error("failed to serialize schema for {type_name}: {source}")]
    Serialize {
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid schema for {type_name}: {message}")]
    Compile {
        type_name: &'static str,
        message: String,
    },
}

/// Decides how a validation failure is answered.
#[derive(Clone)]
pub struct ValidationInterceptor {
    handler: Arc<dyn Fn(ValidationFailed) -> Response + Send + Sync>,
}

impl ValidationInterceptor {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(ValidationFailed) -> Response + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Answer through the validation branch of the classifier: a 400 problem.
    #[must_use]
    pub fn problem_details() -> Self {
        Self::new(|failed| ApiError::from(failed).into_response())
    }

    #[must_use]
    pub fn intercept(&self, failed: ValidationFailed) -> Response {
        (self.handler)(failed)
    }
}

impl fmt::Debug for ValidationInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationInterceptor").finish_non_exhaustive()
    }
}

fn reject(extensions: &Extensions, failed: ValidationFailed) -> Response {
    match extensions.get::<ValidationInterceptor>() {
        Some(interceptor) => interceptor.intercept(failed),
        None => (
            StatusCode::UNPROCESSABLE_ENTITY,
            axum::Json(json!({ "detail": failed.failures() })),
        )
            .into_response(),
    }
}

struct CompiledSchema {
    validator: jsonschema::Validator,
    /// Top-level required properties, checked before the validator runs.
    required: Vec<String>,
    /// Allowed JSON types per top-level property.
    property_types: HashMap<String, Vec<String>>,
    /// Allowed JSON types of array items per top-level property.
    item_types: HashMap<String, Vec<String>>,
    /// Top-level properties in declaration order.
    field_order: Vec<String>,
}

fn json_types(schema: &Value) -> Vec<String> {
    match schema.get("type") {
        Some(Value::String(ty)) => vec![ty.clone()],
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .map(ToOwned::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

impl CompiledSchema {
    fn for_type<T: JsonSchema>() -> Result<Self, SchemaError> {
        let type_name = std::any::type_name::<T>();
        let root = schemars::schema_for!(T);
        let mut schema = serde_json::to_value(&root)
            .map_err(|source| SchemaError::Serialize { type_name, source })?;

        // Missing properties are reported by name, so the root `required` list is
        // checked here instead of by the validator.
        let required: Vec<String> = schema
            .as_object_mut()
            .and_then(|object| object.remove("required"))
            .and_then(|value| match value {
                Value::Array(names) => Some(
                    names
                        .into_iter()
                        .filter_map(|name| name.as_str().map(ToOwned::to_owned))
                        .collect(),
                ),
                _ => None,
            })
            .unwrap_or_default();

        let mut property_types = HashMap::new();
        let mut item_types = HashMap::new();
        let mut field_order = Vec::new();
        if let Some(Value::Object(properties)) = schema.get("properties") {
            for (name, property) in properties {
                field_order.push(name.clone());
                property_types.insert(name.clone(), json_types(property));
                if let Some(items) = property.get("items") {
                    item_types.insert(name.clone(), json_types(items));
                }
            }
        }

        let validator = jsonschema::validator_for(&schema).map_err(|err| SchemaError::Compile {
            type_name,
            message: err.to_string(),
        })?;

        Ok(Self {
            validator,
            required,
            property_types,
            item_types,
            field_order,
        })
    }

    fn failures(&self, instance: &Value) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();
        if let Value::Object(object) = instance {
            failures.extend(
                self.required
                    .iter()
                    .filter(|name| !object.contains_key(name.as_str()))
                    .map(|name| {
                        ValidationFailure::new(name.clone(), "Field required").with_code("missing")
                    }),
            );
        }
        failures.extend(self.validator.iter_errors(instance).map(|error| {
            let field = pointer_to_field(&error.instance_path().to_string());
            ValidationFailure::new(field, error.to_string()).with_code("invalid")
        }));
        // Report in field declaration order; failures of one field keep their relative order.
        failures.sort_by_key(|failure| self.position_of(&failure.field));
        failures
    }

    /// Declaration index of the top-level property a failure belongs to.
    /// Failures outside any declared property sort last.
    fn position_of(&self, field: &str) -> usize {
        let top = field.split('.').next().unwrap_or_default();
        self.field_order
            .iter()
            .position(|name| name == top)
            .unwrap_or(usize::MAX)
    }

    fn validate<T: DeserializeOwned>(&self, instance: Value) -> Result<T, ValidationFailed> {
        let failures = self.failures(&instance);
        if !failures.is_empty() {
            return Err(ValidationFailed::new(failures));
        }
        serde_json::from_value(instance).map_err(|err| {
            ValidationFailed::new(vec![
                ValidationFailure::new(String::new(), err.to_string()).with_code("parse"),
            ])
        })
    }

    fn types_of(&self, property: &str) -> &[String] {
        self.property_types.get(property).map(Vec::as_slice).unwrap_or_default()
    }

    fn item_types_of(&self, property: &str) -> &[String] {
        self.item_types.get(property).map(Vec::as_slice).unwrap_or_default()
    }
}

fn compiled<T: JsonSchema + 'static>() -> Result<Arc<CompiledSchema>, SchemaError> {
    let key = TypeId::of::<T>();
    if let Some(found) = SCHEMAS.get(&key) {
        return Ok(Arc::clone(found.value()));
    }
    let schema = Arc::new(CompiledSchema::for_type::<T>()?);
    SCHEMAS.insert(key, Arc::clone(&schema));
    tracing::debug!(schema = std::any::type_name::<T>(), "compiled request schema");
    Ok(schema)
}

/// `/items/0/name` becomes `items.0.name`; the document root is an empty field.
fn pointer_to_field(pointer: &str) -> String {
    pointer
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect::<Vec<_>>()
        .join(".")
}

/// Query values arrive as text; convert them to the first schema type they parse as.
fn coerce_scalar(raw: &str, types: &[String]) -> Value {
    for ty in types {
        match ty.as_str() {
            "integer" => {
                if let Ok(number) = raw.parse::<i64>() {
                    return Value::from(number);
                }
            }
            "number" => {
                if let Some(number) = raw
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                {
                    return Value::Number(number);
                }
            }
            "boolean" => match raw {
                "true" => return Value::Bool(true),
                "false" => return Value::Bool(false),
                _ => {}
            },
            _ => {}
        }
    }
    Value::String(raw.to_owned())
}

fn query_to_value(query: &str, schema: &CompiledSchema) -> Result<Value, ValidationFailed> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).map_err(|err| {
        ValidationFailed::new(vec![
            ValidationFailure::new(String::new(), err.to_string()).with_code("query_invalid"),
        ])
    })?;

    let mut object = Map::new();
    for (key, raw) in pairs {
        if schema.types_of(&key).iter().any(|ty| ty == "array") {
            let item = coerce_scalar(&raw, schema.item_types_of(&key));
            if let Value::Array(items) = object
                .entry(key)
                .or_insert_with(|| Value::Array(Vec::new()))
            {
                items.push(item);
            }
        } else {
            let value = coerce_scalar(&raw, schema.types_of(&key));
            object.insert(key, value);
        }
    }
    Ok(Value::Object(object))
}

/// Validate a JSON value against the schema of `T`, then deserialize it.
///
/// # Errors
/// [`ApiError::Validation`] listing every failing field, or [`ApiError::Other`]
/// if the schema of `T` cannot be compiled.
pub fn validate_value<T>(instance: Value) -> Result<T, ApiError>
where
    T: DeserializeOwned + JsonSchema + 'static,
{
    let schema = compiled::<T>()?;
    Ok(schema.validate(instance)?)
}

/// Query string extractor validated against the schema of `T`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + JsonSchema + Send + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let schema = compiled::<T>().map_err(|err| ApiError::from(err).into_response())?;
        let query = parts.uri.query().unwrap_or_default();
        query_to_value(query, &schema)
            .and_then(|instance| schema.validate(instance))
            .map(Self)
            .map_err(|failed| reject(&parts.extensions, failed))
    }
}

/// JSON body extractor validated against the schema of `T`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + JsonSchema + Send + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let schema = compiled::<T>().map_err(|err| ApiError::from(err).into_response())?;
        let extensions = req.extensions().clone();
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let instance: Value = serde_json::from_slice(&bytes).map_err(|err| {
            let failure =
                ValidationFailure::new(String::new(), err.to_string()).with_code("json_invalid");
            reject(&extensions, ValidationFailed::new(vec![failure]))
        })?;

        schema
            .validate(instance)
            .map(Self)
            .map_err(|failed| reject(&extensions, failed))
    }
}

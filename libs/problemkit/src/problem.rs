//! RFC 7807 Problem Details for HTTP APIs (pure data model, no HTTP framework dependencies)

use http::StatusCode;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Content type for Problem Details as per RFC 7807.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// Problem type used when the author did not supply one.
pub const ABOUT_BLANK: &str = "about:blank";

/// Body keys owned by the problem itself. Extras never overwrite them.
pub const RESERVED_KEYS: [&str; 7] = [
    "status",
    "title",
    "detail",
    "type",
    "instance",
    "traceback",
    "errors",
];

/// Author-supplied extension members, rendered as top-level siblings.
pub type Extras = serde_json::Map<String, serde_json::Value>;

/// Errors produced while building problem values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProblemError {
    #[error("status code {0} is outside of the 100..=599 range")]
    StatusOutOfRange(u16),
}

/// Convert a raw status into a `StatusCode` usable by a problem.
///
/// # Errors
/// Returns [`ProblemError::StatusOutOfRange`] for codes outside `[100, 599]`.
pub fn status_code_from_u16(code: u16) -> Result<StatusCode, ProblemError> {
    if !(100..=599).contains(&code) {
        return Err(ProblemError::StatusOutOfRange(code));
    }
    StatusCode::from_u16(code).map_err(|_| ProblemError::StatusOutOfRange(code))
}

/// Whether `key` names a member owned by the problem itself (see [`RESERVED_KEYS`]).
#[must_use]
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// RFC 7807 Problem Details for HTTP APIs.
///
/// One value describes one error occurrence. It is built fresh by the
/// classifier (or directly by application code), rendered once and dropped.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct ProblemDetails {
    /// The HTTP status code for this occurrence of the problem.
    /// Serializes as u16.
    pub status: StatusCode,
    /// A short, human-readable summary of the problem type.
    pub title: String,
    /// A human-readable explanation specific to this occurrence of the problem.
    pub detail: String,
    /// A URI reference that identifies the problem type.
    /// Only rendered when it differs from [`ABOUT_BLANK`].
    pub type_url: String,
    /// A URI reference that identifies the specific occurrence of the problem.
    pub instance: Option<String>,
    /// Per-field validation failures, in the order the validator reported them.
    pub errors: Option<Vec<ValidationFailure>>,
    /// Extension members merged into the body as top-level fields.
    pub extras: Extras,
}

/// Individual validation failure for a specific field or property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// field path, e.g. "email" or "user.email"
    pub field: String,
    /// Human-readable message describing the validation error
    pub message: String,
    /// Optional machine-readable error code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ValidationFailure {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl ProblemDetails {
    /// Create a new problem with the given status, title, and detail.
    ///
    /// The type defaults to [`ABOUT_BLANK`], which is left out of the body.
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status,
            title: title.into(),
            detail: detail.into(),
            type_url: ABOUT_BLANK.to_owned(),
            instance: None,
            errors: None,
            extras: Extras::new(),
        }
    }

    /// Like [`ProblemDetails::new`], from a raw status code.
    ///
    /// # Errors
    /// Returns [`ProblemError::StatusOutOfRange`] for codes outside `[100, 599]`.
    pub fn try_new(
        status: u16,
        title: impl Into<String>,
        detail: impl Into<String>,
    ) -> Result<Self, ProblemError> {
        Ok(Self::new(status_code_from_u16(status)?, title, detail))
    }

    pub fn with_type(mut self, type_url: impl Into<String>) -> Self {
        self.type_url = type_url.into();
        self
    }

    pub fn with_instance(mut self, uri: impl Into<String>) -> Self {
        self.instance = Some(uri.into());
        self
    }

    pub fn with_errors(mut self, errors: Vec<ValidationFailure>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    /// Merge `extras` into the existing extension members; later keys win.
    pub fn with_extras(mut self, extras: Extras) -> Self {
        self.extras.extend(extras);
        self
    }

    #[must_use]
    pub fn has_default_type(&self) -> bool {
        self.type_url == ABOUT_BLANK
    }
}

impl Serialize for ProblemDetails {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("status", &self.status.as_u16())?;
        map.serialize_entry("title", &self.title)?;
        map.serialize_entry("detail", &self.detail)?;
        if !self.has_default_type() {
            map.serialize_entry("type", &self.type_url)?;
        }
        if let Some(instance) = &self.instance {
            map.serialize_entry("instance", instance)?;
        }
        if let Some(errors) = &self.errors {
            map.serialize_entry("errors", errors)?;
        }
        for (key, value) in &self.extras {
            if is_reserved_key(key) {
                tracing::warn!(
                    key = %key,
                    "dropping extra field that collides with a reserved problem field"
                );
                continue;
            }
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

fn default_type() -> String {
    ABOUT_BLANK.to_owned()
}

#[derive(Deserialize)]
struct RawProblem {
    status: u16,
    #[serde(default)]
    title: String,
    #[serde(default)]
    detail: String,
    #[serde(rename = "type", default = "default_type")]
    type_url: String,
    #[serde(default)]
    instance: Option<String>,
    #[serde(default)]
    errors: Option<Vec<ValidationFailure>>,
    #[serde(flatten)]
    extras: Extras,
}

/// Unknown members (including a rendered `traceback`) are collected into `extras`.
impl<'de> Deserialize<'de> for ProblemDetails {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawProblem::deserialize(deserializer)?;
        let status = status_code_from_u16(raw.status).map_err(serde::de::Error::custom)?;
        Ok(Self {
            status,
            title: raw.title,
            detail: raw.detail,
            type_url: raw.type_url,
            instance: raw.instance,
            errors: raw.errors,
            extras: raw.extras,
        })
    }
}

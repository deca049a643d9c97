//! Translation of non-success responses into the shared error taxonomy.
//!
//! Each wrapped API supplies an [`ErrorMap`]: status rules checked first,
//! then embedded-code rules, then a catch-all that keeps the raw body for
//! diagnostics. The resulting [`ApiError`] always carries the original
//! status and, when present, the remote error code and message.

use std::fmt::{Display, Formatter};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Closed set of application-level error conditions shared by all wrappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    InvalidToken,
    InvalidVersion,
    InsufficientPermissions,
    ObjectNotFound,
    ParentNotFound,
    Conflict,
    Validation,
    InvalidJson,
    InvalidRequestUrl,
    InvalidRequest,
    InvalidId,
    InternalServerError,
    ServiceUnavailable,
    InvalidDomain,
    Other,
}

impl ApiErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidToken => "invalid_token",
            Self::InvalidVersion => "invalid_version",
            Self::InsufficientPermissions => "insufficient_permissions",
            Self::ObjectNotFound => "object_not_found",
            Self::ParentNotFound => "parent_not_found",
            Self::Conflict => "conflict",
            Self::Validation => "validation",
            Self::InvalidJson => "invalid_json",
            Self::InvalidRequestUrl => "invalid_request_url",
            Self::InvalidRequest => "invalid_request",
            Self::InvalidId => "invalid_id",
            Self::InternalServerError => "internal_server_error",
            Self::ServiceUnavailable => "service_unavailable",
            Self::InvalidDomain => "invalid_domain",
            Self::Other => "api_error",
        }
    }
}

impl Display for ApiErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified application error. Immutable once raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} (status {status}): {message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub status: u16,
    /// Error code embedded in the response body, when the API sent one.
    pub code: Option<String>,
    pub message: String,
}

impl ApiError {
    /// Re-tag with a more specific kind, keeping status/code/message. Used
    /// by facades that know more context than the classifier does.
    pub fn with_kind(mut self, kind: ApiErrorKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Per-API mapping from status code and embedded error code to a kind.
#[derive(Debug, Clone, Default)]
pub struct ErrorMap {
    status_rules: Vec<(u16, ApiErrorKind)>,
    code_rules: Vec<(&'static str, ApiErrorKind)>,
}

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: u16, kind: ApiErrorKind) -> Self {
        self.status_rules.push((status, kind));
        self
    }

    pub fn code(mut self, code: &'static str, kind: ApiErrorKind) -> Self {
        self.code_rules.push((code, kind));
        self
    }

    /// Classify a non-200 response whose body parsed as JSON.
    ///
    /// Status rules win over code rules. When neither table matches, the
    /// result is [`ApiErrorKind::Other`] with the whole body as message so
    /// nothing the remote said is lost.
    pub fn classify(&self, status: u16, body: &Value) -> ApiError {
        let code = body.get("code").and_then(Value::as_str).map(str::to_owned);
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| body.to_string());

        let kind = self
            .status_rules
            .iter()
            .find(|(rule_status, _)| *rule_status == status)
            .map(|(_, kind)| *kind)
            .or_else(|| {
                let code = code.as_deref()?;
                self.code_rules
                    .iter()
                    .find(|(rule_code, _)| *rule_code == code)
                    .map(|(_, kind)| *kind)
            })
            .unwrap_or(ApiErrorKind::Other);

        ApiError {
            kind,
            status,
            code,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_map() -> ErrorMap {
        ErrorMap::new()
            .status(401, ApiErrorKind::InvalidToken)
            .status(404, ApiErrorKind::ObjectNotFound)
            .code("validation_error", ApiErrorKind::Validation)
            .code("missing_version", ApiErrorKind::InvalidVersion)
    }

    #[test]
    fn status_rule_wins() {
        let error = sample_map().classify(
            401,
            &json!({"status": 401, "code": "unauthorized", "message": "API token is invalid."}),
        );

        assert_eq!(error.kind, ApiErrorKind::InvalidToken);
        assert_eq!(error.status, 401);
        assert_eq!(error.code.as_deref(), Some("unauthorized"));
        assert_eq!(error.message, "API token is invalid.");
    }

    #[test]
    fn embedded_code_rule_applies_when_status_has_no_rule() {
        let error = sample_map().classify(
            400,
            &json!({"status": 400, "code": "validation_error", "message": "body failed validation"}),
        );

        assert_eq!(error.kind, ApiErrorKind::Validation);
        assert_eq!(error.code.as_deref(), Some("validation_error"));
    }

    #[test]
    fn unmapped_response_falls_back_to_other_with_raw_body() {
        let error = sample_map().classify(418, &json!({"weird": true}));

        assert_eq!(error.kind, ApiErrorKind::Other);
        assert_eq!(error.code, None);
        assert!(error.message.contains("weird"));
    }

    #[test]
    fn retagging_keeps_diagnostics() {
        let error = sample_map()
            .classify(404, &json!({"code": "object_not_found", "message": "no such page"}))
            .with_kind(ApiErrorKind::ParentNotFound);

        assert_eq!(error.kind, ApiErrorKind::ParentNotFound);
        assert_eq!(error.status, 404);
        assert_eq!(error.message, "no such page");
    }
}

//! Framework-wide error types
//!
//! Every fallible operation in the framework and the application returns
//! `FrameworkError`. It carries an HTTP status and converts into an
//! `HttpResponse`, so handlers propagate failures with `?`.

use std::collections::HashMap;
use thiserror::Error;

/// Message shown to clients in place of any 5xx error
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Simple wrapper for one-off domain errors
///
/// ```rust,ignore
/// if payroll.status == "paid" {
///     return Err(AppError::conflict("Payroll has already been paid.").into());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AppError {
    message: String,
    status_code: u16,
}

impl AppError {
    /// Create a new AppError with status 500 (Internal Server Error)
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: 500,
        }
    }

    /// Set the HTTP status code
    pub fn status(mut self, code: u16) -> Self {
        self.status_code = code;
        self
    }

    /// Create a 409 Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(message).status(409)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl From<AppError> for FrameworkError {
    fn from(e: AppError) -> Self {
        FrameworkError::Domain {
            message: e.message,
            status_code: e.status_code,
        }
    }
}

/// Validation errors in the Laravel/Inertia shape
///
/// ```json
/// {
///     "message": "The given data was invalid.",
///     "errors": {
///         "email": ["The email field must be a valid email address."]
///     }
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    /// Map of field names to their validation error messages
    pub errors: HashMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error for a specific field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Messages recorded for a field
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(|v| v.as_slice())
    }

    /// `Ok(())` when empty, otherwise a 422 error carrying these messages
    pub fn into_result(self) -> Result<(), FrameworkError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(FrameworkError::Validation(self))
        }
    }

    /// Convert from the validator crate's errors
    pub fn from_validator(errors: validator::ValidationErrors) -> Self {
        let mut result = Self::new();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| default_message(field, &error.code));
                result.add(field.to_string(), message);
            }
        }
        result
    }

    /// Convert to JSON Value for response
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "message": "The given data was invalid.",
            "errors": self.errors
        })
    }
}

fn default_message(field: &str, code: &str) -> String {
    let label = field.replace('_', " ");
    match code {
        "required" => format!("The {} field is required.", label),
        "email" => format!("The {} field must be a valid email address.", label),
        "length" => format!("The {} field has an invalid length.", label),
        "range" => format!("The {} field is out of range.", label),
        "url" => format!("The {} field must be a valid URL.", label),
        _ => format!("The {} field is invalid.", label),
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation failed: {:?}", self.errors)
    }
}

impl std::error::Error for ValidationErrors {}

/// Framework-wide error type
///
/// Converts into an `HttpResponse` (see `http::response`), which lets
/// controllers use `?` on anything returning `FrameworkError`, including
/// SeaORM calls through `From<DbErr>`.
#[derive(Debug, Clone, Error)]
pub enum FrameworkError {
    /// Service not found in the container
    #[error("Service '{type_name}' not registered in container")]
    ServiceNotFound {
        /// The type name of the service that was not found
        type_name: &'static str,
    },

    /// Missing route parameter
    #[error("Missing required parameter: {param_name}")]
    ParamError {
        /// The name of the parameter that failed extraction
        param_name: String,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Generic internal server error
    #[error("Internal server error: {message}")]
    Internal {
        /// The error message
        message: String,
    },

    /// Domain error with a custom status code
    #[error("{message}")]
    Domain {
        /// The error message
        message: String,
        /// HTTP status code
        status_code: u16,
    },

    /// Form validation errors (422 Unprocessable Entity)
    #[error("The given data was invalid.")]
    Validation(ValidationErrors),

    /// No authenticated user (401)
    #[error("Unauthenticated.")]
    Unauthenticated,

    /// Authorization failed (403 Forbidden)
    #[error("This action is unauthorized.")]
    Unauthorized,

    /// Model not found (404 Not Found)
    #[error("{model_name} not found")]
    ModelNotFound {
        /// The name of the model that was not found
        model_name: String,
    },

    /// Parameter parse error (400 Bad Request)
    #[error("Invalid parameter '{param}': expected {expected_type}")]
    ParamParse {
        /// The parameter value that failed to parse
        param: String,
        /// The expected type (e.g., "i64")
        expected_type: &'static str,
    },
}

impl FrameworkError {
    /// Create a ServiceNotFound error for a given type
    pub fn service_not_found<T: ?Sized>() -> Self {
        Self::ServiceNotFound {
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Create a ParamError for a missing parameter
    pub fn param(name: impl Into<String>) -> Self {
        Self::ParamError {
            param_name: name.into(),
        }
    }

    /// Create a single-field validation error (422)
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        Self::Validation(errors)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a Domain error with custom status code
    pub fn domain(message: impl Into<String>, status_code: u16) -> Self {
        Self::Domain {
            message: message.into(),
            status_code,
        }
    }

    /// Create a 409 Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::domain(message, 409)
    }

    /// Create a ModelNotFound error (404)
    pub fn model_not_found(name: impl Into<String>) -> Self {
        Self::ModelNotFound {
            model_name: name.into(),
        }
    }

    /// Create a ParamParse error (400)
    pub fn param_parse(param: impl Into<String>, expected_type: &'static str) -> Self {
        Self::ParamParse {
            param: param.into(),
            expected_type,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ServiceNotFound { .. } => 500,
            Self::ParamError { .. } => 400,
            Self::Database(_) => 500,
            Self::Internal { .. } => 500,
            Self::Domain { status_code, .. } => *status_code,
            Self::Validation(_) => 422,
            Self::Unauthenticated => 401,
            Self::Unauthorized => 403,
            Self::ModelNotFound { .. } => 404,
            Self::ParamParse { .. } => 400,
        }
    }

    /// True for errors whose details must not reach the client
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

impl From<sea_orm::DbErr> for FrameworkError {
    fn from(e: sea_orm::DbErr) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<serde_json::Error> for FrameworkError {
    fn from(e: serde_json::Error) -> Self {
        Self::internal(format!("JSON error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Signup {
        #[validate(email)]
        email: String,
        #[validate(length(min = 3, message = "Name is too short."))]
        name: String,
    }

    #[test]
    fn maps_variants_to_statuses() {
        assert_eq!(FrameworkError::Unauthenticated.status_code(), 401);
        assert_eq!(FrameworkError::Unauthorized.status_code(), 403);
        assert_eq!(FrameworkError::model_not_found("Student").status_code(), 404);
        assert_eq!(FrameworkError::conflict("taken").status_code(), 409);
        assert_eq!(FrameworkError::validation("name", "bad").status_code(), 422);
        assert!(FrameworkError::database("boom").is_server_error());
        assert!(!FrameworkError::Unauthorized.is_server_error());
    }

    #[test]
    fn converts_validator_errors_with_messages() {
        let form = Signup {
            email: "not-an-email".to_string(),
            name: "ab".to_string(),
        };
        let errors = ValidationErrors::from_validator(form.validate().unwrap_err());

        assert_eq!(
            errors.get("email").unwrap(),
            &["The email field must be a valid email address.".to_string()]
        );
        assert_eq!(errors.get("name").unwrap(), &["Name is too short.".to_string()]);

        let json = errors.to_json();
        assert_eq!(json["message"], "The given data was invalid.");
        assert!(json["errors"]["email"].is_array());
    }

    #[test]
    fn app_error_keeps_status() {
        let err: FrameworkError = AppError::conflict("Already paid").into();
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.to_string(), "Already paid");
    }
}

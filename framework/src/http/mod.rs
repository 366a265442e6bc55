mod body;
mod form_request;
mod request;
mod response;

pub use body::{collect_body, parse_form, parse_json};
pub use form_request::FormRequest;
pub use request::Request;
pub use response::{HttpResponse, Redirect, Response, ResponseExt, FLASH_COOKIE};

/// Missing route parameter
#[derive(Debug)]
pub struct ParamError {
    pub param_name: String,
}

impl From<ParamError> for crate::error::FrameworkError {
    fn from(err: ParamError) -> crate::error::FrameworkError {
        crate::error::FrameworkError::ParamError {
            param_name: err.param_name,
        }
    }
}

impl From<ParamError> for HttpResponse {
    fn from(err: ParamError) -> HttpResponse {
        crate::error::FrameworkError::from(err).into()
    }
}

/// Create a text response
pub fn text(body: impl Into<String>) -> Response {
    Ok(HttpResponse::text(body))
}

/// Create a JSON response from a serde_json::Value
pub fn json(body: serde_json::Value) -> Response {
    Ok(HttpResponse::json(body))
}

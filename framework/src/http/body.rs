//! Body collection and parsing

use crate::error::FrameworkError;
use bytes::Bytes;
use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use serde::de::DeserializeOwned;

/// Collect an incoming body, refusing anything larger than `limit` bytes
///
/// Oversized bodies fail with a 413 domain error.
pub async fn collect_body(body: Incoming, limit: usize) -> Result<Bytes, FrameworkError> {
    Limited::new(body, limit)
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|e| {
            if e.is::<http_body_util::LengthLimitError>() {
                FrameworkError::domain("The request body is too large.", 413)
            } else {
                FrameworkError::domain(format!("Failed to read request body: {}", e), 400)
            }
        })
}

/// Parse bytes as JSON into the target type
///
/// An empty body parses as `{}` so requests without fields still reach
/// validation instead of failing as malformed.
pub fn parse_json<T: DeserializeOwned>(bytes: &Bytes) -> Result<T, FrameworkError> {
    let slice: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        bytes
    };
    serde_json::from_slice(slice).map_err(|e| {
        FrameworkError::validation("body", format!("The request body is not valid JSON: {}", e))
    })
}

/// Parse bytes as form-urlencoded into the target type
pub fn parse_form<T: DeserializeOwned>(bytes: &Bytes) -> Result<T, FrameworkError> {
    serde_urlencoded::from_bytes(bytes).map_err(|e| {
        FrameworkError::validation("body", format!("The form data is invalid: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct Vehicle {
        registration_no: Option<String>,
        capacity: Option<i32>,
    }

    #[test]
    fn empty_json_body_is_an_empty_object() {
        let parsed: Vehicle = parse_json(&Bytes::from_static(b"  ")).unwrap();
        assert_eq!(
            parsed,
            Vehicle {
                registration_no: None,
                capacity: None
            }
        );
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        let err = parse_json::<Vehicle>(&Bytes::from_static(b"{nope")).unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn parses_forms() {
        let parsed: Vehicle =
            parse_form(&Bytes::from_static(b"registration_no=KA-01&capacity=40")).unwrap();
        assert_eq!(parsed.registration_no.as_deref(), Some("KA-01"));
        assert_eq!(parsed.capacity, Some(40));
    }
}

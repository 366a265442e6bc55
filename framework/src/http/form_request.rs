//! Validated request data
//!
//! Laravel-style FormRequest: parse the body, check authorization, validate.

use super::Request;
use crate::error::{FrameworkError, ValidationErrors};
use serde::de::DeserializeOwned;
use validator::Validate;

/// Trait for validated form/JSON request data
///
/// ```rust,ignore
/// #[derive(Deserialize, Validate)]
/// pub struct StoreVehicle {
///     #[validate(length(min = 1, max = 32))]
///     pub registration_no: String,
///     #[validate(range(min = 1, max = 120))]
///     pub capacity: i32,
/// }
///
/// impl FormRequest for StoreVehicle {}
///
/// pub async fn store(req: Request) -> Response {
///     let form: StoreVehicle = req.validated()?; // 422 on failure
///     // ...
/// }
/// ```
pub trait FormRequest: Sized + DeserializeOwned + Validate {
    /// Returning `false` rejects the request with 403
    fn authorize(_req: &Request) -> bool {
        true
    }

    /// Cross-field rules that `validator` attributes cannot express
    fn after_validation(&self, _errors: &mut ValidationErrors) {}

    /// Authorize, parse (form or JSON by Content-Type) and validate
    fn extract(req: &Request) -> Result<Self, FrameworkError> {
        if !Self::authorize(req) {
            return Err(FrameworkError::Unauthorized);
        }

        let data: Self = req.input()?;

        let mut errors = match data.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => ValidationErrors::from_validator(errors),
        };
        data.after_validation(&mut errors);
        errors.into_result()?;

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize, Validate)]
    struct StoreTerm {
        #[validate(length(min = 1))]
        name: String,
        starts_on: String,
        ends_on: String,
    }

    impl FormRequest for StoreTerm {
        fn after_validation(&self, errors: &mut ValidationErrors) {
            if self.ends_on < self.starts_on {
                errors.add("ends_on", "The term must end after it starts.");
            }
        }
    }

    #[derive(Deserialize, Validate)]
    struct Locked {}

    impl FormRequest for Locked {
        fn authorize(_req: &Request) -> bool {
            false
        }
    }

    #[test]
    fn validates_json_and_cross_field_rules() {
        let req = Request::fake(Method::POST, "/terms").with_json(json!({
            "name": "",
            "starts_on": "2024-09-01",
            "ends_on": "2024-06-01"
        }));

        let err = req.validated::<StoreTerm>().err().unwrap();
        match err {
            FrameworkError::Validation(errors) => {
                assert!(errors.get("name").is_some());
                assert_eq!(
                    errors.get("ends_on").unwrap(),
                    &["The term must end after it starts.".to_string()]
                );
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn accepts_form_bodies() {
        let req = Request::fake(Method::POST, "/terms")
            .with_form("name=Spring&starts_on=2025-01-06&ends_on=2025-04-04");
        let term: StoreTerm = req.validated().unwrap();
        assert_eq!(term.name, "Spring");
    }

    #[test]
    fn rejects_unauthorized_requests() {
        let req = Request::fake(Method::POST, "/locked").with_json(json!({}));
        assert_eq!(req.validated::<Locked>().err().unwrap().status_code(), 403);
    }
}

//! Fluent assertions with expected/received output
//!
//! ```rust,ignore
//! expect!(&response).to_have_status(201);
//! expect!(response.json_body()["data"]).to_have_length(15);
//! expect!(payroll.net_salary).to_equal(95_000);
//! ```

use std::borrow::Borrow;
use std::fmt::Debug;

use crate::http::HttpResponse;
use serde_json::Value;

fn fail(location: &str, matcher: &str, expected: impl Debug, received: impl Debug) -> ! {
    panic!(
        "\nassertion failed at {}\n  expect!(..).{}\n\n  Expected: {:?}\n  Received: {:?}\n",
        location, matcher, expected, received
    )
}

pub struct Expect<T> {
    value: T,
    location: &'static str,
}

impl<T> Expect<T> {
    /// Use the `expect!` macro, which records the call site
    pub fn new(value: T, location: &'static str) -> Self {
        Self { value, location }
    }
}

impl<T: Debug + PartialEq> Expect<T> {
    pub fn to_equal(&self, expected: T) {
        if self.value != expected {
            fail(self.location, "to_equal", expected, &self.value);
        }
    }

    pub fn to_not_equal(&self, unexpected: T) {
        if self.value == unexpected {
            fail(self.location, "to_not_equal", format!("not {:?}", unexpected), &self.value);
        }
    }
}

impl<T: Debug + PartialOrd> Expect<T> {
    pub fn to_be_at_most(&self, limit: T) {
        if self.value > limit {
            fail(self.location, "to_be_at_most", format!("<= {:?}", limit), &self.value);
        }
    }

    pub fn to_be_at_least(&self, limit: T) {
        if self.value < limit {
            fail(self.location, "to_be_at_least", format!(">= {:?}", limit), &self.value);
        }
    }
}

impl Expect<bool> {
    pub fn to_be_true(&self) {
        if !self.value {
            fail(self.location, "to_be_true", true, false);
        }
    }

    pub fn to_be_false(&self) {
        if self.value {
            fail(self.location, "to_be_false", false, true);
        }
    }
}

impl<T: Debug> Expect<Option<T>> {
    pub fn to_be_some(&self) {
        if self.value.is_none() {
            fail(self.location, "to_be_some", "Some(_)", "None");
        }
    }

    pub fn to_be_none(&self) {
        if let Some(value) = &self.value {
            fail(self.location, "to_be_none", "None", value);
        }
    }
}

impl<T: Debug, E: Debug> Expect<Result<T, E>> {
    pub fn to_be_ok(&self) {
        if let Err(err) = &self.value {
            fail(self.location, "to_be_ok", "Ok(_)", err);
        }
    }

    pub fn to_be_err(&self) {
        if let Ok(value) = &self.value {
            fail(self.location, "to_be_err", "Err(_)", value);
        }
    }
}

impl<T: AsRef<str>> Expect<T> {
    pub fn to_contain(&self, needle: &str) {
        let haystack = self.value.as_ref();
        if !haystack.contains(needle) {
            fail(self.location, "to_contain", format!("..{}..", needle), haystack);
        }
    }
}

impl<T: Debug + PartialEq> Expect<Vec<T>> {
    pub fn to_have_length(&self, expected: usize) {
        if self.value.len() != expected {
            fail(self.location, "to_have_length", expected, self.value.len());
        }
    }

    pub fn to_include(&self, item: &T) {
        if !self.value.contains(item) {
            fail(self.location, "to_include", item, &self.value);
        }
    }
}

impl Expect<Value> {
    /// Array length of a JSON value
    pub fn to_have_length(&self, expected: usize) {
        match self.value.as_array() {
            Some(items) if items.len() == expected => {}
            Some(items) => fail(self.location, "to_have_length", expected, items.len()),
            None => fail(self.location, "to_have_length", "an array", &self.value),
        }
    }
}

/// Owned or borrowed, so the response can still be read afterwards
impl<R: Borrow<HttpResponse>> Expect<R> {
    pub fn to_have_status(&self, expected: u16) {
        let response = self.value.borrow();
        if response.status_code() != expected {
            fail(
                self.location,
                "to_have_status",
                expected,
                format!("{} {}", response.status_code(), response.body_str()),
            );
        }
    }

    /// 302 or 301 pointing at `path`
    pub fn to_redirect_to(&self, path: &str) {
        let response = self.value.borrow();
        let status = response.status_code();
        let location = response.header_value("Location");
        if !matches!(status, 301 | 302) || location != Some(path) {
            fail(self.location, "to_redirect_to", path, (status, location));
        }
    }

    /// 422 with at least one message for `field`
    pub fn to_have_validation_error(&self, field: &str) {
        let response = self.value.borrow();
        let body = response.json_body();
        if response.status_code() != 422 || body["errors"][field].as_array().map_or(true, |m| m.is_empty()) {
            fail(
                self.location,
                "to_have_validation_error",
                format!("422 with errors.{}", field),
                format!("{} {}", response.status_code(), response.body_str()),
            );
        }
    }
}

/// Wrap a value for fluent assertions
#[macro_export]
macro_rules! expect {
    ($value:expr) => {
        $crate::testing::Expect::new($value, concat!(file!(), ":", line!()))
    };
}

#[cfg(test)]
mod tests {
    use crate::http::HttpResponse;
    use crate::Redirect;
    use serde_json::json;

    #[test]
    fn passing_matchers() {
        expect!(3).to_equal(3);
        expect!(15u64).to_be_at_most(200);
        expect!(Some("Room 1")).to_be_some();
        expect!("Hillside Academy".to_string()).to_contain("Academy");
        expect!(vec![1, 2]).to_include(&2);
        expect!(json!([1, 2, 3])).to_have_length(3);
        expect!(HttpResponse::json(json!({})).status(201)).to_have_status(201);
        expect!(Redirect::to("/students").into_response()).to_redirect_to("/students");
    }

    #[test]
    #[should_panic(expected = "to_have_status")]
    fn reports_status_mismatch() {
        expect!(HttpResponse::text("nope").status(404)).to_have_status(200);
    }

    #[test]
    fn detects_validation_errors() {
        let response = HttpResponse::json(json!({
            "message": "The given data was invalid.",
            "errors": { "name": ["The name field is required."] }
        }))
        .status(422);
        expect!(&response).to_have_validation_error("name");
        expect!(response.json_body()["errors"]["name"].clone()).to_have_length(1);
    }
}

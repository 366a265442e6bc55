//! Token login for API and browser clients
//!
//! Browsers get the token as an HttpOnly cookie; API clients read it from
//! the JSON body and send it as a bearer token.

use campus::{
    Config, FormRequest, FrameworkError, HttpResponse, Inertia, InertiaContext, Redirect, Request, Response, DB,
};
use chrono::Duration;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::config::AuthConfig;
use crate::middleware::{AuthUser, TOKEN_COOKIE};
use crate::models::{api_tokens, schools, users};

#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

impl FormRequest for LoginForm {}

fn token_cookie(value: &str, max_age: i64) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}", TOKEN_COOKIE, value, max_age)
}

pub async fn create(_req: Request) -> Response {
    Inertia::render("Auth/Login", json!({}))
}

async fn password_matches(password: String, hash: String) -> Result<bool, FrameworkError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .map_err(|e| FrameworkError::internal(e.to_string()))
}

pub async fn login(req: Request) -> Response {
    let form: LoginForm = req.validated()?;
    let db = DB::connection()?;

    let user = users::Entity::find()
        .filter(users::Column::Email.eq(form.email.trim().to_lowercase()))
        .one(db.inner())
        .await?;
    let user = match user {
        Some(user) if password_matches(form.password, user.password.clone()).await? => user,
        _ => {
            tracing::info!(email = %form.email, "failed login");
            return Err(
                FrameworkError::validation("email", "These credentials do not match our records.").into(),
            );
        }
    };

    let ttl_hours = Config::get::<AuthConfig>().unwrap_or_default().token_ttl_hours;
    let (token, record) = api_tokens::issue_record(db.inner(), user.id, Duration::hours(ttl_hours)).await?;
    tracing::info!(user_id = user.id, school_id = user.school_id, "signed in");

    let cookie = token_cookie(&token, ttl_hours * 3600);
    if InertiaContext::wants_json() {
        return HttpResponse::json(json!({
            "token": token,
            "expires_at": record.expires_at,
            "user": user,
        }))
        .header("Set-Cookie", cookie)
        .ok();
    }
    Ok(Redirect::route("dashboard", &[])
        .into_response()
        .header("Set-Cookie", cookie))
}

/// Revoke the token of this request
pub async fn logout(req: Request) -> Response {
    let user = AuthUser::from_request(&req)?;
    let db = DB::connection()?;

    api_tokens::Entity::delete_by_id(user.token_id).exec(db.inner()).await?;
    tracing::info!(user_id = user.id, "signed out");

    let cookie = token_cookie("", 0);
    if InertiaContext::wants_json() {
        return HttpResponse::json(json!({ "message": "Signed out." }))
            .header("Set-Cookie", cookie)
            .ok();
    }
    Ok(Redirect::route("login", &[]).into_response().header("Set-Cookie", cookie))
}

pub async fn me(req: Request) -> Response {
    let user = AuthUser::from_request(&req)?;
    let db = DB::connection()?;

    let school = schools::Entity::find_by_id(user.school_id).one(db.inner()).await?;
    HttpResponse::json(json!({
        "user": {
            "id": user.id,
            "name": user.name,
            "email": user.email,
            "role": user.role,
            "school_id": user.school_id,
        },
        "school": school,
    }))
    .ok()
}

#[cfg(test)]
mod tests {
    use crate::policies::Role;
    use crate::testing::TestApp;
    use campus::expect;
    use serde_json::json;

    #[tokio::test]
    async fn logs_in_and_out_with_a_token() {
        let app = TestApp::new().await;
        let user = app.user(app.school.id, Role::Accountant).await;

        let response = app
            .send(
                campus::Request::fake(http::Method::POST, "/login")
                    .with_header("Accept", "application/json")
                    .with_json(json!({ "email": user.email, "password": "secret-password" })),
            )
            .await;
        expect!(response.status_code()).to_equal(200);
        expect!(response.header_value("Set-Cookie").unwrap_or("").starts_with("campus_token=")).to_be_true();
        let body = response.json_body();
        expect!(body["user"]["password"].is_null()).to_be_true();
        let token = body["token"].as_str().unwrap().to_string();

        let me = app.get(Some(&token), "/me").await.json_body();
        expect!(me["user"]["role"].clone()).to_equal(json!("accountant"));
        expect!(me["school"]["id"].as_i64()).to_equal(Some(app.school.id));

        expect!(app.post(&token, "/logout", json!({})).await).to_have_status(200);
        expect!(app.get(Some(&token), "/me").await).to_have_status(401);
    }

    #[tokio::test]
    async fn wrong_passwords_are_a_validation_error() {
        let app = TestApp::new().await;
        let user = app.user(app.school.id, Role::Teacher).await;

        for (email, password) in [(user.email.as_str(), "nope"), ("nobody@campus.test", "secret-password")] {
            let response = app
                .send(
                    campus::Request::fake(http::Method::POST, "/login")
                        .with_header("Accept", "application/json")
                        .with_json(json!({ "email": email, "password": password })),
                )
                .await;
            expect!(&response).to_have_validation_error("email");
        }
    }
}

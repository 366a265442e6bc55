//! Helpers shared by resource controllers

use campus::database::{Model, ModelMut};
use campus::{
    FormRequest, FrameworkError, HttpResponse, InertiaContext, Redirect, Request, Response, DB,
};
use sea_orm::ConnectionTrait;
use serde::Serialize;

use crate::middleware::AuthUser;
use crate::policies::{Ability, Resource};

/// Signed-in user, after checking `ability` on `resource`
pub fn authorize(req: &Request, resource: Resource, ability: Ability) -> Result<AuthUser, FrameworkError> {
    let user = AuthUser::from_request(req)?;
    user.authorize(resource, ability)?;
    Ok(user)
}

/// The `{id}` route parameter
pub fn id(req: &Request) -> Result<i64, FrameworkError> {
    req.param_as::<i64>("id")
}

/// Validated body, or the type's defaults when the body is empty
pub fn optional_input<T: FormRequest + Default>(req: &Request) -> Result<T, FrameworkError> {
    if req.body().iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    req.validated()
}

fn to_json(record: impl Serialize) -> Result<serde_json::Value, FrameworkError> {
    Ok(serde_json::to_value(record)?)
}

/// 201 with the record for API clients, a redirect with a flash for pages
pub fn created(record: impl Serialize, message: &str, redirect: Redirect) -> Response {
    if InertiaContext::wants_json() {
        let body = serde_json::json!({ "message": message, "data": to_json(record)? });
        return HttpResponse::json(body).status(201).ok();
    }
    redirect.with_success(message).into()
}

pub fn updated(record: impl Serialize, message: &str, redirect: Redirect) -> Response {
    if InertiaContext::wants_json() {
        let body = serde_json::json!({ "message": message, "data": to_json(record)? });
        return HttpResponse::json(body).ok();
    }
    redirect.with_success(message).into()
}

pub fn deleted(message: &str, redirect: Redirect) -> Response {
    if InertiaContext::wants_json() {
        return HttpResponse::json(serde_json::json!({ "message": message })).ok();
    }
    redirect.with_success(message).into()
}

/// Resolve a foreign key of the same school, reporting a miss on `field`
pub async fn exists<E, C>(db: &C, school_id: i64, id: i64, field: &str) -> Result<E::Model, FrameworkError>
where
    E: Model,
    C: ConnectionTrait,
{
    E::find_scoped(db, school_id, id).await.map_err(|err| match err {
        FrameworkError::ModelNotFound { .. } => {
            FrameworkError::validation(field, format!("The selected {} is invalid.", field.replace('_', " ")))
        }
        other => other,
    })
}

/// 422 unless `value` is one of `allowed`
pub fn one_of(field: &str, value: &str, allowed: &[&str]) -> Result<(), FrameworkError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(FrameworkError::validation(
            field,
            format!("The {} must be one of: {}.", field.replace('_', " "), allowed.join(", ")),
        ))
    }
}

pub fn taken(field: &str) -> FrameworkError {
    FrameworkError::validation(field, format!("The {} has already been taken.", field.replace('_', " ")))
}

/// Soft delete the `{id}` row
pub async fn destroy<E>(req: &Request, resource: Resource, index_route: &str) -> Response
where
    E: ModelMut,
{
    let user = authorize(req, resource, Ability::Delete)?;
    let id = id(req)?;
    let db = DB::connection()?;

    E::soft_delete(db.inner(), user.school_id, id).await?;
    tracing::info!(model = E::LABEL, id, user_id = user.id, "soft deleted");
    deleted(&format!("{} deleted.", E::LABEL), Redirect::route(index_route, &[]))
}

/// Bring a trashed `{id}` row back
pub async fn restore<E>(req: &Request, resource: Resource, show_route: &str) -> Response
where
    E: ModelMut,
    E::Model: Serialize,
{
    let user = authorize(req, resource, Ability::Restore)?;
    let id = id(req)?;
    let db = DB::connection()?;

    let record = E::restore(db.inner(), user.school_id, id).await?;
    let id = id.to_string();
    updated(
        record,
        &format!("{} restored.", E::LABEL),
        Redirect::route(show_route, &[("id", &id)]),
    )
}

/// Permanently remove a trashed `{id}` row
pub async fn force_delete<E>(req: &Request, resource: Resource, index_route: &str) -> Response
where
    E: ModelMut,
{
    let user = authorize(req, resource, Ability::ForceDelete)?;
    let id = id(req)?;
    let db = DB::connection()?;

    E::force_delete(db.inner(), user.school_id, id).await?;
    tracing::info!(model = E::LABEL, id, user_id = user.id, "force deleted");
    deleted(
        &format!("{} permanently deleted.", E::LABEL),
        Redirect::route(index_route, &[]),
    )
}

/// What the signed-in user may do with `resource`, for page buttons
pub fn abilities(user: &AuthUser, resource: Resource) -> serde_json::Value {
    serde_json::json!({
        "create": user.can(resource, Ability::Create),
        "update": user.can(resource, Ability::Update),
        "delete": user.can(resource, Ability::Delete),
        "restore": user.can(resource, Ability::Restore),
        "force_delete": user.can(resource, Ability::ForceDelete),
        "manage": user.can(resource, Ability::Manage),
    })
}

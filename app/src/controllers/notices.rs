//! School notices
//!
//! Drafts are visible to those who may create notices; everyone else sees
//! published notices only. Publishing fans out notifications on the queue.

use campus::database::Model;
use campus::query::{FilterKind, SortDirection, TableQuery, TableSpec};
use campus::queue;
use campus::{FormRequest, FrameworkError, Inertia, Redirect, Request, Response, DB};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::support::{self, authorize};
use crate::jobs::SendNoticeNotifications;
use crate::middleware::AuthUser;
use crate::models::{notices, now};
use crate::policies::{Ability, Resource};

#[derive(Debug, Deserialize, Validate)]
pub struct NoticeForm {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 10000))]
    pub body: String,
    #[serde(default = "default_audience")]
    pub audience: String,
    /// Publish right away instead of saving a draft
    #[serde(default)]
    pub publish: bool,
}

fn default_audience() -> String {
    "all".to_string()
}

impl FormRequest for NoticeForm {}

fn table() -> TableSpec<notices::Entity> {
    use notices::Column;

    TableSpec::new(Column::Id)
        .search(Column::Title)
        .search(Column::Body)
        .sort("title", Column::Title)
        .sort("published_at", Column::PublishedAt)
        .sort("created_at", Column::CreatedAt)
        .filter("audience", Column::Audience, FilterKind::Text)
        .soft_deletes(Column::DeletedAt)
        .default_sort("created_at", SortDirection::Desc)
        .present(|row| {
            row["is_published"] = json!(!row["published_at"].is_null());
        })
}

/// Notices the user may see
fn visible(user: &AuthUser) -> sea_orm::Select<notices::Entity> {
    let select = notices::Entity::scoped(user.school_id);
    if user.can(Resource::Notices, Ability::Create) {
        select
    } else {
        select.filter(notices::Column::PublishedAt.is_not_null())
    }
}

pub async fn index(req: Request) -> Response {
    let user = authorize(&req, Resource::Notices, Ability::View)?;
    let query = TableQuery::from_request(&req);
    let db = DB::connection()?;

    let notices = table().paginate(visible(&user), &query, db.inner()).await?;

    Inertia::render(
        "Notices/Index",
        json!({
            "notices": notices,
            "audiences": notices::AUDIENCES,
            "can": support::abilities(&user, Resource::Notices),
        }),
    )
}

pub async fn show(req: Request) -> Response {
    let user = authorize(&req, Resource::Notices, Ability::View)?;
    let id = support::id(&req)?;
    let db = DB::connection()?;

    let notice = visible(&user)
        .filter(notices::Column::Id.eq(id))
        .filter(notices::Column::DeletedAt.is_null())
        .one(db.inner())
        .await?
        .ok_or_else(|| FrameworkError::model_not_found("Notice"))?;

    Inertia::render("Notices/Show", json!({ "notice": notice }))
}

pub async fn store(req: Request) -> Response {
    let user = authorize(&req, Resource::Notices, Ability::Create)?;
    let form: NoticeForm = req.validated()?;
    support::one_of("audience", &form.audience, &notices::AUDIENCES)?;
    let db = DB::connection()?;
    let now = now();

    let notice = notices::ActiveModel {
        school_id: Set(user.school_id),
        created_by: Set(user.id),
        title: Set(form.title),
        body: Set(form.body),
        audience: Set(form.audience),
        published_at: Set(form.publish.then_some(now)),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(db.inner())
    .await?;

    if notice.is_published() {
        announce(&notice).await?;
    }

    let id = notice.id.to_string();
    let message = if notice.is_published() { "Notice published." } else { "Notice saved as draft." };
    support::created(&notice, message, Redirect::route("notices.show", &[("id", &id)]))
}

pub async fn update(req: Request) -> Response {
    let user = authorize(&req, Resource::Notices, Ability::Update)?;
    let id = support::id(&req)?;
    let form: NoticeForm = req.validated()?;
    support::one_of("audience", &form.audience, &notices::AUDIENCES)?;
    let db = DB::connection()?;

    let mut notice = notices::Entity::find_scoped(db.inner(), user.school_id, id)
        .await?
        .into_active_model();
    notice.title = Set(form.title);
    notice.body = Set(form.body);
    notice.audience = Set(form.audience);
    notice.updated_at = Set(now());
    let notice = notice.update(db.inner()).await?;

    let id = notice.id.to_string();
    support::updated(&notice, "Notice updated.", Redirect::route("notices.show", &[("id", &id)]))
}

/// Publish a draft; publishing twice is a 409
pub async fn publish(req: Request) -> Response {
    let user = authorize(&req, Resource::Notices, Ability::Manage)?;
    let id = support::id(&req)?;
    let db = DB::connection()?;
    let now = now();

    let result = notices::Entity::update_many()
        .col_expr(notices::Column::PublishedAt, Expr::value(now))
        .col_expr(notices::Column::UpdatedAt, Expr::value(now))
        .filter(notices::Column::Id.eq(id))
        .filter(notices::Column::SchoolId.eq(user.school_id))
        .filter(notices::Column::PublishedAt.is_null())
        .filter(notices::Column::DeletedAt.is_null())
        .exec(db.inner())
        .await?;
    if result.rows_affected == 0 {
        notices::Entity::find_scoped(db.inner(), user.school_id, id).await?;
        return Err(FrameworkError::conflict("Notice is already published.").into());
    }

    let notice = notices::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    announce(&notice).await?;

    let id = notice.id.to_string();
    support::updated(&notice, "Notice published.", Redirect::route("notices.show", &[("id", &id)]))
}

async fn announce(notice: &notices::Model) -> Result<(), FrameworkError> {
    let handle = queue::dispatch(&SendNoticeNotifications {
        school_id: notice.school_id,
        notice_id: notice.id,
    })
    .await?;
    tracing::info!(notice_id = notice.id, job_id = handle.id(), "notice published");
    Ok(())
}

pub async fn destroy(req: Request) -> Response {
    support::destroy::<notices::Entity>(&req, Resource::Notices, "notices.index").await
}

pub async fn restore(req: Request) -> Response {
    support::restore::<notices::Entity>(&req, Resource::Notices, "notices.show").await
}

pub async fn force_delete(req: Request) -> Response {
    support::force_delete::<notices::Entity>(&req, Resource::Notices, "notices.index").await
}

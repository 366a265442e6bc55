//! Academic sessions; at most one per school is current

use campus::database::{Model, Trashed};
use campus::query::{FilterKind, SortDirection, TableQuery, TableSpec};
use campus::{FormRequest, Inertia, Redirect, Request, Response, ValidationErrors, DB};
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, ColumnTrait, IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::support::{self, authorize};
use crate::models::{academic_sessions, now, terms};
use crate::policies::{Ability, Resource};

#[derive(Debug, Deserialize, Validate)]
pub struct SessionForm {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    #[serde(default)]
    pub is_current: bool,
}

impl FormRequest for SessionForm {
    fn after_validation(&self, errors: &mut ValidationErrors) {
        if self.ends_on <= self.starts_on {
            errors.add("ends_on", "The session must end after it starts.");
        }
    }
}

fn table() -> TableSpec<academic_sessions::Entity> {
    use academic_sessions::Column;

    TableSpec::new(Column::Id)
        .search(Column::Name)
        .sort("name", Column::Name)
        .sort("starts_on", Column::StartsOn)
        .sort("is_current", Column::IsCurrent)
        .filter("is_current", Column::IsCurrent, FilterKind::Boolean)
        .soft_deletes(Column::DeletedAt)
        .default_sort("starts_on", SortDirection::Desc)
}

pub async fn index(req: Request) -> Response {
    let user = authorize(&req, Resource::AcademicSessions, Ability::View)?;
    let query = TableQuery::from_request(&req);
    let db = DB::connection()?;

    let sessions = table()
        .paginate(academic_sessions::Entity::scoped(user.school_id), &query, db.inner())
        .await?;

    Inertia::render(
        "AcademicSessions/Index",
        json!({
            "sessions": sessions,
            "can": support::abilities(&user, Resource::AcademicSessions),
        }),
    )
}

pub async fn show(req: Request) -> Response {
    let user = authorize(&req, Resource::AcademicSessions, Ability::View)?;
    let id = support::id(&req)?;
    let db = DB::connection()?;

    let session = academic_sessions::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    let terms = terms::Entity::query(user.school_id, Trashed::Without)
        .filter(terms::Column::AcademicSessionId.eq(session.id))
        .order_by_asc(terms::Column::StartsOn)
        .all(db.inner())
        .await?;

    Inertia::render("AcademicSessions/Show", json!({ "session": session, "terms": terms }))
}

/// Insert; a session created as current demotes the others in the same transaction
pub async fn store(req: Request) -> Response {
    let user = authorize(&req, Resource::AcademicSessions, Ability::Create)?;
    let form: SessionForm = req.validated()?;
    let db = DB::connection()?;
    let now = now();

    let txn = db.inner().begin().await?;
    let session = academic_sessions::ActiveModel {
        school_id: Set(user.school_id),
        name: Set(form.name),
        starts_on: Set(form.starts_on),
        ends_on: Set(form.ends_on),
        is_current: Set(form.is_current),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    if session.is_current {
        academic_sessions::current_flag(user.school_id)
            .demote_others(&txn, session.id)
            .await?;
    }
    txn.commit().await?;

    let id = session.id.to_string();
    support::created(
        &session,
        "Academic session created.",
        Redirect::route("academic-sessions.show", &[("id", &id)]),
    )
}

pub async fn update(req: Request) -> Response {
    let user = authorize(&req, Resource::AcademicSessions, Ability::Update)?;
    let id = support::id(&req)?;
    let form: SessionForm = req.validated()?;
    let db = DB::connection()?;

    let txn = db.inner().begin().await?;
    let mut session = academic_sessions::Entity::find_scoped(&txn, user.school_id, id)
        .await?
        .into_active_model();
    session.name = Set(form.name);
    session.starts_on = Set(form.starts_on);
    session.ends_on = Set(form.ends_on);
    session.is_current = Set(form.is_current);
    session.updated_at = Set(now());
    let session = session.update(&txn).await?;
    if session.is_current {
        academic_sessions::current_flag(user.school_id)
            .demote_others(&txn, session.id)
            .await?;
    }
    txn.commit().await?;

    let id = session.id.to_string();
    support::updated(
        &session,
        "Academic session updated.",
        Redirect::route("academic-sessions.show", &[("id", &id)]),
    )
}

/// Make this the school's only current session
pub async fn set_current(req: Request) -> Response {
    let user = authorize(&req, Resource::AcademicSessions, Ability::Manage)?;
    let id = support::id(&req)?;
    let db = DB::connection()?;

    let txn = db.inner().begin().await?;
    academic_sessions::Entity::find_scoped(&txn, user.school_id, id).await?;
    academic_sessions::current_flag(user.school_id).promote(&txn, id).await?;
    txn.commit().await?;

    let session = academic_sessions::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    tracing::info!(school_id = user.school_id, session_id = id, "current academic session changed");
    support::updated(&session, "Current academic session updated.", Redirect::back())
}

pub async fn destroy(req: Request) -> Response {
    support::destroy::<academic_sessions::Entity>(&req, Resource::AcademicSessions, "academic-sessions.index").await
}

pub async fn restore(req: Request) -> Response {
    support::restore::<academic_sessions::Entity>(&req, Resource::AcademicSessions, "academic-sessions.show").await
}

pub async fn force_delete(req: Request) -> Response {
    support::force_delete::<academic_sessions::Entity>(&req, Resource::AcademicSessions, "academic-sessions.index")
        .await
}

#[cfg(test)]
mod tests {
    use crate::models::academic_sessions;
    use crate::policies::Role;
    use crate::testing::TestApp;
    use campus::expect;
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
    use serde_json::json;

    async fn current_ids(app: &TestApp, school_id: i64) -> Vec<i64> {
        academic_sessions::Entity::find()
            .filter(academic_sessions::Column::SchoolId.eq(school_id))
            .filter(academic_sessions::Column::IsCurrent.eq(true))
            .order_by_asc(academic_sessions::Column::Id)
            .all(app.conn())
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect()
    }

    #[tokio::test]
    async fn creating_a_current_session_demotes_the_others() {
        let app = TestApp::new().await;
        let token = app.token(Role::Admin).await;
        app.session(app.school.id, "2023/24", true).await;
        let elsewhere = app.session(app.other_school.id, "2023/24", true).await;

        let response = app
            .post(
                &token,
                "/academic-sessions",
                json!({
                    "name": "2024/25",
                    "starts_on": "2024-09-01",
                    "ends_on": "2025-06-30",
                    "is_current": true
                }),
            )
            .await;

        expect!(response.status_code()).to_equal(201);
        let created = response.json_body()["data"]["id"].as_i64().unwrap();
        expect!(current_ids(&app, app.school.id).await).to_equal(vec![created]);
        expect!(current_ids(&app, app.other_school.id).await).to_equal(vec![elsewhere.id]);
    }

    #[tokio::test]
    async fn set_current_switches_the_flag() {
        let app = TestApp::new().await;
        let token = app.token(Role::Admin).await;
        let old = app.session(app.school.id, "2023/24", true).await;
        let new = app.session(app.school.id, "2024/25", false).await;

        let response = app
            .post(&token, &format!("/academic-sessions/{}/current", new.id), json!({}))
            .await;

        expect!(&response).to_have_status(200);
        expect!(current_ids(&app, app.school.id).await).to_equal(vec![new.id]);
        expect!(response.json_body()["data"]["is_current"].as_bool()).to_equal(Some(true));
        expect!(current_ids(&app, app.school.id).await.contains(&old.id)).to_be_false();
    }

    #[tokio::test]
    async fn validates_dates() {
        let app = TestApp::new().await;
        let token = app.token(Role::Admin).await;

        let response = app
            .post(
                &token,
                "/academic-sessions",
                json!({ "name": "", "starts_on": "2025-06-30", "ends_on": "2024-09-01" }),
            )
            .await;

        let errors = response.json_body()["errors"].clone();
        expect!(&response).to_have_validation_error("ends_on");
        expect!(errors["name"].is_array()).to_be_true();
    }

    #[tokio::test]
    async fn teachers_may_view_but_not_switch() {
        let app = TestApp::new().await;
        let token = app.token(Role::Teacher).await;
        let session = app.session(app.school.id, "2024/25", false).await;

        expect!(app.get(Some(&token), "/academic-sessions").await).to_have_status(200);
        expect!(
            app.post(&token, &format!("/academic-sessions/{}/current", session.id), json!({}))
                .await
        )
        .to_have_status(403);
    }

    #[tokio::test]
    async fn sessions_of_other_schools_are_not_found() {
        let app = TestApp::new().await;
        let token = app.token(Role::Admin).await;
        let foreign = app.session(app.other_school.id, "2024/25", false).await;

        let response = app
            .get(Some(&token), &format!("/academic-sessions/{}", foreign.id))
            .await;
        expect!(&response).to_have_status(404);

        let response = app
            .post(&token, &format!("/academic-sessions/{}/current", foreign.id), json!({}))
            .await;
        expect!(&response).to_have_status(404);
    }
}

//! Terms of an academic session; at most one per school is current

use campus::database::Model;
use campus::query::{FilterKind, SortDirection, TableQuery, TableSpec};
use campus::{FormRequest, Inertia, Redirect, Request, Response, ValidationErrors, DB};
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, IntoActiveModel, RelationTrait, Set, TransactionTrait};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::support::{self, authorize};
use crate::models::{academic_sessions, now, terms};
use crate::policies::{Ability, Resource};

#[derive(Debug, Deserialize, Validate)]
pub struct TermForm {
    pub academic_session_id: i64,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    #[serde(default)]
    pub is_current: bool,
}

impl FormRequest for TermForm {
    fn after_validation(&self, errors: &mut ValidationErrors) {
        if self.ends_on <= self.starts_on {
            errors.add("ends_on", "The term must end after it starts.");
        }
    }
}

fn table() -> TableSpec<terms::Entity> {
    use terms::Column;

    TableSpec::new(Column::Id)
        .join("academic_session", || terms::Relation::AcademicSession.def())
        .search(Column::Name)
        .search_related("academic_session", "name")
        .sort("name", Column::Name)
        .sort("starts_on", Column::StartsOn)
        .sort_related("academic_session", "academic_session", "name")
        .filter("academic_session_id", Column::AcademicSessionId, FilterKind::Integer)
        .filter("is_current", Column::IsCurrent, FilterKind::Boolean)
        .column_as(
            "academic_session_name",
            TableSpec::<terms::Entity>::related("academic_session", "name"),
        )
        .soft_deletes(Column::DeletedAt)
        .default_sort("starts_on", SortDirection::Desc)
}

pub async fn index(req: Request) -> Response {
    let user = authorize(&req, Resource::Terms, Ability::View)?;
    let query = TableQuery::from_request(&req);
    let db = DB::connection()?;

    let terms = table()
        .paginate(terms::Entity::scoped(user.school_id), &query, db.inner())
        .await?;

    Inertia::render(
        "Terms/Index",
        json!({ "terms": terms, "can": support::abilities(&user, Resource::Terms) }),
    )
}

pub async fn show(req: Request) -> Response {
    let user = authorize(&req, Resource::Terms, Ability::View)?;
    let id = support::id(&req)?;
    let db = DB::connection()?;

    let term = terms::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    let session = academic_sessions::Entity::find_scoped_with_trashed(
        db.inner(),
        user.school_id,
        term.academic_session_id,
    )
    .await
    .ok();

    Inertia::render("Terms/Show", json!({ "term": term, "academic_session": session }))
}

pub async fn store(req: Request) -> Response {
    let user = authorize(&req, Resource::Terms, Ability::Create)?;
    let form: TermForm = req.validated()?;
    let db = DB::connection()?;
    let now = now();

    let txn = db.inner().begin().await?;
    support::exists::<academic_sessions::Entity, _>(&txn, user.school_id, form.academic_session_id, "academic_session_id")
        .await?;
    let term = terms::ActiveModel {
        school_id: Set(user.school_id),
        academic_session_id: Set(form.academic_session_id),
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
    if term.is_current {
        terms::current_flag(user.school_id).demote_others(&txn, term.id).await?;
    }
    txn.commit().await?;

    let id = term.id.to_string();
    support::created(&term, "Term created.", Redirect::route("terms.show", &[("id", &id)]))
}

pub async fn update(req: Request) -> Response {
    let user = authorize(&req, Resource::Terms, Ability::Update)?;
    let id = support::id(&req)?;
    let form: TermForm = req.validated()?;
    let db = DB::connection()?;

    let txn = db.inner().begin().await?;
    let mut term = terms::Entity::find_scoped(&txn, user.school_id, id)
        .await?
        .into_active_model();
    support::exists::<academic_sessions::Entity, _>(&txn, user.school_id, form.academic_session_id, "academic_session_id")
        .await?;
    term.academic_session_id = Set(form.academic_session_id);
    term.name = Set(form.name);
    term.starts_on = Set(form.starts_on);
    term.ends_on = Set(form.ends_on);
    term.is_current = Set(form.is_current);
    term.updated_at = Set(now());
    let term = term.update(&txn).await?;
    if term.is_current {
        terms::current_flag(user.school_id).demote_others(&txn, term.id).await?;
    }
    txn.commit().await?;

    let id = term.id.to_string();
    support::updated(&term, "Term updated.", Redirect::route("terms.show", &[("id", &id)]))
}

pub async fn set_current(req: Request) -> Response {
    let user = authorize(&req, Resource::Terms, Ability::Manage)?;
    let id = support::id(&req)?;
    let db = DB::connection()?;

    let txn = db.inner().begin().await?;
    terms::Entity::find_scoped(&txn, user.school_id, id).await?;
    terms::current_flag(user.school_id).promote(&txn, id).await?;
    txn.commit().await?;

    let term = terms::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    support::updated(&term, "Current term updated.", Redirect::back())
}

pub async fn destroy(req: Request) -> Response {
    support::destroy::<terms::Entity>(&req, Resource::Terms, "terms.index").await
}

pub async fn restore(req: Request) -> Response {
    support::restore::<terms::Entity>(&req, Resource::Terms, "terms.show").await
}

pub async fn force_delete(req: Request) -> Response {
    support::force_delete::<terms::Entity>(&req, Resource::Terms, "terms.index").await
}

#[cfg(test)]
mod tests {
    use crate::models::terms;
    use crate::policies::Role;
    use crate::testing::TestApp;
    use campus::expect;
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
    use serde_json::json;

    fn term(session_id: i64, name: &str, is_current: bool) -> serde_json::Value {
        json!({
            "academic_session_id": session_id,
            "name": name,
            "starts_on": "2024-09-01",
            "ends_on": "2024-12-20",
            "is_current": is_current
        })
    }

    #[tokio::test]
    async fn only_one_term_is_current() {
        let app = TestApp::new().await;
        let token = app.token(Role::Admin).await;
        let session = app.session(app.school.id, "2024/25", true).await;

        let first = app.post(&token, "/terms", term(session.id, "Autumn", true)).await;
        let second = app.post(&token, "/terms", term(session.id, "Spring", true)).await;
        expect!(first.status_code()).to_equal(201);
        expect!(second.status_code()).to_equal(201);

        let current = terms::Entity::find()
            .filter(terms::Column::IsCurrent.eq(true))
            .all(app.conn())
            .await
            .unwrap();
        expect!(current.len()).to_equal(1);
        expect!(current[0].name.clone()).to_equal("Spring".to_string());

        let first_id = first.json_body()["data"]["id"].as_i64().unwrap();
        app.post(&token, &format!("/terms/{}/current", first_id), json!({})).await;
        let current = terms::Entity::find()
            .filter(terms::Column::IsCurrent.eq(true))
            .all(app.conn())
            .await
            .unwrap();
        expect!(current.iter().map(|t| t.id).collect::<Vec<_>>()).to_equal(vec![first_id]);
    }

    #[tokio::test]
    async fn rejects_sessions_of_other_schools() {
        let app = TestApp::new().await;
        let token = app.token(Role::Admin).await;
        let foreign = app.session(app.other_school.id, "2024/25", false).await;

        let response = app.post(&token, "/terms", term(foreign.id, "Autumn", false)).await;
        expect!(&response).to_have_validation_error("academic_session_id");
    }

    #[tokio::test]
    async fn lists_with_session_name_and_hides_trashed() {
        let app = TestApp::new().await;
        let token = app.token(Role::Admin).await;
        let session = app.session(app.school.id, "2024/25", true).await;
        let kept = app.post(&token, "/terms", term(session.id, "Autumn", false)).await;
        let gone = app.post(&token, "/terms", term(session.id, "Summer", false)).await;
        let gone_id = gone.json_body()["data"]["id"].as_i64().unwrap();
        expect!(app.delete(&token, &format!("/terms/{}", gone_id)).await).to_have_status(200);

        let listing = app.get(Some(&token), "/terms").await.json_body();
        expect!(listing["terms"]["data"].clone()).to_have_length(1);
        expect!(listing["terms"]["data"][0]["id"].clone()).to_equal(kept.json_body()["data"]["id"].clone());
        expect!(listing["terms"]["data"][0]["academic_session_name"].clone()).to_equal(json!("2024/25"));

        let listing = app.get(Some(&token), "/terms?with_trashed=1").await.json_body();
        expect!(listing["terms"]["data"].clone()).to_have_length(2);
    }
}

//! Timetables; one active timetable per class section

use campus::database::Model;
use campus::query::{FilterKind, SortDirection, TableQuery, TableSpec};
use campus::{Inertia, Redirect, Request, Response, DB};
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, IntoActiveModel, RelationTrait, Set, TransactionTrait};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::support::{self, authorize};
use crate::models::{class_sections, now, timetables};
use crate::policies::{Ability, Resource};

#[derive(Debug, Deserialize, Validate)]
pub struct TimetableForm {
    pub class_section_id: i64,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub effective_from: NaiveDate,
    #[serde(default)]
    pub is_active: bool,
}

impl campus::FormRequest for TimetableForm {}

fn table() -> TableSpec<timetables::Entity> {
    use timetables::Column;

    TableSpec::new(Column::Id)
        .join("class_section", || timetables::Relation::ClassSection.def())
        .search(Column::Name)
        .search_related("class_section", "name")
        .sort("name", Column::Name)
        .sort("effective_from", Column::EffectiveFrom)
        .sort_related("class_section", "class_section", "name")
        .filter("class_section_id", Column::ClassSectionId, FilterKind::Integer)
        .filter("is_active", Column::IsActive, FilterKind::Boolean)
        .column_as(
            "class_section_name",
            TableSpec::<timetables::Entity>::related("class_section", "name"),
        )
        .soft_deletes(Column::DeletedAt)
        .default_sort("effective_from", SortDirection::Desc)
}

pub async fn index(req: Request) -> Response {
    let user = authorize(&req, Resource::Timetables, Ability::View)?;
    let query = TableQuery::from_request(&req);
    let db = DB::connection()?;

    let timetables = table()
        .paginate(timetables::Entity::scoped(user.school_id), &query, db.inner())
        .await?;

    Inertia::render(
        "Timetables/Index",
        json!({ "timetables": timetables, "can": support::abilities(&user, Resource::Timetables) }),
    )
}

pub async fn show(req: Request) -> Response {
    let user = authorize(&req, Resource::Timetables, Ability::View)?;
    let id = support::id(&req)?;
    let db = DB::connection()?;

    let timetable = timetables::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    let class_section =
        class_sections::Entity::find_scoped_with_trashed(db.inner(), user.school_id, timetable.class_section_id)
            .await
            .ok();

    Inertia::render(
        "Timetables/Show",
        json!({ "timetable": timetable, "class_section": class_section }),
    )
}

pub async fn store(req: Request) -> Response {
    let user = authorize(&req, Resource::Timetables, Ability::Create)?;
    let form: TimetableForm = req.validated()?;
    let db = DB::connection()?;
    let now = now();

    let txn = db.inner().begin().await?;
    support::exists::<class_sections::Entity, _>(&txn, user.school_id, form.class_section_id, "class_section_id")
        .await?;
    let timetable = timetables::ActiveModel {
        school_id: Set(user.school_id),
        class_section_id: Set(form.class_section_id),
        name: Set(form.name),
        effective_from: Set(form.effective_from),
        is_active: Set(form.is_active),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    if timetable.is_active {
        timetables::active_flag(user.school_id, timetable.class_section_id)
            .demote_others(&txn, timetable.id)
            .await?;
    }
    txn.commit().await?;

    let id = timetable.id.to_string();
    support::created(
        &timetable,
        "Timetable created.",
        Redirect::route("timetables.show", &[("id", &id)]),
    )
}

pub async fn update(req: Request) -> Response {
    let user = authorize(&req, Resource::Timetables, Ability::Update)?;
    let id = support::id(&req)?;
    let form: TimetableForm = req.validated()?;
    let db = DB::connection()?;

    let txn = db.inner().begin().await?;
    let mut timetable = timetables::Entity::find_scoped(&txn, user.school_id, id)
        .await?
        .into_active_model();
    support::exists::<class_sections::Entity, _>(&txn, user.school_id, form.class_section_id, "class_section_id")
        .await?;
    timetable.class_section_id = Set(form.class_section_id);
    timetable.name = Set(form.name);
    timetable.effective_from = Set(form.effective_from);
    timetable.is_active = Set(form.is_active);
    timetable.updated_at = Set(now());
    let timetable = timetable.update(&txn).await?;
    if timetable.is_active {
        timetables::active_flag(user.school_id, timetable.class_section_id)
            .demote_others(&txn, timetable.id)
            .await?;
    }
    txn.commit().await?;

    let id = timetable.id.to_string();
    support::updated(
        &timetable,
        "Timetable updated.",
        Redirect::route("timetables.show", &[("id", &id)]),
    )
}

/// Make this the only active timetable of its class section
pub async fn activate(req: Request) -> Response {
    let user = authorize(&req, Resource::Timetables, Ability::Manage)?;
    let id = support::id(&req)?;
    let db = DB::connection()?;

    let txn = db.inner().begin().await?;
    let timetable = timetables::Entity::find_scoped(&txn, user.school_id, id).await?;
    timetables::active_flag(user.school_id, timetable.class_section_id)
        .promote(&txn, id)
        .await?;
    txn.commit().await?;

    let timetable = timetables::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    support::updated(&timetable, "Timetable activated.", Redirect::back())
}

pub async fn destroy(req: Request) -> Response {
    support::destroy::<timetables::Entity>(&req, Resource::Timetables, "timetables.index").await
}

pub async fn restore(req: Request) -> Response {
    support::restore::<timetables::Entity>(&req, Resource::Timetables, "timetables.show").await
}

pub async fn force_delete(req: Request) -> Response {
    support::force_delete::<timetables::Entity>(&req, Resource::Timetables, "timetables.index").await
}

#[cfg(test)]
mod tests {
    use crate::models::timetables;
    use crate::policies::Role;
    use crate::testing::TestApp;
    use campus::expect;
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
    use serde_json::json;

    async fn active_ids(app: &TestApp) -> Vec<i64> {
        timetables::Entity::find()
            .filter(timetables::Column::IsActive.eq(true))
            .order_by_asc(timetables::Column::Id)
            .all(app.conn())
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect()
    }

    fn timetable(class_section_id: i64, name: &str) -> serde_json::Value {
        json!({
            "class_section_id": class_section_id,
            "name": name,
            "effective_from": "2024-09-02",
            "is_active": true
        })
    }

    #[tokio::test]
    async fn one_active_timetable_per_class_section() {
        let app = TestApp::new().await;
        let token = app.token(Role::Teacher).await;
        let five_a = app.class_section(app.school.id, "5A").await;
        let five_b = app.class_section(app.school.id, "5B").await;

        let a1 = app.post(&token, "/timetables", timetable(five_a.id, "Autumn")).await;
        let b1 = app.post(&token, "/timetables", timetable(five_b.id, "Autumn")).await;
        let a2 = app.post(&token, "/timetables", timetable(five_a.id, "Winter")).await;
        let id = |r: &campus::HttpResponse| r.json_body()["data"]["id"].as_i64().unwrap();

        expect!(active_ids(&app).await).to_equal(vec![id(&b1), id(&a2)]);

        let response = app
            .post(&token, &format!("/timetables/{}/activate", id(&a1)), json!({}))
            .await;
        expect!(&response).to_have_status(200);
        expect!(active_ids(&app).await).to_equal(vec![id(&a1), id(&b1)]);
    }

    #[tokio::test]
    async fn accountants_cannot_touch_timetables() {
        let app = TestApp::new().await;
        let token = app.token(Role::Accountant).await;
        let section = app.class_section(app.school.id, "5A").await;

        expect!(app.get(Some(&token), "/timetables").await).to_have_status(403);
        expect!(app.post(&token, "/timetables", timetable(section.id, "Autumn")).await).to_have_status(403);
    }
}

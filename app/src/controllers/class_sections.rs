use campus::database::{Model, Trashed};
use campus::query::{related_count, SortDirection, TableQuery, TableSpec};
use campus::{FormRequest, Inertia, Redirect, Request, Response, DB};
use sea_orm::sea_query::SimpleExpr;
use sea_orm::{ActiveModelTrait, ColumnTrait, IntoActiveModel, PaginatorTrait, QueryFilter, Set};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::support::{self, authorize};
use crate::models::{class_sections, now, students, timetables};
use crate::policies::{Ability, Resource};

#[derive(Debug, Deserialize, Validate)]
pub struct ClassSectionForm {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(range(min = 1, max = 20))]
    pub grade_level: i32,
    #[validate(length(min = 1, max = 10))]
    pub section: String,
    #[validate(range(min = 1, max = 500))]
    pub capacity: i32,
}

impl FormRequest for ClassSectionForm {}

/// Live students of the row's class section
fn students_count() -> SimpleExpr {
    related_count::<students::Entity>(
        students::Column::ClassSectionId,
        (class_sections::Entity, class_sections::Column::Id),
        Some(students::Column::DeletedAt),
    )
}

fn table() -> TableSpec<class_sections::Entity> {
    use class_sections::Column;

    TableSpec::new(Column::Id)
        .search(Column::Name)
        .search(Column::Section)
        .sort("name", Column::Name)
        .sort("grade_level", Column::GradeLevel)
        .sort("capacity", Column::Capacity)
        .count_as("students_count", students_count())
        .soft_deletes(Column::DeletedAt)
        .default_sort("grade_level", SortDirection::Asc)
}

pub async fn index(req: Request) -> Response {
    let user = authorize(&req, Resource::ClassSections, Ability::View)?;
    let query = TableQuery::from_request(&req);
    let db = DB::connection()?;

    let sections = table()
        .paginate(class_sections::Entity::scoped(user.school_id), &query, db.inner())
        .await?;

    Inertia::render(
        "ClassSections/Index",
        json!({ "class_sections": sections, "can": support::abilities(&user, Resource::ClassSections) }),
    )
}

pub async fn show(req: Request) -> Response {
    let user = authorize(&req, Resource::ClassSections, Ability::View)?;
    let id = support::id(&req)?;
    let db = DB::connection()?;

    let section = class_sections::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    let students_count = students::Entity::query(user.school_id, Trashed::Without)
        .filter(students::Column::ClassSectionId.eq(section.id))
        .count(db.inner())
        .await?;
    let timetable = timetables::Entity::query(user.school_id, Trashed::Without)
        .filter(timetables::Column::ClassSectionId.eq(section.id))
        .filter(timetables::Column::IsActive.eq(true))
        .one(db.inner())
        .await?;

    Inertia::render(
        "ClassSections/Show",
        json!({
            "class_section": section,
            "students_count": students_count,
            "active_timetable": timetable,
        }),
    )
}

pub async fn store(req: Request) -> Response {
    let user = authorize(&req, Resource::ClassSections, Ability::Create)?;
    let form: ClassSectionForm = req.validated()?;
    let db = DB::connection()?;
    let now = now();

    let section = class_sections::ActiveModel {
        school_id: Set(user.school_id),
        name: Set(form.name),
        grade_level: Set(form.grade_level),
        section: Set(form.section),
        capacity: Set(form.capacity),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(db.inner())
    .await?;

    let id = section.id.to_string();
    support::created(
        &section,
        "Class section created.",
        Redirect::route("class-sections.show", &[("id", &id)]),
    )
}

pub async fn update(req: Request) -> Response {
    let user = authorize(&req, Resource::ClassSections, Ability::Update)?;
    let id = support::id(&req)?;
    let form: ClassSectionForm = req.validated()?;
    let db = DB::connection()?;

    let mut section = class_sections::Entity::find_scoped(db.inner(), user.school_id, id)
        .await?
        .into_active_model();
    section.name = Set(form.name);
    section.grade_level = Set(form.grade_level);
    section.section = Set(form.section);
    section.capacity = Set(form.capacity);
    section.updated_at = Set(now());
    let section = section.update(db.inner()).await?;

    let id = section.id.to_string();
    support::updated(
        &section,
        "Class section updated.",
        Redirect::route("class-sections.show", &[("id", &id)]),
    )
}

pub async fn destroy(req: Request) -> Response {
    support::destroy::<class_sections::Entity>(&req, Resource::ClassSections, "class-sections.index").await
}

pub async fn restore(req: Request) -> Response {
    support::restore::<class_sections::Entity>(&req, Resource::ClassSections, "class-sections.show").await
}

pub async fn force_delete(req: Request) -> Response {
    support::force_delete::<class_sections::Entity>(&req, Resource::ClassSections, "class-sections.index").await
}

#[cfg(test)]
mod tests {
    use crate::policies::Role;
    use crate::testing::TestApp;
    use campus::expect;
    use campus::database::ModelMut;
    use crate::models::students;
    use serde_json::json;

    #[tokio::test]
    async fn sorts_by_live_students_count() {
        let app = TestApp::new().await;
        let token = app.token(Role::Admin).await;
        let session = app.session(app.school.id, "2024/25", true).await;
        let small = app.class_section(app.school.id, "5A").await;
        let large = app.class_section(app.school.id, "5B").await;
        app.student(app.school.id, small.id, session.id, "A-1").await;
        app.student(app.school.id, large.id, session.id, "B-1").await;
        app.student(app.school.id, large.id, session.id, "B-2").await;
        let gone = app.student(app.school.id, large.id, session.id, "B-3").await;
        students::Entity::soft_delete(app.conn(), app.school.id, gone.id).await.unwrap();

        let body = app
            .get(Some(&token), "/class-sections?sort=students_count&sort_order=desc")
            .await
            .json_body();
        let rows = body["class_sections"]["data"].as_array().unwrap().clone();

        expect!(rows.len()).to_equal(2);
        expect!(rows[0]["id"].as_i64()).to_equal(Some(large.id));
        expect!(rows[0]["students_count"].as_i64()).to_equal(Some(2));
        expect!(rows[1]["students_count"].as_i64()).to_equal(Some(1));
    }

    #[tokio::test]
    async fn lifecycle_from_store_to_force_delete() {
        let app = TestApp::new().await;
        let token = app.token(Role::Admin).await;

        let created = app
            .post(
                &token,
                "/class-sections",
                json!({ "name": "Grade 6 B", "grade_level": 6, "section": "B", "capacity": 32 }),
            )
            .await;
        expect!(created.status_code()).to_equal(201);
        let id = created.json_body()["data"]["id"].as_i64().unwrap();

        let updated = app
            .put(
                &token,
                &format!("/class-sections/{}", id),
                json!({ "name": "Grade 6 B", "grade_level": 6, "section": "B", "capacity": 35 }),
            )
            .await;
        expect!(updated.json_body()["data"]["capacity"].as_i64()).to_equal(Some(35));

        expect!(app.delete(&token, &format!("/class-sections/{}/force", id)).await).to_have_status(409);
        expect!(app.delete(&token, &format!("/class-sections/{}", id)).await).to_have_status(200);
        expect!(app.get(Some(&token), &format!("/class-sections/{}", id)).await).to_have_status(404);

        let restored = app.post(&token, &format!("/class-sections/{}/restore", id), json!({})).await;
        expect!(&restored).to_have_status(200);
        expect!(app.post(&token, &format!("/class-sections/{}/restore", id), json!({})).await).to_have_status(409);

        expect!(app.delete(&token, &format!("/class-sections/{}", id)).await).to_have_status(200);
        expect!(app.delete(&token, &format!("/class-sections/{}/force", id)).await).to_have_status(200);
        expect!(app.post(&token, &format!("/class-sections/{}/restore", id), json!({})).await).to_have_status(404);
    }

    #[tokio::test]
    async fn rejects_out_of_range_capacity() {
        let app = TestApp::new().await;
        let token = app.token(Role::Admin).await;

        let response = app
            .post(
                &token,
                "/class-sections",
                json!({ "name": "Huge", "grade_level": 6, "section": "Z", "capacity": 0 }),
            )
            .await;
        expect!(&response).to_have_validation_error("capacity");
    }
}

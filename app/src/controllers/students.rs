//! Student records

use campus::database::{Model, Trashed};
use campus::query::{FilterKind, SortDirection, TableQuery, TableSpec};
use campus::{FormRequest, FrameworkError, Inertia, Redirect, Request, Response, DB};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    RelationTrait, Set,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::support::{self, authorize};
use crate::models::{academic_sessions, class_sections, now, students};
use crate::policies::{Ability, Resource};

pub const GENDERS: [&str; 3] = ["male", "female", "other"];

#[derive(Debug, Deserialize, Validate)]
pub struct StudentForm {
    pub class_section_id: Option<i64>,
    pub academic_session_id: Option<i64>,
    #[validate(length(min = 1, max = 50))]
    pub admission_no: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    pub gender: String,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(length(max = 30))]
    pub guardian_phone: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "active".to_string()
}

impl FormRequest for StudentForm {}

impl StudentForm {
    /// Checks that need the database or the school
    async fn check<C: ConnectionTrait>(&self, db: &C, school_id: i64, id: Option<i64>) -> Result<(), FrameworkError> {
        support::one_of("gender", &self.gender, &GENDERS)?;
        support::one_of("status", &self.status, &students::STATUSES)?;
        if let Some(section) = self.class_section_id {
            support::exists::<class_sections::Entity, _>(db, school_id, section, "class_section_id").await?;
        }
        if let Some(session) = self.academic_session_id {
            support::exists::<academic_sessions::Entity, _>(db, school_id, session, "academic_session_id").await?;
        }

        let mut duplicate = students::Entity::query(school_id, Trashed::With)
            .filter(students::Column::AdmissionNo.eq(self.admission_no.as_str()));
        if let Some(id) = id {
            duplicate = duplicate.filter(students::Column::Id.ne(id));
        }
        if duplicate.count(db).await? > 0 {
            return Err(support::taken("admission_no"));
        }
        Ok(())
    }
}

fn table() -> TableSpec<students::Entity> {
    use students::Column;

    TableSpec::new(Column::Id)
        .join("class_section", || students::Relation::ClassSection.def())
        .join("academic_session", || students::Relation::AcademicSession.def())
        .search(Column::FirstName)
        .search(Column::LastName)
        .search(Column::AdmissionNo)
        .search_related("class_section", "name")
        .sort("admission_no", Column::AdmissionNo)
        .sort("first_name", Column::FirstName)
        .sort("last_name", Column::LastName)
        .sort("created_at", Column::CreatedAt)
        .sort_related("class_section", "class_section", "name")
        .filter("class_section_id", Column::ClassSectionId, FilterKind::Integer)
        .filter("academic_session_id", Column::AcademicSessionId, FilterKind::Integer)
        .filter("status", Column::Status, FilterKind::Text)
        .filter("gender", Column::Gender, FilterKind::Text)
        .filter_related("grade_level", "class_section", "grade_level", FilterKind::Integer)
        .column_as(
            "class_section_name",
            TableSpec::<students::Entity>::related("class_section", "name"),
        )
        .column_as(
            "academic_session_name",
            TableSpec::<students::Entity>::related("academic_session", "name"),
        )
        .soft_deletes(Column::DeletedAt)
        .default_sort("admission_no", SortDirection::Asc)
        .present(|row| {
            let full_name = format!(
                "{} {}",
                row["first_name"].as_str().unwrap_or_default(),
                row["last_name"].as_str().unwrap_or_default()
            );
            row["full_name"] = json!(full_name);
        })
}

pub async fn index(req: Request) -> Response {
    let user = authorize(&req, Resource::Students, Ability::View)?;
    let query = TableQuery::from_request(&req);
    let db = DB::connection()?;

    let students = table()
        .paginate(students::Entity::scoped(user.school_id), &query, db.inner())
        .await?;

    Inertia::render(
        "Students/Index",
        json!({ "students": students, "can": support::abilities(&user, Resource::Students) }),
    )
}

pub async fn show(req: Request) -> Response {
    let user = authorize(&req, Resource::Students, Ability::View)?;
    let id = support::id(&req)?;
    let db = DB::connection()?;

    let student = students::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    let class_section = match student.class_section_id {
        Some(section) => class_sections::Entity::find_scoped_with_trashed(db.inner(), user.school_id, section)
            .await
            .ok(),
        None => None,
    };
    let session = match student.academic_session_id {
        Some(session) => academic_sessions::Entity::find_scoped_with_trashed(db.inner(), user.school_id, session)
            .await
            .ok(),
        None => None,
    };

    Inertia::render(
        "Students/Show",
        json!({
            "student": student,
            "full_name": student.full_name(),
            "class_section": class_section,
            "academic_session": session,
        }),
    )
}

pub async fn store(req: Request) -> Response {
    let user = authorize(&req, Resource::Students, Ability::Create)?;
    let form: StudentForm = req.validated()?;
    let db = DB::connection()?;
    form.check(db.inner(), user.school_id, None).await?;
    let now = now();

    let student = students::ActiveModel {
        school_id: Set(user.school_id),
        class_section_id: Set(form.class_section_id),
        academic_session_id: Set(form.academic_session_id),
        admission_no: Set(form.admission_no),
        first_name: Set(form.first_name),
        last_name: Set(form.last_name),
        gender: Set(form.gender),
        date_of_birth: Set(form.date_of_birth),
        guardian_phone: Set(form.guardian_phone),
        status: Set(form.status),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(db.inner())
    .await?;

    tracing::info!(school_id = user.school_id, student_id = student.id, "student admitted");
    let id = student.id.to_string();
    support::created(&student, "Student created.", Redirect::route("students.show", &[("id", &id)]))
}

pub async fn update(req: Request) -> Response {
    let user = authorize(&req, Resource::Students, Ability::Update)?;
    let id = support::id(&req)?;
    let form: StudentForm = req.validated()?;
    let db = DB::connection()?;

    let student = students::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    form.check(db.inner(), user.school_id, Some(student.id)).await?;

    let mut student = student.into_active_model();
    student.class_section_id = Set(form.class_section_id);
    student.academic_session_id = Set(form.academic_session_id);
    student.admission_no = Set(form.admission_no);
    student.first_name = Set(form.first_name);
    student.last_name = Set(form.last_name);
    student.gender = Set(form.gender);
    student.date_of_birth = Set(form.date_of_birth);
    student.guardian_phone = Set(form.guardian_phone);
    student.status = Set(form.status);
    student.updated_at = Set(now());
    let student = student.update(db.inner()).await?;

    let id = student.id.to_string();
    support::updated(&student, "Student updated.", Redirect::route("students.show", &[("id", &id)]))
}

pub async fn destroy(req: Request) -> Response {
    support::destroy::<students::Entity>(&req, Resource::Students, "students.index").await
}

pub async fn restore(req: Request) -> Response {
    support::restore::<students::Entity>(&req, Resource::Students, "students.show").await
}

pub async fn force_delete(req: Request) -> Response {
    support::force_delete::<students::Entity>(&req, Resource::Students, "students.index").await
}

#[cfg(test)]
mod tests {
    use crate::policies::Role;
    use crate::testing::TestApp;
    use campus::expect;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn admission_nos(body: &serde_json::Value) -> Vec<String> {
        body["students"]["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["admission_no"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn searches_names_numbers_and_class_section() {
        let app = TestApp::new().await;
        let token = app.token(Role::Teacher).await;
        let session = app.session(app.school.id, "2024/25", true).await;
        let five = app.class_section(app.school.id, "Grade 5 Blue").await;
        let six = app.class_section(app.school.id, "Grade 6 Red").await;
        app.student(app.school.id, five.id, session.id, "ADM-001").await;
        app.student(app.school.id, six.id, session.id, "ADM-002").await;
        app.student(app.school.id, six.id, session.id, "ADM-100").await;

        let by_section = app.get(Some(&token), "/students?search=blue").await.json_body();
        assert_eq!(admission_nos(&by_section), vec!["ADM-001"]);

        let by_number = app.get(Some(&token), "/students?search=adm-10").await.json_body();
        assert_eq!(admission_nos(&by_number), vec!["ADM-100"]);

        let filtered = app
            .get(
                Some(&token),
                &format!("/students?filters%5Bclass_section_id%5D={}&sort=admission_no&sort_order=desc", six.id),
            )
            .await
            .json_body();
        assert_eq!(admission_nos(&filtered), vec!["ADM-100", "ADM-002"]);
        expect!(filtered["students"]["data"][0]["class_section_name"].clone()).to_equal(json!("Grade 6 Red"));
        expect!(filtered["students"]["data"][0]["full_name"].clone()).to_equal(json!("Student ADM-100"));
    }

    #[tokio::test]
    async fn filters_by_class_section_grade() {
        let app = TestApp::new().await;
        let token = app.token(Role::Teacher).await;
        let session = app.session(app.school.id, "2024/25", true).await;
        let two = app.class_section_in_grade(app.school.id, "Grade 2 A", 2).await;
        let two_b = app.class_section_in_grade(app.school.id, "Grade 2 B", 2).await;
        let three = app.class_section_in_grade(app.school.id, "Grade 3 A", 3).await;
        app.student(app.school.id, two.id, session.id, "G2-001").await;
        app.student(app.school.id, two_b.id, session.id, "G2-002").await;
        app.student(app.school.id, three.id, session.id, "G3-001").await;

        let body = app
            .get(Some(&token), "/students?filters%5Bgrade_level%5D=2")
            .await
            .json_body();
        assert_eq!(admission_nos(&body), vec!["G2-001", "G2-002"]);

        let body = app
            .get(Some(&token), "/students?filters%5Bgrade_level%5D=2&search=2%20b")
            .await
            .json_body();
        assert_eq!(admission_nos(&body), vec!["G2-002"]);
    }

    #[tokio::test]
    async fn search_wildcards_match_literally() {
        let app = TestApp::new().await;
        let token = app.token(Role::Admin).await;
        let session = app.session(app.school.id, "2024/25", true).await;
        let section = app.class_section(app.school.id, "5A").await;
        app.student(app.school.id, section.id, session.id, "100%").await;
        app.student(app.school.id, section.id, session.id, "1000").await;

        let body = app.get(Some(&token), "/students?search=100%25").await.json_body();
        assert_eq!(admission_nos(&body), vec!["100%"]);
    }

    #[tokio::test]
    async fn paging_is_clamped() {
        let app = TestApp::new().await;
        let token = app.token(Role::Admin).await;
        let session = app.session(app.school.id, "2024/25", true).await;
        let section = app.class_section(app.school.id, "5A").await;
        for n in 0..12 {
            app.student(app.school.id, section.id, session.id, &format!("S-{:02}", n)).await;
        }

        let body = app.get(Some(&token), "/students?per_page=1").await.json_body();
        expect!(body["students"]["meta"]["per_page"].as_u64()).to_equal(Some(10));
        expect!(body["students"]["data"].clone()).to_have_length(10);
        expect!(body["students"]["meta"]["last_page"].as_u64()).to_equal(Some(2));

        let past_the_end = app.get(Some(&token), "/students?page=9").await.json_body();
        expect!(past_the_end["students"]["data"].clone()).to_have_length(0);
        expect!(past_the_end["students"]["meta"]["total"].as_u64()).to_equal(Some(12));
    }

    #[tokio::test]
    async fn admission_numbers_are_unique_per_school_including_trashed() {
        let app = TestApp::new().await;
        let token = app.token(Role::Admin).await;
        let session = app.session(app.school.id, "2024/25", true).await;
        let section = app.class_section(app.school.id, "5A").await;
        let taken = app.student(app.school.id, section.id, session.id, "ADM-7").await;
        app.delete(&token, &format!("/students/{}", taken.id)).await;

        let body = json!({
            "class_section_id": section.id,
            "academic_session_id": session.id,
            "admission_no": "ADM-7",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "gender": "female"
        });
        expect!(app.post(&token, "/students", body.clone()).await).to_have_validation_error("admission_no");

        let (_, other) = app.sign_in_at(app.other_school.id, Role::Admin).await;
        let other_section = app.class_section(app.other_school.id, "5A").await;
        let mut elsewhere = body.clone();
        elsewhere["class_section_id"] = json!(other_section.id);
        elsewhere["academic_session_id"] = json!(null);
        expect!(app.post(&other, "/students", elsewhere).await.status_code()).to_equal(201);
    }

    #[tokio::test]
    async fn validates_gender_and_foreign_sections() {
        let app = TestApp::new().await;
        let token = app.token(Role::Admin).await;
        let foreign = app.class_section(app.other_school.id, "5A").await;

        let response = app
            .post(
                &token,
                "/students",
                json!({
                    "admission_no": "ADM-1",
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "gender": "unknown"
                }),
            )
            .await;
        expect!(&response).to_have_validation_error("gender");

        let response = app
            .post(
                &token,
                "/students",
                json!({
                    "class_section_id": foreign.id,
                    "admission_no": "ADM-1",
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "gender": "female"
                }),
            )
            .await;
        expect!(&response).to_have_validation_error("class_section_id");
    }

    #[tokio::test]
    async fn transport_managers_only_read() {
        let app = TestApp::new().await;
        let token = app.token(Role::TransportManager).await;

        expect!(app.get(Some(&token), "/students").await).to_have_status(200);
        expect!(app.post(&token, "/students", json!({})).await).to_have_status(403);
    }
}

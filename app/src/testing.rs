//! Test harness: migrated in-memory database, two schools and the full router

use campus::testing::{FakeMailer, TestDatabase};
use campus::{HttpResponse, Request, Server};
use chrono::{Duration, NaiveDate};
use http::Method;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use serde_json::Value;

use crate::migrations::Migrator;
use crate::models::{academic_sessions, api_tokens, class_sections, now, schools, staff, students, users};
use crate::policies::Role;
use crate::routes;

pub struct TestApp {
    pub db: TestDatabase,
    pub mail: FakeMailer,
    pub school: schools::Model,
    pub other_school: schools::Model,
    server: Server,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = TestDatabase::fresh::<Migrator>().await.unwrap();
        let mail = FakeMailer::install();
        let school = create_school(&db, "Hillside Academy", "HILL").await;
        let other_school = create_school(&db, "Riverside School", "RIVER").await;

        Self {
            db,
            mail,
            school,
            other_school,
            server: Server::new(routes::register()),
        }
    }

    pub fn conn(&self) -> &DatabaseConnection {
        self.db.conn()
    }

    pub async fn user(&self, school_id: i64, role: Role) -> users::Model {
        let n = users::Entity::find().count(self.conn()).await.unwrap() + 1;
        let now = now();
        users::ActiveModel {
            school_id: Set(school_id),
            name: Set(format!("{} {}", role.as_str(), n)),
            email: Set(format!("{}{}@campus.test", role.as_str(), n)),
            password: Set(bcrypt::hash("secret-password", 4).unwrap()),
            role: Set(role.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.conn())
        .await
        .unwrap()
    }

    pub async fn issue_token(&self, user: &users::Model, ttl: Duration) -> String {
        api_tokens::issue(self.conn(), user.id, ttl).await.unwrap()
    }

    /// A user of the main school plus a valid token
    pub async fn sign_in(&self, role: Role) -> (users::Model, String) {
        self.sign_in_at(self.school.id, role).await
    }

    pub async fn sign_in_at(&self, school_id: i64, role: Role) -> (users::Model, String) {
        let user = self.user(school_id, role).await;
        let token = self.issue_token(&user, Duration::hours(1)).await;
        (user, token)
    }

    pub async fn token(&self, role: Role) -> String {
        self.sign_in(role).await.1
    }

    pub async fn send(&self, request: Request) -> HttpResponse {
        self.server.handle(request).await
    }

    fn api(method: Method, token: Option<&str>, uri: &str) -> Request {
        let request = Request::fake(method, uri).with_header("Accept", "application/json");
        match token {
            Some(token) => request.with_header("Authorization", &format!("Bearer {}", token)),
            None => request,
        }
    }

    pub async fn get(&self, token: Option<&str>, uri: &str) -> HttpResponse {
        self.send(Self::api(Method::GET, token, uri)).await
    }

    pub async fn post(&self, token: &str, uri: &str, body: Value) -> HttpResponse {
        self.send(Self::api(Method::POST, Some(token), uri).with_json(body)).await
    }

    pub async fn put(&self, token: &str, uri: &str, body: Value) -> HttpResponse {
        self.send(Self::api(Method::PUT, Some(token), uri).with_json(body)).await
    }

    pub async fn delete(&self, token: &str, uri: &str) -> HttpResponse {
        self.send(Self::api(Method::DELETE, Some(token), uri)).await
    }

    pub async fn session(&self, school_id: i64, name: &str, is_current: bool) -> academic_sessions::Model {
        let now = now();
        academic_sessions::ActiveModel {
            school_id: Set(school_id),
            name: Set(name.to_string()),
            starts_on: Set(date("2024-09-01")),
            ends_on: Set(date("2025-06-30")),
            is_current: Set(is_current),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.conn())
        .await
        .unwrap()
    }

    pub async fn class_section(&self, school_id: i64, name: &str) -> class_sections::Model {
        self.class_section_in_grade(school_id, name, 5).await
    }

    pub async fn class_section_in_grade(&self, school_id: i64, name: &str, grade_level: i32) -> class_sections::Model {
        let now = now();
        class_sections::ActiveModel {
            school_id: Set(school_id),
            name: Set(name.to_string()),
            grade_level: Set(grade_level),
            section: Set("A".to_string()),
            capacity: Set(30),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.conn())
        .await
        .unwrap()
    }

    pub async fn student(
        &self,
        school_id: i64,
        class_section_id: i64,
        academic_session_id: i64,
        admission_no: &str,
    ) -> students::Model {
        let now = now();
        students::ActiveModel {
            school_id: Set(school_id),
            class_section_id: Set(Some(class_section_id)),
            academic_session_id: Set(Some(academic_session_id)),
            admission_no: Set(admission_no.to_string()),
            first_name: Set("Student".to_string()),
            last_name: Set(admission_no.to_string()),
            gender: Set("female".to_string()),
            date_of_birth: Set(None),
            guardian_phone: Set(None),
            status: Set("active".to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.conn())
        .await
        .unwrap()
    }

    pub async fn staff(&self, school_id: i64, name: &str, user_id: Option<i64>) -> staff::Model {
        let n = staff::Entity::find().count(self.conn()).await.unwrap() + 1;
        let now = now();
        staff::ActiveModel {
            school_id: Set(school_id),
            user_id: Set(user_id),
            employee_no: Set(format!("EMP-{:03}", n)),
            name: Set(name.to_string()),
            email: Set(format!("staff{}@campus.test", n)),
            designation: Set("Driver".to_string()),
            basic_salary: Set(250_000),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.conn())
        .await
        .unwrap()
    }
}

pub fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
}

async fn create_school(db: &TestDatabase, name: &str, code: &str) -> schools::Model {
    let now = now();
    schools::ActiveModel {
        name: Set(name.to_string()),
        code: Set(code.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db.conn())
    .await
    .unwrap()
}

//! Promotion batches
//!
//! A batch moves a snapshot of students from one class section and session
//! to another. It is reviewed by someone other than its creator, then run by
//! the `PromoteStudents` job. Every status change is a conditional update on
//! the status the action expects.

use std::collections::BTreeSet;

use campus::database::{Model, Trashed};
use campus::query::{related_count, FilterKind, SortDirection, TableQuery, TableSpec};
use campus::queue::{self, JobStatus};
use campus::{
    FormRequest, FrameworkError, HttpResponse, Inertia, InertiaContext, Redirect, Request, Response, DB,
};
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use super::support::{self, authorize};
use crate::jobs::PromoteStudents;
use crate::models::promotion_batches::{self, BatchStatus};
use crate::models::{academic_sessions, class_sections, now, promotion_batch_items as items, students};
use crate::policies::{Ability, Resource};

#[derive(Debug, Deserialize, Validate)]
pub struct PromotionForm {
    pub from_session_id: i64,
    pub to_session_id: i64,
    pub from_class_section_id: i64,
    pub to_class_section_id: i64,
    /// Explicit students; all active students of the source when absent
    #[validate(length(max = 1000))]
    pub student_ids: Option<Vec<i64>>,
}

impl FormRequest for PromotionForm {}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct RejectForm {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

impl FormRequest for RejectForm {}

impl PromotionForm {
    /// Student ids to snapshot, after checking every reference
    async fn snapshot<C: ConnectionTrait>(&self, db: &C, school_id: i64) -> Result<Vec<i64>, FrameworkError> {
        support::exists::<academic_sessions::Entity, _>(db, school_id, self.from_session_id, "from_session_id").await?;
        support::exists::<academic_sessions::Entity, _>(db, school_id, self.to_session_id, "to_session_id").await?;
        support::exists::<class_sections::Entity, _>(db, school_id, self.from_class_section_id, "from_class_section_id")
            .await?;
        support::exists::<class_sections::Entity, _>(db, school_id, self.to_class_section_id, "to_class_section_id")
            .await?;
        if self.from_session_id == self.to_session_id && self.from_class_section_id == self.to_class_section_id {
            return Err(FrameworkError::validation(
                "to_class_section_id",
                "The destination must differ from the source.",
            ));
        }

        let students = students::Entity::query(school_id, Trashed::Without);
        let ids: Vec<i64> = match &self.student_ids {
            Some(requested) => {
                let requested: BTreeSet<i64> = requested.iter().copied().collect();
                let found: Vec<i64> = students
                    .filter(students::Column::Id.is_in(requested.iter().copied()))
                    .order_by_asc(students::Column::Id)
                    .all(db)
                    .await?
                    .into_iter()
                    .map(|student| student.id)
                    .collect();
                if found.len() != requested.len() {
                    return Err(FrameworkError::validation(
                        "student_ids",
                        "One or more selected students are invalid.",
                    ));
                }
                found
            }
            None => students
                .filter(students::Column::ClassSectionId.eq(self.from_class_section_id))
                .filter(students::Column::AcademicSessionId.eq(self.from_session_id))
                .filter(students::Column::Status.eq("active"))
                .order_by_asc(students::Column::Id)
                .all(db)
                .await?
                .into_iter()
                .map(|student| student.id)
                .collect(),
        };

        if ids.is_empty() {
            return Err(FrameworkError::validation("student_ids", "There are no students to promote."));
        }
        Ok(ids)
    }
}

fn items_count() -> SimpleExpr {
    related_count::<items::Entity>(
        items::Column::BatchId,
        (promotion_batches::Entity, promotion_batches::Column::Id),
        None,
    )
}

fn table() -> TableSpec<promotion_batches::Entity> {
    use promotion_batches::Column;

    TableSpec::new(Column::Id)
        .sort("created_at", Column::CreatedAt)
        .sort("status", Column::Status)
        .count_as("items_count", items_count())
        .filter("status", Column::Status, FilterKind::Text)
        .filter("from_class_section_id", Column::FromClassSectionId, FilterKind::Integer)
        .filter("to_class_section_id", Column::ToClassSectionId, FilterKind::Integer)
        .default_sort("created_at", SortDirection::Desc)
}

pub async fn index(req: Request) -> Response {
    let user = authorize(&req, Resource::Promotions, Ability::View)?;
    let query = TableQuery::from_request(&req);
    let db = DB::connection()?;

    let batches = table()
        .paginate(promotion_batches::Entity::scoped(user.school_id), &query, db.inner())
        .await?;

    Inertia::render(
        "Promotions/Index",
        json!({
            "batches": batches,
            "can": {
                "create": user.can(Resource::Promotions, Ability::Create),
                "approve": user.can(Resource::Promotions, Ability::Approve),
                "execute": user.can(Resource::Promotions, Ability::Manage),
            },
        }),
    )
}

pub async fn show(req: Request) -> Response {
    let user = authorize(&req, Resource::Promotions, Ability::View)?;
    let id = support::id(&req)?;
    let db = DB::connection()?;

    let batch = promotion_batches::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    let items: Vec<Value> = items::Entity::find()
        .filter(items::Column::BatchId.eq(batch.id))
        .find_also_related(students::Entity)
        .order_by_asc(items::Column::Id)
        .all(db.inner())
        .await?
        .into_iter()
        .map(|(item, student)| {
            json!({
                "id": item.id,
                "student_id": item.student_id,
                "status": item.status,
                "student_name": student.map(|s| format!("{} {}", s.first_name, s.last_name)),
            })
        })
        .collect();

    Inertia::render(
        "Promotions/Show",
        json!({
            "batch": batch,
            "items": items,
            "can": {
                "approve": user.can(Resource::Promotions, Ability::Approve) && batch.created_by != user.id,
                "execute": user.can(Resource::Promotions, Ability::Manage),
            },
        }),
    )
}

/// Create a pending batch with its student snapshot
pub async fn store(req: Request) -> Response {
    let user = authorize(&req, Resource::Promotions, Ability::Create)?;
    let form: PromotionForm = req.validated()?;
    let db = DB::connection()?;
    let now = now();

    let txn = db.inner().begin().await?;
    let student_ids = form.snapshot(&txn, user.school_id).await?;
    let batch = promotion_batches::ActiveModel {
        school_id: Set(user.school_id),
        from_session_id: Set(form.from_session_id),
        to_session_id: Set(form.to_session_id),
        from_class_section_id: Set(form.from_class_section_id),
        to_class_section_id: Set(form.to_class_section_id),
        status: Set(BatchStatus::Pending.as_str().to_string()),
        created_by: Set(user.id),
        reviewed_by: Set(None),
        rejection_reason: Set(None),
        job_id: Set(None),
        promoted_count: Set(0),
        failure_reason: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    items::Entity::insert_many(student_ids.iter().map(|&student_id| items::ActiveModel {
        batch_id: Set(batch.id),
        student_id: Set(student_id),
        status: Set(items::STATUS_PENDING.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }))
    .exec(&txn)
    .await?;
    txn.commit().await?;

    tracing::info!(batch_id = batch.id, students = student_ids.len(), user_id = user.id, "promotion batch created");
    let id = batch.id.to_string();
    support::created(&batch, "Promotion batch created.", Redirect::route("promotions.show", &[("id", &id)]))
}

/// Move a batch from one of `from` to `to`; 409 when it is in any other state
async fn transition<C: ConnectionTrait>(
    db: &C,
    school_id: i64,
    id: i64,
    from: &[BatchStatus],
    to: BatchStatus,
    changes: Vec<(promotion_batches::Column, SimpleExpr)>,
) -> Result<promotion_batches::Model, FrameworkError> {
    let mut update = promotion_batches::Entity::update_many()
        .col_expr(promotion_batches::Column::Status, Expr::value(to.as_str()))
        .col_expr(promotion_batches::Column::UpdatedAt, Expr::value(now()));
    for (column, value) in changes {
        update = update.col_expr(column, value);
    }
    let result = update
        .filter(promotion_batches::Column::Id.eq(id))
        .filter(promotion_batches::Column::SchoolId.eq(school_id))
        .filter(promotion_batches::Column::Status.is_in(from.iter().map(BatchStatus::as_str)))
        .exec(db)
        .await?;

    let batch = promotion_batches::Entity::find_scoped(db, school_id, id).await?;
    if result.rows_affected == 0 {
        let expected: Vec<&str> = from.iter().map(BatchStatus::as_str).collect();
        return Err(FrameworkError::conflict(format!(
            "The batch is {}; only {} batches can become {}.",
            batch.status,
            expected.join(" or "),
            to.as_str()
        )));
    }
    Ok(batch)
}

pub async fn approve(req: Request) -> Response {
    let user = authorize(&req, Resource::Promotions, Ability::Approve)?;
    let id = support::id(&req)?;
    let db = DB::connection()?;

    let batch = promotion_batches::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    if batch.created_by == user.id {
        tracing::debug!(batch_id = id, user_id = user.id, "creator tried to approve own batch");
        return Err(FrameworkError::Unauthorized.into());
    }

    let batch = transition(
        db.inner(),
        user.school_id,
        id,
        &[BatchStatus::Pending],
        BatchStatus::Approved,
        vec![(promotion_batches::Column::ReviewedBy, Expr::value(user.id))],
    )
    .await?;

    tracing::info!(batch_id = id, user_id = user.id, "promotion batch approved");
    let id = id.to_string();
    support::updated(&batch, "Promotion batch approved.", Redirect::route("promotions.show", &[("id", &id)]))
}

pub async fn reject(req: Request) -> Response {
    let user = authorize(&req, Resource::Promotions, Ability::Approve)?;
    let id = support::id(&req)?;
    let form: RejectForm = support::optional_input(&req)?;
    let db = DB::connection()?;

    let reason = form.reason.filter(|reason| !reason.trim().is_empty());
    let batch = transition(
        db.inner(),
        user.school_id,
        id,
        &[BatchStatus::Pending],
        BatchStatus::Rejected,
        vec![
            (promotion_batches::Column::ReviewedBy, Expr::value(user.id)),
            (promotion_batches::Column::RejectionReason, Expr::value(reason)),
        ],
    )
    .await?;

    tracing::info!(batch_id = id, user_id = user.id, "promotion batch rejected");
    let id = id.to_string();
    support::updated(&batch, "Promotion batch rejected.", Redirect::route("promotions.show", &[("id", &id)]))
}

/// Queue the run of an approved or previously failed batch
pub async fn execute(req: Request) -> Response {
    let user = authorize(&req, Resource::Promotions, Ability::Manage)?;
    let id = support::id(&req)?;
    let db = DB::connection()?;

    transition(
        db.inner(),
        user.school_id,
        id,
        &[BatchStatus::Approved, BatchStatus::Failed],
        BatchStatus::Processing,
        vec![(promotion_batches::Column::FailureReason, Expr::value(Option::<String>::None))],
    )
    .await?;

    let job = PromoteStudents { school_id: user.school_id, batch_id: id };
    let handle = match queue::dispatch(&job).await {
        Ok(handle) => handle,
        Err(err) => {
            tracing::error!(batch_id = id, error = %err, "could not queue promotion");
            transition(
                db.inner(),
                user.school_id,
                id,
                &[BatchStatus::Processing],
                BatchStatus::Failed,
                vec![(promotion_batches::Column::FailureReason, Expr::value(err.to_string()))],
            )
            .await?;
            return Err(err.into());
        }
    };

    // Sync queues have already finished the run, so only the job id is written
    promotion_batches::Entity::update_many()
        .col_expr(promotion_batches::Column::JobId, Expr::value(handle.id()))
        .filter(promotion_batches::Column::Id.eq(id))
        .filter(promotion_batches::Column::SchoolId.eq(user.school_id))
        .exec(db.inner())
        .await?;
    tracing::info!(batch_id = id, job_id = handle.id(), user_id = user.id, "promotion batch queued");

    if InertiaContext::wants_json() {
        let status = status_of(db.inner(), user.school_id, id).await?;
        return HttpResponse::json(json!({ "message": "Promotion queued.", "data": status }))
            .status(202)
            .ok();
    }
    let id = id.to_string();
    Redirect::route("promotions.show", &[("id", &id)])
        .with_success("Promotion queued.")
        .into()
}

async fn status_of<C: ConnectionTrait>(db: &C, school_id: i64, id: i64) -> Result<Value, FrameworkError> {
    let batch = promotion_batches::Entity::find_scoped(db, school_id, id).await?;
    let total = items::Entity::find()
        .filter(items::Column::BatchId.eq(batch.id))
        .count(db)
        .await?;
    let job_status = match batch.job_id {
        Some(job_id) => match queue::store::find(job_id).await {
            Ok(job) => JobStatus::parse(&job.status).map(|status| status.as_str()),
            Err(FrameworkError::ModelNotFound { .. }) => None,
            Err(err) => return Err(err),
        },
        None => None,
    };

    Ok(json!({
        "id": batch.id,
        "status": batch.status,
        "promoted_count": batch.promoted_count,
        "total": total,
        "failure_reason": batch.failure_reason,
        "job_id": batch.job_id,
        "job_status": job_status,
    }))
}

/// Progress for polling clients
pub async fn status(req: Request) -> Response {
    let user = authorize(&req, Resource::Promotions, Ability::View)?;
    let id = support::id(&req)?;
    let db = DB::connection()?;

    let status = status_of(db.inner(), user.school_id, id).await?;
    HttpResponse::json(status).ok()
}

#[cfg(test)]
mod tests {
    use crate::models::{class_sections, promotion_batch_items as items, students};
    use crate::policies::Role;
    use crate::testing::TestApp;
    use campus::database::ModelMut;
    use campus::expect;
    use campus::notification;
    use pretty_assertions::assert_eq;
    use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
    use serde_json::json;

    struct Fixture {
        from_session: i64,
        to_session: i64,
        from_section: i64,
        to_section: i64,
        students: Vec<i64>,
    }

    async fn fixture(app: &TestApp) -> Fixture {
        let from_session = app.session(app.school.id, "2024/25", true).await.id;
        let to_session = app.session(app.school.id, "2025/26", false).await.id;
        let from_section = app.class_section(app.school.id, "Grade 5 A").await.id;
        let to_section = app.class_section(app.school.id, "Grade 6 A").await.id;
        let mut students = Vec::new();
        for admission_no in ["P-1", "P-2", "P-3"] {
            students.push(app.student(app.school.id, from_section, from_session, admission_no).await.id);
        }
        Fixture { from_session, to_session, from_section, to_section, students }
    }

    fn body(f: &Fixture) -> serde_json::Value {
        json!({
            "from_session_id": f.from_session,
            "to_session_id": f.to_session,
            "from_class_section_id": f.from_section,
            "to_class_section_id": f.to_section,
        })
    }

    #[tokio::test]
    async fn runs_an_approved_batch_and_notifies_the_creator() {
        let app = TestApp::new().await;
        let f = fixture(&app).await;
        let (teacher, teacher_token) = app.sign_in(Role::Teacher).await;
        let admin = app.token(Role::Admin).await;

        let created = app.post(&teacher_token, "/promotions", body(&f)).await;
        expect!(created.status_code()).to_equal(201);
        let id = created.json_body()["data"]["id"].as_i64().unwrap();

        expect!(app.post(&teacher_token, &format!("/promotions/{}/approve", id), json!({})).await)
            .to_have_status(403);
        expect!(app.post(&admin, &format!("/promotions/{}/execute", id), json!({})).await).to_have_status(409);
        expect!(app.post(&admin, &format!("/promotions/{}/approve", id), json!({})).await).to_have_status(200);
        expect!(app.post(&admin, &format!("/promotions/{}/approve", id), json!({})).await).to_have_status(409);

        let executed = app.post(&admin, &format!("/promotions/{}/execute", id), json!({})).await;
        expect!(executed.status_code()).to_equal(202);
        let status = executed.json_body()["data"].clone();
        assert_eq!(status["status"], json!("completed"));
        assert_eq!(status["promoted_count"], json!(3));
        assert_eq!(status["total"], json!(3));
        assert_eq!(status["job_status"], json!("completed"));

        for id in &f.students {
            let student = students::Entity::find_by_id(*id).one(app.conn()).await.unwrap().unwrap();
            assert_eq!(student.class_section_id, Some(f.to_section));
            assert_eq!(student.academic_session_id, Some(f.to_session));
        }

        let inbox = notification::for_user(teacher.id, 10).await.unwrap();
        expect!(inbox.len()).to_equal(1);
        expect!(inbox[0].kind.clone()).to_equal("promotion_completed".to_string());

        expect!(app.post(&admin, &format!("/promotions/{}/execute", id), json!({})).await).to_have_status(409);
    }

    #[tokio::test]
    async fn the_creator_cannot_approve_their_own_batch() {
        let app = TestApp::new().await;
        let f = fixture(&app).await;
        let admin = app.token(Role::Admin).await;

        let id = app.post(&admin, "/promotions", body(&f)).await.json_body()["data"]["id"]
            .as_i64()
            .unwrap();
        expect!(app.post(&admin, &format!("/promotions/{}/approve", id), json!({})).await).to_have_status(403);

        let reviewer = app.token(Role::Admin).await;
        let rejected = app
            .post(&reviewer, &format!("/promotions/{}/reject", id), json!({ "reason": "Wrong section" }))
            .await;
        expect!(rejected.status_code()).to_equal(200);
        let batch = rejected.json_body()["data"].clone();
        assert_eq!(batch["status"], json!("rejected"));
        assert_eq!(batch["rejection_reason"], json!("Wrong section"));

        expect!(app.post(&reviewer, &format!("/promotions/{}/approve", id), json!({})).await).to_have_status(409);
    }

    #[tokio::test]
    async fn snapshots_listed_or_active_students() {
        let app = TestApp::new().await;
        let f = fixture(&app).await;
        let token = app.token(Role::Teacher).await;

        let mut listed = body(&f);
        listed["student_ids"] = json!([f.students[0], f.students[0], f.students[2]]);
        let id = app.post(&token, "/promotions", listed).await.json_body()["data"]["id"]
            .as_i64()
            .unwrap();
        let snapshot = items::Entity::find()
            .filter(items::Column::BatchId.eq(id))
            .all(app.conn())
            .await
            .unwrap();
        expect!(snapshot.len()).to_equal(2);

        let mut foreign = body(&f);
        let outsider = app.class_section(app.other_school.id, "Elsewhere").await;
        let session = app.session(app.other_school.id, "2024/25", true).await;
        let stranger = app.student(app.other_school.id, outsider.id, session.id, "X-1").await;
        foreign["student_ids"] = json!([f.students[1], stranger.id]);
        expect!(app.post(&token, "/promotions", foreign).await).to_have_validation_error("student_ids");

        let mut empty = body(&f);
        empty["from_class_section_id"] = json!(f.to_section);
        empty["to_class_section_id"] = json!(f.from_section);
        expect!(app.post(&token, "/promotions", empty).await).to_have_validation_error("student_ids");

        let mut same = body(&f);
        same["to_session_id"] = json!(f.from_session);
        same["to_class_section_id"] = json!(f.from_section);
        expect!(app.post(&token, "/promotions", same).await).to_have_validation_error("to_class_section_id");
    }

    #[tokio::test]
    async fn a_failed_run_can_be_executed_again() {
        let app = TestApp::new().await;
        let f = fixture(&app).await;
        let (creator, token) = app.sign_in(Role::Admin).await;
        let reviewer = app.token(Role::Admin).await;

        let id = app.post(&token, "/promotions", body(&f)).await.json_body()["data"]["id"]
            .as_i64()
            .unwrap();
        app.post(&reviewer, &format!("/promotions/{}/approve", id), json!({})).await;

        class_sections::Entity::soft_delete(app.conn(), app.school.id, f.to_section).await.unwrap();
        let executed = app.post(&token, &format!("/promotions/{}/execute", id), json!({})).await;
        expect!(executed.status_code()).to_equal(202);
        let status = executed.json_body()["data"].clone();
        assert_eq!(status["status"], json!("failed"));
        assert_eq!(status["job_status"], json!("failed"));
        expect!(status["failure_reason"].is_string()).to_be_true();

        let inbox = notification::for_user(creator.id, 10).await.unwrap();
        expect!(inbox[0].kind.clone()).to_equal("promotion_failed".to_string());

        class_sections::Entity::restore(app.conn(), app.school.id, f.to_section).await.unwrap();
        let executed = app.post(&token, &format!("/promotions/{}/execute", id), json!({})).await;
        let status = executed.json_body()["data"].clone();
        assert_eq!(status["status"], json!("completed"));
        assert_eq!(status["promoted_count"], json!(3));
        assert_eq!(status["failure_reason"], json!(null));

        let polled = app.get(Some(&token), &format!("/promotions/{}/status", id)).await.json_body();
        assert_eq!(polled, status);
    }

    #[tokio::test]
    async fn a_batch_that_cannot_be_queued_is_marked_failed() {
        let app = TestApp::new().await;
        let f = fixture(&app).await;
        let token = app.token(Role::Admin).await;
        let reviewer = app.token(Role::Admin).await;

        let id = app.post(&token, "/promotions", body(&f)).await.json_body()["data"]["id"]
            .as_i64()
            .unwrap();
        app.post(&reviewer, &format!("/promotions/{}/approve", id), json!({})).await;

        app.conn().execute_unprepared("DROP TABLE jobs").await.unwrap();
        expect!(app.post(&token, &format!("/promotions/{}/execute", id), json!({})).await).to_have_status(500);

        let polled = app.get(Some(&token), &format!("/promotions/{}/status", id)).await.json_body();
        assert_eq!(polled["status"], json!("failed"));
        assert_eq!(polled["job_id"], json!(null));
        expect!(polled["failure_reason"].is_string()).to_be_true();
        for id in &f.students {
            let student = students::Entity::find_by_id(*id).one(app.conn()).await.unwrap().unwrap();
            assert_eq!(student.class_section_id, Some(f.from_section));
        }
    }

    #[tokio::test]
    async fn accountants_cannot_see_promotions() {
        let app = TestApp::new().await;
        let token = app.token(Role::Accountant).await;

        expect!(app.get(Some(&token), "/promotions").await).to_have_status(403);
    }
}

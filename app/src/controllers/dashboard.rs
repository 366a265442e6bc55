use campus::database::{Model, Trashed};
use campus::notification;
use campus::{Inertia, Request, Response, DB};
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait};
use serde_json::{json, Value};

use super::support::authorize;
use crate::middleware::AuthUser;
use crate::models::{academic_sessions, schools, staff, students, vehicles};
use crate::policies::{Ability, Resource};

/// Live rows of `E`, or null when the user may not list them
async fn count<E, C>(db: &C, user: &AuthUser, resource: Resource) -> Result<Value, sea_orm::DbErr>
where
    E: Model,
    E::Model: Sync,
    C: ConnectionTrait,
{
    if !user.can(resource, Ability::View) {
        return Ok(Value::Null);
    }
    Ok(json!(E::query(user.school_id, Trashed::Without).count(db).await?))
}

pub async fn index(req: Request) -> Response {
    let user = authorize(&req, Resource::Dashboard, Ability::View)?;
    let db = DB::connection()?;
    let db = db.inner();

    let school = schools::Entity::find_by_id(user.school_id).one(db).await?;
    let session = academic_sessions::current(db, user.school_id).await?;

    Inertia::render(
        "Dashboard",
        json!({
            "school": school,
            "current_session": session,
            "counts": {
                "students": count::<students::Entity, _>(db, &user, Resource::Students).await?,
                "staff": count::<staff::Entity, _>(db, &user, Resource::Staff).await?,
                "vehicles": count::<vehicles::Entity, _>(db, &user, Resource::Vehicles).await?,
            },
            "unread_notifications": notification::unread_count(user.id).await?,
        }),
    )
}

#[cfg(test)]
mod tests {
    use crate::policies::Role;
    use crate::testing::TestApp;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn counts_what_the_role_may_see() {
        let app = TestApp::new().await;
        let session = app.session(app.school.id, "2024/25", true).await;
        let section = app.class_section(app.school.id, "Grade 1 A").await;
        app.student(app.school.id, section.id, session.id, "D-1").await;
        app.student(app.school.id, section.id, session.id, "D-2").await;
        let elsewhere = app.class_section(app.other_school.id, "Grade 1 A").await;
        let other_session = app.session(app.other_school.id, "2024/25", true).await;
        app.student(app.other_school.id, elsewhere.id, other_session.id, "D-1").await;

        let token = app.token(Role::Accountant).await;
        let body = app.get(Some(&token), "/").await.json_body();
        assert_eq!(body["counts"]["students"], json!(2));
        assert_eq!(body["counts"]["vehicles"], json!(null));
        assert_eq!(body["current_session"]["name"], json!("2024/25"));
        assert_eq!(body["school"]["code"], json!("HILL"));
        assert_eq!(body["unread_notifications"], json!(0));
    }

    #[tokio::test]
    async fn guests_are_rejected() {
        let app = TestApp::new().await;

        assert_eq!(app.get(None, "/").await.status_code(), 401);
    }
}

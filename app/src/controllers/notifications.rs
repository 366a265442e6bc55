//! The signed-in user's inbox

use campus::notification;
use campus::{HttpResponse, Inertia, Request, Response};
use serde::Deserialize;
use serde_json::{json, Value};

use super::support;
use crate::middleware::AuthUser;

#[derive(Debug, Deserialize)]
struct InboxQuery {
    limit: Option<u64>,
}

pub async fn index(req: Request) -> Response {
    let user = AuthUser::from_request(&req)?;
    let limit = req.query::<InboxQuery>()?.limit.unwrap_or(50).clamp(1, 200);

    let notifications: Vec<Value> = notification::for_user(user.id, limit)
        .await?
        .iter()
        .map(notification::present)
        .collect();

    Inertia::render(
        "Notifications/Index",
        json!({
            "notifications": notifications,
            "unread": notification::unread_count(user.id).await?,
        }),
    )
}

pub async fn mark_read(req: Request) -> Response {
    let user = AuthUser::from_request(&req)?;
    let id = support::id(&req)?;

    let record = notification::mark_read(user.id, id).await?;
    HttpResponse::json(json!({
        "data": notification::present(&record),
        "unread": notification::unread_count(user.id).await?,
    }))
    .ok()
}

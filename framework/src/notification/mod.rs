//! Notifications
//!
//! A notification is stored in the `notifications` table for the recipient's
//! in-app inbox and, when it has a mail representation, sent through the
//! bound `Mailer`.
//!
//! ```rust,ignore
//! use campus::notification::{self, MailMessage, Notifiable, Notification};
//!
//! struct PayrollPaid { amount: i64 }
//!
//! impl Notification for PayrollPaid {
//!     fn kind(&self) -> &'static str { "payroll_paid" }
//!
//!     fn to_database(&self) -> serde_json::Value {
//!         serde_json::json!({ "amount": self.amount })
//!     }
//! }
//!
//! notification::send(&Notifiable::new(7, "amy@hillside.test", "Amy"), &PayrollPaid { amount: 100 }).await?;
//! ```

pub mod entity;
pub mod mail;
pub mod migration;

pub use entity::notifications;
pub use mail::{mailer, LogMailer, MailConfig, MailMessage, Mailer, SmtpMailer};
pub use migration::CreateNotificationsTable;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};
use serde_json::Value;

use crate::database::DB;
use crate::error::FrameworkError;

/// A user that can receive notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notifiable {
    pub user_id: i64,
    pub email: String,
    pub name: String,
}

impl Notifiable {
    pub fn new(user_id: i64, email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
            name: name.into(),
        }
    }
}

pub trait Notification: Send + Sync {
    /// Short machine name stored as `kind`
    fn kind(&self) -> &'static str;

    /// Payload stored for the in-app inbox
    fn to_database(&self) -> Value;

    fn to_mail(&self, _notifiable: &Notifiable) -> Option<MailMessage> {
        None
    }
}

/// Store the notification and mail it when it has a mail form
///
/// Mail failures are logged; the stored notification stands.
pub async fn send<N: Notification + ?Sized>(
    notifiable: &Notifiable,
    notification: &N,
) -> Result<notifications::Model, FrameworkError> {
    let db = DB::connection()?;
    let now = Utc::now().naive_utc();

    let stored = notifications::ActiveModel {
        user_id: Set(notifiable.user_id),
        kind: Set(notification.kind().to_string()),
        data: Set(notification.to_database().to_string()),
        read_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db.inner())
    .await?;

    if let Some(message) = notification.to_mail(notifiable) {
        let delivered = match mailer() {
            Ok(mailer) => mailer.send(&message).await,
            Err(err) => Err(err),
        };
        if let Err(err) = delivered {
            tracing::warn!(
                kind = notification.kind(),
                user_id = notifiable.user_id,
                error = %err,
                "notification mail not delivered"
            );
        }
    }

    tracing::debug!(kind = notification.kind(), user_id = notifiable.user_id, "notification sent");
    Ok(stored)
}

/// Send the same notification to every recipient
///
/// Returns how many were stored. One failed recipient does not stop the rest.
pub async fn send_all<N: Notification + ?Sized>(recipients: &[Notifiable], notification: &N) -> usize {
    let mut sent = 0;
    for notifiable in recipients {
        match send(notifiable, notification).await {
            Ok(_) => sent += 1,
            Err(err) => tracing::error!(
                kind = notification.kind(),
                user_id = notifiable.user_id,
                error = %err,
                "notification not stored"
            ),
        }
    }
    sent
}

/// Latest notifications for a user, newest first
pub async fn for_user(user_id: i64, limit: u64) -> Result<Vec<notifications::Model>, FrameworkError> {
    let db = DB::connection()?;
    Ok(notifications::Entity::find()
        .filter(notifications::Column::UserId.eq(user_id))
        .order_by_desc(notifications::Column::Id)
        .limit(limit)
        .all(db.inner())
        .await?)
}

pub async fn unread_count(user_id: i64) -> Result<u64, FrameworkError> {
    use sea_orm::PaginatorTrait;

    let db = DB::connection()?;
    Ok(notifications::Entity::find()
        .filter(notifications::Column::UserId.eq(user_id))
        .filter(notifications::Column::ReadAt.is_null())
        .count(db.inner())
        .await?)
}

/// Mark one of the user's notifications read; reading twice is a no-op
pub async fn mark_read(user_id: i64, id: i64) -> Result<notifications::Model, FrameworkError> {
    let db = DB::connection()?;
    let now = Utc::now().naive_utc();

    notifications::Entity::update_many()
        .col_expr(notifications::Column::ReadAt, Expr::value(now))
        .col_expr(notifications::Column::UpdatedAt, Expr::value(now))
        .filter(notifications::Column::Id.eq(id))
        .filter(notifications::Column::UserId.eq(user_id))
        .filter(notifications::Column::ReadAt.is_null())
        .exec(db.inner())
        .await?;

    notifications::Entity::find_by_id(id)
        .filter(notifications::Column::UserId.eq(user_id))
        .one(db.inner())
        .await?
        .ok_or_else(|| FrameworkError::model_not_found("Notification"))
}

/// JSON shape used by inbox listings
pub fn present(record: &notifications::Model) -> Value {
    serde_json::json!({
        "id": record.id,
        "kind": record.kind,
        "data": serde_json::from_str::<Value>(&record.data).unwrap_or(Value::Null),
        "read_at": record.read_at,
        "created_at": record.created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeMailer, TestDatabase};
    use sea_orm_migration::prelude::*;

    struct InboxMigrator;

    #[async_trait::async_trait]
    impl MigratorTrait for InboxMigrator {
        fn migrations() -> Vec<Box<dyn MigrationTrait>> {
            vec![Box::new(CreateNotificationsTable)]
        }
    }

    struct NoticePublished {
        title: String,
        mail: bool,
    }

    impl Notification for NoticePublished {
        fn kind(&self) -> &'static str {
            "notice_published"
        }

        fn to_database(&self) -> Value {
            serde_json::json!({ "title": self.title })
        }

        fn to_mail(&self, notifiable: &Notifiable) -> Option<MailMessage> {
            self.mail.then(|| {
                MailMessage::new(&notifiable.email, format!("New notice: {}", self.title))
                    .to_name(&notifiable.name)
            })
        }
    }

    #[tokio::test]
    async fn stores_and_mails() {
        let _db = TestDatabase::fresh::<InboxMigrator>().await.unwrap();
        let mailer = FakeMailer::install();
        let amy = Notifiable::new(1, "amy@hillside.test", "Amy");

        let notice = NoticePublished { title: "Sports day".to_string(), mail: true };
        let stored = send(&amy, &notice).await.unwrap();

        assert_eq!(stored.kind, "notice_published");
        assert_eq!(present(&stored)["data"]["title"], "Sports day");
        assert_eq!(mailer.sent().len(), 1);
        assert_eq!(mailer.sent()[0].subject, "New notice: Sports day");
        assert_eq!(mailer.sent()[0].to_name.as_deref(), Some("Amy"));
    }

    #[tokio::test]
    async fn inbox_is_per_user() {
        let _db = TestDatabase::fresh::<InboxMigrator>().await.unwrap();
        let _mailer = FakeMailer::install();
        let amy = Notifiable::new(1, "amy@hillside.test", "Amy");
        let ben = Notifiable::new(2, "ben@hillside.test", "Ben");
        let notice = NoticePublished { title: "Exams".to_string(), mail: false };

        assert_eq!(send_all(&[amy.clone(), ben.clone()], &notice).await, 2);
        let first = send(&amy, &notice).await.unwrap();

        assert_eq!(for_user(1, 10).await.unwrap().len(), 2);
        assert_eq!(for_user(1, 10).await.unwrap()[0].id, first.id);
        assert_eq!(unread_count(1).await.unwrap(), 2);

        let read = mark_read(1, first.id).await.unwrap();
        assert!(read.read_at.is_some());
        assert_eq!(mark_read(1, first.id).await.unwrap().read_at, read.read_at);
        assert_eq!(unread_count(1).await.unwrap(), 1);

        // Another user's notification is invisible
        assert_eq!(mark_read(2, first.id).await.unwrap_err().status_code(), 404);
    }
}

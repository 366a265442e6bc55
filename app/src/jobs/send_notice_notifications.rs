use campus::database::Model;
use campus::notification;
use campus::queue::Job;
use campus::{async_trait, FrameworkError, DB};
use serde::{Deserialize, Serialize};

use crate::models::{notices, users};
use crate::notifications::NoticePublished;

/// Notify everyone in a published notice's audience
#[derive(Debug, Serialize, Deserialize)]
pub struct SendNoticeNotifications {
    pub school_id: i64,
    pub notice_id: i64,
}

#[async_trait]
impl Job for SendNoticeNotifications {
    const NAME: &'static str = "send_notice_notifications";

    async fn handle(&self) -> Result<(), FrameworkError> {
        let db = DB::connection()?;
        let notice = match notices::Entity::find_scoped(db.inner(), self.school_id, self.notice_id).await {
            Ok(notice) if notice.is_published() => notice,
            Ok(_) | Err(FrameworkError::ModelNotFound { .. }) => {
                tracing::warn!(notice_id = self.notice_id, "notice gone or unpublished, nothing to send");
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let recipients: Vec<_> = users::with_roles(db.inner(), self.school_id, notice.audience_roles())
            .await?
            .iter()
            .filter(|user| user.id != notice.created_by)
            .map(users::Model::notifiable)
            .collect();

        let sent = notification::send_all(&recipients, &NoticePublished::new(&notice)).await;
        tracing::info!(notice_id = notice.id, recipients = recipients.len(), sent, "notice notifications sent");
        Ok(())
    }
}

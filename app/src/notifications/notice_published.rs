use campus::notification::{MailMessage, Notifiable, Notification};
use serde_json::{json, Value};

use crate::models::notices;

pub struct NoticePublished {
    pub notice_id: i64,
    pub title: String,
    pub body: String,
}

impl NoticePublished {
    pub fn new(notice: &notices::Model) -> Self {
        Self {
            notice_id: notice.id,
            title: notice.title.clone(),
            body: notice.body.clone(),
        }
    }
}

impl Notification for NoticePublished {
    fn kind(&self) -> &'static str {
        "notice_published"
    }

    fn to_database(&self) -> Value {
        json!({ "notice_id": self.notice_id, "title": self.title })
    }

    fn to_mail(&self, notifiable: &Notifiable) -> Option<MailMessage> {
        Some(
            MailMessage::new(&notifiable.email, format!("New notice: {}", self.title))
                .to_name(&notifiable.name)
                .line(&self.body),
        )
    }
}

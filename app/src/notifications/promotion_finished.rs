use campus::notification::{MailMessage, Notifiable, Notification};
use serde_json::{json, Value};

/// Tells the creator of a promotion batch how its run ended
pub struct PromotionFinished {
    pub batch_id: i64,
    pub promoted_count: i32,
    /// Set when the run failed
    pub failure_reason: Option<String>,
}

impl PromotionFinished {
    pub fn completed(batch_id: i64, promoted_count: i32) -> Self {
        Self {
            batch_id,
            promoted_count,
            failure_reason: None,
        }
    }

    pub fn failed(batch_id: i64, reason: impl Into<String>) -> Self {
        Self {
            batch_id,
            promoted_count: 0,
            failure_reason: Some(reason.into()),
        }
    }

    fn succeeded(&self) -> bool {
        self.failure_reason.is_none()
    }
}

impl Notification for PromotionFinished {
    fn kind(&self) -> &'static str {
        if self.succeeded() {
            "promotion_completed"
        } else {
            "promotion_failed"
        }
    }

    fn to_database(&self) -> Value {
        json!({
            "batch_id": self.batch_id,
            "promoted_count": self.promoted_count,
            "failure_reason": self.failure_reason,
        })
    }

    fn to_mail(&self, notifiable: &Notifiable) -> Option<MailMessage> {
        let message = match &self.failure_reason {
            None => MailMessage::new(&notifiable.email, format!("Promotion batch #{} completed", self.batch_id))
                .line(format!("{} students were promoted.", self.promoted_count)),
            Some(reason) => MailMessage::new(&notifiable.email, format!("Promotion batch #{} failed", self.batch_id))
                .line(format!("The promotion stopped with an error: {}", reason))
                .line("Students already promoted keep their new class. The batch can be executed again."),
        };
        Some(message.to_name(&notifiable.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_outcome() {
        assert_eq!(PromotionFinished::completed(1, 20).kind(), "promotion_completed");

        let failed = PromotionFinished::failed(1, "database is locked");
        assert_eq!(failed.kind(), "promotion_failed");
        let mail = failed.to_mail(&Notifiable::new(1, "amy@hillside.test", "Amy")).unwrap();
        assert!(mail.body.contains("database is locked"));
    }
}

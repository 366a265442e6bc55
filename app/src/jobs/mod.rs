//! Queued jobs
//!
//! Every job is registered here so `campus queue:work` can run it by name.

mod promote_students;
mod send_notice_notifications;

pub use promote_students::PromoteStudents;
pub use send_notice_notifications::SendNoticeNotifications;

campus::register_job!(PromoteStudents);
campus::register_job!(SendNoticeNotifications);

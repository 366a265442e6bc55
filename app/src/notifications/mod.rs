//! Application notifications
//!
//! Each is stored in the in-app inbox and, where it has a mail form,
//! mailed through the bound `Mailer`.

mod notice_published;
mod payroll_paid;
mod promotion_finished;

pub use notice_published::NoticePublished;
pub use payroll_paid::PayrollPaid;
pub use promotion_finished::PromotionFinished;

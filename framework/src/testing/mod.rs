//! Test helpers
//!
//! - `expect!` fluent assertions
//! - `TestDatabase` for an isolated, migrated SQLite database per test
//! - `TestContainer` for per-thread service overrides
//! - `FakeMailer` to capture outgoing mail
//!
//! ```rust,ignore
//! use campus::expect;
//! use campus::testing::{FakeMailer, TestDatabase};
//!
//! #[tokio::test]
//! async fn pays_staff() {
//!     let _db = TestDatabase::fresh::<Migrator>().await.unwrap();
//!     let mail = FakeMailer::install();
//!     // ...
//!     expect!(mail.sent()).to_have_length(1);
//! }
//! ```

mod expect;
mod fake_mailer;

pub use crate::container::testing::{TestContainer, TestContainerGuard};
pub use crate::database::testing::TestDatabase;
pub use expect::Expect;
pub use fake_mailer::FakeMailer;

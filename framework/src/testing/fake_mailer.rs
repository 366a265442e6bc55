use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::container::testing::TestContainer;
use crate::error::FrameworkError;
use crate::notification::{MailMessage, Mailer};

/// Records mail instead of sending it
#[derive(Clone, Default)]
pub struct FakeMailer {
    sent: Arc<Mutex<Vec<MailMessage>>>,
}

impl FakeMailer {
    /// Bind a fresh fake as this thread's `Mailer`
    pub fn install() -> Self {
        let fake = Self::default();
        TestContainer::bind::<dyn Mailer>(Arc::new(fake.clone()));
        fake
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn sent_to(&self, address: &str) -> Vec<MailMessage> {
        self.sent().into_iter().filter(|m| m.to == address).collect()
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), FrameworkError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        Ok(())
    }
}

//! Out-of-band delivery of confirmation links.

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::info;
use url::Url;
use warden_common::{ConditionalSync, SharedCell};

/// A confirmation email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    /// Recipient address.
    pub to: String,
    /// The confirmation link.
    pub url: Url,
}

/// Delivers confirmation emails. Delivery is fire-and-forget; failures
/// are the notifier's to log.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait Notifier: ConditionalSync + Debug {
    /// Sends `email`.
    async fn send(&self, email: Email);
}

/// Keeps every email in an outbox.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    outbox: Arc<SharedCell<Vec<Email>>>,
    arrived: Arc<Notify>,
}

impl MemoryNotifier {
    /// An empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far.
    pub fn outbox(&self) -> Vec<Email> {
        self.outbox.get()
    }

    /// Waits until at least `count` emails were sent and returns the
    /// `count`th.
    pub async fn wait_for(&self, count: usize) -> Email {
        loop {
            let arrived = self.arrived.notified();
            if let Some(email) = count.checked_sub(1).and_then(|i| self.outbox.read().get(i).cloned()) {
                return email;
            }
            arrived.await;
        }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Notifier for MemoryNotifier {
    async fn send(&self, email: Email) {
        info!(to = %email.to, "sending confirmation email");
        self.outbox.write().push(email);
        self.arrived.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn waiters_see_emails_sent_later() -> testresult::TestResult {
        let notifier = MemoryNotifier::new();
        let email = Email {
            to: "alice@example.com".into(),
            url: Url::parse("https://up.example.com/validate-email?ucan=x")?,
        };

        let waiter = tokio::spawn({
            let notifier = notifier.clone();
            async move { notifier.wait_for(1).await }
        });
        tokio::task::yield_now().await;
        notifier.send(email.clone()).await;

        assert_eq!(waiter.await?, email);
        assert_eq!(notifier.outbox(), vec![email]);
        Ok(())
    }
}

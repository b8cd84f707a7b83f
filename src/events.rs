use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

const CHANNEL_CAPACITY: usize = 64;

/// Fired after every successful debit so observers can re-read the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountChanged {
    pub account_id: String,
    pub credit_balance: u64,
    pub at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AccountEvents {
    sender: broadcast::Sender<AccountChanged>,
}

impl AccountEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Returns how many observers received the event. Zero is fine.
    pub fn publish(&self, event: AccountChanged) -> usize {
        log::debug!(
            "Account {} changed, balance {}",
            event.account_id,
            event.credit_balance
        );
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AccountChanged> {
        self.sender.subscribe()
    }

    pub fn stream(&self) -> BroadcastStream<AccountChanged> {
        BroadcastStream::new(self.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for AccountEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn changed(balance: u64) -> AccountChanged {
        AccountChanged {
            account_id: "acct".into(),
            credit_balance: balance,
            at: Utc::now(),
        }
    }

    #[test]
    fn publish_without_observers() {
        let events = AccountEvents::new();
        assert_eq!(events.publish(changed(1)), 0);
    }

    #[tokio::test]
    async fn every_subscriber_sees_the_event() {
        let events = AccountEvents::new();
        let mut first = events.subscribe();
        let mut second = events.stream();

        assert_eq!(events.publish(changed(40)), 2);

        assert_eq!(first.recv().await.unwrap().credit_balance, 40);
        let via_stream = second.next().await.unwrap().unwrap();
        assert_eq!(via_stream.credit_balance, 40);
    }
}

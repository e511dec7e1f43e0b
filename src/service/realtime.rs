//! In-process change feed. Every write publishes a [`ChangeEvent`]; open
//! dashboards hold a [`Subscription`] and refetch when a matching event
//! arrives.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

const FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    Tickets,
    TicketChatMessages,
    TicketAttachments,
    TicketAssignments,
    TicketFeedback,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeEvent {
    pub table: ChangeTable,
    pub kind: ChangeKind,
    pub ticket_id: Uuid,
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(table: ChangeTable, kind: ChangeKind, ticket_id: Uuid) -> Self {
        ChangeEvent {
            table,
            kind,
            ticket_id,
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
pub struct SubscriptionFilter {
    pub table: Option<ChangeTable>,
    pub ticket_id: Option<Uuid>,
}

impl SubscriptionFilter {
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        self.table.map_or(true, |t| t == event.table)
            && self.ticket_id.map_or(true, |id| id == event.ticket_id)
    }
}

/// What a subscriber receives next.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    Change(ChangeEvent),
    /// The subscriber fell behind and `n` events were dropped; refetch.
    Lagged(u64),
}

#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
    subscribers: Arc<AtomicUsize>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        ChangeFeed {
            sender,
            subscribers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publishing with nobody listening is not an error.
    pub fn publish(&self, event: ChangeEvent) {
        tracing::debug!(
            "change {:?}/{:?} on ticket {}",
            event.table,
            event.kind,
            event.ticket_id
        );
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self, filter: SubscriptionFilter) -> Subscription {
        let count = self.subscribers.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!("realtime subscriber joined ({} active)", count);
        Subscription {
            receiver: self.sender.subscribe(),
            filter,
            subscribers: self.subscribers.clone(),
        }
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::SeqCst)
    }
}

/// Live subscription. Dropping it unsubscribes.
pub struct Subscription {
    receiver: broadcast::Receiver<ChangeEvent>,
    filter: SubscriptionFilter,
    subscribers: Arc<AtomicUsize>,
}

impl Subscription {
    /// Next matching event. `None` once the feed is gone.
    pub async fn recv(&mut self) -> Option<FeedMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => {
                    return Some(FeedMessage::Change(event))
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("realtime subscriber lagged, {} events skipped", skipped);
                    return Some(FeedMessage::Lagged(skipped));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let remaining = self.subscribers.fetch_sub(1, Ordering::SeqCst) - 1;
        tracing::info!("realtime subscriber left ({} active)", remaining);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn filtered_subscription_skips_other_tickets() {
        let feed = ChangeFeed::new();
        let watched = Uuid::new_v4();
        let mut sub = feed.subscribe(SubscriptionFilter {
            table: Some(ChangeTable::TicketChatMessages),
            ticket_id: Some(watched),
        });

        feed.publish(ChangeEvent::new(
            ChangeTable::TicketChatMessages,
            ChangeKind::Insert,
            Uuid::new_v4(),
        ));
        feed.publish(ChangeEvent::new(ChangeTable::Tickets, ChangeKind::Update, watched));
        feed.publish(ChangeEvent::new(
            ChangeTable::TicketChatMessages,
            ChangeKind::Insert,
            watched,
        ));

        match sub.recv().await {
            Some(FeedMessage::Change(event)) => {
                assert_eq!(event.ticket_id, watched);
                assert_eq!(event.table, ChangeTable::TicketChatMessages);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn dropping_subscription_releases_it() {
        let feed = ChangeFeed::new();
        let a = feed.subscribe(SubscriptionFilter::default());
        let b = feed.subscribe(SubscriptionFilter::default());
        assert_eq!(feed.subscriber_count(), 2);

        drop(a);
        assert_eq!(feed.subscriber_count(), 1);
        drop(b);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn slow_subscriber_is_told_to_refetch() {
        let feed = ChangeFeed::new();
        let mut sub = feed.subscribe(SubscriptionFilter::default());
        let id = Uuid::new_v4();
        for _ in 0..(FEED_CAPACITY + 10) {
            feed.publish(ChangeEvent::new(ChangeTable::Tickets, ChangeKind::Update, id));
        }

        assert!(matches!(sub.recv().await, Some(FeedMessage::Lagged(n)) if n >= 10));
        assert!(matches!(sub.recv().await, Some(FeedMessage::Change(_))));
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let feed = ChangeFeed::new();
        feed.publish(ChangeEvent::new(
            ChangeTable::TicketFeedback,
            ChangeKind::Insert,
            Uuid::new_v4(),
        ));
        assert_eq!(feed.subscriber_count(), 0);
    }
}

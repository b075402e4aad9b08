use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::debug;

use crate::lock::lock_or_recover;

#[derive(Debug, Default)]
struct Subscribers {
    next_id: u64,
    senders: HashMap<u64, Sender<String>>,
}

fn lock_subscribers(subscribers: &Mutex<Subscribers>) -> MutexGuard<'_, Subscribers> {
    lock_or_recover(subscribers, "feed_subscribers")
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotFeed {
    subscribers: Arc<Mutex<Subscribers>>,
}

impl SnapshotFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> FeedSubscription {
        let (sender, receiver) = mpsc::channel();
        let mut subscribers = lock_subscribers(&self.subscribers);
        let id = subscribers.next_id;
        subscribers.next_id = subscribers.next_id.saturating_add(1);
        subscribers.senders.insert(id, sender);
        debug!(subscriber = id, "feed_subscribed");
        FeedSubscription {
            id,
            receiver,
            feed: Arc::downgrade(&self.subscribers),
        }
    }

    pub fn publish(&self, payload: impl Into<String>) -> usize {
        let payload = payload.into();
        let mut subscribers = lock_subscribers(&self.subscribers);
        subscribers
            .senders
            .retain(|_, sender| sender.send(payload.clone()).is_ok());
        subscribers.senders.len()
    }

    pub fn subscriber_count(&self) -> usize {
        lock_subscribers(&self.subscribers).senders.len()
    }
}

/// Receiving side of one registration. Dropping it unregisters from the feed.
#[derive(Debug)]
pub struct FeedSubscription {
    id: u64,
    receiver: Receiver<String>,
    feed: Weak<Mutex<Subscribers>>,
}

impl FeedSubscription {
    pub fn try_next(&self) -> Option<String> {
        self.receiver.try_recv().ok()
    }

    pub fn drain(&self) -> Vec<String> {
        self.receiver.try_iter().collect()
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.feed.upgrade() {
            lock_subscribers(&subscribers).senders.remove(&self.id);
            debug!(subscriber = self.id, "feed_unsubscribed");
        }
    }
}

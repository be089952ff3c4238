use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use crate::workflows::hiring::domain::Clock;

/// Anything that wants to hear the one-second heartbeat.
pub trait TickSubscriber: Send + Sync {
    fn on_tick(&self, now: DateTime<Utc>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Single tick source fanned out to every subscriber.
///
/// The subscriber list is snapshotted before delivery, so a subscriber may subscribe or
/// unsubscribe from inside `on_tick` without deadlocking.
pub struct Ticker {
    subscribers: Mutex<Vec<(SubscriptionId, Arc<dyn TickSubscriber>)>>,
    next_id: AtomicU64,
}

impl Ticker {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn subscribe(&self, subscriber: Arc<dyn TickSubscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, subscriber));
        id
    }

    /// Returns `false` when the id was never registered or already removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    /// Delivers one tick, returning how many subscribers received it.
    pub fn fire(&self, now: DateTime<Utc>) -> usize {
        let snapshot: Vec<Arc<dyn TickSubscriber>> = self
            .lock()
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();

        for subscriber in &snapshot {
            subscriber.on_tick(now);
        }
        snapshot.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, Arc<dyn TickSubscriber>)>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticker")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Spawns a background task firing `ticker` every `period` using `clock` for timestamps.
pub fn drive<C>(ticker: Arc<Ticker>, clock: Arc<C>, period: Duration) -> JoinHandle<()>
where
    C: Clock + ?Sized + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately; the countdown starts one period later.
        interval.tick().await;
        loop {
            interval.tick().await;
            ticker.fire(clock.now());
        }
    })
}

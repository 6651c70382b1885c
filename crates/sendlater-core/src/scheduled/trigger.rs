//! Trigger source - durable one-shot alarms and periodic ticks
//!
//! Each work item holds at most one armed alarm; re-arming an id
//! replaces the previous alarm and `disarm` cancels it. Alarm state is
//! not itself the durable record: the scheduler rebuilds every alarm
//! from the work store at startup, so a restart loses nothing.
//!
//! Alarms armed for a past instant fire as soon as possible.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

/// Event delivered to the worker loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerEvent {
    /// A one-shot alarm reached its instant
    Fired(Uuid),
    /// A periodic tick (e.g. the follow-up sweep)
    Sweep(String),
}

/// One-shot alarm registry plus periodic tick factory
pub struct TriggerSource {
    events: mpsc::UnboundedSender<TriggerEvent>,
    alarms: Arc<Mutex<HashMap<Uuid, JoinHandle<()>>>>,
}

impl TriggerSource {
    /// Create a trigger source and the event stream it feeds
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TriggerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                events: tx,
                alarms: Arc::new(Mutex::new(HashMap::new())),
            },
            rx,
        )
    }

    /// Register a one-shot alarm for the id, replacing any armed alarm
    pub async fn arm(&self, id: Uuid, when: DateTime<Utc>) {
        let delay = (when - Utc::now()).to_std().unwrap_or(Duration::ZERO);

        let mut alarms = self.alarms.lock().await;
        if let Some(previous) = alarms.remove(&id) {
            previous.abort();
            debug!(%id, "Replaced armed trigger");
        }

        let events = self.events.clone();
        let registry = Arc::clone(&self.alarms);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            registry.lock().await.remove(&id);
            let _ = events.send(TriggerEvent::Fired(id));
        });

        alarms.insert(id, handle);
    }

    /// Cancel the alarm for an id; no-op when absent
    pub async fn disarm(&self, id: Uuid) {
        if let Some(handle) = self.alarms.lock().await.remove(&id) {
            handle.abort();
            debug!(%id, "Disarmed trigger");
        }
    }

    /// Whether an alarm is currently armed for the id
    pub async fn is_armed(&self, id: Uuid) -> bool {
        self.alarms.lock().await.contains_key(&id)
    }

    /// Number of armed alarms
    pub async fn armed_count(&self) -> usize {
        self.alarms.lock().await.len()
    }

    /// Start a recurring tick with the given tag. The first tick fires
    /// one full interval after registration.
    pub fn periodic(&self, tag: &str, interval_minutes: u64) -> JoinHandle<()> {
        let events = self.events.clone();
        let tag = tag.to_string();

        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_secs(interval_minutes.max(1) * 60));
            // interval's first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if events.send(TriggerEvent::Sweep(tag.clone())).is_err() {
                    break;
                }
            }
        })
    }
}

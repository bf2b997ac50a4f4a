//! Per-node publish/subscribe event broadcaster (spec §4.1).
//!
//! Delivery is synchronous with respect to the firing thread: subscribers
//! see events fired by a given caller in the order that caller fired them.
//! A callback that panics is caught and logged; it never prevents the
//! remaining subscribers from receiving the event.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::ids::{Oid, Uid};

/// Event category. `Attribute` covers runtime-published attributes such as
/// `containerIp` (spec §4.7 interest mechanism).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Status,
    Open,
    ExecStatus,
    Attribute(&'static str),
}

/// Value carried by an `Attribute` event payload.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(s) => f.write_str(s),
            AttributeValue::Int(i) => write!(f, "{i}"),
            AttributeValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Kind-specific payload delivered alongside the event header.
#[derive(Clone, Debug)]
pub enum EventPayload {
    Status(crate::status::DataStatus),
    Open { descriptor: i64 },
    ExecStatus(crate::status::ExecStatus),
    Attribute(AttributeValue),
}

/// A single fired event: node identity plus kind-specific payload.
#[derive(Clone, Debug)]
pub struct Event {
    pub oid: Oid,
    pub uid: Uid,
    pub kind: EventKind,
    pub payload: EventPayload,
}

type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

struct Subscription {
    id: u64,
    kind: Option<EventKind>,
    callback: Callback,
}

/// Opaque handle returned by [`EventBroadcaster::subscribe`]; Rust closures
/// have no stable identity to unsubscribe by, so a token stands in for the
/// "same callback" comparison the spec describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// Per-node pub/sub hub.
#[derive(Default)]
pub struct EventBroadcaster {
    subscriptions: Mutex<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback`; if `kind` is `None` it receives every event.
    pub fn subscribe(
        &self,
        kind: Option<EventKind>,
        callback: impl Fn(&Event) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscriptions.lock().push(Subscription {
            id,
            kind,
            callback: Arc::new(callback),
        });
        SubscriptionId(id)
    }

    /// Inverse of [`subscribe`](Self::subscribe); no-op if the handle is
    /// already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.lock().retain(|s| s.id != id.0);
    }

    /// Delivers one event to every matching subscriber, in registration
    /// order. Exceptions (panics) from a subscriber are logged and do not
    /// stop delivery to the rest.
    pub fn fire(&self, oid: &Oid, uid: &Uid, kind: EventKind, payload: EventPayload) {
        let event = Event {
            oid: oid.clone(),
            uid: uid.clone(),
            kind: kind.clone(),
            payload,
        };
        // Snapshot under the lock, then call back outside it so a subscriber
        // that calls subscribe/unsubscribe from its own callback can't deadlock.
        let callbacks: Vec<Callback> = self
            .subscriptions
            .lock()
            .iter()
            .filter(|s| s.kind.is_none() || s.kind.as_ref() == Some(&kind))
            .map(|s| s.callback.clone())
            .collect();
        for callback in callbacks {
            let result = panic::catch_unwind(AssertUnwindSafe(|| callback(&event)));
            if let Err(panic) = result {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                tracing::error!(
                    oid = %event.oid,
                    uid = %event.uid,
                    kind = ?event.kind,
                    %reason,
                    "event subscriber panicked; other subscribers still notified"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::DataStatus;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn fires_in_order_and_filters_by_kind() {
        let bus = EventBroadcaster::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        bus.subscribe(Some(EventKind::Status), move |e| {
            seen2.lock().push(format!("{:?}", e.kind));
        });
        let oid = Oid::new("o");
        let uid = Uid::new("u");
        bus.fire(&oid, &uid, EventKind::Open, EventPayload::Open { descriptor: 1 });
        bus.fire(
            &oid,
            &uid,
            EventKind::Status,
            EventPayload::Status(DataStatus::Writing),
        );
        bus.fire(
            &oid,
            &uid,
            EventKind::Status,
            EventPayload::Status(DataStatus::Completed),
        );
        assert_eq!(seen.lock().len(), 2);
    }

    #[test]
    fn panicking_subscriber_does_not_block_others() {
        let bus = EventBroadcaster::new();
        let counter = Arc::new(AtomicUsize::new(0));
        bus.subscribe(None, |_| panic!("boom"));
        let counter2 = counter.clone();
        bus.subscribe(None, move |_| {
            counter2.fetch_add(1, Ordering::SeqCst);
        });
        bus.fire(
            &Oid::new("o"),
            &Uid::new("u"),
            EventKind::Status,
            EventPayload::Status(DataStatus::Completed),
        );
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let bus = EventBroadcaster::new();
        let id = bus.subscribe(None, |_| {});
        bus.unsubscribe(id);
        bus.unsubscribe(id);
    }
}

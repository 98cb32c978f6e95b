//! Asynchronous readiness notification
//!
//! The user-space counterpart of SIGIO delivery: every attached open file
//! gets a [`PollEvent`] when the buffer becomes readable or writable. An event
//! is a hint that the state changed, never a copy of the data. Delivery is
//! fire-and-forget:
//! - a subscriber whose receiver was dropped is skipped;
//! - a subscriber that already has [`EVENT_QUEUE_DEPTH`] undelivered events
//!   misses the new one and learns the current state from `poll()`.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};

use crate::idgen::Handle;

/// Undelivered events kept per subscriber, one per band
pub const EVENT_QUEUE_DEPTH: usize = 2;

/// Band carried by an async notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollEvent {
    /// Buffer went from empty to non-empty (`POLL_IN`)
    Readable,
    /// Buffer went from full to non-full, or was cleared (`POLL_OUT`)
    Writable,
}

struct Subscribers {
    senders: HashMap<Handle, Sender<PollEvent>>,
    closed: bool,
}

/// Set of open files subscribed to async notifications
pub struct Notifier {
    subscribers: Mutex<Subscribers>,
    debug_hint: String,
}

impl Notifier {
    #[must_use]
    pub fn new(debug_hint: &str) -> Self {
        Self {
            subscribers: Mutex::new(Subscribers {
                senders: HashMap::new(),
                closed: false,
            }),
            debug_hint: debug_hint.to_string(),
        }
    }

    /// Subscribe `handle` and return the receiving end of its event stream
    ///
    /// Attaching an already attached handle keeps it attached once; its
    /// previous receiver stops getting events. After [`Notifier::close`] the
    /// returned stream is already ended.
    pub fn attach(&self, handle: Handle) -> Receiver<PollEvent> {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let mut subscribers = self.subscribers.lock();
        if subscribers.closed {
            log::debug!(
                "notifier.attach: {} is closed, {handle} gets an ended stream",
                self.debug_hint
            );
            return rx;
        }
        if subscribers.senders.insert(handle, tx).is_some() {
            log::warn!(
                "notifier.attach: {handle} already attached to {}, replacing its receiver",
                self.debug_hint
            );
        }
        rx
    }

    /// Unsubscribe `handle`; returns whether it was attached
    pub fn detach(&self, handle: Handle) -> bool {
        self.subscribers.lock().senders.remove(&handle).is_some()
    }

    #[must_use]
    pub fn is_attached(&self, handle: Handle) -> bool {
        self.subscribers.lock().senders.contains_key(&handle)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().senders.len()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.subscribers.lock().closed
    }

    /// Send `event` to every attached subscriber
    ///
    /// Returns the number of subscribers the event reached.
    pub fn notify(&self, event: PollEvent) -> usize {
        let subscribers = self.subscribers.lock();
        let mut delivered = 0;
        for (handle, sender) in &subscribers.senders {
            match sender.try_send(event) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    log::debug!(
                        "notifier.notify: {handle} of {} has a full queue, dropping {event:?}",
                        self.debug_hint
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    log::debug!(
                        "notifier.notify: {handle} of {} is gone, skipping {event:?}",
                        self.debug_hint
                    );
                }
            }
        }
        log::debug!(
            "notifier.notify: {} {event:?}, delivered to {delivered}/{}",
            self.debug_hint,
            subscribers.senders.len()
        );
        delivered
    }

    /// Detach everybody and refuse later attaches; receivers see the end of
    /// the stream
    pub fn close(&self) {
        let mut subscribers = self.subscribers.lock();
        subscribers.closed = true;
        subscribers.senders.clear();
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscribers = self.subscribers.lock();
        f.debug_struct("Notifier")
            .field("debug_hint", &self.debug_hint)
            .field("subscriber_count", &subscribers.senders.len())
            .field("closed", &subscribers.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::error::TryRecvError;

    #[test]
    fn test_notify_reaches_attached_handles() {
        let notifier = Notifier::new("test");
        let mut rx1 = notifier.attach(Handle::new(1));
        let mut rx2 = notifier.attach(Handle::new(2));

        assert_eq!(notifier.notify(PollEvent::Readable), 2);
        assert_eq!(rx1.try_recv().ok(), Some(PollEvent::Readable));
        assert_eq!(rx2.try_recv().ok(), Some(PollEvent::Readable));

        assert!(notifier.detach(Handle::new(1)));
        assert!(!notifier.detach(Handle::new(1)));
        assert_eq!(notifier.notify(PollEvent::Writable), 1);
        assert!(rx1.try_recv().is_err());
        assert_eq!(rx2.try_recv().ok(), Some(PollEvent::Writable));
    }

    #[test]
    fn test_dropped_receiver_is_skipped() {
        let notifier = Notifier::new("test");
        let rx = notifier.attach(Handle::new(1));
        drop(rx);

        assert_eq!(notifier.notify(PollEvent::Readable), 0);
        assert!(notifier.is_attached(Handle::new(1)));
    }

    #[test]
    fn test_undrained_queue_is_bounded() {
        let notifier = Notifier::new("test");
        let mut rx = notifier.attach(Handle::new(1));

        for _ in 0..1000 {
            notifier.notify(PollEvent::Readable);
            notifier.notify(PollEvent::Writable);
        }

        let mut queued = 0;
        while rx.try_recv().is_ok() {
            queued += 1;
        }
        assert_eq!(queued, EVENT_QUEUE_DEPTH);

        // Draining makes room again
        assert_eq!(notifier.notify(PollEvent::Readable), 1);
    }

    #[test]
    fn test_close_ends_streams() {
        let notifier = Notifier::new("test");
        let mut rx = notifier.attach(Handle::new(1));
        notifier.close();

        assert!(notifier.is_closed());
        assert_eq!(notifier.subscriber_count(), 0);
        assert_eq!(rx.try_recv(), Err(TryRecvError::Disconnected));
    }

    #[test]
    fn test_attach_after_close_gets_ended_stream() {
        let notifier = Notifier::new("test");
        notifier.close();

        let mut rx = notifier.attach(Handle::new(1));
        assert!(!notifier.is_attached(Handle::new(1)));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Disconnected));
        assert_eq!(notifier.notify(PollEvent::Readable), 0);
    }
}

//! Wait Queue
//!
//! Suspension and wake-up for callers blocked on a buffer condition
//! ("data available" or "space available").
//!
//! # 1) Waiting for a condition
//!
//! A blocked read goes through these steps:
//!
//! 10. Reader: lock the buffer, see it empty, unlock
//! 20. Reader: call `wait_async`
//! 30. Queue-for-reader: add reader to the waiting list
//! 40. Queue-for-reader: wait for a wake-up
//!
//! 50. Writer: lock the buffer, append, unlock
//! 60. Writer: call `wake`
//! 70. Queue-for-writer: extract the reader(s) from the waiting list and wake them
//!
//! The writer runs in a different task, so step 70 can happen before step 30.
//! The reader would then sleep although data is available: a lost wake-up.
//!
//! To avoid this, the reader takes the queue lock and re-checks the buffer
//! while holding it, so steps 10-30 are atomic with respect to step 70:
//!
//! ```ignore
//! let lock = queue.get_lock();
//! if buffer_is_empty() {
//!     queue.wait_async(Condition::DataAvailable, owner, "reader", lock).await;
//!     // Note: lock is consumed by wait_async and released before awaiting
//! }
//! ```
//!
//! Lock ordering: waiters take queue → buffer; wakers release the buffer
//! before taking the queue lock.
//!
//! # 2) Interrupts
//!
//! `interrupt(owner)` wakes the blocked call of one open file with
//! [`WakeReason::Interrupted`]. If that file is not blocked, the interrupt
//! stays pending and the next `wait_async` of the same file resolves
//! immediately.
//!
//! # 3) Cancellation
//!
//! Dropping the future returned by `wait_async` removes its entry from the
//! waiting list. If an interrupt was delivered to it but never observed, the
//! interrupt goes back to pending.
//!
//! # 4) Shutdown
//!
//! `shutdown()` wakes everybody with [`WakeReason::Gone`] and makes any later
//! `wait_async` resolve the same way.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

use crate::idgen::Handle;

/// Buffer state a blocked caller is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// Buffer became non-empty
    DataAvailable,
    /// Buffer became non-full
    SpaceAvailable,
}

/// Why a blocked caller was woken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// The condition may hold now; re-check it
    Ready,
    /// An interrupt was delivered to the waiting file
    Interrupted,
    /// The queue was shut down
    Gone,
}

/// Represents a caller waiting for a condition
struct WaitingClient {
    id: u64,
    owner: Handle,
    sender: oneshot::Sender<WakeReason>,
    debug_hint: String,
}

impl fmt::Debug for WaitingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitingClient")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("debug_hint", &self.debug_hint)
            .finish_non_exhaustive()
    }
}

impl WaitingClient {
    /// Returns whether the waiter was still there to receive `reason`
    fn wake(self, reason: WakeReason) -> bool {
        if self.sender.send(reason).is_err() {
            log::debug!(
                "queue.wake: {} ({}) stopped waiting before {reason:?}",
                self.owner,
                self.debug_hint
            );
            return false;
        }
        true
    }
}

// ============================================================================
// Internal State
// ============================================================================

pub struct InnerState {
    shut_down: bool,
    next_waiter_id: u64,
    whitelist: HashSet<Handle>,
    waiting_clients: HashMap<Condition, Vec<WaitingClient>>,
    pending_interrupts: HashSet<Handle>,
}

impl InnerState {
    fn new() -> Self {
        Self {
            shut_down: false,
            next_waiter_id: 0,
            whitelist: HashSet::new(),
            waiting_clients: HashMap::new(),
            pending_interrupts: HashSet::new(),
        }
    }

    fn take_waiters_of(&mut self, owner: Handle) -> Vec<WaitingClient> {
        let mut taken = Vec::new();
        for waiters in self.waiting_clients.values_mut() {
            let (mine, others): (Vec<_>, Vec<_>) =
                waiters.drain(..).partition(|w| w.owner == owner);
            *waiters = others;
            taken.extend(mine);
        }
        taken
    }

    fn remove_waiter(&mut self, condition: Condition, id: u64) {
        if let Some(waiters) = self.waiting_clients.get_mut(&condition) {
            waiters.retain(|w| w.id != id);
            if waiters.is_empty() {
                self.waiting_clients.remove(&condition);
            }
        }
    }

    fn repend_interrupt(&mut self, owner: Handle) {
        if !self.shut_down && self.whitelist.contains(&owner) {
            self.pending_interrupts.insert(owner);
        }
    }
}

// ============================================================================
// Wait Future
// ============================================================================

/// Entry of a waiting list, removed again when its future goes away
struct Registration {
    inner: Arc<Mutex<InnerState>>,
    condition: Condition,
    id: u64,
    owner: Handle,
}

/// Future returned by [`WaitQueueArc::wait_async`]
#[must_use = "the wait is cancelled when the future is dropped"]
pub struct WaitFuture {
    rx: oneshot::Receiver<WakeReason>,
    registration: Option<Registration>,
}

impl Future for WaitFuture {
    type Output = WakeReason;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<WakeReason> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(result) => {
                // The waker already took the entry out of the list
                self.registration = None;
                // The sender only disappears without sending if the whole
                // queue is dropped while somebody waits, same as a shutdown.
                Poll::Ready(result.unwrap_or(WakeReason::Gone))
            }
        }
    }
}

impl Drop for WaitFuture {
    fn drop(&mut self) {
        let Some(registration) = self.registration.take() else {
            return;
        };
        // After close() no wake can arrive; one that arrived before is kept
        self.rx.close();
        let unobserved = self.rx.try_recv().ok();

        let mut state = registration.inner.lock();
        state.remove_waiter(registration.condition, registration.id);
        if unobserved == Some(WakeReason::Interrupted) {
            state.repend_interrupt(registration.owner);
            log::debug!(
                "queue.cancel: {} dropped its wait, interrupt left pending",
                registration.owner
            );
        }
    }
}

impl fmt::Debug for WaitFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitFuture")
            .field("registered", &self.registration.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Main Queue
// ============================================================================

/// Thread-safe wait queue shared by one buffer's readers and writers
#[derive(Clone)]
pub struct WaitQueueArc {
    inner: Arc<Mutex<InnerState>>,
}

impl WaitQueueArc {
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(InnerState::new())),
        }
    }

    /// Get the lock for atomic condition-check + register operations
    pub fn get_lock(&self) -> parking_lot::MutexGuard<'_, InnerState> {
        self.inner.lock()
    }

    /// Register an open file as a possible waiter and interrupt target
    pub fn whitelist(&self, owner: Handle) {
        let mut state = self.inner.lock();
        if !state.whitelist.insert(owner) {
            log::warn!("queue.whitelist: {owner} already in whitelist");
        }
    }

    /// Forget an open file, dropping its waiters and any interrupt still
    /// pending for it
    pub fn unlist(&self, owner: Handle) {
        let mut state = self.inner.lock();
        if !state.whitelist.remove(&owner) {
            log::warn!("queue.unlist: {owner} not in whitelist");
        }
        state.pending_interrupts.remove(&owner);
        let stale = state.take_waiters_of(owner);
        drop(state);

        if !stale.is_empty() {
            log::debug!("queue.unlist: {owner} dropped {} waiters", stale.len());
        }
    }

    /// Wait for `condition` to be signalled
    ///
    /// Precondition: the caller acquired the lock and checked, while holding
    /// it, that it has to wait.
    /// Post-condition: the lock is released when this method returns.
    ///
    /// See the module documentation for the lock acquisition pattern.
    pub fn wait_async(
        &self,
        condition: Condition,
        owner: Handle,
        debug_hint: &str,
        mut lock: parking_lot::MutexGuard<'_, InnerState>,
    ) -> WaitFuture {
        let (tx, rx) = oneshot::channel();

        if lock.shut_down {
            drop(lock);
            let _ = tx.send(WakeReason::Gone);
            return WaitFuture {
                rx,
                registration: None,
            };
        }
        if lock.pending_interrupts.remove(&owner) {
            drop(lock);
            log::debug!("queue.wait: {owner} ({debug_hint}) has a pending interrupt");
            let _ = tx.send(WakeReason::Interrupted);
            return WaitFuture {
                rx,
                registration: None,
            };
        }

        let id = lock.next_waiter_id;
        lock.next_waiter_id += 1;
        let client = WaitingClient {
            id,
            owner,
            sender: tx,
            debug_hint: debug_hint.to_string(),
        };
        lock.waiting_clients.entry(condition).or_default().push(client);

        // Release lock before awaiting
        drop(lock);

        WaitFuture {
            rx,
            registration: Some(Registration {
                inner: Arc::clone(&self.inner),
                condition,
                id,
                owner,
            }),
        }
    }

    /// Wake every caller waiting for `condition`
    ///
    /// Returns the number of callers woken. A wake with no waiters is not
    /// remembered.
    pub fn wake(&self, condition: Condition) -> usize {
        let mut state = self.inner.lock();
        let waiters = state
            .waiting_clients
            .remove(&condition)
            .unwrap_or_default();
        drop(state);

        log::debug!("queue.wake: {condition:?}, waiters: {}", waiters.len());

        let mut count = 0;
        for waiter in waiters {
            count += usize::from(waiter.wake(WakeReason::Ready));
        }
        count
    }

    /// Deliver an interrupt to the blocked call of `owner`
    ///
    /// Returns `true` if a blocked call was woken, `false` if the interrupt
    /// was left pending (or dropped because `owner` is not an open file).
    pub fn interrupt(&self, owner: Handle) -> bool {
        let mut state = self.inner.lock();
        if !state.whitelist.contains(&owner) {
            log::debug!("queue.interrupt: {owner} is not open, ignoring");
            return false;
        }
        let waiters: Vec<WaitingClient> = state
            .take_waiters_of(owner)
            .into_iter()
            .filter(|w| !w.sender.is_closed())
            .collect();
        if waiters.is_empty() {
            state.pending_interrupts.insert(owner);
            return false;
        }
        drop(state);

        let mut delivered = false;
        for waiter in waiters {
            delivered |= waiter.wake(WakeReason::Interrupted);
        }
        if !delivered {
            // Every waiter went away between the check and the send
            self.inner.lock().repend_interrupt(owner);
        }
        delivered
    }

    /// Wake everybody with [`WakeReason::Gone`] and refuse further waits
    pub fn shutdown(&self) {
        let mut state = self.inner.lock();
        if state.shut_down {
            log::warn!("queue.shutdown: already shut down");
            return;
        }
        state.shut_down = true;
        state.pending_interrupts.clear();
        let waiters: Vec<WaitingClient> = state
            .waiting_clients
            .drain()
            .flat_map(|(_, waiters)| waiters)
            .collect();
        drop(state);

        log::debug!("queue.shutdown: waking {} waiters", waiters.len());
        for waiter in waiters {
            waiter.wake(WakeReason::Gone);
        }
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.lock().shut_down
    }

    /// Number of callers currently waiting for `condition`
    #[must_use]
    pub fn waiter_count(&self, condition: Condition) -> usize {
        self.inner
            .lock()
            .waiting_clients
            .get(&condition)
            .map_or(0, Vec::len)
    }
}

impl fmt::Debug for WaitQueueArc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("WaitQueueArc")
            .field("shut_down", &state.shut_down)
            .field("open_files", &state.whitelist.len())
            .field("waiting_clients", &state.waiting_clients)
            .field("pending_interrupts", &state.pending_interrupts)
            .finish()
    }
}

//! Connection lifecycle state machine
//!
//! The `ConnectionManager` exclusively owns the native connection. Its state
//! moves only through these transitions:
//!
//! ```text
//!                 ensure_ready()               setup OK
//! Disconnected ─────────────────► Connecting ───────────► Ready
//!      ▲                              │                     │
//!      │          setup failed        │                     │
//!      ├──────────────────────────────┘                     │
//!      │        unsolicited disconnect / shutdown()         │
//!      └────────────────────────────────────────────────────┘
//! ```
//!
//! # Single-winner connect
//!
//! The first caller that finds the state `Disconnected` moves it to
//! `Connecting` and issues the one native connect call. Every caller arriving
//! while `Connecting` parks a oneshot waiter; the setup callback resolves all
//! of them with the same `BillingResult`.
//!
//! # Stale callbacks
//!
//! Each connect attempt is tagged with an epoch. `shutdown()` bumps the epoch,
//! so notifications from the listener of an earlier attempt are ignored.
//!
//! If the native layer releases an attempt's listener without ever reporting
//! a setup result, the attempt fails with an `Error` result instead of
//! leaving the state `Connecting`.

use super::broadcaster::EventBroadcaster;
use super::correlator::DroppedCallback;
use crate::native::types::NativeBillingResult;
use crate::native::{BillingClientStateListener, NativeBillingClient};
use crate::serialization::records;
use crate::types::BillingResult;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

const START_CONNECTION: &str = "startConnection";

/// Lifecycle state of the native connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Ready => "ready",
        };
        f.write_str(name)
    }
}

struct ConnectionInner {
    state: ConnectionState,
    epoch: u64,
    waiters: Vec<oneshot::Sender<BillingResult>>,
}

type SharedInner = Arc<Mutex<ConnectionInner>>;

fn lock(inner: &SharedInner) -> MutexGuard<'_, ConnectionInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owner of the native connection and its state
pub struct ConnectionManager {
    native: Arc<dyn NativeBillingClient>,
    inner: SharedInner,
    events: Arc<EventBroadcaster>,
}

impl ConnectionManager {
    /// Create a manager in the `Disconnected` state
    ///
    /// Unsolicited disconnects are reported on `events`.
    pub fn new(native: Arc<dyn NativeBillingClient>, events: Arc<EventBroadcaster>) -> Self {
        Self {
            native,
            inner: Arc::new(Mutex::new(ConnectionInner {
                state: ConnectionState::Disconnected,
                epoch: 0,
                waiters: Vec::new(),
            })),
            events,
        }
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.inner).state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    /// Bring the connection to `Ready`
    ///
    /// - `Ready`: returns OK immediately
    /// - `Connecting`: waits for the attempt already in flight
    /// - `Disconnected`: starts a new attempt and waits for it
    ///
    /// Failures are reported through the returned `BillingResult`. Nothing is
    /// retried; call again to make another attempt.
    pub async fn ensure_ready(&self) -> BillingResult {
        let (waiter, attempt) = {
            let mut inner = lock(&self.inner);
            match inner.state {
                ConnectionState::Ready => return BillingResult::ok(),
                ConnectionState::Connecting => {
                    let (sender, receiver) = oneshot::channel();
                    inner.waiters.push(sender);
                    debug!(epoch = inner.epoch, "joining connection attempt in flight");
                    (receiver, None)
                }
                ConnectionState::Disconnected => {
                    let (sender, receiver) = oneshot::channel();
                    inner.state = ConnectionState::Connecting;
                    inner.epoch += 1;
                    inner.waiters.push(sender);
                    (receiver, Some(inner.epoch))
                }
            }
        };

        // The native call is issued outside the lock: a binding is free to
        // invoke the listener synchronously.
        if let Some(epoch) = attempt {
            info!(epoch, "connecting to billing service");
            self.native.start_connection(Arc::new(ConnectionListener {
                inner: Arc::clone(&self.inner),
                events: Arc::clone(&self.events),
                epoch,
            }));
        }

        waiter
            .await
            .unwrap_or_else(|_| BillingResult::dropped_callback(START_CONNECTION))
    }

    /// Close the connection if it is `Ready`
    ///
    /// A no-op in any other state, including while a connect attempt is in
    /// flight.
    pub fn shutdown(&self) {
        {
            let mut inner = lock(&self.inner);
            if inner.state != ConnectionState::Ready {
                debug!(state = %inner.state, "shutdown skipped, connection not ready");
                return;
            }
            inner.state = ConnectionState::Disconnected;
            inner.epoch += 1;
        }

        self.native.end_connection();
        info!("billing connection closed");
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("ConnectionManager")
            .field("state", &inner.state)
            .field("epoch", &inner.epoch)
            .field("waiters", &inner.waiters.len())
            .finish()
    }
}

/// State listener handed to the native layer for one connect attempt
struct ConnectionListener {
    inner: SharedInner,
    events: Arc<EventBroadcaster>,
    epoch: u64,
}

impl ConnectionListener {
    /// Resolve this listener's attempt if it is still the one in flight
    ///
    /// Returns the parked waiters, or `None` for a stale or finished attempt.
    fn finish_attempt(&self, result: &BillingResult) -> Option<Vec<oneshot::Sender<BillingResult>>> {
        let mut inner = lock(&self.inner);
        if inner.epoch != self.epoch || inner.state != ConnectionState::Connecting {
            return None;
        }
        inner.state = if result.is_ok() {
            ConnectionState::Ready
        } else {
            ConnectionState::Disconnected
        };
        Some(std::mem::take(&mut inner.waiters))
    }
}

fn resolve_waiters(waiters: Vec<oneshot::Sender<BillingResult>>, result: &BillingResult) {
    for waiter in waiters {
        // A waiter whose caller gave up has nothing to receive the result.
        let _ = waiter.send(result.clone());
    }
}

impl BillingClientStateListener for ConnectionListener {
    fn on_billing_setup_finished(&self, result: NativeBillingResult) {
        let result = records::billing_result(&result);

        let Some(waiters) = self.finish_attempt(&result) else {
            debug!(epoch = self.epoch, "ignoring stale setup result");
            return;
        };

        if result.is_ok() {
            info!(epoch = self.epoch, waiters = waiters.len(), "billing service connected");
        } else {
            warn!(
                epoch = self.epoch,
                code = %result.response_code,
                message = %result.debug_message,
                "billing service connection failed"
            );
        }

        resolve_waiters(waiters, &result);
    }

    fn on_billing_service_disconnected(&self) {
        {
            let mut inner = lock(&self.inner);
            if inner.epoch != self.epoch {
                debug!(epoch = self.epoch, "ignoring disconnect from a closed connection");
                return;
            }
            if inner.state == ConnectionState::Ready {
                inner.state = ConnectionState::Disconnected;
            }
            warn!(state = %inner.state, "billing service disconnected");
        }

        self.events.emit_service_disconnected();
    }
}

/// A listener released by the native layer before setup finished ends its
/// attempt with an `Error` result and returns the state to `Disconnected`.
impl Drop for ConnectionListener {
    fn drop(&mut self) {
        let result = BillingResult::dropped_callback(START_CONNECTION);
        if let Some(waiters) = self.finish_attempt(&result) {
            warn!(
                epoch = self.epoch,
                waiters = waiters.len(),
                "native layer dropped the connection listener before setup finished"
            );
            resolve_waiters(waiters, &result);
        }
    }
}

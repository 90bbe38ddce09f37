//! Filesystem session lifecycle.
//!
//! ```text
//! Mounted --begin_unmount--> Unmounting --drained--> Closed
//! ```
//!
//! Every operation holds an [`OpGuard`] while it runs. Once unmounting
//! starts no new guard is granted, and shutdown waits for outstanding
//! guards to drop.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use tokio::sync::Notify;

use crate::error::VfsError;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting requests.
    Mounted,
    /// Refusing new requests, letting outstanding ones finish.
    Unmounting,
    /// All requests finished and all handles dropped.
    Closed,
}

impl SessionState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => SessionState::Mounted,
            1 => SessionState::Unmounting,
            _ => SessionState::Closed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            SessionState::Mounted => 0,
            SessionState::Unmounting => 1,
            SessionState::Closed => 2,
        }
    }
}

/// Tracks session state and in-flight operations.
#[derive(Debug)]
pub struct Session {
    state: AtomicU8,
    in_flight: AtomicUsize,
    drained: Notify,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create a mounted session.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(SessionState::Mounted.as_u8()),
            in_flight: AtomicUsize::new(0),
            drained: Notify::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Number of operations currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Admit an operation.
    ///
    /// # Errors
    /// Returns `VfsError::Unmounting` once unmounting has started.
    pub fn begin(&self) -> Result<OpGuard<'_>, VfsError> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard: OpGuard<'_> = OpGuard { session: self };
        if self.state() != SessionState::Mounted {
            return Err(VfsError::Unmounting);
        }
        Ok(guard)
    }

    /// Stop admitting operations. Returns false if already unmounting or closed.
    pub fn begin_unmount(&self) -> bool {
        self.state
            .compare_exchange(
                SessionState::Mounted.as_u8(),
                SessionState::Unmounting.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Wait until no operation is running.
    pub async fn wait_drained(&self) {
        loop {
            let notified = self.drained.notified();
            let mut notified = std::pin::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Mark the session closed.
    pub fn mark_closed(&self) {
        self.state
            .store(SessionState::Closed.as_u8(), Ordering::SeqCst);
    }
}

/// RAII marker for one running operation.
#[derive(Debug)]
pub struct OpGuard<'a> {
    session: &'a Session,
}

impl Drop for OpGuard<'_> {
    fn drop(&mut self) {
        if self.session.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.session.drained.notify_waiters();
        }
    }
}

//! Shared user-session store: a reducer over [`SessionState`], derived
//! selectors, and ordered synchronous change notification.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
    thread::{self, ThreadId},
};

use serde::{Deserialize, Serialize};
use shared::protocol::SessionAction;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    pub name: Option<String>,
    pub is_authenticated: bool,
}

/// Root of the application state as fragments see it. The `user` slice may be
/// missing when a fragment runs without the shell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootState {
    pub user: Option<SessionState>,
}

pub fn reduce(state: &SessionState, action: &SessionAction) -> SessionState {
    match action {
        SessionAction::Login { name } => SessionState {
            name: Some(name.clone()),
            is_authenticated: true,
        },
        SessionAction::UpdateUserName { name } => SessionState {
            name: Some(name.clone()),
            ..state.clone()
        },
        SessionAction::Logout => SessionState {
            name: None,
            is_authenticated: false,
        },
    }
}

pub fn select_session(root: &RootState) -> Option<&SessionState> {
    root.user.as_ref()
}

pub fn select_user_name(state: Option<&SessionState>) -> Option<&str> {
    state.and_then(|state| state.name.as_deref())
}

pub fn select_is_authenticated(state: Option<&SessionState>) -> bool {
    state.is_some_and(|state| state.is_authenticated)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("cannot dispatch {action} from inside a session notification")]
    Reentrant { action: &'static str },
}

type Listener = Arc<dyn Fn(&SessionState) + Send + Sync>;

pub struct SessionStore {
    state: Mutex<SessionState>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener_id: AtomicU64,
    // Held for a whole transition, notifications included.
    serial: Mutex<()>,
    delivering_on: Mutex<Option<ThreadId>>,
}

impl SessionStore {
    pub fn new() -> Arc<Self> {
        Self::with_state(SessionState::default())
    }

    pub fn with_state(state: SessionState) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
            serial: Mutex::new(()),
            delivering_on: Mutex::new(None),
        })
    }

    /// Applies `action` and delivers the new state to every subscriber in
    /// registration order before returning. Dispatches from other threads
    /// wait for the current transition to finish; a dispatch from inside a
    /// notification is rejected.
    pub fn dispatch(&self, action: SessionAction) -> Result<SessionState, StoreError> {
        let Some(_delivering) = self.begin_delivery() else {
            return Err(StoreError::Reentrant {
                action: action.type_tag(),
            });
        };

        let next = {
            let mut state = lock(&self.state);
            let next = reduce(&state, &action);
            *state = next.clone();
            next
        };
        debug!(
            action = action.type_tag(),
            authenticated = next.is_authenticated,
            "session transition applied"
        );

        let listeners: Vec<Listener> = lock(&self.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&next);
        }

        Ok(next)
    }

    pub fn snapshot(&self) -> SessionState {
        lock(&self.state).clone()
    }

    pub fn user_name(&self) -> Option<String> {
        let state = lock(&self.state);
        select_user_name(Some(&state)).map(str::to_owned)
    }

    pub fn is_authenticated(&self) -> bool {
        let state = lock(&self.state);
        select_is_authenticated(Some(&state))
    }

    /// Registers `listener`; it stays registered until the returned guard is
    /// dropped.
    pub fn subscribe<F>(self: &Arc<Self>, listener: F) -> Subscription
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        self.register(Arc::new(listener))
    }

    /// Like [`subscribe`](Self::subscribe), but first hands `listener` the
    /// current state. No transition can land between that replay and the
    /// listener's first notification.
    pub fn subscribe_current<F>(self: &Arc<Self>, listener: F) -> Subscription
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        // `None` means this thread is inside a notification and already
        // holds the serial lock.
        let _delivering = self.begin_delivery();
        let listener: Listener = Arc::new(listener);
        let subscription = self.register(Arc::clone(&listener));
        let current = self.snapshot();
        listener(&current);
        subscription
    }

    fn register(self: &Arc<Self>, listener: Listener) -> Subscription {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.listeners).push((id, listener));
        trace!(subscription = id, "session subscriber added");
        Subscription {
            store: Arc::downgrade(self),
            id,
        }
    }

    /// Serializes deliveries. Returns `None` when the calling thread is
    /// already delivering a notification.
    fn begin_delivery(&self) -> Option<Delivery<'_>> {
        let current = thread::current().id();
        if *lock(&self.delivering_on) == Some(current) {
            return None;
        }
        let serial = lock(&self.serial);
        *lock(&self.delivering_on) = Some(current);
        Some(Delivery {
            delivering_on: &self.delivering_on,
            _serial: serial,
        })
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    fn remove_listener(&self, id: u64) {
        lock(&self.listeners).retain(|(listener_id, _)| *listener_id != id);
        trace!(subscription = id, "session subscriber removed");
    }
}

#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    store: Weak<SessionStore>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.remove_listener(self.id);
        }
    }
}

struct Delivery<'a> {
    delivering_on: &'a Mutex<Option<ThreadId>>,
    _serial: MutexGuard<'a, ()>,
}

impl Drop for Delivery<'_> {
    fn drop(&mut self) {
        // Runs before `_serial` is released.
        *lock(self.delivering_on) = None;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

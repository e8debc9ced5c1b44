//! Shared loading/error/unauthorized state for list-backed screens, and the
//! observable holder that publishes it.
//!
//! Every list screen goes through the same machine:
//!
//! ```text
//! Idle ──▶ Loading ──▶ Loaded ──▶ Loading (refresh / next page)
//!             │   └──▶ Error  ──▶ Loading (retry)
//!             └──────▶ Unauthorized (terminal)
//! ```
//!
//! A rejected session moves any non-terminal state to `Unauthorized`, since
//! mutations issued from a loaded screen can be rejected too.

use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;

/// Where a screen's data fetch currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ScreenState {
    Idle,
    Loading,
    Loaded,
    Error(String),
    /// The backend rejected the session. The UI must navigate away.
    Unauthorized,
}

/// Inputs that drive [`ScreenState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenEvent {
    FetchStarted,
    FetchSucceeded,
    FetchFailed(String),
    AuthRejected,
}

/// A transition the machine does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot apply {event:?} while {from:?}")]
pub struct InvalidTransition {
    pub from: ScreenState,
    pub event: ScreenEvent,
}

impl ScreenState {
    /// Compute the next state, or reject the event.
    pub fn apply(&self, event: ScreenEvent) -> Result<ScreenState, InvalidTransition> {
        let next = match (self, &event) {
            (Self::Idle | Self::Loaded | Self::Error(_), ScreenEvent::FetchStarted) => Self::Loading,
            (Self::Loading, ScreenEvent::FetchSucceeded) => Self::Loaded,
            (Self::Loading, ScreenEvent::FetchFailed(message)) => Self::Error(message.clone()),
            (Self::Idle | Self::Loading | Self::Loaded | Self::Error(_), ScreenEvent::AuthRejected) => {
                Self::Unauthorized
            }
            _ => {
                return Err(InvalidTransition {
                    from: self.clone(),
                    event,
                });
            }
        };
        Ok(next)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ScreenState::Loading)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ScreenState::Unauthorized)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ScreenState::Error(message) => Some(message.as_str()),
            _ => None,
        }
    }
}

/// Single-writer observable value.
///
/// The owning controller keeps the `StateHolder`; everyone else gets a
/// [`StateSubscriber`], which can read and wait for changes but never write.
#[derive(Debug)]
pub struct StateHolder<T> {
    tx: watch::Sender<T>,
}

impl<T> StateHolder<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Atomically inspect and maybe change the value. Subscribers are woken
    /// only when `f` returns true.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut T) -> bool,
    {
        self.tx.send_if_modified(f)
    }

    /// Replace the value and wake subscribers.
    pub fn publish(&self, value: T) {
        self.tx.send_replace(value);
    }

    pub fn subscribe(&self) -> StateSubscriber<T> {
        StateSubscriber {
            rx: self.tx.subscribe(),
        }
    }
}

impl<T: Clone> StateHolder<T> {
    pub fn snapshot(&self) -> T {
        self.tx.borrow().clone()
    }
}

/// Read-only view of a [`StateHolder`].
#[derive(Debug, Clone)]
pub struct StateSubscriber<T> {
    rx: watch::Receiver<T>,
}

impl<T: Clone> StateSubscriber<T> {
    /// Latest published value.
    pub fn snapshot(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Wait for the next publish and return it. `None` once the owner is gone.
    pub async fn changed(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

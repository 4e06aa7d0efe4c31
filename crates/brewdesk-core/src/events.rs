//! Session event port.
//!
//! The session manager emits a `SessionEvent` on every transition into
//! `Authenticated` or `Unauthenticated`. Front ends subscribe and navigate;
//! the core never touches a UI.
//!
//! Uses tokio's broadcast channel: emitting with no subscribers is fine,
//! and a slow subscriber sees `Lagged` rather than blocking the session.

use tokio::sync::broadcast;

use crate::models::UserProfile;

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Where the front end should go after a session transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/home",
            Route::Login => "/login",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Authenticated { user: UserProfile },
    Unauthenticated,
}

impl SessionEvent {
    pub fn route(&self) -> Route {
        match self {
            SessionEvent::Authenticated { .. } => Route::Home,
            SessionEvent::Unauthenticated => Route::Login,
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn emit(&self, event: SessionEvent) {
        // No subscribers is not an error
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

//! Workflow controllers.
//!
//! Controllers own the view state of their pages. Each piece of fetched state
//! lives in a [`ViewSlot`], which tags every fetch with a ticket and discards
//! responses that arrive after a newer one was committed. All cached state
//! belongs to one signed-in user; a [`SessionEpoch`] tells the controller when
//! that user changed so it can drop what it holds.

pub mod accommodation;
pub mod admin_review;
pub mod host_application;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::routes::Route;
use crate::services::session_store::SessionStore;

/// What a page shows for one piece of fetched state. `Failed` is never
/// rendered like an empty result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState<T> {
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            LoadState::Loaded(value) => Some(value),
            _ => None,
        }
    }
}

/// Sequence number handed out when a fetch starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

struct SlotInner<T> {
    issued: u64,
    committed: u64,
    state: LoadState<T>,
}

pub struct ViewSlot<T> {
    inner: Mutex<SlotInner<T>>,
}

impl<T> Default for ViewSlot<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(SlotInner {
                issued: 0,
                committed: 0,
                state: LoadState::Loading,
            }),
        }
    }
}

impl<T: Clone> ViewSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> Ticket {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.issued += 1;
        Ticket(inner.issued)
    }

    /// Store `state` if `ticket` is newer than the last committed one.
    /// Returns whether it was stored.
    pub fn commit(&self, ticket: Ticket, state: LoadState<T>) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if ticket.0 <= inner.committed {
            tracing::debug!(
                ticket = ticket.0,
                committed = inner.committed,
                "Discarding out-of-order response"
            );
            return false;
        }
        inner.committed = ticket.0;
        inner.state = state;
        true
    }

    /// Replace the state with a locally known value, superseding every fetch
    /// still in flight.
    pub fn set_local(&self, value: T) {
        let ticket = self.issue();
        self.commit(ticket, LoadState::Loaded(value));
    }

    /// Forget the state and ignore every outstanding ticket.
    pub fn invalidate(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.committed = inner.issued;
        inner.state = LoadState::Loading;
    }

    pub fn state(&self) -> LoadState<T> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .state
            .clone()
    }
}

/// The session generation a controller's cached state was built under.
pub struct SessionEpoch {
    session: Arc<SessionStore>,
    seen: AtomicU64,
}

impl SessionEpoch {
    pub fn new(session: Arc<SessionStore>) -> Self {
        let seen = AtomicU64::new(session.generation());
        Self { session, seen }
    }

    /// Whether the signed-in user changed since the previous call.
    pub fn changed(&self) -> bool {
        let now = self.session.generation();
        self.seen.swap(now, Ordering::AcqRel) != now
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Neutral,
    Waiting,
    Success,
    Rejected,
}

impl Tone {
    pub fn css_class(&self) -> &'static str {
        match self {
            Tone::Neutral => "status-neutral",
            Tone::Waiting => "status-waiting",
            Tone::Success => "status-success",
            Tone::Rejected => "status-rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallToAction {
    pub label: &'static str,
    pub route: Route,
}

impl CallToAction {
    pub fn new(label: &'static str, route: Route) -> Self {
        Self { label, route }
    }

    pub fn href(&self) -> String {
        self.route.path()
    }
}

/// Everything a status page renders, derived from a record alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub tone: Tone,
    pub title: String,
    pub message: String,
    pub details: Vec<(&'static str, String)>,
    pub rejection_reason: Option<String>,
    pub action: CallToAction,
}

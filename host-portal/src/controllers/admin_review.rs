use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use super::{LoadState, SessionEpoch};
use crate::error::ClientError;
use crate::models::accommodation::PendingAccommodation;
use crate::models::host_request::PendingHostRequest;
use crate::services::gateway::{ApiGateway, ApiRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewKind {
    Host,
    Accommodation,
}

impl ReviewKind {
    fn segment(self) -> &'static str {
        match self {
            ReviewKind::Host => "host-requests",
            ReviewKind::Accommodation => "accommodations",
        }
    }
}

impl fmt::Display for ReviewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReviewKind::Host => "HOST",
            ReviewKind::Accommodation => "ACCOMMODATION",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl ReviewAction {
    /// Parse the action segment of a decision URL.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "approve" => Some(ReviewAction::Approve),
            "reject" => Some(ReviewAction::Reject),
            _ => None,
        }
    }

    fn segment(self) -> &'static str {
        match self {
            ReviewAction::Approve => "approve",
            ReviewAction::Reject => "reject",
        }
    }
}

/// Pending records of one kind, in backend order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingList {
    Host(Vec<PendingHostRequest>),
    Accommodation(Vec<PendingAccommodation>),
}

impl PendingList {
    fn empty(kind: ReviewKind) -> Self {
        match kind {
            ReviewKind::Host => PendingList::Host(Vec::new()),
            ReviewKind::Accommodation => PendingList::Accommodation(Vec::new()),
        }
    }

    pub fn ids(&self) -> Vec<i64> {
        match self {
            PendingList::Host(requests) => requests.iter().map(|r| r.id).collect(),
            PendingList::Accommodation(items) => items.iter().map(|a| a.accommodation.id).collect(),
        }
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids().contains(&id)
    }

    pub fn len(&self) -> usize {
        match self {
            PendingList::Host(requests) => requests.len(),
            PendingList::Accommodation(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&mut self, id: i64) {
        match self {
            PendingList::Host(requests) => requests.retain(|r| r.id != id),
            PendingList::Accommodation(items) => items.retain(|a| a.accommodation.id != id),
        }
    }
}

pub struct AdminReviewController {
    gateway: Arc<ApiGateway>,
    epoch: SessionEpoch,
    cache: Mutex<HashMap<ReviewKind, PendingList>>,
}

impl AdminReviewController {
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self {
            epoch: SessionEpoch::new(Arc::clone(gateway.session())),
            gateway,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, HashMap<ReviewKind, PendingList>> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if self.epoch.changed() {
            tracing::debug!("Session changed, dropping cached pending lists");
            cache.clear();
        }
        cache
    }

    pub async fn list_pending(&self, kind: ReviewKind) -> Result<PendingList, ClientError> {
        let path = format!("/api/admin/{}/pending", kind.segment());
        let response = self
            .gateway
            .send(&ApiRequest::get(path))
            .await?
            .into_result()?;

        let list = if response.is_no_content() {
            PendingList::empty(kind)
        } else {
            match kind {
                ReviewKind::Host => PendingList::Host(response.json()?),
                ReviewKind::Accommodation => PendingList::Accommodation(response.json()?),
            }
        };

        tracing::debug!(kind = %kind, count = list.len(), "Pending list fetched");
        self.cache().insert(kind, list.clone());
        Ok(list)
    }

    /// The last list fetched successfully for `kind`.
    pub fn cached(&self, kind: ReviewKind) -> Option<PendingList> {
        self.cache().get(&kind).cloned()
    }

    /// Approve or reject one pending record and reload the pending list.
    /// A rejection needs a non-blank reason; without one nothing is sent.
    ///
    /// Once the decision is recorded, a reload that fails for any reason other
    /// than an ended session comes back as [`LoadState::Failed`]; the decided
    /// record is still dropped from the cached list.
    pub async fn decide(
        &self,
        id: i64,
        kind: ReviewKind,
        action: ReviewAction,
        reason: Option<&str>,
    ) -> Result<LoadState<PendingList>, ClientError> {
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());

        let path = format!("/api/admin/{}/{}/{}", kind.segment(), id, action.segment());
        let request = match (action, reason) {
            (ReviewAction::Reject, None) => return Err(ClientError::ReasonRequired),
            (ReviewAction::Reject, Some(reason)) => {
                ApiRequest::post(path).json(serde_json::json!({ "rejectionReason": reason }))
            }
            (ReviewAction::Approve, _) => ApiRequest::post(path),
        };

        self.gateway.send(&request).await?.into_result()?;
        tracing::info!(kind = %kind, id, action = ?action, "Review decision recorded");

        match self.list_pending(kind).await {
            Ok(list) => Ok(LoadState::Loaded(list)),
            Err(e) if e.requires_login() => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, kind = %kind, "Failed to reload pending list after decision");
                if let Some(list) = self.cache().get_mut(&kind) {
                    list.remove(id);
                }
                Ok(LoadState::Failed(e.user_message()))
            }
        }
    }
}

//! In-process reporter: the terminal client talks to the completion
//! service directly instead of over a network.

use chrono::{DateTime, Utc};
use dailyzip_core::{
    CompletionError, CompletionReporter, CompletionResponse, CompletionService, ProfileStore,
    ReportError, StatusResponse, StoreError, UserId,
};
use std::sync::Arc;

/// Shared store handle used by the client
pub type SharedStore = Arc<dyn ProfileStore>;

pub struct LocalReporter {
    service: CompletionService<SharedStore>,
    /// `None` when playing as a guest
    user: Option<UserId>,
    clock: fn() -> DateTime<Utc>,
}

impl LocalReporter {
    pub fn new(service: CompletionService<SharedStore>, user: Option<UserId>) -> Self {
        Self {
            service,
            user,
            clock: Utc::now,
        }
    }

    #[cfg(test)]
    fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.service.store().backend_name()
    }

    fn signed_in(&self) -> Result<&UserId, ReportError> {
        self.user.as_ref().ok_or(ReportError::Unauthenticated)
    }
}

impl CompletionReporter for LocalReporter {
    fn fetch_status(&mut self) -> Result<StatusResponse, ReportError> {
        let user = self.signed_in()?;
        self.service
            .status(user, (self.clock)())
            .map_err(store_failure)
    }

    fn report_completion(&mut self) -> Result<CompletionResponse, ReportError> {
        let user = self.signed_in()?;
        self.service
            .complete(user, (self.clock)())
            .map_err(|e| match e {
                CompletionError::Locked(rejection) => ReportError::Rejected(rejection),
                CompletionError::Store(e) => store_failure(e),
                CompletionError::Conflict => {
                    ReportError::Transport(CompletionError::Conflict.to_string())
                }
            })
    }
}

fn store_failure(e: StoreError) -> ReportError {
    match e {
        StoreError::NotFound(_) => ReportError::Unauthenticated,
        e => ReportError::Transport(e.to_string()),
    }
}

//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::error::ApiResult;
use std::sync::Arc;
use training_core::paging::PageRequest;
use training_core::ports::{ExerciseCatalog, PlanStore, SessionStore, TrainingGroupStore};
use training_core::services::{GroupService, InstantiationService, PlanService, SessionService};

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub groups: GroupService,
    pub plans: PlanService,
    pub sessions: SessionService,
    pub instantiation: InstantiationService,
}

impl AppState {
    /// Builds every service on top of one store that implements all the ports.
    pub fn new<S>(store: Arc<S>, config: Arc<Config>) -> Self
    where
        S: TrainingGroupStore + PlanStore + SessionStore + ExerciseCatalog + 'static,
    {
        Self {
            config,
            groups: GroupService::new(store.clone(), store.clone()),
            plans: PlanService::new(store.clone(), store.clone()),
            sessions: SessionService::new(store.clone(), store.clone()),
            instantiation: InstantiationService::new(store.clone(), store.clone(), store),
        }
    }

    /// Validates list paging parameters against the configured limits.
    pub fn page_request(&self, page: Option<u32>, limit: Option<u32>) -> ApiResult<PageRequest> {
        Ok(PageRequest::new(
            page.unwrap_or(1),
            limit.unwrap_or(self.config.default_page_size),
            self.config.max_page_size,
        )?)
    }
}

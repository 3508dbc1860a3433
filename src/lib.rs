pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod telemetry;
pub mod utils;

use crate::config::Config;
use crate::database::CandidateStore;
use crate::services::candidate_service::CandidateService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub candidate_service: CandidateService,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn CandidateStore>) -> Self {
        Self {
            config: Arc::new(config),
            candidate_service: CandidateService::new(store),
        }
    }
}

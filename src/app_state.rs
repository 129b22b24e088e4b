use std::sync::Arc;

use crate::{config::AppConfig, pipeline::Pipeline};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub pipeline: Arc<Pipeline>,
}

use foldserve::workflows::fold::FoldService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<FoldService>,
}

impl AppState {
    pub fn new(service: Arc<FoldService>) -> Self {
        Self { service }
    }
}

use places_core::Aggregator;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
}

use crate::FetchService;
use ratatoskr_states::State;
use std::sync::Arc;

/// The HTTP client every query and command goes through.
#[derive(Debug, Clone)]
pub struct FetchState {
    pub inner: Arc<dyn FetchService>,
}

impl FetchState {
    pub fn new(fetcher: impl FetchService + 'static) -> Self {
        Self {
            inner: Arc::new(fetcher),
        }
    }
}

impl State for FetchState {}

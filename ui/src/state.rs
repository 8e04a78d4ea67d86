use std::sync::Arc;

use log::warn;
use ratatoskr_business::{
    BusinessConfig, Credentials, EhttpFetcher, FetchService, FetchState, build_state_ctx,
};
use ratatoskr_states::StateCtx;

/// What is typed into the login form. Never enters the store.
#[derive(Debug, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    /// Empties the form, handing its contents to the caller.
    pub fn take_credentials(&mut self) -> Credentials {
        Credentials::new(
            std::mem::take(&mut self.username),
            std::mem::take(&mut self.password),
        )
    }
}

/// The main application state.
pub struct State {
    /// The state context for business logic.
    pub ctx: StateCtx,
    /// Local state of the login form.
    pub login_form: LoginForm,
}

impl Default for State {
    fn default() -> Self {
        let config = BusinessConfig::from_env().unwrap_or_else(|e| {
            warn!("Invalid configuration in environment, using defaults: {e}");
            BusinessConfig::default()
        });
        Self::with_fetcher(config, Arc::new(EhttpFetcher::default()))
    }
}

impl State {
    pub fn with_fetcher(config: BusinessConfig, fetcher: Arc<dyn FetchService>) -> Self {
        Self {
            ctx: build_state_ctx(config, FetchState { inner: fetcher }),
            login_form: LoginForm::default(),
        }
    }

    pub fn test(fetcher: Arc<dyn FetchService>) -> Self {
        Self::with_fetcher(BusinessConfig::default(), fetcher)
    }
}

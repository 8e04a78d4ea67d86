//! Domain layer of the Ratatoskr client: wire types, the HTTP seam, and the
//! queries and commands that keep the store in sync with the backend.

mod accounts;
mod config;
mod counter;
mod display_texts;
mod fetch_service;
mod fetch_state;
pub mod http;
mod locale;
mod login_result;
mod login_state;
mod query_status;
mod route;

#[cfg(all(test, not(target_arch = "wasm32")))]
mod test_utils;

pub use accounts::{Account, Accounts, AccountsQuery};
pub use config::BusinessConfig;
pub use counter::{
    Counter, CounterCommand, CounterIncrementStep, CounterIncrementStepQuery, CounterQuery,
    UpdateCounterIncrementStepCommand,
};
pub use display_texts::{DisplayTexts, DisplayTextsQuery};
#[cfg(any(test, feature = "test-utils"))]
pub use fetch_service::MockFetcher;
pub use fetch_service::{EhttpFetcher, FetchService, OnDone, fetch_json};
pub use fetch_state::FetchState;
pub use http::{HttpError, HttpRequest, HttpResponse, HttpResult, Method};
pub use locale::{
    AvailableLocales, AvailableLocalesQuery, DefaultLocaleQuery, Locale, LocaleBean,
    SetLocaleCommand,
};
pub use login_result::{Credentials, LoginPayload, LoginResult, User};
pub use login_state::{
    LoginMutation, LoginStateQuery, LogoutCommand, PostLoginCommand, SessionEpoch,
};
pub use query_status::{QueryPlan, QueryStatus, plan};
pub use route::{NavigateCommand, Route};

use ratatoskr_states::StateCtx;

/// A store holding every state and query the client renders from.
pub fn build_state_ctx(config: BusinessConfig, fetch: FetchState) -> StateCtx {
    let mut ctx = StateCtx::new();

    ctx.add_state(config);
    ctx.add_state(fetch);
    ctx.add_state(Locale::default());
    ctx.add_state(AvailableLocales::default());
    ctx.add_state(DisplayTexts::default());
    ctx.add_state(LoginResult::default());
    ctx.add_state(LoginMutation::default());
    ctx.add_state(SessionEpoch::default());
    ctx.add_state(Accounts::default());
    ctx.add_state(Counter::default());
    ctx.add_state(CounterIncrementStep::default());
    ctx.add_state(Route::default());

    ctx.record_compute(DefaultLocaleQuery::default());
    ctx.record_compute(AvailableLocalesQuery::default());
    ctx.record_compute(LoginStateQuery::default());
    ctx.record_compute(DisplayTextsQuery::default());
    ctx.record_compute(AccountsQuery::default());
    ctx.record_compute(CounterQuery::default());
    ctx.record_compute(CounterIncrementStepQuery::default());

    ctx
}

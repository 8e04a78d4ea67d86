//! Session lifecycle: the login-state query, the login mutation and logout.
//!
//! All three write the same [`LoginResult`] slice; views only read it.
//! Login and logout each open a new [`SessionEpoch`], and a response only
//! lands if no newer session change was issued after its request.

use std::any::TypeId;

use chrono::Utc;
use log::{debug, error, info, warn};
use ratatoskr_states::{
    Command, Compute, ComputeDeps, ComputeStage, Dep, Error, State, StateCtx, Updater,
};

use crate::{
    BusinessConfig, Credentials, DefaultLocaleQuery, FetchState, Locale, LoginResult, Route,
    fetch_service::fetch_json,
    http::HttpRequest,
    query_status::{QueryPlan, QueryStatus, plan},
};

fn with_locale(api_url: &str, path: &str, locale: &str) -> String {
    format!("{api_url}/{path}?locale={}", urlencoding::encode(locale))
}

/// Bumped whenever a login or logout is issued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionEpoch(pub u64);

impl SessionEpoch {
    fn next(self) -> Self {
        Self(self.0 + 1)
    }

    fn is_current(self, ctx: &StateCtx) -> bool {
        ctx.cached::<Self>() == Some(&self)
    }
}

impl State for SessionEpoch {}

/// `GET /api/loginstate?locale=`, the session as the backend sees it.
#[derive(Debug, Clone, Default)]
pub struct LoginStateQuery {
    pub status: QueryStatus,
    issued_for: Option<String>,
}

impl LoginStateQuery {
    fn is_current(ctx: &StateCtx, locale: &str) -> bool {
        ctx.cached::<Self>()
            .is_some_and(|query| query.issued_for.as_deref() == Some(locale))
            && ctx
                .cached::<Locale>()
                .is_some_and(|current| current.code() == locale)
    }
}

impl State for LoginStateQuery {}

impl Compute for LoginStateQuery {
    fn deps(&self) -> ComputeDeps {
        vec![
            TypeId::of::<DefaultLocaleQuery>(),
            TypeId::of::<Locale>(),
            TypeId::of::<BusinessConfig>(),
        ]
    }

    fn compute(&self, deps: Dep, updater: Updater) -> Result<ComputeStage, Error> {
        let default_locale = deps.get_compute_ref::<DefaultLocaleQuery>()?;
        let locale = deps.get_state_ref::<Locale>()?.code().to_owned();
        let ready = default_locale.is_success() && !locale.is_empty();

        match plan(ready, &self.status, self.issued_for.as_ref(), &locale) {
            QueryPlan::Keep => return Ok(ComputeStage::Finished),
            QueryPlan::Wait => {
                updater.set(Self {
                    status: QueryStatus::WaitingOnPrerequisite,
                    issued_for: None,
                });
                return Ok(ComputeStage::Finished);
            }
            QueryPlan::Fetch => {}
        }

        let api_url = deps.get_state_ref::<BusinessConfig>()?.api_url();
        let fetcher = deps.get_state_ref::<FetchState>()?.inner.clone();
        let epoch = *deps.get_state_ref::<SessionEpoch>()?;

        info!("LoginStateQuery: fetching login state");
        updater.set(Self {
            status: QueryStatus::InFlight,
            issued_for: Some(locale.clone()),
        });

        let request = HttpRequest::get(with_locale(&api_url, "loginstate", &locale));
        fetch_json::<LoginResult, _>(fetcher.as_ref(), request, move |result| {
            updater.apply("LoginStateQuery", move |ctx| {
                if !Self::is_current(ctx, &locale) {
                    debug!("LoginStateQuery: dropping stale answer for '{locale}'");
                    return;
                }
                match result {
                    Ok(login_result) => {
                        info!(
                            "LoginStateQuery: signed in: {}",
                            login_result.is_signed_in()
                        );
                        // a login or logout issued since supersedes this answer
                        if epoch.is_current(ctx) {
                            ctx.set(login_result);
                        } else {
                            debug!("LoginStateQuery: session changed, keeping newer result");
                        }
                        ctx.set(Self {
                            status: QueryStatus::Succeeded(Utc::now()),
                            issued_for: Some(locale),
                        });
                    }
                    Err(e) => {
                        error!("LoginStateQuery: {e}");
                        ctx.set(Self {
                            status: QueryStatus::Failed(e.to_string()),
                            issued_for: Some(locale),
                        });
                    }
                }
            });
        });

        Ok(ComputeStage::Pending)
    }
}

/// Progress of the last submitted login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginMutation {
    pub status: QueryStatus,
}

impl LoginMutation {
    pub fn is_in_flight(&self) -> bool {
        self.status.is_in_flight()
    }
}

impl State for LoginMutation {}

/// `POST /api/login?locale=` with the password base64-encoded.
///
/// Takes the credentials by value; once dispatched they exist only in the
/// request body.
#[derive(Debug)]
pub struct PostLoginCommand {
    pub credentials: Credentials,
}

impl PostLoginCommand {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

impl Command for PostLoginCommand {
    fn run(self, deps: Dep, updater: Updater) -> Result<(), Error> {
        if deps.get_state_ref::<LoginMutation>()?.is_in_flight() {
            warn!("PostLoginCommand: login already in flight, ignoring");
            return Ok(());
        }

        let api_url = deps.get_state_ref::<BusinessConfig>()?.api_url();
        let locale = deps.get_state_ref::<Locale>()?.code().to_owned();
        let fetcher = deps.get_state_ref::<FetchState>()?.inner.clone();
        let username = self.credentials.username.clone();

        let url = with_locale(&api_url, "login", &locale);
        let request = match HttpRequest::post_json(&url, &self.credentials.into_payload()) {
            Ok(request) => request,
            Err(e) => {
                error!("PostLoginCommand: {e}");
                updater.set(LoginMutation {
                    status: QueryStatus::Failed(e.to_string()),
                });
                return Ok(());
            }
        };

        info!("PostLoginCommand: logging in '{username}'");
        let epoch = deps.get_state_ref::<SessionEpoch>()?.next();
        updater.set(epoch);
        updater.set(LoginMutation {
            status: QueryStatus::InFlight,
        });

        fetch_json::<LoginResult, _>(fetcher.as_ref(), request, move |result| {
            updater.apply("PostLoginCommand", move |ctx| match result {
                Ok(login_result) => {
                    if login_result.is_signed_in() {
                        info!("PostLoginCommand: '{username}' signed in");
                    } else {
                        warn!(
                            "PostLoginCommand: '{username}' not signed in: {}",
                            login_result.errormessage
                        );
                    }
                    if epoch.is_current(ctx) {
                        ctx.set(login_result);
                    } else {
                        debug!("PostLoginCommand: session changed, dropping result");
                    }
                    ctx.set(LoginMutation {
                        status: QueryStatus::Succeeded(Utc::now()),
                    });
                }
                Err(e) => {
                    error!("PostLoginCommand: {e}");
                    ctx.set(LoginMutation {
                        status: QueryStatus::Failed(e.to_string()),
                    });
                }
            });
        });

        Ok(())
    }
}

/// `GET /api/logout?locale=`. Carries no payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogoutCommand;

impl Command for LogoutCommand {
    fn run(self, deps: Dep, updater: Updater) -> Result<(), Error> {
        let api_url = deps.get_state_ref::<BusinessConfig>()?.api_url();
        let locale = deps.get_state_ref::<Locale>()?.code().to_owned();
        let fetcher = deps.get_state_ref::<FetchState>()?.inner.clone();

        info!("LogoutCommand: logging out");
        let epoch = deps.get_state_ref::<SessionEpoch>()?.next();
        updater.set(epoch);

        let request = HttpRequest::get(with_locale(&api_url, "logout", &locale));
        fetch_json::<LoginResult, _>(fetcher.as_ref(), request, move |result| match result {
            Ok(login_result) => updater.apply("LogoutCommand", move |ctx| {
                if !epoch.is_current(ctx) {
                    debug!("LogoutCommand: session changed, dropping result");
                    return;
                }
                info!("LogoutCommand: logged out");
                ctx.set(login_result);
                ctx.set(Route::Home);
            }),
            Err(e) => error!("LogoutCommand: {e}"),
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{LoginPayload, MockFetcher, SetLocaleCommand, http::Method};

    fn signed_in() -> serde_json::Value {
        json!({
            "success": true,
            "errormessage": "",
            "authorized": true,
            "user": {"userid": 1, "username": "alice", "email": "alice@example.com", "firstname": "Alice", "lastname": "Liddell"}
        })
    }

    fn ctx_with(fetcher: Arc<MockFetcher>) -> StateCtx {
        let mut ctx = StateCtx::new();
        ctx.add_state(BusinessConfig::default());
        ctx.add_state(FetchState { inner: fetcher });
        ctx.add_state(Locale::default());
        ctx.add_state(LoginResult::default());
        ctx.add_state(LoginMutation::default());
        ctx.add_state(SessionEpoch::default());
        ctx.add_state(Route::Counter);
        ctx.record_compute(DefaultLocaleQuery::default());
        ctx.record_compute(LoginStateQuery::default());
        ctx
    }

    #[test]
    fn login_state_waits_for_default_locale() {
        let fetcher = Arc::new(MockFetcher::new());
        let mut ctx = ctx_with(fetcher.clone());

        ctx.run_until_idle(10);

        assert_eq!(fetcher.requests_to("/defaultlocale").len(), 1);
        assert!(fetcher.requests_to("/loginstate").is_empty());
    }

    #[test]
    fn login_state_is_fetched_with_locale() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.respond(Method::Get, "/api/defaultlocale", 200, json!("en_GB"));
        fetcher.respond(Method::Get, "/api/loginstate", 200, signed_in());
        let mut ctx = ctx_with(fetcher.clone());

        assert!(ctx.run_until_idle(10));

        let requests = fetcher.requests_to("/loginstate");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].query_param("locale"), Some("en_GB"));
        assert!(ctx.cached::<LoginResult>().is_some_and(LoginResult::is_signed_in));
    }

    #[test]
    fn post_login_sends_encoded_password_once() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.respond(Method::Post, "/api/login", 200, signed_in());
        let mut ctx = ctx_with(fetcher.clone());
        ctx.update::<Locale>(|locale| *locale = Locale::new("en"));

        ctx.dispatch(PostLoginCommand::new(Credentials::new("alice", "pw1")));
        ctx.sync_computes();

        let requests = fetcher.requests_to("/login");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].query_param("locale"), Some("en"));
        let payload: LoginPayload =
            serde_json::from_slice(&requests[0].body).expect("Should be a login payload");
        assert_eq!(
            payload,
            LoginPayload {
                username: "alice".to_owned(),
                password: "cHcx".to_owned(),
            }
        );
        assert_eq!(
            ctx.cached::<LoginResult>().and_then(LoginResult::username),
            Some("alice")
        );
        assert!(
            ctx.cached::<LoginMutation>()
                .is_some_and(|m| m.status.is_success())
        );
    }

    #[test]
    fn rejected_login_keeps_server_message() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.respond(
            Method::Post,
            "/api/login",
            200,
            json!({"success": false, "errormessage": "Wrong password"}),
        );
        let mut ctx = ctx_with(fetcher);

        ctx.dispatch(PostLoginCommand::new(Credentials::new("alice", "nope")));
        ctx.sync_computes();

        let result = ctx.snapshot::<LoginResult>().expect("registered");
        assert!(!result.is_signed_in());
        assert_eq!(result.errormessage, "Wrong password");
    }

    #[test]
    fn login_in_flight_is_not_duplicated() {
        let fetcher = Arc::new(MockFetcher::new());
        let mut ctx = ctx_with(fetcher.clone());
        ctx.update::<LoginMutation>(|m| m.status = QueryStatus::InFlight);

        ctx.dispatch(PostLoginCommand::new(Credentials::new("alice", "pw1")));

        assert!(fetcher.requests_to("/login").is_empty());
    }

    #[test]
    fn logout_replaces_login_result_and_goes_home() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.respond(
            Method::Get,
            "/api/logout",
            200,
            json!({"success": true, "authorized": false}),
        );
        let mut ctx = ctx_with(fetcher.clone());
        ctx.update::<Locale>(|locale| *locale = Locale::new("nb_NO"));
        ctx.update::<LoginResult>(|result| {
            *result = serde_json::from_value(signed_in()).expect("Should deserialize");
        });

        ctx.dispatch(LogoutCommand);
        ctx.sync_computes();

        let requests = fetcher.requests_to("/logout");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].query_param("locale"), Some("nb_NO"));
        assert!(requests[0].body.is_empty());
        assert!(!ctx.cached::<LoginResult>().is_some_and(LoginResult::is_signed_in));
        assert_eq!(ctx.cached::<Route>(), Some(&Route::Home));
    }

    #[test]
    fn login_state_answer_older_than_login_is_ignored() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.respond(Method::Get, "/api/defaultlocale", 200, json!("en_GB"));
        fetcher.respond(Method::Post, "/api/login", 200, signed_in());
        fetcher.hold("/loginstate");
        let mut ctx = ctx_with(fetcher.clone());
        ctx.run_until_idle(10);

        ctx.dispatch(PostLoginCommand::new(Credentials::new("alice", "pw1")));
        ctx.run_until_idle(10);
        assert!(ctx.cached::<LoginResult>().is_some_and(LoginResult::is_signed_in));

        let signed_out = json!({"success": true, "authorized": false});
        assert!(fetcher.release(|_| true, 200, signed_out));
        assert!(ctx.run_until_idle(10));

        assert_eq!(
            ctx.cached::<LoginResult>().and_then(LoginResult::username),
            Some("alice")
        );
        let query = ctx.snapshot::<LoginStateQuery>().expect("registered");
        assert!(query.status.is_success());
    }

    #[test]
    fn login_state_answer_for_previous_locale_is_ignored() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.respond(Method::Get, "/api/defaultlocale", 200, json!("nb_NO"));
        fetcher.hold("/loginstate");
        let mut ctx = ctx_with(fetcher.clone());
        ctx.run_until_idle(10);

        ctx.dispatch(SetLocaleCommand("en_GB".to_owned()));
        ctx.run_until_idle(10);

        let en = |request: &HttpRequest| request.query_param("locale") == Some("en_GB");
        assert!(fetcher.release(en, 200, signed_in()));
        let signed_out = json!({"success": false, "errormessage": "Ikke logget inn"});
        assert!(fetcher.release(|_| true, 200, signed_out));
        assert!(ctx.run_until_idle(10));

        let result = ctx.snapshot::<LoginResult>().expect("registered");
        assert!(result.is_signed_in());
        assert_eq!(result.errormessage, "");
    }

    #[test]
    fn login_answer_after_logout_is_ignored() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.respond(
            Method::Get,
            "/api/logout",
            200,
            json!({"success": true, "authorized": false}),
        );
        fetcher.hold("/login");
        let mut ctx = ctx_with(fetcher.clone());

        ctx.dispatch(PostLoginCommand::new(Credentials::new("alice", "pw1")));
        ctx.sync_computes();
        ctx.dispatch(LogoutCommand);
        ctx.sync_computes();
        assert!(fetcher.release(|_| true, 200, signed_in()));
        ctx.sync_computes();

        assert!(!ctx.cached::<LoginResult>().is_some_and(LoginResult::is_signed_in));
        assert!(
            ctx.cached::<LoginMutation>()
                .is_some_and(|m| m.status.is_success())
        );
    }
}

//! The signed-in user's counter and the step it moves by.

use std::any::TypeId;

use chrono::Utc;
use log::{debug, error, info};
use ratatoskr_states::{
    Command, Compute, ComputeDeps, ComputeStage, Dep, Error, State, StateCtx, Updater,
};
use serde::{Deserialize, Serialize};

use crate::{
    BusinessConfig, FetchState, LoginResult,
    fetch_service::fetch_json,
    http::HttpRequest,
    query_status::{QueryPlan, QueryStatus, plan},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Counter {
    pub counter: i64,
}

impl State for Counter {}

/// How far one increment or decrement moves the counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CounterIncrementStep {
    pub username: String,
    pub counter_increment_step: i64,
}

impl State for CounterIncrementStep {}

fn counter_url(api_url: &str, username: &str) -> String {
    format!("{api_url}/counter/{}", urlencoding::encode(username))
}

fn increment_step_url(api_url: &str) -> String {
    format!("{api_url}/counterincrementstep")
}

fn signed_in_as(ctx: &StateCtx, username: &str) -> bool {
    ctx.cached::<LoginResult>()
        .is_some_and(|result| result.is_signed_in_as(username))
}

fn signed_in_user(deps: &Dep) -> Result<Option<String>, Error> {
    let login_result = deps.get_state_ref::<LoginResult>()?;
    Ok(login_result
        .username()
        .filter(|_| login_result.is_signed_in())
        .map(str::to_owned))
}

/// `GET /api/counter/{username}`.
#[derive(Debug, Clone, Default)]
pub struct CounterQuery {
    pub status: QueryStatus,
    issued_for: Option<String>,
}

impl CounterQuery {
    fn is_current(ctx: &StateCtx, username: &str) -> bool {
        ctx.cached::<Self>()
            .is_some_and(|query| query.issued_for.as_deref() == Some(username))
            && signed_in_as(ctx, username)
    }
}

impl State for CounterQuery {}

impl Compute for CounterQuery {
    fn deps(&self) -> ComputeDeps {
        vec![TypeId::of::<LoginResult>(), TypeId::of::<BusinessConfig>()]
    }

    fn compute(&self, deps: Dep, updater: Updater) -> Result<ComputeStage, Error> {
        let login_result = deps.get_state_ref::<LoginResult>()?;
        let username = login_result.username().unwrap_or_default().to_owned();

        match plan(
            login_result.is_signed_in(),
            &self.status,
            self.issued_for.as_ref(),
            &username,
        ) {
            QueryPlan::Keep => return Ok(ComputeStage::Finished),
            QueryPlan::Wait => {
                updater.set(Counter::default());
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

        updater.set(Self {
            status: QueryStatus::InFlight,
            issued_for: Some(username.clone()),
        });

        let request = HttpRequest::get(counter_url(&api_url, &username));
        fetch_json::<Counter, _>(fetcher.as_ref(), request, move |result| {
            updater.apply("CounterQuery", move |ctx| {
                if !Self::is_current(ctx, &username) {
                    debug!("CounterQuery: '{username}' is no longer signed in, dropping");
                    return;
                }
                match result {
                    Ok(counter) => {
                        info!("CounterQuery: counter of '{username}' is {}", counter.counter);
                        ctx.set(counter);
                        ctx.set(Self {
                            status: QueryStatus::Succeeded(Utc::now()),
                            issued_for: Some(username),
                        });
                    }
                    Err(e) => {
                        error!("CounterQuery: {e}");
                        ctx.set(Self {
                            status: QueryStatus::Failed(e.to_string()),
                            issued_for: Some(username),
                        });
                    }
                }
            });
        });

        Ok(ComputeStage::Pending)
    }
}

/// `POST /api/counter/{username}/increment` or `/decrement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterCommand {
    Increment,
    Decrement,
}

impl CounterCommand {
    fn action(self) -> &'static str {
        match self {
            Self::Increment => "increment",
            Self::Decrement => "decrement",
        }
    }
}

impl Command for CounterCommand {
    fn run(self, deps: Dep, updater: Updater) -> Result<(), Error> {
        let Some(username) = signed_in_user(&deps)? else {
            error!("CounterCommand: nobody is signed in");
            return Ok(());
        };
        let api_url = deps.get_state_ref::<BusinessConfig>()?.api_url();
        let fetcher = deps.get_state_ref::<FetchState>()?.inner.clone();

        let url = format!("{}/{}", counter_url(&api_url, &username), self.action());
        let request = match HttpRequest::post_json(url, &serde_json::Value::Null) {
            Ok(request) => request,
            Err(e) => {
                error!("CounterCommand: {e}");
                return Ok(());
            }
        };

        info!("CounterCommand: {}", self.action());
        fetch_json::<Counter, _>(fetcher.as_ref(), request, move |result| match result {
            Ok(counter) => updater.apply("CounterCommand", move |ctx| {
                if signed_in_as(ctx, &username) {
                    ctx.set(counter);
                }
            }),
            Err(e) => error!("CounterCommand: {e}"),
        });

        Ok(())
    }
}

/// `GET /api/counterincrementstep/{username}`.
#[derive(Debug, Clone, Default)]
pub struct CounterIncrementStepQuery {
    pub status: QueryStatus,
    issued_for: Option<String>,
}

impl CounterIncrementStepQuery {
    fn is_current(ctx: &StateCtx, username: &str) -> bool {
        ctx.cached::<Self>()
            .is_some_and(|query| query.issued_for.as_deref() == Some(username))
            && signed_in_as(ctx, username)
    }
}

impl State for CounterIncrementStepQuery {}

impl Compute for CounterIncrementStepQuery {
    fn deps(&self) -> ComputeDeps {
        vec![TypeId::of::<LoginResult>(), TypeId::of::<BusinessConfig>()]
    }

    fn compute(&self, deps: Dep, updater: Updater) -> Result<ComputeStage, Error> {
        let username = signed_in_user(&deps)?;
        let wanted = username.clone().unwrap_or_default();

        match plan(
            username.is_some(),
            &self.status,
            self.issued_for.as_ref(),
            &wanted,
        ) {
            QueryPlan::Keep => return Ok(ComputeStage::Finished),
            QueryPlan::Wait => {
                updater.set(CounterIncrementStep::default());
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

        updater.set(Self {
            status: QueryStatus::InFlight,
            issued_for: Some(wanted.clone()),
        });

        let url = format!(
            "{}/{}",
            increment_step_url(&api_url),
            urlencoding::encode(&wanted)
        );
        fetch_json::<CounterIncrementStep, _>(
            fetcher.as_ref(),
            HttpRequest::get(url),
            move |result| {
                updater.apply("CounterIncrementStepQuery", move |ctx| {
                    if !Self::is_current(ctx, &wanted) {
                        debug!("CounterIncrementStepQuery: '{wanted}' is no longer signed in");
                        return;
                    }
                    match result {
                        Ok(step) => {
                            info!(
                                "CounterIncrementStepQuery: step of '{wanted}' is {}",
                                step.counter_increment_step
                            );
                            ctx.set(step);
                            ctx.set(Self {
                                status: QueryStatus::Succeeded(Utc::now()),
                                issued_for: Some(wanted),
                            });
                        }
                        Err(e) => {
                            error!("CounterIncrementStepQuery: {e}");
                            ctx.set(Self {
                                status: QueryStatus::Failed(e.to_string()),
                                issued_for: Some(wanted),
                            });
                        }
                    }
                });
            },
        );

        Ok(ComputeStage::Pending)
    }
}

/// `POST /api/counterincrementstep` with the new step for the signed-in user.
/// The backend answers with the stored step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateCounterIncrementStepCommand(pub i64);

impl Command for UpdateCounterIncrementStepCommand {
    fn run(self, deps: Dep, updater: Updater) -> Result<(), Error> {
        let Some(username) = signed_in_user(&deps)? else {
            error!("UpdateCounterIncrementStepCommand: nobody is signed in");
            return Ok(());
        };
        let previous = deps.get_state_ref::<CounterIncrementStep>()?.clone();
        if previous.counter_increment_step == self.0 {
            return Ok(());
        }
        let api_url = deps.get_state_ref::<BusinessConfig>()?.api_url();
        let fetcher = deps.get_state_ref::<FetchState>()?.inner.clone();

        let body = CounterIncrementStep {
            username: username.clone(),
            counter_increment_step: self.0,
        };
        let request = match HttpRequest::post_json(increment_step_url(&api_url), &body) {
            Ok(request) => request,
            Err(e) => {
                error!("UpdateCounterIncrementStepCommand: {e}");
                return Ok(());
            }
        };

        info!("UpdateCounterIncrementStepCommand: step of '{username}' to {}", self.0);
        // shown right away, replaced by what the backend stored
        updater.set(body.clone());
        fetch_json::<CounterIncrementStep, _>(fetcher.as_ref(), request, move |result| {
            updater.apply("UpdateCounterIncrementStepCommand", move |ctx| {
                if !signed_in_as(ctx, &username) {
                    return;
                }
                match result {
                    Ok(step) => {
                        ctx.set(step);
                    }
                    Err(e) => {
                        error!("UpdateCounterIncrementStepCommand: {e}");
                        if ctx.cached::<CounterIncrementStep>() == Some(&body) {
                            ctx.set(previous);
                        }
                    }
                }
            });
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{MockFetcher, User, http::Method};

    fn ctx_with(fetcher: Arc<MockFetcher>, username: &str) -> StateCtx {
        let mut ctx = StateCtx::new();
        ctx.add_state(BusinessConfig::default());
        ctx.add_state(FetchState { inner: fetcher });
        ctx.add_state(LoginResult {
            success: true,
            authorized: !username.is_empty(),
            user: User {
                username: username.to_owned(),
                ..Default::default()
            },
            ..Default::default()
        });
        ctx.add_state(Counter::default());
        ctx.add_state(CounterIncrementStep::default());
        ctx.record_compute(CounterQuery::default());
        ctx.record_compute(CounterIncrementStepQuery::default());
        ctx
    }

    fn sign_in_as(ctx: &mut StateCtx, username: &str) {
        ctx.update::<LoginResult>(|result| {
            result.authorized = true;
            result.user.username = username.to_owned();
        });
    }

    #[test]
    fn counter_is_fetched_for_signed_in_user() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.respond(Method::Get, "/api/counter/jod", 200, json!({"counter": 4}));
        let mut ctx = ctx_with(fetcher.clone(), "jod");

        assert!(ctx.run_until_idle(10));

        assert_eq!(ctx.cached::<Counter>(), Some(&Counter { counter: 4 }));
        assert_eq!(fetcher.requests_to("/counter/jod").len(), 1);
    }

    #[test]
    fn increment_and_decrement_post_to_user_counter() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.respond(
            Method::Post,
            "/api/counter/jod/increment",
            200,
            json!({"counter": 5}),
        );
        fetcher.respond(
            Method::Post,
            "/api/counter/jod/decrement",
            200,
            json!({"counter": 3}),
        );
        let mut ctx = ctx_with(fetcher.clone(), "jod");

        ctx.dispatch(CounterCommand::Increment);
        ctx.sync_computes();
        assert_eq!(ctx.cached::<Counter>(), Some(&Counter { counter: 5 }));

        ctx.dispatch(CounterCommand::Decrement);
        ctx.sync_computes();
        assert_eq!(ctx.cached::<Counter>(), Some(&Counter { counter: 3 }));

        let posts: Vec<_> = fetcher
            .requests()
            .into_iter()
            .filter(|request| request.method == Method::Post)
            .collect();
        assert_eq!(posts.len(), 2);
    }

    #[test]
    fn counter_command_needs_signed_in_user() {
        let fetcher = Arc::new(MockFetcher::new());
        let mut ctx = ctx_with(fetcher.clone(), "");

        ctx.dispatch(CounterCommand::Increment);

        assert!(fetcher.requests().is_empty());
    }

    #[test]
    fn counter_for_previous_user_is_dropped() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.hold("/counter/jod");
        fetcher.respond(Method::Get, "/api/counter/jad", 200, json!({"counter": 9}));
        let mut ctx = ctx_with(fetcher.clone(), "jod");
        ctx.run_until_idle(10);

        sign_in_as(&mut ctx, "jad");
        ctx.run_until_idle(10);
        assert!(fetcher.release(|_| true, 200, json!({"counter": 4})));
        assert!(ctx.run_until_idle(10));

        assert_eq!(ctx.cached::<Counter>(), Some(&Counter { counter: 9 }));
    }

    #[test]
    fn increment_step_is_fetched_for_signed_in_user() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.respond(
            Method::Get,
            "/api/counterincrementstep/jod",
            200,
            json!({"username": "jod", "counterIncrementStep": 3}),
        );
        let mut ctx = ctx_with(fetcher.clone(), "jod");

        ctx.run_until_idle(10);

        let step = ctx.snapshot::<CounterIncrementStep>().expect("registered");
        assert_eq!(step.counter_increment_step, 3);
        assert_eq!(step.username, "jod");
        assert_eq!(fetcher.requests_to("/counterincrementstep/jod").len(), 1);
    }

    #[test]
    fn update_step_posts_bean_and_keeps_stored_value() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.respond(
            Method::Post,
            "/api/counterincrementstep",
            200,
            json!({"username": "jod", "counterIncrementStep": 5}),
        );
        let mut ctx = ctx_with(fetcher.clone(), "jod");

        ctx.dispatch(UpdateCounterIncrementStepCommand(5));
        ctx.sync_computes();

        let requests = fetcher.requests_to("/counterincrementstep");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Post);
        let body: serde_json::Value =
            serde_json::from_slice(&requests[0].body).expect("Should be JSON");
        assert_eq!(body, json!({"username": "jod", "counterIncrementStep": 5}));
        assert_eq!(
            ctx.cached::<CounterIncrementStep>()
                .map(|step| step.counter_increment_step),
            Some(5)
        );

        // Unchanged step is not posted again.
        ctx.dispatch(UpdateCounterIncrementStepCommand(5));
        assert_eq!(fetcher.requests_to("/counterincrementstep").len(), 1);
    }

    #[test]
    fn failed_step_update_restores_previous_step() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.respond(Method::Post, "/api/counterincrementstep", 500, json!({}));
        let mut ctx = ctx_with(fetcher, "jod");
        ctx.update::<CounterIncrementStep>(|step| step.counter_increment_step = 1);

        ctx.dispatch(UpdateCounterIncrementStepCommand(7));
        ctx.sync_computes();

        assert_eq!(
            ctx.cached::<CounterIncrementStep>()
                .map(|step| step.counter_increment_step),
            Some(1)
        );
    }
}

use std::any::TypeId;

use chrono::Utc;
use log::{debug, error, info};
use ratatoskr_states::{
    Compute, ComputeDeps, ComputeStage, Dep, Error, State, StateCtx, Updater,
};
use serde::{Deserialize, Serialize};

use crate::{
    BusinessConfig, FetchState, LoginResult, User,
    fetch_service::fetch_json,
    http::HttpRequest,
    query_status::{QueryPlan, QueryStatus, plan},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    #[serde(rename = "accountId")]
    pub accountid: i64,
    pub user: User,
}

/// Every account known to the backend. Empty while signed out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Accounts(pub Vec<Account>);

impl Accounts {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl State for Accounts {}

/// `GET /api/accounts`, issued once per signed-in user.
#[derive(Debug, Clone, Default)]
pub struct AccountsQuery {
    pub status: QueryStatus,
    issued_for: Option<String>,
}

impl AccountsQuery {
    fn is_current(ctx: &StateCtx, username: &str) -> bool {
        ctx.cached::<Self>()
            .is_some_and(|query| query.issued_for.as_deref() == Some(username))
            && ctx
                .cached::<LoginResult>()
                .is_some_and(|result| result.is_signed_in_as(username))
    }
}

impl State for AccountsQuery {}

impl Compute for AccountsQuery {
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
                // Signed out: forget the previous user's view.
                updater.set(Accounts::default());
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

        let request = HttpRequest::get(format!("{api_url}/accounts"));
        fetch_json::<Vec<Account>, _>(fetcher.as_ref(), request, move |result| {
            updater.apply("AccountsQuery", move |ctx| {
                if !Self::is_current(ctx, &username) {
                    debug!("AccountsQuery: '{username}' is no longer signed in, dropping");
                    return;
                }
                match result {
                    Ok(accounts) => {
                        info!("AccountsQuery: {} accounts", accounts.len());
                        ctx.set(Accounts(accounts));
                        ctx.set(Self {
                            status: QueryStatus::Succeeded(Utc::now()),
                            issued_for: Some(username),
                        });
                    }
                    Err(e) => {
                        error!("AccountsQuery: {e}");
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

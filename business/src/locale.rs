//! Locale selection.
//!
//! The active [`Locale`] starts empty. [`DefaultLocaleQuery`] asks the backend
//! for its default and seeds the locale with it; [`SetLocaleCommand`] lets the
//! user switch. Everything keyed by locale waits for the default to arrive.

use std::any::TypeId;

use chrono::Utc;
use log::{error, info};
use ratatoskr_states::{Command, Compute, ComputeDeps, ComputeStage, Dep, Error, State, Updater};
use serde::{Deserialize, Serialize};
use ustr::Ustr;

use crate::{
    BusinessConfig, FetchState,
    fetch_service::fetch_json,
    http::HttpRequest,
    query_status::{QueryPlan, QueryStatus, plan},
};

/// The active locale code, e.g. `nb_NO`. Empty until known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locale(pub String);

impl Locale {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl State for Locale {}

/// One entry of the locale selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocaleBean {
    pub code: String,
    pub display_language: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailableLocales(pub Vec<LocaleBean>);

impl AvailableLocales {
    pub fn display_language(&self, code: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|locale| locale.code == code)
            .map(|locale| locale.display_language.as_str())
    }
}

impl State for AvailableLocales {}

/// `GET /api/defaultlocale`. The prerequisite of every locale-keyed query.
#[derive(Debug, Clone, Default)]
pub struct DefaultLocaleQuery {
    pub status: QueryStatus,
    pub default_locale: Option<String>,
    issued_for: Option<Ustr>,
}

impl DefaultLocaleQuery {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

impl State for DefaultLocaleQuery {}

impl Compute for DefaultLocaleQuery {
    fn deps(&self) -> ComputeDeps {
        vec![TypeId::of::<BusinessConfig>()]
    }

    fn compute(&self, deps: Dep, updater: Updater) -> Result<ComputeStage, Error> {
        let api_url = deps.get_state_ref::<BusinessConfig>()?.api_url();
        if plan(true, &self.status, self.issued_for.as_ref(), &api_url) != QueryPlan::Fetch {
            return Ok(ComputeStage::Finished);
        }

        let fetcher = deps.get_state_ref::<FetchState>()?.inner.clone();

        info!("DefaultLocaleQuery: fetching default locale");
        updater.set(Self {
            status: QueryStatus::InFlight,
            default_locale: self.default_locale.clone(),
            issued_for: Some(api_url),
        });

        let request = HttpRequest::get(format!("{api_url}/defaultlocale"));
        fetch_json::<String, _>(fetcher.as_ref(), request, move |result| match result {
            Ok(locale) => {
                info!("DefaultLocaleQuery: default locale is '{locale}'");
                updater.apply("DefaultLocaleQuery", move |ctx| {
                    // a locale picked while this was in flight wins
                    if ctx.cached::<Locale>().is_some_and(Locale::is_empty) {
                        ctx.set(Locale::new(locale.clone()));
                    }
                    ctx.set(Self {
                        status: QueryStatus::Succeeded(Utc::now()),
                        default_locale: Some(locale),
                        issued_for: Some(api_url),
                    });
                });
            }
            Err(e) => {
                error!("DefaultLocaleQuery: {e}");
                updater.set(Self {
                    status: QueryStatus::Failed(e.to_string()),
                    default_locale: None,
                    issued_for: Some(api_url),
                });
            }
        });

        Ok(ComputeStage::Pending)
    }
}

/// `GET /api/availablelocales`, for the locale selector.
#[derive(Debug, Clone, Default)]
pub struct AvailableLocalesQuery {
    pub status: QueryStatus,
    issued_for: Option<Ustr>,
}

impl State for AvailableLocalesQuery {}

impl Compute for AvailableLocalesQuery {
    fn deps(&self) -> ComputeDeps {
        vec![TypeId::of::<BusinessConfig>()]
    }

    fn compute(&self, deps: Dep, updater: Updater) -> Result<ComputeStage, Error> {
        let api_url = deps.get_state_ref::<BusinessConfig>()?.api_url();
        if plan(true, &self.status, self.issued_for.as_ref(), &api_url) != QueryPlan::Fetch {
            return Ok(ComputeStage::Finished);
        }
        let fetcher = deps.get_state_ref::<FetchState>()?.inner.clone();

        updater.set(Self {
            status: QueryStatus::InFlight,
            issued_for: Some(api_url),
        });

        let request = HttpRequest::get(format!("{api_url}/availablelocales"));
        fetch_json::<Vec<LocaleBean>, _>(fetcher.as_ref(), request, move |result| match result {
            Ok(locales) => {
                info!("AvailableLocalesQuery: {} locales", locales.len());
                updater.set(AvailableLocales(locales));
                updater.set(Self {
                    status: QueryStatus::Succeeded(Utc::now()),
                    issued_for: Some(api_url),
                });
            }
            Err(e) => {
                error!("AvailableLocalesQuery: {e}");
                updater.set(Self {
                    status: QueryStatus::Failed(e.to_string()),
                    issued_for: Some(api_url),
                });
            }
        });

        Ok(ComputeStage::Pending)
    }
}

/// Switches the active locale. Locale-keyed queries re-fetch on the next run.
#[derive(Debug, Clone)]
pub struct SetLocaleCommand(pub String);

impl Command for SetLocaleCommand {
    fn run(self, deps: Dep, updater: Updater) -> Result<(), Error> {
        if deps.get_state_ref::<Locale>()?.code() == self.0 {
            return Ok(());
        }
        info!("SetLocaleCommand: switching to '{}'", self.0);
        updater.set(Locale(self.0));
        Ok(())
    }
}

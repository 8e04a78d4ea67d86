use std::{any::TypeId, collections::BTreeMap};

use chrono::Utc;
use log::{debug, error, info};
use ratatoskr_states::{
    Compute, ComputeDeps, ComputeStage, Dep, Error, State, StateCtx, Updater,
};

use crate::{
    BusinessConfig, DefaultLocaleQuery, FetchState, Locale,
    fetch_service::fetch_json,
    http::HttpRequest,
    query_status::{QueryPlan, QueryStatus, plan},
};

/// Localized UI strings, keyed by text id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayTexts(pub BTreeMap<String, String>);

impl DisplayTexts {
    /// Missing keys render as nothing rather than failing.
    pub fn get(&self, key: &str) -> &str {
        self.0.get(key).map(String::as_str).unwrap_or_default()
    }
}

impl State for DisplayTexts {}

/// `GET /api/displaytexts?locale=`, re-fetched whenever the locale changes.
#[derive(Debug, Clone, Default)]
pub struct DisplayTextsQuery {
    pub status: QueryStatus,
    issued_for: Option<String>,
}

impl DisplayTextsQuery {
    /// Whether a response for `locale` still belongs to the latest request.
    fn is_current(ctx: &StateCtx, locale: &str) -> bool {
        ctx.cached::<Self>()
            .is_some_and(|query| query.issued_for.as_deref() == Some(locale))
            && ctx
                .cached::<Locale>()
                .is_some_and(|current| current.code() == locale)
    }
}

impl State for DisplayTextsQuery {}

impl Compute for DisplayTextsQuery {
    fn deps(&self) -> ComputeDeps {
        vec![
            TypeId::of::<DefaultLocaleQuery>(),
            TypeId::of::<Locale>(),
            TypeId::of::<BusinessConfig>(),
        ]
    }

    fn compute(&self, deps: Dep, updater: Updater) -> Result<ComputeStage, Error> {
        let default_locale = deps.get_compute_ref::<DefaultLocaleQuery>()?;
        let locale = deps.get_state_ref::<Locale>()?;
        let ready = default_locale.is_success() && !locale.is_empty();

        match plan(
            ready,
            &self.status,
            self.issued_for.as_ref(),
            &locale.code().to_owned(),
        ) {
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
        let locale = locale.code().to_owned();

        info!("DisplayTextsQuery: fetching texts for '{locale}'");
        updater.set(Self {
            status: QueryStatus::InFlight,
            issued_for: Some(locale.clone()),
        });

        let request = HttpRequest::get(format!(
            "{api_url}/displaytexts?locale={}",
            urlencoding::encode(&locale)
        ));
        fetch_json::<BTreeMap<String, String>, _>(fetcher.as_ref(), request, move |result| {
            updater.apply("DisplayTextsQuery", move |ctx| {
                if !Self::is_current(ctx, &locale) {
                    debug!("DisplayTextsQuery: dropping stale texts for '{locale}'");
                    return;
                }
                match result {
                    Ok(texts) => {
                        info!("DisplayTextsQuery: {} texts for '{locale}'", texts.len());
                        ctx.set(DisplayTexts(texts));
                        ctx.set(Self {
                            status: QueryStatus::Succeeded(Utc::now()),
                            issued_for: Some(locale),
                        });
                    }
                    Err(e) => {
                        error!("DisplayTextsQuery: {e}");
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

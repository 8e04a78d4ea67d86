use std::sync::Arc;

use egui_kittest::Harness;
use ratatoskr_business::{Method, MockFetcher};
use ratatoskr_ui::{RatatoskrApp, render, state::State};
use serde_json::{Value, json};

/// Frames needed for the default locale, login state, display texts and
/// accounts to land one after another.
pub const SETTLE_FRAMES: usize = 8;

pub struct TestCtx<'a, T = State> {
    fetcher: Arc<MockFetcher>,
    harness: Harness<'a, T>,
}

impl<'a, T> TestCtx<'a, T> {
    pub fn harness_mut(&mut self) -> &mut Harness<'a, T> {
        &mut self.harness
    }

    #[allow(unused)]
    pub fn harness(&self) -> &Harness<'a, T> {
        &self.harness
    }

    pub fn fetcher(&self) -> &MockFetcher {
        &self.fetcher
    }

    pub fn settle(&mut self) {
        for _ in 0..SETTLE_FRAMES {
            self.harness.step();
        }
    }
}

impl<'a> TestCtx<'a, State> {
    pub fn new(fetcher: Arc<MockFetcher>) -> Self {
        let state = State::test(fetcher.clone());
        let harness = Harness::new_ui_state(|ui, state: &mut State| render(state, ui), state);
        Self { fetcher, harness }
    }

    #[allow(unused)]
    pub fn signed_in() -> Self {
        Self::new(backend(true))
    }

    #[allow(unused)]
    pub fn signed_out() -> Self {
        Self::new(backend(false))
    }
}

impl<'a> TestCtx<'a, RatatoskrApp> {
    #[allow(unused)]
    pub fn new_app(fetcher: Arc<MockFetcher>) -> Self {
        let state = State::test(fetcher.clone());
        let harness = Harness::new_eframe(|cc| RatatoskrApp::new(state, &cc.egui_ctx));
        Self { fetcher, harness }
    }
}

pub fn display_texts() -> Value {
    json!({
        "gohome": "Go home",
        "counter": "Counter",
        "hi": "Hi",
        "numberofaccounts": "Number of accounts",
        "logged_in_user_info": "Logged in user info",
        "username": "Username",
        "firstname": "First name",
        "lastname": "Last name",
        "email": "Email address",
        "password": "Password",
        "logout": "Log out"
    })
}

pub fn signed_in_result() -> Value {
    json!({
        "success": true,
        "errormessage": "",
        "authorized": true,
        "user": {
            "userid": 1,
            "username": "jod",
            "email": "jd@example.com",
            "firstname": "John",
            "lastname": "Doe"
        }
    })
}

/// A backend in locale `en` with three accounts.
pub fn backend(signed_in: bool) -> Arc<MockFetcher> {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.respond(Method::Get, "/api/defaultlocale", 200, json!("en"));
    fetcher.respond(
        Method::Get,
        "/api/availablelocales",
        200,
        json!([
            {"code": "en", "displayLanguage": "English"},
            {"code": "nb_NO", "displayLanguage": "norsk bokmål"}
        ]),
    );
    fetcher.respond(Method::Get, "/api/displaytexts", 200, display_texts());
    let login_state = if signed_in {
        signed_in_result()
    } else {
        json!({"success": false, "errormessage": "", "authorized": false})
    };
    fetcher.respond(Method::Get, "/api/loginstate", 200, login_state);
    fetcher.respond(
        Method::Get,
        "/api/accounts",
        200,
        json!([
            {"accountId": 1, "user": {"username": "jod"}},
            {"accountId": 2, "user": {"username": "jad"}},
            {"accountId": 3, "user": {"username": "jdd"}}
        ]),
    );
    fetcher.respond(Method::Get, "/api/counter/jod", 200, json!({"counter": 0}));
    fetcher.respond(
        Method::Get,
        "/api/counterincrementstep/jod",
        200,
        json!({"username": "jod", "counterIncrementStep": 1}),
    );
    fetcher.respond(
        Method::Get,
        "/api/logout",
        200,
        json!({"success": true, "errormessage": "Logged out", "authorized": false}),
    );
    fetcher
}

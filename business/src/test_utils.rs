//! Helpers for driving the business layer against a `wiremock` backend
//! through the real [`EhttpFetcher`].
//!
//! ```ignore
//! let mut test_ctx = TestContext::new().await;
//! test_ctx.mock_default_locale("nb_NO").await;
//! test_ctx
//!     .settle_until(|ctx| ctx.cached::<Locale>().is_some_and(|l| !l.is_empty()))
//!     .await;
//! ```

use std::time::{Duration, Instant};

use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

use crate::{BusinessConfig, EhttpFetcher, FetchState, build_state_ctx};
use ratatoskr_states::StateCtx;

pub const BASENAME: &str = "/ratatoskr";

/// A mock server and a store configured to talk to it.
pub struct TestContext {
    pub mock_server: MockServer,
    pub ctx: StateCtx,
}

impl TestContext {
    pub async fn new() -> Self {
        let mock_server = MockServer::start().await;
        let config = BusinessConfig::new(mock_server.uri(), BASENAME);
        let ctx = build_state_ctx(config, FetchState::new(EhttpFetcher::default()));

        Self { mock_server, ctx }
    }

    /// Runs the store until `done` holds, giving the HTTP threads time to
    /// answer between rounds.
    pub async fn settle_until(&mut self, done: impl Fn(&StateCtx) -> bool) {
        let timeout = Duration::from_secs(5);
        let start = Instant::now();
        loop {
            self.ctx.run_until_idle(10);
            if done(&self.ctx) {
                return;
            }
            if start.elapsed() > timeout {
                panic!("Timed out waiting for the store to settle: {:?}", self.ctx);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Lets in-flight requests land, then applies them.
    pub async fn settle_for(&mut self, duration: Duration) {
        let start = Instant::now();
        while start.elapsed() < duration {
            self.ctx.run_until_idle(10);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.ctx.run_until_idle(10);
    }

    pub async fn received_paths(&self) -> Vec<String> {
        self.mock_server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|request| request.url.path().to_owned())
            .collect()
    }

    fn api(endpoint: &str) -> String {
        format!("{BASENAME}/api/{endpoint}")
    }

    async fn mount_get(&self, endpoint: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(Self::api(endpoint)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.mock_server)
            .await;
    }

    pub async fn mock_default_locale(&self, locale: &str) {
        self.mount_get("defaultlocale", json!(locale)).await;
    }

    pub async fn mock_default_locale_error(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path(Self::api("defaultlocale")))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.mock_server)
            .await;
    }

    pub async fn mock_available_locales(&self) {
        self.mount_get(
            "availablelocales",
            json!([
                {"code": "nb_NO", "displayLanguage": "norsk bokmål"},
                {"code": "en_GB", "displayLanguage": "English"}
            ]),
        )
        .await;
    }

    pub async fn mock_display_texts(&self, locale: &str, texts: Value) {
        Mock::given(method("GET"))
            .and(path(Self::api("displaytexts")))
            .and(query_param("locale", locale))
            .respond_with(ResponseTemplate::new(200).set_body_json(texts))
            .mount(&self.mock_server)
            .await;
    }

    pub async fn mock_login_state(&self, login_result: Value) {
        self.mount_get("loginstate", login_result).await;
    }

    pub async fn mock_login(&self, login_result: Value) {
        Mock::given(method("POST"))
            .and(path(Self::api("login")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(login_result)
                    .insert_header("set-cookie", "JSESSIONID=abc123; Path=/ratatoskr"),
            )
            .mount(&self.mock_server)
            .await;
    }

    pub async fn mock_accounts(&self, usernames: &[&str]) {
        let accounts: Vec<Value> = usernames
            .iter()
            .enumerate()
            .map(|(idx, username)| json!({"accountId": idx + 1, "user": {"username": username}}))
            .collect();
        self.mount_get("accounts", Value::Array(accounts)).await;
    }
}

pub fn signed_in_result(username: &str) -> Value {
    json!({
        "success": true,
        "errormessage": "",
        "authorized": true,
        "user": {
            "userid": 1,
            "username": username,
            "email": format!("{username}@example.com"),
            "firstname": "John",
            "lastname": "Doe"
        }
    })
}

pub fn signed_out_result() -> Value {
    json!({"success": false, "errormessage": "", "authorized": false})
}

//! Home page for signed-in users.

use egui::{Grid, Ui};
use ratatoskr_business::{
    Accounts, BusinessConfig, DisplayTexts, LoginResult, LogoutCommand, NavigateCommand, Route,
};

use crate::{state::State, widgets};

/// Renders the navigation bar, the greeting, the account count, the
/// identity table and the logout button.
pub fn home_page(state: &mut State, ui: &mut Ui) {
    let texts = state.ctx.snapshot::<DisplayTexts>().unwrap_or_default();
    let login_result = state.ctx.snapshot::<LoginResult>().unwrap_or_default();
    let accounts = state
        .ctx
        .cached::<Accounts>()
        .map(Accounts::len)
        .unwrap_or_default();
    let home_url = state
        .ctx
        .cached::<BusinessConfig>()
        .map(BusinessConfig::home_url)
        .unwrap_or_default();
    let user = &login_result.user;

    ui.horizontal(|ui| {
        ui.hyperlink_to(format!("⏴ {}!", texts.get("gohome")), home_url);
        ui.heading("Ratatoskr");
        if ui.link(texts.get("counter")).clicked() {
            state.ctx.dispatch(NavigateCommand(Route::Counter));
        }
        widgets::locale_selector(&mut state.ctx, ui);
    });
    ui.separator();

    ui.label(format!("{} {}!", texts.get("hi"), user.firstname));
    ui.label(format!("{}: {accounts}", texts.get("numberofaccounts")));
    ui.add_space(8.0);

    ui.label(texts.get("logged_in_user_info"));
    Grid::new("logged_in_user_info")
        .num_columns(2)
        .striped(true)
        .show(ui, |ui| {
            for (key, value) in [
                ("username", &user.username),
                ("firstname", &user.firstname),
                ("lastname", &user.lastname),
                ("email", &user.email),
            ] {
                ui.label(texts.get(key));
                ui.label(value);
                ui.end_row();
            }
        });
    ui.add_space(8.0);

    if ui.button(texts.get("logout")).clicked() {
        state.ctx.dispatch(LogoutCommand);
    }
}

#[cfg(test)]
mod home_page_test {
    use std::sync::Arc;

    use egui_kittest::Harness;
    use kittest::Queryable;
    use ratatoskr_business::{Method, MockFetcher};
    use serde_json::json;

    use crate::{render, state::State};

    fn backend() -> Arc<MockFetcher> {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.respond(Method::Get, "/api/defaultlocale", 200, json!("nb_NO"));
        fetcher.respond(Method::Get, "/api/availablelocales", 200, json!([]));
        fetcher.respond(
            Method::Get,
            "/api/displaytexts",
            200,
            json!({"hi": "Hei", "numberofaccounts": "Antall kontoer", "logout": "Logg ut"}),
        );
        fetcher.respond(
            Method::Get,
            "/api/loginstate",
            200,
            json!({
                "success": true,
                "authorized": true,
                "user": {"username": "jod", "firstname": "John", "lastname": "Doe", "email": "jd@example.com"}
            }),
        );
        fetcher.respond(Method::Get, "/api/accounts", 200, json!([{"accountId": 1}]));
        fetcher
    }

    #[test]
    fn test_home_page_greets_user() {
        let state = State::test(backend());
        let mut harness = Harness::new_ui_state(|ui, state: &mut State| render(state, ui), state);
        for _ in 0..8 {
            harness.step();
        }

        assert!(harness.query_by_label("Hei John!").is_some());
        assert!(harness.query_by_label("Antall kontoer: 1").is_some());
        assert!(harness.query_by_label("jd@example.com").is_some());
    }
}

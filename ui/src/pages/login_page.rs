//! Login page, shown whenever nobody is signed in.

use egui::{Align, Grid, Key, Layout, TextEdit, Ui};
use log::debug;
use ratatoskr_business::{DisplayTexts, LoginMutation, LoginResult, PostLoginCommand};

use crate::{state::State, widgets};

/// Renders the login form.
///
/// Keystrokes only touch [`State::login_form`]; submitting moves its
/// contents into a [`PostLoginCommand`].
pub fn login_page(state: &mut State, ui: &mut Ui) {
    let texts = state.ctx.snapshot::<DisplayTexts>().unwrap_or_default();
    let login_result = state.ctx.snapshot::<LoginResult>().unwrap_or_default();
    let in_flight = state
        .ctx
        .cached::<LoginMutation>()
        .is_some_and(LoginMutation::is_in_flight);

    let mut submit = false;
    ui.with_layout(Layout::top_down(Align::Center), |ui| {
        ui.add_space(20.0);
        ui.heading("Ratatoskr login");
        ui.add_space(20.0);

        widgets::login_message(&login_result, ui);

        let form = &mut state.login_form;
        Grid::new("login_form").num_columns(2).show(ui, |ui| {
            let label = ui.label(texts.get("username"));
            ui.add(TextEdit::singleline(&mut form.username))
                .labelled_by(label.id);
            ui.end_row();

            let label = ui.label(texts.get("password"));
            let password = ui
                .add(TextEdit::singleline(&mut form.password).password(true))
                .labelled_by(label.id);
            if password.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter)) {
                submit = true;
            }
            ui.end_row();
        });

        ui.add_space(16.0);
        if in_flight {
            ui.spinner();
        } else if ui.button("Login").clicked() {
            submit = true;
        }
    });

    if submit && !in_flight {
        debug!("login_page: submitting");
        let credentials = state.login_form.take_credentials();
        state.ctx.dispatch(PostLoginCommand::new(credentials));
    }
}

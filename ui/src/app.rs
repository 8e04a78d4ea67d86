use egui::Ui;
use ratatoskr_business::{
    Accounts, AvailableLocales, Counter, CounterIncrementStep, DisplayTexts, Locale,
    LoginMutation, LoginResult, Route,
};

use crate::{pages, state::State};

pub struct RatatoskrApp {
    state: State,
}

impl RatatoskrApp {
    /// Called once before the first frame.
    ///
    /// Background updates wake the UI, and every slice the pages render
    /// requests a repaint when it changes.
    pub fn new(mut state: State, egui_ctx: &egui::Context) -> Self {
        let waker = egui_ctx.clone();
        state.ctx.set_waker(move || waker.request_repaint());

        macro_rules! repaint_on_change {
            ($($slice:ty),+ $(,)?) => {
                $(
                    let repaint = egui_ctx.clone();
                    state
                        .ctx
                        .subscribe::<$slice>(move |_| repaint.request_repaint());
                )+
            };
        }
        repaint_on_change!(
            Locale,
            AvailableLocales,
            DisplayTexts,
            LoginResult,
            LoginMutation,
            Accounts,
            Counter,
            CounterIncrementStep,
            Route,
        );

        Self { state }
    }
}

impl eframe::App for RatatoskrApp {
    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            render(&mut self.state, ui);
        });
    }
}

/// One frame: apply queued updates, draw the active page, then start any
/// queries the new state calls for.
pub fn render(state: &mut State, ui: &mut Ui) {
    state.ctx.sync_computes();

    let signed_in = state
        .ctx
        .cached::<LoginResult>()
        .is_some_and(LoginResult::is_signed_in);
    if signed_in {
        match state.ctx.snapshot::<Route>().unwrap_or_default() {
            Route::Home => pages::home_page(state, ui),
            Route::Counter => pages::counter_page(state, ui),
        }
    } else {
        pages::login_page(state, ui);
    }

    state.ctx.run_computed();
}

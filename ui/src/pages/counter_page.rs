use egui::{Align, DragValue, Layout, RichText, Ui};
use ratatoskr_business::{
    Counter, CounterCommand, CounterIncrementStep, DisplayTexts, NavigateCommand, Route,
    UpdateCounterIncrementStepCommand,
};

use crate::state::State;

/// The signed-in user's counter, with buttons to step it and the step size.
pub fn counter_page(state: &mut State, ui: &mut Ui) {
    let texts = state.ctx.snapshot::<DisplayTexts>().unwrap_or_default();
    let counter = state.ctx.snapshot::<Counter>().unwrap_or_default();
    let mut step = state
        .ctx
        .cached::<CounterIncrementStep>()
        .map(|step| step.counter_increment_step)
        .unwrap_or_default();

    ui.horizontal(|ui| {
        if ui.link("Ratatoskr").clicked() {
            state.ctx.dispatch(NavigateCommand(Route::Home));
        }
        ui.heading(texts.get("counter"));
    });
    ui.separator();

    ui.with_layout(Layout::top_down(Align::Center), |ui| {
        ui.add_space(20.0);
        ui.label(RichText::new(counter.counter.to_string()).size(32.0));
        ui.add_space(12.0);
        ui.horizontal(|ui| {
            if ui.button("-").clicked() {
                state.ctx.dispatch(CounterCommand::Decrement);
            }
            if ui.button("+").clicked() {
                state.ctx.dispatch(CounterCommand::Increment);
            }
        });
        ui.add_space(12.0);
        ui.horizontal(|ui| {
            ui.label("Increment step");
            // zero until the stored step has arrived
            if step < 1 {
                ui.spinner();
            } else if ui
                .add(DragValue::new(&mut step).range(1..=1000).speed(0.1))
                .changed()
            {
                state.ctx.dispatch(UpdateCounterIncrementStepCommand(step));
            }
        });
    });
}

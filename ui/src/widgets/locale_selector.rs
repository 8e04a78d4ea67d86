use egui::{ComboBox, Response, Ui};
use ratatoskr_business::{AvailableLocales, Locale, SetLocaleCommand};
use ratatoskr_states::StateCtx;

/// Combo box over the backend's locales. Picking one dispatches
/// [`SetLocaleCommand`].
pub fn locale_selector(state_ctx: &mut StateCtx, ui: &mut Ui) -> Response {
    let current = state_ctx.snapshot::<Locale>().unwrap_or_default();
    let locales = state_ctx.snapshot::<AvailableLocales>().unwrap_or_default();

    let selected_text = locales
        .display_language(current.code())
        .unwrap_or(current.code())
        .to_owned();

    let mut selected = current.code().to_owned();
    let response = ComboBox::from_id_salt("locale_selector")
        .selected_text(selected_text)
        .show_ui(ui, |ui| {
            for locale in &locales.0 {
                ui.selectable_value(&mut selected, locale.code.clone(), &locale.display_language);
            }
        })
        .response;

    if selected != current.code() {
        state_ctx.dispatch(SetLocaleCommand(selected));
    }

    response
}

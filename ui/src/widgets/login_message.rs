//! The server's explanation of the last login, logout or login-state answer.

use egui::{Color32, Response, Ui};
use ratatoskr_business::LoginResult;

/// Red color for rejected logins
const COLOR_RED: Color32 = Color32::from_rgb(220, 53, 69);
/// Muted color for informational messages, e.g. after logout
const COLOR_MUTED: Color32 = Color32::from_rgb(108, 117, 125);

/// Renders `errormessage` when the backend sent one; nothing otherwise.
pub fn login_message(login_result: &LoginResult, ui: &mut Ui) -> Option<Response> {
    if login_result.errormessage.is_empty() {
        return None;
    }
    let color = if login_result.success {
        COLOR_MUTED
    } else {
        COLOR_RED
    };
    Some(ui.colored_label(color, &login_result.errormessage))
}

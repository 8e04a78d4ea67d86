mod locale_selector;
mod login_message;

pub use locale_selector::locale_selector;
pub use login_message::login_message;

//! Pages module for the application.
//!
//! - `login_page`: shown whenever the login result is not a signed-in user
//! - `home_page`: greeting, account count and the user's identity
//! - `counter_page`: the signed-in user's counter

mod counter_page;
mod home_page;
mod login_page;

pub use counter_page::counter_page;
pub use home_page::home_page;
pub use login_page::login_page;

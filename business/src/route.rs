//! Which page the signed-in user is looking at.
//!
//! The login page is not a route: it is shown whenever the current
//! [`LoginResult`](crate::LoginResult) is not a successful, authorized login.

use log::info;
use ratatoskr_states::{Command, Dep, Error, State, Updater};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Route {
    #[default]
    Home,
    Counter,
}

impl State for Route {}

#[derive(Debug, Clone, Copy)]
pub struct NavigateCommand(pub Route);

impl Command for NavigateCommand {
    fn run(self, deps: Dep, updater: Updater) -> Result<(), Error> {
        if *deps.get_state_ref::<Route>()? != self.0 {
            info!("NavigateCommand: {:?}", self.0);
            updater.set(self.0);
        }
        Ok(())
    }
}

use std::any::{TypeId, type_name};

use crate::{Error, State, StateSnapshot};

/// Read-only view of the store handed to a compute or command.
///
/// Values are snapshots taken right before the run, so a `Dep` can be moved
/// into an async callback without borrowing the store.
pub struct Dep {
    snapshot: StateSnapshot,
}

impl Dep {
    pub(crate) fn new(snapshot: StateSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn get_state_ref<T: State>(&self) -> Result<&T, Error> {
        self.lookup::<T>()
            .ok_or_else(|| Error::state_not_found(type_name::<T>(), "Dep::get_state_ref"))
    }

    pub fn get_compute_ref<T: State>(&self) -> Result<&T, Error> {
        self.lookup::<T>()
            .ok_or_else(|| Error::compute_not_found(type_name::<T>(), "Dep::get_compute_ref"))
    }

    /// Returns an owned copy of the dependency, for moving into callbacks.
    pub fn cloned<T: State>(&self) -> Result<T, Error> {
        self.get_state_ref::<T>().cloned()
    }

    fn lookup<T: State>(&self) -> Option<&T> {
        self.snapshot
            .get_raw(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }
}

use std::any::{Any, TypeId, type_name};

use crate::{Dep, Error, Updater};

/// A value held by [`StateCtx`](crate::StateCtx), keyed by its type.
///
/// States are cloned into snapshots handed to computes and commands, so they
/// must be cheap enough to clone and safe to send to the thread an async
/// callback completes on.
pub trait State: Any + Clone + Send + 'static {}

/// Type ids of the states and computes a compute reads.
pub type ComputeDeps = Vec<TypeId>;

/// Outcome of a single compute run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeStage {
    /// Everything the compute wanted to publish was sent before returning.
    Finished,
    /// An async operation was started and will publish through the updater.
    Pending,
}

/// A derived state that re-runs whenever one of its dependencies changes.
///
/// A compute never mutates itself. It reads its dependencies from `deps`
/// and publishes new values (of itself or of any other state) through the
/// `updater`; those values are applied on the next `sync_computes()`.
pub trait Compute: State {
    fn deps(&self) -> ComputeDeps;

    fn compute(&self, deps: Dep, updater: Updater) -> Result<ComputeStage, Error>;
}

/// An explicitly dispatched action.
///
/// Commands are consumed on dispatch, so any payload they carry is dropped
/// as soon as `run` returns or the async work it started completes.
pub trait Command: Send + 'static {
    fn run(self, deps: Dep, updater: Updater) -> Result<(), Error>;
}

pub(crate) trait AnyState: Send {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn snapshot(&self) -> Box<dyn Any + Send>;

    fn assign_box(&mut self, new_self: Box<dyn Any + Send>) -> Result<(), Error>;

    fn name(&self) -> &'static str;
}

impl<T: State> AnyState for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn snapshot(&self) -> Box<dyn Any + Send> {
        Box::new(self.clone())
    }

    fn assign_box(&mut self, new_self: Box<dyn Any + Send>) -> Result<(), Error> {
        match new_self.downcast::<T>() {
            Ok(value) => {
                *self = *value;
                Ok(())
            }
            Err(_) => Err(Error::type_mismatch(type_name::<T>())),
        }
    }

    fn name(&self) -> &'static str {
        type_name::<T>()
    }
}

pub(crate) trait AnyCompute: AnyState {
    fn run_compute(&self, deps: Dep, updater: Updater) -> Result<ComputeStage, Error>;
}

impl<T: Compute> AnyCompute for T {
    fn run_compute(&self, deps: Dep, updater: Updater) -> Result<ComputeStage, Error> {
        self.compute(deps, updater)
    }
}

use std::{
    any::{Any, TypeId, type_name},
    fmt::{Debug, Formatter},
    sync::Arc,
};

use flume::Sender;
use log::warn;

use crate::{State, StateCtx};

pub(crate) type Apply = Box<dyn FnOnce(&mut StateCtx) + Send>;

pub(crate) enum Update {
    Set(TypeId, Box<dyn Any + Send>),
    Apply(&'static str, Apply),
}

pub(crate) type Waker = Arc<dyn Fn() + Send + Sync>;

/// Write handle into the store.
///
/// Values sent here are queued and applied by `StateCtx::sync_computes` on
/// the thread that owns the store. Cloning is cheap, and clones may be moved
/// into callbacks completing on other threads.
#[derive(Clone)]
pub struct Updater {
    send: Sender<Update>,
    waker: Option<Waker>,
}

impl Updater {
    pub(crate) fn new(send: Sender<Update>, waker: Option<Waker>) -> Self {
        Self { send, waker }
    }

    pub fn set<T: State>(&self, state: T) {
        self.push(
            type_name::<T>(),
            Update::Set(TypeId::of::<T>(), Box::new(state)),
        );
    }

    /// Queues a write that runs against the store as it is when the queue is
    /// drained, not as it was when the write was issued.
    ///
    /// Async completions use this to drop responses whose key is no longer
    /// the current one.
    pub fn apply(&self, label: &'static str, f: impl FnOnce(&mut StateCtx) + Send + 'static) {
        self.push(label, Update::Apply(label, Box::new(f)));
    }

    fn push(&self, label: &'static str, update: Update) {
        if self.send.send(update).is_err() {
            warn!("Store dropped, discarding update for {label}");
            return;
        }
        if let Some(wake) = &self.waker {
            wake();
        }
    }
}

impl Debug for Updater {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updater")
            .field("queued", &self.send.len())
            .field("has_waker", &self.waker.is_some())
            .finish()
    }
}

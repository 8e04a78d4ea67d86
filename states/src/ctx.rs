use std::{
    any::{Any, TypeId, type_name},
    collections::BTreeMap,
    sync::Arc,
};

use flume::{Receiver, Sender};
use log::{debug, error};

use crate::{
    Command, Compute, ComputeStage, Dep, Error, Graph, State, StateSnapshot, StateSyncStatus,
    SubscriptionId, Updater,
    state::{AnyCompute, AnyState},
    subscription::Subscribers,
    updater::{Update, Waker},
};

enum Slot {
    State(Box<dyn AnyState>),
    Compute(Box<dyn AnyCompute>),
}

impl Slot {
    fn as_any(&self) -> &dyn Any {
        match self {
            Self::State(state) => state.as_any(),
            Self::Compute(compute) => compute.as_any(),
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        match self {
            Self::State(state) => state.as_any_mut(),
            Self::Compute(compute) => compute.as_any_mut(),
        }
    }

    fn snapshot(&self) -> Box<dyn Any + Send> {
        match self {
            Self::State(state) => state.snapshot(),
            Self::Compute(compute) => compute.snapshot(),
        }
    }

    fn assign_box(&mut self, value: Box<dyn Any + Send>) -> Result<(), Error> {
        match self {
            Self::State(state) => state.assign_box(value),
            Self::Compute(compute) => compute.assign_box(value),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::State(state) => state.name(),
            Self::Compute(compute) => compute.name(),
        }
    }
}

struct Entry {
    slot: Slot,
    status: StateSyncStatus,
}

/// The application store.
///
/// Holds every state and compute by type, applies queued updates, re-runs
/// computes whose dependencies changed, and notifies subscribers.
///
/// The store has a single writer: whoever owns the `StateCtx` (the UI thread).
/// Other threads only ever hold an [`Updater`].
pub struct StateCtx {
    storage: BTreeMap<TypeId, Entry>,
    graph: Graph<TypeId>,

    send: Sender<Update>,
    recv: Receiver<Update>,
    waker: Option<Waker>,

    subscribers: Subscribers,
}

impl Default for StateCtx {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StateCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&'static str> = self.storage.values().map(|e| e.slot.name()).collect();
        f.debug_struct("StateCtx")
            .field("storage", &names)
            .field("queued", &self.recv.len())
            .field("subscribers", &self.subscribers)
            .finish()
    }
}

impl StateCtx {
    pub fn new() -> Self {
        let (send, recv) = flume::unbounded();
        Self {
            storage: BTreeMap::new(),
            graph: Graph::new(),
            send,
            recv,
            waker: None,
            subscribers: Subscribers::default(),
        }
    }

    pub fn add_state<T: State>(&mut self, state: T) {
        self.storage.insert(
            TypeId::of::<T>(),
            Entry {
                slot: Slot::State(Box::new(state)),
                status: StateSyncStatus::Clean,
            },
        );
    }

    /// Registers a compute. It runs on the next `run_computed()` and again
    /// whenever one of its dependencies changes.
    pub fn record_compute<T: Compute>(&mut self, compute: T) {
        let id = TypeId::of::<T>();
        self.graph.add_node(id);
        for dep in compute.deps() {
            self.graph.route_to(dep, id);
        }
        self.storage.insert(
            id,
            Entry {
                slot: Slot::Compute(Box::new(compute)),
                status: StateSyncStatus::Init,
            },
        );
    }

    /// Checks that the recorded computes form a DAG.
    pub fn verify_deps(&self) -> Result<(), Error> {
        self.graph
            .topology_sort()
            .map(|_| ())
            .map_err(|e| Error::Topology(e.to_string()))
    }

    /// Wakes the owner whenever an update is queued from any thread.
    ///
    /// Only updaters created after this call carry the waker.
    pub fn set_waker(&mut self, waker: impl Fn() + Send + Sync + 'static) {
        self.waker = Some(Arc::new(waker));
    }

    pub fn updater(&self) -> Updater {
        Updater::new(self.send.clone(), self.waker.clone())
    }

    pub fn cached<T: State>(&self) -> Option<&T> {
        self.storage
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.slot.as_any().downcast_ref::<T>())
    }

    pub fn snapshot<T: State>(&self) -> Option<T> {
        self.cached::<T>().cloned()
    }

    pub fn snapshot_all(&self) -> StateSnapshot {
        let mut snapshot = StateSnapshot::new();
        for (id, entry) in &self.storage {
            snapshot.insert_cloned(*id, entry.slot.snapshot());
        }
        snapshot
    }

    pub fn status<T: State>(&self) -> Option<StateSyncStatus> {
        self.storage.get(&TypeId::of::<T>()).map(|entry| entry.status)
    }

    /// Mutates a state in place and propagates the change.
    ///
    /// Returns `false` if `T` is not registered.
    pub fn update<T: State>(&mut self, f: impl FnOnce(&mut T)) -> bool {
        let id = TypeId::of::<T>();
        let Some(value) = self
            .storage
            .get_mut(&id)
            .and_then(|entry| entry.slot.as_any_mut().downcast_mut::<T>())
        else {
            error!("update: {} is not registered", type_name::<T>());
            return false;
        };
        f(value);
        self.settle(id);
        self.changed(id);
        true
    }

    /// Replaces a state and propagates the change.
    ///
    /// Returns `false` if `T` is not registered.
    pub fn set<T: State>(&mut self, value: T) -> bool {
        self.update::<T>(move |current| *current = value)
    }

    pub fn subscribe<T: State>(
        &mut self,
        mut callback: impl FnMut(&T) + Send + 'static,
    ) -> SubscriptionId {
        self.subscribers.add(
            TypeId::of::<T>(),
            Box::new(move |value: &dyn Any| {
                if let Some(value) = value.downcast_ref::<T>() {
                    callback(value);
                }
            }),
        )
    }

    pub fn unsubscribe(&mut self, subscription: SubscriptionId) -> bool {
        self.subscribers.remove(subscription)
    }

    /// Runs a command against a fresh snapshot of the store.
    pub fn dispatch<C: Command>(&mut self, command: C) {
        debug!("dispatch {}", type_name::<C>());
        let deps = Dep::new(self.snapshot_all());
        if let Err(e) = command.run(deps, self.updater()) {
            error!("Command {} failed: {e}", type_name::<C>());
        }
    }

    /// Applies every queued update. Returns how many were applied.
    pub fn sync_computes(&mut self) -> usize {
        let updates: Vec<Update> = self.recv.try_iter().collect();
        let mut applied = 0;
        for update in updates {
            match update {
                Update::Set(id, value) => {
                    let Some(entry) = self.storage.get_mut(&id) else {
                        error!("sync_computes: dropping update for an unregistered type");
                        continue;
                    };
                    if let Err(e) = entry.slot.assign_box(value) {
                        error!("sync_computes: {e}");
                        continue;
                    }
                    self.settle(id);
                    self.changed(id);
                }
                Update::Apply(label, f) => {
                    debug!("sync_computes: applying {label}");
                    f(self);
                }
            }
            applied += 1;
        }
        applied
    }

    /// Runs every compute that has not run yet or whose dependencies changed,
    /// in dependency order.
    pub fn run_computed(&mut self) {
        let order = match self.graph.topology_sort() {
            Ok(order) => order,
            Err(e) => {
                error!("run_computed: {e}");
                return;
            }
        };

        for id in order {
            let should_run = self.storage.get(&id).is_some_and(|entry| {
                matches!(entry.slot, Slot::Compute(_))
                    && matches!(
                        entry.status,
                        StateSyncStatus::Init | StateSyncStatus::Dirty
                    )
            });
            if !should_run {
                continue;
            }

            let deps = Dep::new(self.snapshot_all());
            let updater = self.updater();
            let Some(entry) = self.storage.get_mut(&id) else {
                continue;
            };
            let Slot::Compute(compute) = &entry.slot else {
                continue;
            };
            entry.status = match compute.run_compute(deps, updater) {
                Ok(ComputeStage::Finished) => StateSyncStatus::Clean,
                Ok(ComputeStage::Pending) => StateSyncStatus::Pending,
                Err(e) => {
                    error!("Compute {} failed: {e}", compute.name());
                    StateSyncStatus::Clean
                }
            };
        }
    }

    /// Alternates `sync_computes` and `run_computed` until nothing is queued
    /// and no compute is dirty, or `max_rounds` is reached.
    ///
    /// Returns `true` if the store settled.
    pub fn run_until_idle(&mut self, max_rounds: usize) -> bool {
        for _ in 0..max_rounds {
            let applied = self.sync_computes();
            let dirty = self.storage.values().any(|entry| {
                matches!(entry.slot, Slot::Compute(_))
                    && matches!(
                        entry.status,
                        StateSyncStatus::Init | StateSyncStatus::Dirty
                    )
            });
            if applied == 0 && !dirty && self.recv.is_empty() {
                return true;
            }
            self.run_computed();
        }
        false
    }

    /// A compute waiting on an async result is clean once the result lands.
    fn settle(&mut self, id: TypeId) {
        if let Some(entry) = self.storage.get_mut(&id)
            && entry.status == StateSyncStatus::Pending
        {
            entry.status = StateSyncStatus::Clean;
        }
    }

    fn changed(&mut self, id: TypeId) {
        for dependent in self.graph.dependents(id) {
            if let Some(entry) = self.storage.get_mut(&dependent)
                && entry.status != StateSyncStatus::Init
            {
                entry.status = StateSyncStatus::Dirty;
            }
        }
        if let Some(entry) = self.storage.get(&id) {
            self.subscribers.notify(&id, entry.slot.as_any());
        }
    }
}

use std::{
    any::{Any, TypeId},
    collections::BTreeMap,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn FnMut(&dyn Any) + Send>;

/// Change listeners, grouped by the type of state they watch.
#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: u64,
    by_type: BTreeMap<TypeId, Vec<(SubscriptionId, Callback)>>,
}

impl Subscribers {
    pub(crate) fn add(&mut self, id: TypeId, callback: Callback) -> SubscriptionId {
        self.next_id += 1;
        let subscription = SubscriptionId(self.next_id);
        self.by_type
            .entry(id)
            .or_default()
            .push((subscription, callback));
        subscription
    }

    pub(crate) fn remove(&mut self, subscription: SubscriptionId) -> bool {
        let mut removed = false;
        for callbacks in self.by_type.values_mut() {
            let before = callbacks.len();
            callbacks.retain(|(id, _)| *id != subscription);
            removed |= callbacks.len() != before;
        }
        self.by_type.retain(|_, callbacks| !callbacks.is_empty());
        removed
    }

    pub(crate) fn notify(&mut self, id: &TypeId, value: &dyn Any) {
        if let Some(callbacks) = self.by_type.get_mut(id) {
            for (_, callback) in callbacks.iter_mut() {
                callback(value);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.by_type.values().map(Vec::len).sum()
    }
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("len", &self.len())
            .finish()
    }
}

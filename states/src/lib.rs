//! Explicit client-side store.
//!
//! A [`StateCtx`] holds typed [`State`]s and [`Compute`]s. Computes re-run
//! when the values they depend on change; [`Command`]s are dispatched
//! explicitly. Every write goes through an [`Updater`] queue and is applied
//! by the owner of the store, which then notifies subscribers.

mod ctx;
mod dep;
mod error;
mod graph;
mod snapshot;
mod state;
mod state_sync_status;
mod subscription;
mod updater;

pub use ctx::StateCtx;
pub use dep::Dep;
pub use error::Error;
pub use graph::{DepRoute, Graph, TopologyError};
pub use snapshot::StateSnapshot;
pub use state::{Command, Compute, ComputeDeps, ComputeStage, State};
pub use state_sync_status::StateSyncStatus;
pub use subscription::SubscriptionId;
pub use updater::Updater;

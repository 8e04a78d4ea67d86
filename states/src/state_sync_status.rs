/// Where an entry of the store stands relative to its dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateSyncStatus {
    /// Recorded but never run.
    #[default]
    Init,
    /// Returned `ComputeStage::Pending`; waiting for its own update.
    Pending,
    /// A dependency changed since the last run.
    Dirty,
    Clean,
}

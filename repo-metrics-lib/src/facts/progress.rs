/// A trait for reporting progress of long-running operations.
pub trait Progress: Send + Sync {
    /// Set the phase label for the current operation (e.g., "Collecting").
    fn set_phase(&self, phase: &str);

    /// Set the total number of work items; progress is reported as a fraction of it.
    fn set_total(&self, total: u64);

    /// Record one finished work item, with a message describing the next one.
    fn advance(&self, message: &str);

    /// Finish and clear the progress indicator.
    fn done(&self);
}

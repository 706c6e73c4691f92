pub type BlockingJob = Box<dyn FnOnce() + Send + 'static>;

pub trait AsyncExecutor: Send + Sync {
    /// Runs synchronous filesystem work off the owner thread.
    fn spawn_blocking(&self, job: BlockingJob);
}

use crate::kernel::services::ports::{AsyncExecutor, BlockingJob};

/// Runs every job to completion on the calling thread.
#[derive(Default, Clone, Copy)]
pub struct InlineExecutor;

impl AsyncExecutor for InlineExecutor {
    fn spawn_blocking(&self, job: BlockingJob) {
        job();
    }
}

//! Background jobs driven by the apalis cron monitor.

mod sweep;

pub use sweep::{
    PublishSweepJob, SweepOutcome, SweepWorkerContext, process_publish_sweep_job,
    publish_sweep_schedule, run_publish_sweep,
};

use std::sync::Arc;

use apalis::prelude::Error as ApalisError;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convert any error into an [`ApalisError::Failed`].
pub fn job_failed<E>(err: E) -> ApalisError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let boxed: BoxError = Box::new(err);
    ApalisError::Failed(Arc::new(boxed))
}
